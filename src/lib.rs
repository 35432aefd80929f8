//! # Exchange Price Aggregator
//!
//! Computes a consensus spot price for trading pairs (e.g. BTC/USD) at a
//! historical timestamp by querying several cryptocurrency exchanges
//! concurrently, normalizing each exchange's OHLCV candle into a common
//! fixed-point representation, and combining contributions into a single
//! volume-weighted price with provenance.
//!
//! Failures are isolated per provider and per pair: an exchange outage or
//! a malformed response costs that contribution only, never the whole
//! computation. [`get_prices`] always resolves with a (possibly partial
//! or empty) result map unless the caller's configuration is invalid.
//!
//! ## Usage
//!
//! ```no_run
//! use exchange_price_aggregator::{get_prices, Asset, Pair};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let btc = Asset::new("BTC", vec!["XBT".to_string()]);
//! let usd = Asset::new("USD", vec![]);
//! let pairs = [Pair::new(btc, usd)];
//!
//! let prices = get_prices(
//!     &["binance", "kraken", "coinbase"],
//!     &pairs,
//!     1_700_000_000_000, // timestamp in ms
//!     5,                 // timeframe in minutes
//!     8,                 // price decimals
//! )
//! .await?;
//!
//! for (pair, entry) in &prices {
//!     println!("{pair}: {} (from {:?})", entry.price, entry.sources);
//! }
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod aggregator;
pub mod constants;
pub mod error;
pub mod market;
pub mod math;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use accumulator::{AggregatedPrice, PriceAccumulator};
pub use aggregator::get_prices;
pub use error::{AggregationError, ProviderError};
pub use market::SymbolInfo;
pub use math::ScaledPrice;
pub use provider::PriceProvider;
pub use types::{Asset, Ohlcv, Pair, RawCandle};
