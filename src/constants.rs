//! Constants for the exchange price aggregator
//!
//! All configuration is centralized here. No runtime configuration is
//! used - the system operates with these compile-time constants.

/// Reload a provider's market list when the snapshot is older than this
pub const MARKET_REFRESH_INTERVAL_MS: i64 = 1000 * 60 * 60 * 6;

/// HTTP request timeout for exchange API calls (in milliseconds)
pub const REQUEST_TIMEOUT_MS: u64 = 2000;

/// Highest supported decimals value; `10^(2 * MAX_DECIMALS)` must fit the
/// scaled price type for inversion
pub const MAX_DECIMALS: u32 = 18;

/// Binance API base URL
pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Bybit API base URL
pub const BYBIT_API_URL: &str = "https://api.bybit.com/v5";

/// OKX API base URL
pub const OKX_API_URL: &str = "https://www.okx.com/api/v5";

/// Kraken API base URL
pub const KRAKEN_API_URL: &str = "https://api.kraken.com/0";

/// Coinbase Exchange API base URL
pub const COINBASE_API_URL: &str = "https://api.exchange.coinbase.com";

/// Gate.io API base URL
pub const GATE_API_URL: &str = "https://api.gateio.ws/api/v4";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "exchange-price-aggregator/0.1.0";
