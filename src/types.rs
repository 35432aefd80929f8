//! Core value types: assets, pairs, and normalized candles

use crate::math::{invert, pow10, scale, ScaledPrice};
use serde::{Deserialize, Serialize};

/// A priceable asset: a canonical ticker plus the set of tickers accepted
/// as equivalent on any exchange (e.g. BTC is listed as XBT on Kraken).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Canonical ticker
    pub name: String,
    /// Equivalent tickers, always including `name`
    pub alias: Vec<String>,
}

impl Asset {
    /// Creates an asset, appending `name` to the alias list when absent so
    /// that resolution can iterate aliases alone.
    pub fn new(name: impl Into<String>, alias: Vec<String>) -> Self {
        let name = name.into();
        let mut alias = alias;
        if !alias.iter().any(|a| a == &name) {
            alias.push(name.clone());
        }
        Self { name, alias }
    }
}

/// An ordered trading pair. `BTC/USD` and `USD/BTC` are distinct pairs with
/// distinct names, even though one can be resolved through the other by
/// price inversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub base: Asset,
    pub quote: Asset,
    /// Derived `"<base>/<quote>"` name, used as the result map key
    pub name: String,
}

impl Pair {
    pub fn new(base: Asset, quote: Asset) -> Self {
        let name = format!("{}/{}", base.name, quote.name);
        Self { base, quote, name }
    }

    /// True when base and quote are the same asset; such a pair prices at
    /// exactly 1 without consulting any exchange.
    pub fn is_degenerate(&self) -> bool {
        self.base.name == self.quote.name
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Raw candle values as reported by an exchange, in the exchange's own
/// market orientation, before any scaling or inversion.
#[derive(Debug, Clone, Copy)]
pub struct RawCandle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in the market's base asset units
    pub volume: f64,
    /// Volume in the market's quote asset units
    pub quote_volume: f64,
}

/// A normalized OHLCV candle for one pair, one provider, one timeframe
/// bucket, always expressed in the caller's requested base/quote
/// orientation.
#[derive(Debug, Clone)]
pub struct Ohlcv {
    pub open: ScaledPrice,
    pub high: ScaledPrice,
    pub low: ScaledPrice,
    pub close: ScaledPrice,
    /// Base asset volume
    pub volume: f64,
    /// Quote asset volume
    pub quote_volume: f64,
    pub decimals: u32,
    /// Provider that produced this candle
    pub source: String,
}

impl Ohlcv {
    /// Normalizes a raw exchange candle.
    ///
    /// When `inversed`, the exchange trades quote/base rather than the
    /// requested base/quote: every price is inverted, high and low swap
    /// roles, and the volume columns swap units.
    pub fn from_candle(raw: RawCandle, inversed: bool, source: &str, decimals: u32) -> Self {
        if inversed {
            Self {
                open: invert(scale(raw.open, decimals), decimals),
                high: invert(scale(raw.low, decimals), decimals),
                low: invert(scale(raw.high, decimals), decimals),
                close: invert(scale(raw.close, decimals), decimals),
                volume: raw.quote_volume,
                quote_volume: raw.volume,
                decimals,
                source: source.to_string(),
            }
        } else {
            Self {
                open: scale(raw.open, decimals),
                high: scale(raw.high, decimals),
                low: scale(raw.low, decimals),
                close: scale(raw.close, decimals),
                volume: raw.volume,
                quote_volume: raw.quote_volume,
                decimals,
                source: source.to_string(),
            }
        }
    }

    /// Synthetic candle for a same-asset pair: price exactly 1 at the given
    /// decimals, zero volume, no network involved.
    pub fn unit(source: &str, decimals: u32) -> Self {
        let one = pow10(decimals);
        Self {
            open: one,
            high: one,
            low: one,
            close: one,
            volume: 0.0,
            quote_volume: 0.0,
            decimals,
            source: source.to_string(),
        }
    }

    /// Volume-weighted price of this single candle; `0` when no volume
    /// traded in the bucket.
    pub fn vwap(&self) -> ScaledPrice {
        if self.volume == 0.0 {
            return 0;
        }
        scale(self.quote_volume / self.volume, self.decimals)
    }
}
