//! Coinbase Exchange price provider implementation

use crate::{
    constants::COINBASE_API_URL,
    error::ProviderError,
    market::MarketCache,
    provider::PriceProvider,
    providers::{bucket_start_ms, candle_f64, candle_i64, get_json, http_client},
    types::{Ohlcv, Pair, RawCandle},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// Coinbase `/products` entry
#[derive(Debug, Deserialize)]
struct Product {
    id: String,
    status: String,
}

/// Coinbase Exchange spot price provider
pub struct CoinbaseProvider {
    client: Client,
    markets: MarketCache,
}

impl CoinbaseProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            markets: MarketCache::new(),
        })
    }

    fn format_symbol(base: &str, quote: &str) -> String {
        format!("{}-{}", base.to_uppercase(), quote.to_uppercase())
    }

    fn parse_markets(products: Vec<Product>) -> Vec<String> {
        products
            .into_iter()
            .filter(|product| product.status == "online")
            .map(|product| product.id)
            .collect()
    }

    /// Candle rows are `[time, low, high, open, close, volume]` with time
    /// in seconds and only a base-asset volume. The quote volume is
    /// approximated as `volume * mean(open, high, low, close)`.
    fn parse_candle(candles: &Value, bucket_s: i64) -> Result<Option<RawCandle>, ProviderError> {
        let candles = candles
            .as_array()
            .ok_or_else(|| ProviderError::InvalidResponse("Candles is not an array".into()))?;
        let Some(candle) = candles.first() else {
            return Ok(None);
        };
        if candle_i64(candle, 0)? != bucket_s {
            return Ok(None);
        }
        let low = candle_f64(candle, 1)?;
        let high = candle_f64(candle, 2)?;
        let open = candle_f64(candle, 3)?;
        let close = candle_f64(candle, 4)?;
        let volume = candle_f64(candle, 5)?;
        Ok(Some(RawCandle {
            open,
            high,
            low,
            close,
            volume,
            quote_volume: volume * (open + high + low + close) / 4.0,
        }))
    }
}

impl Default for CoinbaseProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create Coinbase provider")
    }
}

#[async_trait]
impl PriceProvider for CoinbaseProvider {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn markets_loaded_at(&self) -> i64 {
        self.markets.markets_loaded_at()
    }

    async fn load_markets(&self) -> Result<(), ProviderError> {
        let url = format!("{COINBASE_API_URL}/products");
        let value = get_json(&self.client, &url).await?;
        let products: Vec<Product> = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad products: {e}")))?;
        self.markets.replace(Self::parse_markets(products)).await;
        Ok(())
    }

    async fn get_ohlcv(
        &self,
        pair: &Pair,
        timestamp_ms: i64,
        timeframe_minutes: u32,
        decimals: u32,
    ) -> Result<Option<Ohlcv>, ProviderError> {
        if pair.is_degenerate() {
            return Ok(Some(Ohlcv::unit(self.name(), decimals)));
        }
        let Some(info) = self.markets.resolve(pair, Self::format_symbol).await else {
            return Ok(None);
        };
        let bucket_s = bucket_start_ms(timestamp_ms, timeframe_minutes) / 1000;
        let start = chrono::DateTime::from_timestamp(bucket_s, 0)
            .ok_or_else(|| ProviderError::InvalidResponse("Timestamp out of range".into()))?
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let url = format!(
            "{COINBASE_API_URL}/products/{}/candles?granularity={}&start={start}&end={start}",
            info.symbol,
            timeframe_minutes * 60
        );
        let candles = get_json(&self.client, &url).await?;
        let Some(raw) = Self::parse_candle(&candles, bucket_s)? else {
            return Ok(None);
        };
        Ok(Some(Ohlcv::from_candle(
            raw,
            info.inversed,
            self.name(),
            decimals,
        )))
    }
}
