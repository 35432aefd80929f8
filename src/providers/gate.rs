//! Gate.io price provider implementation

use crate::{
    constants::GATE_API_URL,
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

/// Gate.io `currency_pairs` entry
#[derive(Debug, Deserialize)]
struct CurrencyPair {
    id: String,
    trade_status: String,
}

/// Gate.io spot price provider
pub struct GateProvider {
    client: Client,
    markets: MarketCache,
}

impl GateProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            markets: MarketCache::new(),
        })
    }

    fn format_symbol(base: &str, quote: &str) -> String {
        format!("{}_{}", base.to_uppercase(), quote.to_uppercase())
    }

    fn parse_markets(pairs: Vec<CurrencyPair>) -> Vec<String> {
        pairs
            .into_iter()
            .filter(|pair| pair.trade_status == "tradable")
            .map(|pair| pair.id)
            .collect()
    }

    /// Candlestick rows are `[time, quoteVolume, close, high, low, open,
    /// baseVolume, closed]` with time in seconds and every field a string.
    fn parse_candle(candles: &Value, bucket_s: i64) -> Result<Option<RawCandle>, ProviderError> {
        let candles = candles
            .as_array()
            .ok_or_else(|| ProviderError::InvalidResponse("Candlesticks is not an array".into()))?;
        let Some(candle) = candles.first() else {
            return Ok(None);
        };
        if candle_i64(candle, 0)? != bucket_s {
            return Ok(None);
        }
        Ok(Some(RawCandle {
            open: candle_f64(candle, 5)?,
            high: candle_f64(candle, 3)?,
            low: candle_f64(candle, 4)?,
            close: candle_f64(candle, 2)?,
            volume: candle_f64(candle, 6)?,
            quote_volume: candle_f64(candle, 1)?,
        }))
    }
}

impl Default for GateProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create Gate provider")
    }
}

#[async_trait]
impl PriceProvider for GateProvider {
    fn name(&self) -> &'static str {
        "gate"
    }

    fn markets_loaded_at(&self) -> i64 {
        self.markets.markets_loaded_at()
    }

    async fn load_markets(&self) -> Result<(), ProviderError> {
        let url = format!("{GATE_API_URL}/spot/currency_pairs");
        let value = get_json(&self.client, &url).await?;
        let pairs: Vec<CurrencyPair> = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad currency_pairs: {e}")))?;
        self.markets.replace(Self::parse_markets(pairs)).await;
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
        let url = format!(
            "{GATE_API_URL}/spot/candlesticks?currency_pair={}&interval={timeframe_minutes}m&from={bucket_s}&limit=1",
            info.symbol
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
