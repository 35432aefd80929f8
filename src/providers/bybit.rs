//! Bybit price provider implementation

use crate::{
    constants::BYBIT_API_URL,
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

/// Bybit v5 `instruments-info` response
#[derive(Debug, Deserialize)]
struct InstrumentsResponse {
    result: InstrumentsResult,
}

#[derive(Debug, Deserialize)]
struct InstrumentsResult {
    list: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct Instrument {
    symbol: String,
    status: String,
}

/// Bybit spot price provider
pub struct BybitProvider {
    client: Client,
    markets: MarketCache,
}

impl BybitProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            markets: MarketCache::new(),
        })
    }

    fn format_symbol(base: &str, quote: &str) -> String {
        format!("{}{}", base.to_uppercase(), quote.to_uppercase())
    }

    fn parse_markets(response: InstrumentsResponse) -> Vec<String> {
        response
            .result
            .list
            .into_iter()
            .filter(|instrument| instrument.status == "Trading")
            .map(|instrument| instrument.symbol)
            .collect()
    }

    /// Kline rows are `[startMs, open, high, low, close, volume, turnover]`
    /// with every field as a string; turnover is the quote-asset volume.
    fn parse_candle(response: &Value, bucket_ms: i64) -> Result<Option<RawCandle>, ProviderError> {
        let list = response
            .pointer("/result/list")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::InvalidResponse("Missing result.list".into()))?;
        let Some(kline) = list.first() else {
            return Ok(None);
        };
        if candle_i64(kline, 0)? != bucket_ms {
            return Ok(None);
        }
        Ok(Some(RawCandle {
            open: candle_f64(kline, 1)?,
            high: candle_f64(kline, 2)?,
            low: candle_f64(kline, 3)?,
            close: candle_f64(kline, 4)?,
            volume: candle_f64(kline, 5)?,
            quote_volume: candle_f64(kline, 6)?,
        }))
    }
}

impl Default for BybitProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create Bybit provider")
    }
}

#[async_trait]
impl PriceProvider for BybitProvider {
    fn name(&self) -> &'static str {
        "bybit"
    }

    fn markets_loaded_at(&self) -> i64 {
        self.markets.markets_loaded_at()
    }

    async fn load_markets(&self) -> Result<(), ProviderError> {
        let url = format!("{BYBIT_API_URL}/market/instruments-info?category=spot");
        let value = get_json(&self.client, &url).await?;
        let response: InstrumentsResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad instruments-info: {e}")))?;
        self.markets.replace(Self::parse_markets(response)).await;
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
        let bucket_ms = bucket_start_ms(timestamp_ms, timeframe_minutes);
        // klines come back newest-first, so bound the window to the bucket
        let end_ms = bucket_ms + timeframe_minutes as i64 * 60_000 - 1;
        let url = format!(
            "{BYBIT_API_URL}/market/kline?category=spot&symbol={}&interval={timeframe_minutes}&start={bucket_ms}&end={end_ms}&limit=1",
            info.symbol
        );
        let response = get_json(&self.client, &url).await?;
        let Some(raw) = Self::parse_candle(&response, bucket_ms)? else {
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
