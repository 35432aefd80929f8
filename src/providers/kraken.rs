//! Kraken price provider implementation

use crate::{
    constants::KRAKEN_API_URL,
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
use std::collections::HashMap;

/// Kraken `AssetPairs` response
#[derive(Debug, Deserialize)]
struct AssetPairsResponse {
    result: HashMap<String, AssetPair>,
}

#[derive(Debug, Deserialize)]
struct AssetPair {
    altname: String,
    status: String,
}

/// Kraken spot price provider
///
/// Kraken lists BTC under its XBT altname; callers cover that through
/// asset aliases.
pub struct KrakenProvider {
    client: Client,
    markets: MarketCache,
}

impl KrakenProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            markets: MarketCache::new(),
        })
    }

    fn format_symbol(base: &str, quote: &str) -> String {
        format!("{}{}", base.to_uppercase(), quote.to_uppercase())
    }

    fn parse_markets(response: AssetPairsResponse) -> Vec<String> {
        response
            .result
            .into_values()
            .filter(|pair| pair.status == "online")
            .map(|pair| pair.altname)
            .collect()
    }

    /// The OHLC result holds the kline array under the pair's internal
    /// name (not always the requested symbol) next to a `last` cursor.
    /// Rows are `[time, open, high, low, close, vwap, volume, count]` with
    /// time in seconds; there is no limit parameter, so the row matching
    /// the bucket is picked out here. Quote volume is `vwap * volume`.
    fn parse_candle(response: &Value, bucket_s: i64) -> Result<Option<RawCandle>, ProviderError> {
        let result = response
            .get("result")
            .and_then(Value::as_object)
            .ok_or_else(|| ProviderError::InvalidResponse("Missing result object".into()))?;
        let klines = result
            .iter()
            .find(|(key, _)| key.as_str() != "last")
            .and_then(|(_, value)| value.as_array())
            .ok_or_else(|| ProviderError::InvalidResponse("Missing OHLC rows".into()))?;

        for kline in klines {
            if candle_i64(kline, 0)? != bucket_s {
                continue;
            }
            let vwap = candle_f64(kline, 5)?;
            let volume = candle_f64(kline, 6)?;
            return Ok(Some(RawCandle {
                open: candle_f64(kline, 1)?,
                high: candle_f64(kline, 2)?,
                low: candle_f64(kline, 3)?,
                close: candle_f64(kline, 4)?,
                volume,
                quote_volume: vwap * volume,
            }));
        }
        Ok(None)
    }
}

impl Default for KrakenProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create Kraken provider")
    }
}

#[async_trait]
impl PriceProvider for KrakenProvider {
    fn name(&self) -> &'static str {
        "kraken"
    }

    fn markets_loaded_at(&self) -> i64 {
        self.markets.markets_loaded_at()
    }

    async fn load_markets(&self) -> Result<(), ProviderError> {
        let url = format!("{KRAKEN_API_URL}/public/AssetPairs");
        let value = get_json(&self.client, &url).await?;
        let response: AssetPairsResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad AssetPairs: {e}")))?;
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
        let bucket_s = bucket_start_ms(timestamp_ms, timeframe_minutes) / 1000;
        // `since` is exclusive, back off one second to include the bucket
        let url = format!(
            "{KRAKEN_API_URL}/public/OHLC?pair={}&interval={timeframe_minutes}&since={}",
            info.symbol,
            bucket_s - 1
        );
        let response = get_json(&self.client, &url).await?;
        let Some(raw) = Self::parse_candle(&response, bucket_s)? else {
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
