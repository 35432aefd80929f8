//! OKX price provider implementation

use crate::{
    constants::OKX_API_URL,
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

/// OKX v5 `instruments` response
#[derive(Debug, Deserialize)]
struct InstrumentsResponse {
    data: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct Instrument {
    #[serde(rename = "instId")]
    inst_id: String,
    state: String,
}

/// OKX spot price provider
pub struct OkxProvider {
    client: Client,
    markets: MarketCache,
}

impl OkxProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            markets: MarketCache::new(),
        })
    }

    fn format_symbol(base: &str, quote: &str) -> String {
        format!("{}-{}", base.to_uppercase(), quote.to_uppercase())
    }

    fn parse_markets(response: InstrumentsResponse) -> Vec<String> {
        response
            .data
            .into_iter()
            .filter(|instrument| instrument.state == "live")
            .map(|instrument| instrument.inst_id)
            .collect()
    }

    /// Candle rows are `[ts, open, high, low, close, vol, volCcy,
    /// volCcyQuote, confirm]`; for spot markets `volCcy` is the base-asset
    /// volume and `volCcyQuote` the quote-asset volume.
    fn parse_candle(response: &Value, bucket_ms: i64) -> Result<Option<RawCandle>, ProviderError> {
        let data = response
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::InvalidResponse("Missing data array".into()))?;
        let Some(kline) = data.first() else {
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
            volume: candle_f64(kline, 6)?,
            quote_volume: candle_f64(kline, 7)?,
        }))
    }
}

impl Default for OkxProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create OKX provider")
    }
}

#[async_trait]
impl PriceProvider for OkxProvider {
    fn name(&self) -> &'static str {
        "okx"
    }

    fn markets_loaded_at(&self) -> i64 {
        self.markets.markets_loaded_at()
    }

    async fn load_markets(&self) -> Result<(), ProviderError> {
        let url = format!("{OKX_API_URL}/public/instruments?instType=SPOT");
        let value = get_json(&self.client, &url).await?;
        let response: InstrumentsResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad instruments: {e}")))?;
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
        // `after` is exclusive and pages backwards, so the bucket end
        // returns the bucket itself as the newest record
        let after = bucket_ms + timeframe_minutes as i64 * 60_000;
        let url = format!(
            "{OKX_API_URL}/market/candles?instId={}&bar={timeframe_minutes}m&after={after}&limit=1",
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
