//! Binance price provider implementation

use crate::{
    constants::BINANCE_API_URL,
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

/// Binance `exchangeInfo` response
#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<MarketEntry>,
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    symbol: String,
    status: String,
}

/// Binance spot price provider
pub struct BinanceProvider {
    client: Client,
    markets: MarketCache,
}

impl BinanceProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client()?,
            markets: MarketCache::new(),
        })
    }

    fn format_symbol(base: &str, quote: &str) -> String {
        format!("{}{}", base.to_uppercase(), quote.to_uppercase())
    }

    fn parse_markets(info: ExchangeInfo) -> Vec<String> {
        info.symbols
            .into_iter()
            .filter(|market| market.status == "TRADING")
            .map(|market| market.symbol)
            .collect()
    }

    /// Klines come back as `[[openTime, open, high, low, close, volume,
    /// closeTime, quoteVolume, ...]]` with prices as strings.
    fn parse_candle(klines: &Value, bucket_ms: i64) -> Result<Option<RawCandle>, ProviderError> {
        let klines = klines
            .as_array()
            .ok_or_else(|| ProviderError::InvalidResponse("Klines is not an array".into()))?;
        let Some(kline) = klines.first() else {
            return Ok(None);
        };
        if candle_i64(kline, 0)? != bucket_ms {
            // a neighboring bucket means no data for the requested one
            return Ok(None);
        }
        Ok(Some(RawCandle {
            open: candle_f64(kline, 1)?,
            high: candle_f64(kline, 2)?,
            low: candle_f64(kline, 3)?,
            close: candle_f64(kline, 4)?,
            volume: candle_f64(kline, 5)?,
            quote_volume: candle_f64(kline, 7)?,
        }))
    }
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create Binance provider")
    }
}

#[async_trait]
impl PriceProvider for BinanceProvider {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn markets_loaded_at(&self) -> i64 {
        self.markets.markets_loaded_at()
    }

    async fn load_markets(&self) -> Result<(), ProviderError> {
        let url = format!("{BINANCE_API_URL}/exchangeInfo");
        let value = get_json(&self.client, &url).await?;
        let info: ExchangeInfo = serde_json::from_value(value)
            .map_err(|e| ProviderError::InvalidResponse(format!("Bad exchangeInfo: {e}")))?;
        self.markets.replace(Self::parse_markets(info)).await;
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
        let url = format!(
            "{BINANCE_API_URL}/klines?symbol={}&interval={timeframe_minutes}m&startTime={bucket_ms}&limit=1",
            info.symbol
        );
        let klines = get_json(&self.client, &url).await?;
        let Some(raw) = Self::parse_candle(&klines, bucket_ms)? else {
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
