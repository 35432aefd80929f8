//! Exchange provider implementations
//!
//! One module per exchange, plus the request/parse helpers they share.
//! Every exchange reports candles as heterogeneous JSON arrays (numbers,
//! strings, or a mix), so field extraction goes through [`candle_f64`] /
//! [`candle_i64`] instead of typed structs.

pub mod binance;
pub mod bybit;
pub mod coinbase;
pub mod gate;
pub mod kraken;
pub mod okx;

pub use binance::BinanceProvider;
pub use bybit::BybitProvider;
pub use coinbase::CoinbaseProvider;
pub use gate::GateProvider;
pub use kraken::KrakenProvider;
pub use okx::OkxProvider;

use crate::constants::{REQUEST_TIMEOUT_MS, USER_AGENT};
use crate::error::ProviderError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Builds the HTTP client every provider uses
pub(crate) fn http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_millis(REQUEST_TIMEOUT_MS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::NetworkError)
}

/// Performs a GET request and decodes the JSON body, mapping rate-limit
/// and error statuses to [`ProviderError`]
pub(crate) async fn get_json(client: &Client, url: &str) -> Result<Value, ProviderError> {
    tracing::debug!(url, "Fetching");
    let response = client.get(url).send().await?;

    if response.status().as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }
    if !response.status().is_success() {
        return Err(ProviderError::ApiError(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )));
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| ProviderError::InvalidResponse(format!("Malformed JSON: {e}")))
}

/// Extracts a numeric candle field that an exchange may encode either as a
/// JSON number or as a string
pub(crate) fn candle_f64(kline: &Value, index: usize) -> Result<f64, ProviderError> {
    let field = kline
        .get(index)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("Missing candle field {index}")))?;
    match field {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("Bad number at field {index}"))),
        Value::String(s) => s.parse::<f64>().map_err(|_| {
            ProviderError::InvalidResponse(format!("Non-numeric string at field {index}: {s}"))
        }),
        other => Err(ProviderError::InvalidResponse(format!(
            "Unexpected candle field {index}: {other}"
        ))),
    }
}

/// Extracts a candle timestamp field (integer or numeric string)
pub(crate) fn candle_i64(kline: &Value, index: usize) -> Result<i64, ProviderError> {
    let value = candle_f64(kline, index)?;
    Ok(value as i64)
}

/// Start of the timeframe bucket containing `timestamp_ms`
pub(crate) fn bucket_start_ms(timestamp_ms: i64, timeframe_minutes: u32) -> i64 {
    let bucket_ms = timeframe_minutes as i64 * 60_000;
    timestamp_ms - timestamp_ms % bucket_ms
}
