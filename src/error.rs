//! Error types for the exchange price aggregator

use thiserror::Error;

/// Errors that can occur when talking to an exchange
///
/// These never escape [`crate::aggregator::get_prices`]: a failing provider
/// or pair is logged and its contribution is simply absent from the result.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response could not be parsed or had an unexpected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Exchange API returned an error status
    #[error("Exchange API error: {0}")]
    ApiError(String),
}

/// Errors surfaced by the aggregation entry point
///
/// Invalid caller configuration is the only way `get_prices` fails; it is
/// detected before any network activity begins.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// Caller-supplied parameters are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AggregationError {
    /// Creates an InvalidConfiguration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
