//! Provider capability contract for exchange integrations

use crate::{
    error::ProviderError,
    math::ScaledPrice,
    types::{Ohlcv, Pair},
};
use async_trait::async_trait;

/// The contract every exchange integration implements.
///
/// The orchestrator depends only on this trait, never on a concrete
/// exchange type. `Ok(None)` from [`get_ohlcv`](PriceProvider::get_ohlcv)
/// means "no data for this bucket or no market mapping for this pair" and
/// is not an error; transport and parse failures surface as
/// [`ProviderError`] and are contained by the caller.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider identifier, used as the `source` tag in candles and in the
    /// aggregated `sources` output
    fn name(&self) -> &'static str;

    /// Timestamp (ms) of the last successful market load, 0 if never
    /// loaded. The orchestrator reloads when this is older than
    /// [`crate::constants::MARKET_REFRESH_INTERVAL_MS`].
    fn markets_loaded_at(&self) -> i64;

    /// Fetches the exchange's tradable symbol list and replaces the market
    /// snapshot, invalidating the symbol resolution cache.
    async fn load_markets(&self) -> Result<(), ProviderError>;

    /// Returns the normalized candle for the timeframe bucket containing
    /// `timestamp_ms`, already adjusted for inversion.
    ///
    /// A pair whose base and quote are the same asset yields a synthetic
    /// unit-price, zero-volume candle without any network call.
    async fn get_ohlcv(
        &self,
        pair: &Pair,
        timestamp_ms: i64,
        timeframe_minutes: u32,
        decimals: u32,
    ) -> Result<Option<Ohlcv>, ProviderError>;

    /// Single-provider price: the VWAP of the candle for the bucket, or
    /// `None` when the provider has no data for the pair.
    async fn get_price(
        &self,
        pair: &Pair,
        timestamp_ms: i64,
        timeframe_minutes: u32,
        decimals: u32,
    ) -> Result<Option<ScaledPrice>, ProviderError> {
        let ohlcv = self
            .get_ohlcv(pair, timestamp_ms, timeframe_minutes, decimals)
            .await?;
        Ok(ohlcv.map(|candle| candle.vwap()))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Configurable in-memory provider for orchestrator tests
    pub struct MockProvider {
        name: &'static str,
        candles: Mutex<HashMap<String, Ohlcv>>,
        failing_pairs: Mutex<Vec<String>>,
        load_failure: Mutex<bool>,
        markets_loaded_at: AtomicI64,
        load_count: AtomicUsize,
    }

    impl MockProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                candles: Mutex::new(HashMap::new()),
                failing_pairs: Mutex::new(Vec::new()),
                load_failure: Mutex::new(false),
                markets_loaded_at: AtomicI64::new(0),
                load_count: AtomicUsize::new(0),
            }
        }

        /// Pre-loads the mock so the orchestrator skips the market reload
        pub fn with_fresh_markets(self) -> Self {
            self.markets_loaded_at
                .store(chrono::Utc::now().timestamp_millis(), Ordering::Release);
            self
        }

        pub fn set_candle(&self, pair_name: &str, ohlcv: Ohlcv) {
            self.candles
                .lock()
                .unwrap()
                .insert(pair_name.to_string(), ohlcv);
        }

        pub fn fail_pair(&self, pair_name: &str) {
            self.failing_pairs
                .lock()
                .unwrap()
                .push(pair_name.to_string());
        }

        pub fn fail_market_load(&self) {
            *self.load_failure.lock().unwrap() = true;
        }

        pub fn load_calls(&self) -> usize {
            self.load_count.load(Ordering::Acquire)
        }
    }

    #[async_trait]
    impl PriceProvider for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn markets_loaded_at(&self) -> i64 {
            self.markets_loaded_at.load(Ordering::Acquire)
        }

        async fn load_markets(&self) -> Result<(), ProviderError> {
            self.load_count.fetch_add(1, Ordering::AcqRel);
            if *self.load_failure.lock().unwrap() {
                return Err(ProviderError::ApiError("mock market load failure".into()));
            }
            self.markets_loaded_at
                .store(chrono::Utc::now().timestamp_millis(), Ordering::Release);
            Ok(())
        }

        async fn get_ohlcv(
            &self,
            pair: &Pair,
            _timestamp_ms: i64,
            _timeframe_minutes: u32,
            decimals: u32,
        ) -> Result<Option<Ohlcv>, ProviderError> {
            if pair.is_degenerate() {
                return Ok(Some(Ohlcv::unit(self.name, decimals)));
            }
            if self.failing_pairs.lock().unwrap().contains(&pair.name) {
                return Err(ProviderError::InvalidResponse("mock pair failure".into()));
            }
            Ok(self.candles.lock().unwrap().get(&pair.name).cloned())
        }
    }
}
