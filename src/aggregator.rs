//! Orchestrator: concurrent multi-provider price aggregation
//!
//! Fans out one task per requested provider, joins them at a single
//! barrier, and merges all candle contributions per pair into one
//! volume-weighted consensus price. Provider and pair failures are
//! isolated: a failing exchange is logged and contributes nothing, it
//! never corrupts or blocks the rest of the computation.

use crate::{
    accumulator::{AggregatedPrice, PriceAccumulator},
    constants::{MARKET_REFRESH_INTERVAL_MS, MAX_DECIMALS},
    error::AggregationError,
    provider::PriceProvider,
    registry,
    types::{Ohlcv, Pair},
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Computes consensus prices for `pairs` at `timestamp_ms` across the
/// requested providers.
///
/// The result maps pair name to `{price, sources}`. Pairs no provider
/// could resolve are absent from the map; pairs that were processed but
/// saw no liquidity appear with a zero price and empty sources. Unknown
/// provider names are logged and skipped.
///
/// The only failure mode is invalid caller configuration (`decimals`
/// beyond [`MAX_DECIMALS`], a zero timeframe, or a negative timestamp),
/// detected before any network activity. Everything else degrades to a
/// partial or empty result map.
pub async fn get_prices(
    provider_names: &[&str],
    pairs: &[Pair],
    timestamp_ms: i64,
    timeframe_minutes: u32,
    decimals: u32,
) -> Result<HashMap<String, AggregatedPrice>, AggregationError> {
    if decimals > MAX_DECIMALS {
        return Err(AggregationError::invalid_configuration(format!(
            "decimals {decimals} exceeds maximum {MAX_DECIMALS}"
        )));
    }
    if timeframe_minutes == 0 {
        return Err(AggregationError::invalid_configuration(
            "timeframe must be at least one minute",
        ));
    }
    if timestamp_ms < 0 {
        return Err(AggregationError::invalid_configuration(
            "timestamp must not be negative",
        ));
    }

    let mut providers = Vec::with_capacity(provider_names.len());
    for name in provider_names {
        match registry::get(name) {
            Some(provider) => providers.push(provider),
            None => tracing::warn!(provider = *name, "Provider not found, skipping"),
        }
    }

    Ok(aggregate_from(&providers, pairs, timestamp_ms, timeframe_minutes, decimals).await)
}

/// Fan-out/barrier/merge over already-resolved provider instances.
async fn aggregate_from(
    providers: &[Arc<dyn PriceProvider>],
    pairs: &[Pair],
    timestamp_ms: i64,
    timeframe_minutes: u32,
    decimals: u32,
) -> HashMap<String, AggregatedPrice> {
    let mut tasks = Vec::with_capacity(providers.len());
    for provider in providers {
        let provider = provider.clone();
        let pairs = pairs.to_vec();
        tasks.push(tokio::spawn(async move {
            fetch_provider_ohlcvs(provider, &pairs, timestamp_ms, timeframe_minutes, decimals)
                .await
        }));
    }

    // Barrier: wait for every provider task, then merge. Partial results
    // from slow providers are never raced against incomplete ones.
    let mut accumulators: HashMap<String, PriceAccumulator> = HashMap::new();
    for joined in join_all(tasks).await {
        match joined {
            Ok(ohlcvs) => {
                for (pair_name, ohlcv) in ohlcvs {
                    accumulators
                        .entry(pair_name)
                        .or_insert_with(|| PriceAccumulator::new(timestamp_ms, decimals))
                        .push(ohlcv);
                }
            }
            Err(e) => tracing::error!(error = %e, "Provider task failed to complete"),
        }
    }

    accumulators
        .into_iter()
        .map(|(pair_name, accumulator)| (pair_name, accumulator.aggregate()))
        .collect()
}

/// One provider's cycle: refresh the market snapshot when stale, then
/// fetch candles for every requested pair in order.
///
/// Pair fetches are sequential within the provider to avoid bursting an
/// exchange's rate limit with a single call's fan-out. A market load
/// failure abandons the whole provider for this cycle; a per-pair failure
/// skips that pair only.
async fn fetch_provider_ohlcvs(
    provider: Arc<dyn PriceProvider>,
    pairs: &[Pair],
    timestamp_ms: i64,
    timeframe_minutes: u32,
    decimals: u32,
) -> Vec<(String, Ohlcv)> {
    let now = chrono::Utc::now().timestamp_millis();
    if now - provider.markets_loaded_at() > MARKET_REFRESH_INTERVAL_MS {
        if let Err(e) = provider.load_markets().await {
            tracing::error!(
                provider = provider.name(),
                error = %e,
                "Error loading markets, provider contributes nothing this cycle"
            );
            return Vec::new();
        }
    }

    let mut ohlcvs = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match provider
            .get_ohlcv(pair, timestamp_ms, timeframe_minutes, decimals)
            .await
        {
            Ok(Some(ohlcv)) => ohlcvs.push((pair.name.clone(), ohlcv)),
            Ok(None) => {
                tracing::debug!(
                    provider = provider.name(),
                    pair = %pair,
                    "No candle for pair"
                );
            }
            Err(e) => {
                tracing::error!(
                    provider = provider.name(),
                    pair = %pair,
                    error = %e,
                    "Error getting candle, skipping pair"
                );
            }
        }
    }
    ohlcvs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::types::{Asset, RawCandle};

    const TS: i64 = 1_700_000_000_000;

    fn pair(base: &str, quote: &str) -> Pair {
        Pair::new(Asset::new(base, vec![]), Asset::new(quote, vec![]))
    }

    fn candle(volume: f64, quote_volume: f64, source: &str) -> Ohlcv {
        Ohlcv::from_candle(
            RawCandle {
                open: 0.0,
                high: 0.0,
                low: 0.0,
                close: 0.0,
                volume,
                quote_volume,
            },
            false,
            source,
            8,
        )
    }

    async fn aggregate(
        providers: Vec<Arc<dyn PriceProvider>>,
        pairs: &[Pair],
    ) -> HashMap<String, AggregatedPrice> {
        aggregate_from(&providers, pairs, TS, 5, 8).await
    }

    #[tokio::test]
    async fn single_provider_single_pair() {
        let provider = MockProvider::new("providerX").with_fresh_markets();
        provider.set_candle("BTC/USD", candle(2.0, 60000.0, "providerX"));

        let prices = aggregate(vec![Arc::new(provider)], &[pair("BTC", "USD")]).await;
        let entry = &prices["BTC/USD"];
        assert_eq!(entry.price, 3_000_000_000_000);
        assert_eq!(entry.sources, vec!["providerX".to_string()]);
    }

    #[tokio::test]
    async fn merges_two_providers_by_volume() {
        let first = MockProvider::new("first").with_fresh_markets();
        first.set_candle("BTC/USD", candle(1.0, 100.0, "first"));
        let second = MockProvider::new("second").with_fresh_markets();
        second.set_candle("BTC/USD", candle(3.0, 330.0, "second"));

        let prices = aggregate(
            vec![Arc::new(first), Arc::new(second)],
            &[pair("BTC", "USD")],
        )
        .await;
        let entry = &prices["BTC/USD"];
        // (100 + 330) / (1 + 3) = 107.5
        assert_eq!(entry.price, 10_750_000_000);
        assert_eq!(entry.sources.len(), 2);
    }

    #[tokio::test]
    async fn zero_volume_contribution_yields_zero_price_no_sources() {
        let provider = MockProvider::new("illiquid").with_fresh_markets();
        provider.set_candle("BTC/USD", candle(0.0, 0.0, "illiquid"));

        let prices = aggregate(vec![Arc::new(provider)], &[pair("BTC", "USD")]).await;
        let entry = &prices["BTC/USD"];
        assert_eq!(entry.price, 0);
        assert!(entry.sources.is_empty());
    }

    #[tokio::test]
    async fn unmapped_pair_is_absent_from_result() {
        let provider = MockProvider::new("providerX").with_fresh_markets();
        provider.set_candle("BTC/USD", candle(1.0, 30000.0, "providerX"));

        let prices = aggregate(
            vec![Arc::new(provider)],
            &[pair("BTC", "USD"), pair("DOGE", "JPY")],
        )
        .await;
        assert!(prices.contains_key("BTC/USD"));
        assert!(!prices.contains_key("DOGE/JPY"));
    }

    #[tokio::test]
    async fn degenerate_pair_aggregates_to_zero_volume_result() {
        let provider = MockProvider::new("providerX").with_fresh_markets();

        let prices = aggregate(vec![Arc::new(provider)], &[pair("USD", "USD")]).await;
        // unit candles carry zero volume, so the zero-liquidity rule applies
        let entry = &prices["USD/USD"];
        assert_eq!(entry.price, 0);
        assert!(entry.sources.is_empty());
    }

    #[tokio::test]
    async fn market_load_failure_isolates_provider() {
        let broken = MockProvider::new("broken");
        broken.fail_market_load();
        broken.set_candle("BTC/USD", candle(5.0, 500.0, "broken"));
        let healthy = MockProvider::new("healthy").with_fresh_markets();
        healthy.set_candle("BTC/USD", candle(1.0, 100.0, "healthy"));

        let prices = aggregate(
            vec![Arc::new(broken), Arc::new(healthy)],
            &[pair("BTC", "USD")],
        )
        .await;
        let entry = &prices["BTC/USD"];
        assert_eq!(entry.price, 10_000_000_000);
        assert_eq!(entry.sources, vec!["healthy".to_string()]);
    }

    #[tokio::test]
    async fn pair_failure_skips_that_pair_only() {
        let provider = MockProvider::new("flaky").with_fresh_markets();
        provider.fail_pair("BTC/USD");
        provider.set_candle("ETH/USD", candle(10.0, 20000.0, "flaky"));

        let prices = aggregate(
            vec![Arc::new(provider)],
            &[pair("BTC", "USD"), pair("ETH", "USD")],
        )
        .await;
        assert!(!prices.contains_key("BTC/USD"));
        assert_eq!(prices["ETH/USD"].price, 200_000_000_000);
    }

    #[tokio::test]
    async fn stale_provider_reloads_markets_once() {
        let provider = Arc::new(MockProvider::new("stale"));
        provider.set_candle("BTC/USD", candle(1.0, 100.0, "stale"));

        let providers: Vec<Arc<dyn PriceProvider>> = vec![provider.clone()];
        aggregate_from(&providers, &[pair("BTC", "USD")], TS, 5, 8).await;
        assert_eq!(provider.load_calls(), 1);

        // fresh snapshot now, no second load
        aggregate_from(&providers, &[pair("BTC", "USD")], TS, 5, 8).await;
        assert_eq!(provider.load_calls(), 1);
    }

    #[tokio::test]
    async fn invalid_decimals_fail_fast() {
        let err = get_prices(&["binance"], &[pair("BTC", "USD")], TS, 5, MAX_DECIMALS + 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn zero_timeframe_fails_fast() {
        let err = get_prices(&["binance"], &[pair("BTC", "USD")], TS, 0, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn negative_timestamp_fails_fast() {
        let err = get_prices(&["binance"], &[pair("BTC", "USD")], -1, 5, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, AggregationError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn unknown_providers_yield_empty_result() {
        let prices = get_prices(&["not-an-exchange"], &[pair("BTC", "USD")], TS, 5, 8)
            .await
            .unwrap();
        assert!(prices.is_empty());
    }
}
