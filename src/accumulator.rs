//! Merges per-provider candles for one pair into a consensus price

use crate::math::{weighted_average, ScaledPrice};
use crate::types::Ohlcv;

/// Final aggregated entry for one pair: the volume-weighted consensus
/// price and the providers that contributed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedPrice {
    pub price: ScaledPrice,
    pub sources: Vec<String>,
}

/// Collects OHLCV contributions from multiple providers for a single pair
/// during one aggregation call. Not persisted - built, aggregated, dropped.
pub struct PriceAccumulator {
    timestamp_ms: i64,
    decimals: u32,
    ohlcvs: Vec<Ohlcv>,
}

impl PriceAccumulator {
    pub fn new(timestamp_ms: i64, decimals: u32) -> Self {
        Self {
            timestamp_ms,
            decimals,
            ohlcvs: Vec::new(),
        }
    }

    /// Timestamp (ms) this accumulator aggregates for
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Appends a contribution. A candle whose decimals disagree with the
    /// accumulator's is a caller error; it is logged and dropped so the
    /// rest of the batch still aggregates.
    pub fn push(&mut self, ohlcv: Ohlcv) {
        if ohlcv.decimals != self.decimals {
            tracing::warn!(
                source = %ohlcv.source,
                candle_decimals = ohlcv.decimals,
                expected_decimals = self.decimals,
                "Dropping contribution with mismatched decimals"
            );
            return;
        }
        self.ohlcvs.push(ohlcv);
    }

    /// Volume-weighted average across all contributions.
    ///
    /// Zero total volume yields `{price: 0, sources: []}` - the sources
    /// list is deliberately empty even when candles were pushed, signaling
    /// "no usable price" rather than "no data seen".
    pub fn aggregate(&self) -> AggregatedPrice {
        let contributions: Vec<(f64, f64)> = self
            .ohlcvs
            .iter()
            .map(|ohlcv| (ohlcv.volume, ohlcv.quote_volume))
            .collect();
        let total_volume: f64 = contributions.iter().map(|(volume, _)| volume).sum();
        if total_volume == 0.0 {
            return AggregatedPrice {
                price: 0,
                sources: Vec::new(),
            };
        }
        AggregatedPrice {
            price: weighted_average(&contributions, self.decimals),
            sources: self.ohlcvs.iter().map(|o| o.source.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawCandle;

    fn candle(volume: f64, quote_volume: f64, source: &str, decimals: u32) -> Ohlcv {
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
            decimals,
        )
    }

    #[test]
    fn single_contribution_yields_its_vwap() {
        let mut acc = PriceAccumulator::new(1_700_000_000_000, 8);
        acc.push(candle(2.0, 60000.0, "binance", 8));

        let result = acc.aggregate();
        assert_eq!(result.price, 3_000_000_000_000);
        assert_eq!(result.sources, vec!["binance".to_string()]);
    }

    #[test]
    fn merges_across_providers_by_volume_weight() {
        let mut acc = PriceAccumulator::new(1_700_000_000_000, 8);
        acc.push(candle(1.0, 100.0, "binance", 8));
        acc.push(candle(3.0, 330.0, "kraken", 8));

        let result = acc.aggregate();
        // (100 + 330) / (1 + 3) = 107.5
        assert_eq!(result.price, 10_750_000_000);
        assert_eq!(
            result.sources,
            vec!["binance".to_string(), "kraken".to_string()]
        );
    }

    #[test]
    fn zero_total_volume_reports_no_sources() {
        let mut acc = PriceAccumulator::new(1_700_000_000_000, 8);
        acc.push(candle(0.0, 0.0, "binance", 8));
        acc.push(candle(0.0, 0.0, "kraken", 8));

        let result = acc.aggregate();
        assert_eq!(result.price, 0);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn empty_accumulator_reports_no_sources() {
        let acc = PriceAccumulator::new(1_700_000_000_000, 8);
        let result = acc.aggregate();
        assert_eq!(result.price, 0);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn keeps_the_timestamp_it_aggregates_for() {
        let mut acc = PriceAccumulator::new(1_700_000_000_000, 8);
        acc.push(candle(1.0, 100.0, "binance", 8));
        assert_eq!(acc.timestamp_ms(), 1_700_000_000_000);
    }

    #[test]
    fn mismatched_decimals_contribution_is_dropped() {
        let mut acc = PriceAccumulator::new(1_700_000_000_000, 8);
        acc.push(candle(1.0, 100.0, "binance", 8));
        acc.push(candle(100.0, 1.0, "kraken", 6));

        let result = acc.aggregate();
        assert_eq!(result.price, 10_000_000_000);
        assert_eq!(result.sources, vec!["binance".to_string()]);
    }
}
