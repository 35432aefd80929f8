//! Per-provider market snapshot and symbol resolution cache

use crate::types::{Asset, Pair};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Resolution result: the exchange's native symbol for a pair and whether
/// the exchange quotes it the other way around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub symbol: String,
    pub inversed: bool,
}

#[derive(Default)]
struct Snapshot {
    /// Native symbols currently tradable on the exchange
    symbols: HashSet<String>,
    /// Memoized resolutions keyed by pair name; `None` means the pair has
    /// no mapping on this snapshot
    resolved: HashMap<String, Option<SymbolInfo>>,
}

/// The market snapshot a provider instance exclusively owns.
///
/// Symbol lookups against a stable snapshot share the memoization cache;
/// [`replace`](MarketCache::replace) installs the new symbol list and an
/// empty cache in one write-lock critical section, so a reload never
/// interleaves with lookups against the snapshot it replaces.
pub struct MarketCache {
    state: RwLock<Snapshot>,
    loaded_at_ms: AtomicI64,
}

impl MarketCache {
    /// Creates an empty cache. `markets_loaded_at` starts at 0, which the
    /// orchestrator reads as "stale", forcing an initial market load.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            loaded_at_ms: AtomicI64::new(0),
        }
    }

    /// Timestamp (ms) of the last successful market load, 0 if never loaded.
    pub fn markets_loaded_at(&self) -> i64 {
        self.loaded_at_ms.load(Ordering::Acquire)
    }

    /// Atomically replaces the market snapshot and clears the resolution
    /// cache.
    pub async fn replace(&self, symbols: Vec<String>) {
        let mut state = self.state.write().await;
        state.symbols = symbols.into_iter().collect();
        state.resolved.clear();
        self.loaded_at_ms
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Release);
    }

    /// Resolves a pair to the exchange's native symbol.
    ///
    /// Tries every base alias crossed with every quote alias through the
    /// exchange-specific `format` function; if nothing matches, repeats the
    /// search with the sides swapped and marks the result inversed. `None`
    /// means the exchange does not trade this pair at all - callers skip
    /// the provider for the pair, it is not an error.
    pub async fn resolve<F>(&self, pair: &Pair, format: F) -> Option<SymbolInfo>
    where
        F: Fn(&str, &str) -> String,
    {
        {
            let state = self.state.read().await;
            if let Some(cached) = state.resolved.get(&pair.name) {
                return cached.clone();
            }
        }
        // Re-check under the write lock: the snapshot may have been
        // replaced between dropping the read lock and acquiring this one.
        let mut state = self.state.write().await;
        if let Some(cached) = state.resolved.get(&pair.name) {
            return cached.clone();
        }
        let info = Self::search(&state.symbols, &pair.base, &pair.quote, &format, false)
            .or_else(|| Self::search(&state.symbols, &pair.quote, &pair.base, &format, true));
        state.resolved.insert(pair.name.clone(), info.clone());
        info
    }

    fn search<F>(
        symbols: &HashSet<String>,
        base: &Asset,
        quote: &Asset,
        format: &F,
        inversed: bool,
    ) -> Option<SymbolInfo>
    where
        F: Fn(&str, &str) -> String,
    {
        for base_alias in &base.alias {
            for quote_alias in &quote.alias {
                let symbol = format(base_alias, quote_alias);
                if symbols.contains(&symbol) {
                    return Some(SymbolInfo { symbol, inversed });
                }
            }
        }
        None
    }
}

impl Default for MarketCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(base: &str, quote: &str) -> String {
        format!("{base}{quote}")
    }

    fn btc_usd() -> Pair {
        Pair::new(
            Asset::new("BTC", vec!["XBT".to_string()]),
            Asset::new("USD", vec![]),
        )
    }

    #[tokio::test]
    async fn resolves_direct_symbol_through_alias() {
        let cache = MarketCache::new();
        cache.replace(vec!["XBTUSD".to_string(), "ETHUSD".to_string()]).await;

        let info = cache.resolve(&btc_usd(), concat).await.unwrap();
        assert_eq!(info.symbol, "XBTUSD");
        assert!(!info.inversed);
    }

    #[tokio::test]
    async fn resolves_inversed_symbol_when_direct_missing() {
        let cache = MarketCache::new();
        cache.replace(vec!["USDBTC".to_string()]).await;

        let info = cache.resolve(&btc_usd(), concat).await.unwrap();
        assert_eq!(info.symbol, "USDBTC");
        assert!(info.inversed);
    }

    #[tokio::test]
    async fn direct_match_wins_over_inversed() {
        let cache = MarketCache::new();
        cache.replace(vec!["BTCUSD".to_string(), "USDBTC".to_string()]).await;

        let info = cache.resolve(&btc_usd(), concat).await.unwrap();
        assert_eq!(info.symbol, "BTCUSD");
        assert!(!info.inversed);
    }

    #[tokio::test]
    async fn unsupported_pair_resolves_to_none_and_is_cached() {
        let cache = MarketCache::new();
        cache.replace(vec!["ETHUSD".to_string()]).await;

        assert!(cache.resolve(&btc_usd(), concat).await.is_none());
        // memoized miss
        assert!(cache.resolve(&btc_usd(), concat).await.is_none());
    }

    #[tokio::test]
    async fn reload_invalidates_cached_resolutions() {
        let cache = MarketCache::new();
        cache.replace(vec!["ETHUSD".to_string()]).await;
        assert!(cache.resolve(&btc_usd(), concat).await.is_none());

        // the pair becomes supported once the market list changes
        cache.replace(vec!["XBTUSD".to_string()]).await;
        let info = cache.resolve(&btc_usd(), concat).await.unwrap();
        assert_eq!(info.symbol, "XBTUSD");
    }

    #[tokio::test]
    async fn repeated_lookups_are_stable_between_reloads() {
        let cache = MarketCache::new();
        cache.replace(vec!["BTCUSD".to_string()]).await;

        let first = cache.resolve(&btc_usd(), concat).await;
        let second = cache.resolve(&btc_usd(), concat).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fresh_cache_reports_never_loaded() {
        let cache = MarketCache::new();
        assert_eq!(cache.markets_loaded_at(), 0);

        cache.replace(vec![]).await;
        assert!(cache.markets_loaded_at() > 0);
    }
}
