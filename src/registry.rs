//! Process-wide provider registry
//!
//! One instance per provider name, created lazily on first request and
//! reused for the lifetime of the process. The registry exists purely to
//! preserve each provider's market snapshot and symbol cache across
//! aggregation calls; there is no teardown.

use crate::provider::PriceProvider;
use crate::providers::{
    BinanceProvider, BybitProvider, CoinbaseProvider, GateProvider, KrakenProvider, OkxProvider,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

static REGISTRY: OnceLock<Mutex<HashMap<&'static str, Arc<dyn PriceProvider>>>> = OnceLock::new();

/// Returns the shared provider instance for `name`, creating it on first
/// use, or `None` for an unknown provider name.
///
/// Creation happens under the registry mutex, so a race on first use
/// resolves to a single surviving instance per name.
pub fn get(name: &str) -> Option<Arc<dyn PriceProvider>> {
    let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut providers = registry.lock().expect("provider registry poisoned");
    if let Some(provider) = providers.get(name) {
        return Some(provider.clone());
    }
    let (key, provider): (&'static str, Arc<dyn PriceProvider>) = match name {
        "binance" => ("binance", Arc::new(BinanceProvider::default())),
        "bybit" => ("bybit", Arc::new(BybitProvider::default())),
        "okx" => ("okx", Arc::new(OkxProvider::default())),
        "kraken" => ("kraken", Arc::new(KrakenProvider::default())),
        "coinbase" => ("coinbase", Arc::new(CoinbaseProvider::default())),
        "gate" => ("gate", Arc::new(GateProvider::default())),
        _ => return None,
    };
    providers.insert(key, provider.clone());
    Some(provider)
}
