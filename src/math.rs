//! Fixed-point price arithmetic
//!
//! Prices are carried as scaled integers (`value * 10^decimals`) so that
//! aggregation never accumulates floating-point drift. `i128` is wide enough
//! for the `10^(2 * decimals)` numerator used by [`invert`] at any decimals
//! value up to [`crate::constants::MAX_DECIMALS`].

/// Scaled fixed-point price: the real value multiplied by `10^decimals`.
pub type ScaledPrice = i128;

/// Returns `10^decimals` as a scaled integer.
pub fn pow10(decimals: u32) -> ScaledPrice {
    (10 as ScaledPrice).pow(decimals)
}

/// Converts a float value to a scaled integer, rounding to nearest.
///
/// Non-finite input (NaN, infinity) degrades to `0` so that a single bad
/// data point becomes a zero contribution instead of aborting a whole
/// aggregation cycle.
pub fn scale(value: f64, decimals: u32) -> ScaledPrice {
    if !value.is_finite() {
        return 0;
    }
    (value * 10f64.powi(decimals as i32)).round() as ScaledPrice
}

/// Returns the reciprocal of a scaled price, re-expressed at the same scale.
///
/// Since `price` already carries `decimals` digits of scale, dividing
/// `10^(2 * decimals)` by it yields the reciprocal at `decimals` digits.
/// Division rounds to nearest. A zero price inverts to zero.
pub fn invert(price: ScaledPrice, decimals: u32) -> ScaledPrice {
    if price == 0 {
        return 0;
    }
    (pow10(2 * decimals) + price / 2) / price
}

/// Volume-weighted average over `(volume, quote_volume)` contributions,
/// scaled to `decimals`.
///
/// Zero total volume means no liquidity was observed and yields `0`; this
/// is defined behavior, not an error.
pub fn weighted_average(contributions: &[(f64, f64)], decimals: u32) -> ScaledPrice {
    let mut total_volume = 0f64;
    let mut total_quote_volume = 0f64;
    for (volume, quote_volume) in contributions {
        total_volume += volume;
        total_quote_volume += quote_volume;
    }
    if total_volume == 0f64 {
        return 0;
    }
    scale(total_quote_volume / total_volume, decimals)
}

/// Median of a set of scaled prices.
///
/// Even-length input returns the integer-divided average of the two middle
/// elements. Empty input returns `0`.
pub fn median(prices: &[ScaledPrice]) -> ScaledPrice {
    if prices.is_empty() {
        return 0;
    }
    let mut sorted = prices.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2
    }
}
