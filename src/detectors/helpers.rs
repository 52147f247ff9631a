//! Common candle comparisons shared by detector modules.
//!
//! Every comparison is exact: no epsilon is applied to prices.

use crate::{OHLCVExt, OHLCV};

/// Bullish body larger than `ratio` of the opening price (strict).
///
/// Uses the signed body `close - open`, so a bearish bar never passes.
#[inline]
pub fn body_exceeds_open_ratio<T: OHLCV>(bar: &T, ratio: f64) -> bool {
    (bar.close() - bar.open()) > ratio * bar.open()
}

/// Bearish bar whose close is below `reference`'s close.
#[inline]
pub fn is_bearish_below_close<T: OHLCV>(bar: &T, reference: &T) -> bool {
    bar.is_bearish() && bar.close() < reference.close()
}

/// Gap-up or flat open: `bar` opens at or above `prior`'s close (inclusive).
#[inline]
pub fn opens_at_or_above_close<T: OHLCV>(bar: &T, prior: &T) -> bool {
    bar.open() >= prior.close()
}
