//! Mat Hold detector (5-bar bullish continuation)
//!
//! Rules over bars 0..4, oldest first:
//!
//! 1. bar 0 is white with a body larger than 2% of its open
//! 2. bar 1 is black and closes below bar 0's close
//! 3. bars 2 and 3 are black
//! 4. bar 4 opens at or above bar 3's close
//! 5. bar 4 closes above bar 0's close
//!
//! All comparisons are strict except rule 4. No tolerance is applied.

use super::helpers::{body_exceeds_open_ratio, is_bearish_below_close, opens_at_or_above_close};
use crate::{OHLCVExt, PatternDetector, PatternId, PriceWindow, OHLCV, WINDOW_LEN};

/// Minimum body of the first candle as a fraction of its open. Fixed, not a parameter.
pub const MAT_HOLD_MIN_BODY_RATIO: f64 = 0.02;

/// Label reported with every Mat Hold hit
pub const MAT_HOLD_LABEL: &str = "Mat Hold";

// ============================================================
// MAT HOLD
// ============================================================

/// MATHOLD - Mat Hold (5-bar pattern)
#[derive(Debug, Clone, Copy, Default)]
pub struct MatHoldDetector;

impl MatHoldDetector {
    pub const fn new() -> Self {
        Self
    }

    /// Evaluate one fixed five-bar window.
    #[inline]
    pub fn detect(&self, window: &PriceWindow) -> bool {
        let [first, second, third, fourth, fifth] = window.bars();
        is_mat_hold(first, second, third, fourth, fifth)
    }
}

#[inline]
fn is_mat_hold<T: OHLCV>(first: &T, second: &T, third: &T, fourth: &T, fifth: &T) -> bool {
    // Strong white opening candle
    first.is_bullish()
        && body_exceeds_open_ratio(first, MAT_HOLD_MIN_BODY_RATIO)
        // Black reaction that gives back part of the first candle
        && is_bearish_below_close(second, first)
        // Consolidation: any black close qualifies
        && third.is_bearish()
        && fourth.is_bearish()
        // Hold: fifth opens at or above the last reaction close
        && opens_at_or_above_close(fifth, fourth)
        // Net progress across the window
        && fifth.close() > first.close()
}

impl PatternDetector for MatHoldDetector {
    fn id(&self) -> PatternId {
        PatternId("MAT_HOLD")
    }

    fn label(&self) -> &'static str {
        MAT_HOLD_LABEL
    }

    fn window_len(&self) -> usize {
        WINDOW_LEN
    }

    fn matches<T: OHLCV>(&self, bars: &[T]) -> bool {
        let [first, second, third, fourth, fifth] = bars else {
            return false;
        };
        is_mat_hold(first, second, third, fourth, fifth)
    }
}

// ============================================================
// TESTS
// ============================================================
