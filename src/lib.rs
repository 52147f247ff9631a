//! # mathold - Mat Hold candlestick screener
//!
//! Screens a list of stock tickers for the five-candle Mat Hold bullish continuation
//! pattern over daily price history.
//!
//! ## Quick Start
//!
//! ```rust
//! use mathold::prelude::*;
//!
//! let window = PriceWindow::new([
//!     PriceBar::new(97.0, 100.5, 96.5, 100.0),
//!     PriceBar::new(99.0, 99.5, 97.5, 98.0),
//!     PriceBar::new(97.0, 97.5, 95.5, 96.0),
//!     PriceBar::new(96.0, 96.5, 94.5, 95.0),
//!     PriceBar::new(95.0, 102.5, 95.0, 102.0),
//! ]);
//!
//! assert!(MatHoldDetector::new().detect(&window));
//! ```
//!
//! The detector is a pure predicate. Fetching, ticker lists, progress and rendering live in
//! [`screener`], [`provider`], [`tickers`] and [`report`].

pub mod config;
pub mod detectors;
pub mod provider;
pub mod report;
pub mod screener;
pub mod tickers;

pub mod prelude {
    pub use crate::{
        // Configuration
        config::{ConfigError, ScreenConfig},
        // Detectors
        detectors::*,
        // Collaborators
        provider::{PriceHistoryProvider, ProviderError, YahooFinance},
        report::{OutputFormat, ScreenHit},
        screener::{Progress, ScreenError, ScreenReport, Screener, SkippedTicker},
        tickers::{Symbol, TickerError, TickerSource},
        // Types
        OHLCVExt,
        PatternDetector,
        // Errors
        PatternError,
        PatternId,
        PatternMatch,
        Period,
        PriceBar,
        PriceWindow,
        Result,
        OHLCV,
        WINDOW_LEN,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T, E = PatternError> = std::result::Result<T, E>;

/// Errors raised while building detector inputs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Window must hold exactly {need} bars, got {got}")]
    WindowLength { need: usize, got: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Reject bars the detector cannot compare meaningfully.
    ///
    /// Only NaN and infinite prices are refused; `open/close` inside `[low, high]` is assumed.
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// PRICE BAR / WINDOW
// ============================================================

/// One trading day's observed prices.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    /// Unix seconds of the session, when the source supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl PriceBar {
    pub const fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume: 0.0,
            timestamp: None,
        }
    }

    pub const fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub const fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl OHLCV for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// Number of bars in a candidate pattern window
pub const WINDOW_LEN: usize = 5;

/// Exactly five bars, oldest first. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceWindow([PriceBar; WINDOW_LEN]);

impl PriceWindow {
    pub const fn new(bars: [PriceBar; WINDOW_LEN]) -> Self {
        Self(bars)
    }

    /// Last five bars of a chronological history, or `None` if there are fewer than five.
    pub fn from_tail(bars: &[PriceBar]) -> Option<Self> {
        let start = bars.len().checked_sub(WINDOW_LEN)?;
        Self::try_from(&bars[start..]).ok()
    }

    #[inline]
    pub fn bars(&self) -> &[PriceBar; WINDOW_LEN] {
        &self.0
    }

    #[inline]
    pub fn oldest(&self) -> &PriceBar {
        &self.0[0]
    }

    #[inline]
    pub fn newest(&self) -> &PriceBar {
        &self.0[WINDOW_LEN - 1]
    }

    #[inline]
    pub fn last_close(&self) -> f64 {
        self.newest().close
    }
}

impl TryFrom<&[PriceBar]> for PriceWindow {
    type Error = PatternError;

    fn try_from(bars: &[PriceBar]) -> Result<Self> {
        let got = bars.len();
        <[PriceBar; WINDOW_LEN]>::try_from(bars)
            .map(Self)
            .map_err(|_| {
                if got < WINDOW_LEN {
                    PatternError::InsufficientData {
                        need: WINDOW_LEN,
                        got,
                    }
                } else {
                    PatternError::WindowLength {
                        need: WINDOW_LEN,
                        got,
                    }
                }
            })
    }
}

impl AsRef<[PriceBar]> for PriceWindow {
    fn as_ref(&self) -> &[PriceBar] {
        &self.0
    }
}

// ============================================================
// PATTERN MATCH
// ============================================================

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PatternId(pub &'static str);

impl PatternId {
    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Where a pattern was found inside a bar history. Copy, no allocations.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub start_index: usize,
    pub end_index: usize,
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Fixed-window boolean pattern detector.
///
/// Implementations are stateless: `matches` must depend on nothing but the bars passed in.
pub trait PatternDetector: Send + Sync {
    fn id(&self) -> PatternId;

    /// Human-readable name reported with each hit
    fn label(&self) -> &'static str;

    fn window_len(&self) -> usize;

    /// True when `bars` (oldest first) forms the pattern.
    /// Any slice whose length is not `window_len()` yields `false`.
    fn matches<T: OHLCV>(&self, bars: &[T]) -> bool;

    /// Check the window that ends at `index`.
    fn detect_at<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let start = index.checked_add(1)?.checked_sub(self.window_len())?;
        let window = bars.get(start..=index)?;
        self.matches(window).then(|| PatternMatch {
            pattern_id: self.id(),
            start_index: start,
            end_index: index,
        })
    }

    /// Every occurrence in a chronological history, oldest first.
    fn scan<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternMatch> {
        (0..bars.len())
            .filter_map(|index| self.detect_at(bars, index))
            .collect()
    }
}

// ============================================================
// TESTS
// ============================================================
