//! Screening orchestration
//!
//! For each ticker: fetch a trailing range of daily bars, keep the last five, run the
//! detector, collect hits. A ticker that cannot be evaluated is logged, recorded as skipped
//! and the run moves on to the next one.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Days, NaiveDate};
use rayon::prelude::*;

use crate::{
    config::ScreenConfig,
    detectors::MatHoldDetector,
    provider::{PriceHistoryProvider, ProviderError},
    report::ScreenHit,
    tickers::Symbol,
    OHLCVExt, PatternDetector, PatternError, Period, PriceBar, PriceWindow,
};

// ============================================================
// TYPES
// ============================================================

/// Why a ticker was skipped
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("Error fetching data: {0}")]
    Fetch(#[from] ProviderError),

    #[error("Not enough trading data in the given date range: got {got} bars")]
    InsufficientData { got: usize },

    #[error("Price history out of chronological order at bar {index}")]
    Unordered { index: usize },

    #[error(transparent)]
    InvalidBar(#[from] PatternError),
}

/// Tickers processed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Fraction complete in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed.min(self.total) as f64 / self.total as f64
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0) as u32
    }
}

#[derive(Debug)]
pub struct SkippedTicker {
    pub ticker: String,
    pub error: ScreenError,
}

/// Outcome of one screening run. `hits` and `skipped` keep ticker-list order.
#[derive(Debug, Default)]
pub struct ScreenReport {
    pub hits: Vec<ScreenHit>,
    pub skipped: Vec<SkippedTicker>,
    pub total: usize,
}

impl ScreenReport {
    fn record(&mut self, symbol: &Symbol, outcome: Result<Option<ScreenHit>, ScreenError>) {
        match outcome {
            Ok(Some(hit)) => self.hits.push(hit),
            Ok(None) => {}
            Err(error) => self.skipped.push(SkippedTicker {
                ticker: symbol.ticker.clone(),
                error,
            }),
        }
    }
}

// ============================================================
// SCREENER
// ============================================================

pub struct Screener<P: PriceHistoryProvider, D: PatternDetector = MatHoldDetector> {
    provider: P,
    detector: D,
    analysis_date: NaiveDate,
    lookback: Period,
}

impl<P: PriceHistoryProvider> Screener<P, MatHoldDetector> {
    pub fn new(provider: P, analysis_date: NaiveDate, lookback: Period) -> Self {
        Self {
            provider,
            detector: MatHoldDetector::new(),
            analysis_date,
            lookback,
        }
    }

    pub fn from_config(provider: P, config: &ScreenConfig) -> Self {
        Self::new(provider, config.analysis_date(), config.lookback_days)
    }
}

impl<P: PriceHistoryProvider, D: PatternDetector> Screener<P, D> {
    /// Swap the detector
    pub fn detector<D2: PatternDetector>(self, detector: D2) -> Screener<P, D2> {
        Screener {
            provider: self.provider,
            detector,
            analysis_date: self.analysis_date,
            lookback: self.lookback,
        }
    }

    /// Fetch range `[analysis_date - lookback, analysis_date)`
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        let start = self
            .analysis_date
            .checked_sub_days(Days::new(self.lookback.get() as u64))
            .unwrap_or(NaiveDate::MIN);
        (start, self.analysis_date)
    }

    /// Evaluate one ticker. `Ok(None)` means the data was usable but did not match.
    pub fn evaluate(&self, symbol: &Symbol) -> Result<Option<ScreenHit>, ScreenError> {
        let (start, end) = self.date_range();
        let bars = self
            .provider
            .history(&symbol.provider_symbol, start, end)?;

        check_history(&bars)?;

        let window = PriceWindow::from_tail(&bars)
            .ok_or(ScreenError::InsufficientData { got: bars.len() })?;

        if !self.detector.matches(window.as_ref()) {
            return Ok(None);
        }

        tracing::info!(
            ticker = %symbol.ticker,
            last_close = window.last_close(),
            pattern = self.detector.label(),
            "pattern detected"
        );
        Ok(Some(ScreenHit {
            ticker: symbol.ticker.clone(),
            last_close: window.last_close(),
            pattern: self.detector.label().to_string(),
        }))
    }

    /// Screen tickers one by one. `on_progress` runs after every ticker, in order.
    pub fn run<F>(&self, symbols: &[Symbol], mut on_progress: F) -> ScreenReport
    where
        F: FnMut(Progress),
    {
        let total = symbols.len();
        let (start, end) = self.date_range();
        tracing::info!(total, %start, %end, "screening started");

        let mut report = ScreenReport {
            total,
            ..ScreenReport::default()
        };
        for (i, symbol) in symbols.iter().enumerate() {
            let outcome = self.evaluate(symbol);
            log_outcome(symbol, &outcome);
            report.record(symbol, outcome);
            on_progress(Progress {
                completed: i + 1,
                total,
            });
        }

        log_summary(&report);
        report
    }

    /// Screen tickers on the rayon pool.
    ///
    /// Each completion is reported once; calls may interleave across threads, so the
    /// `completed` values arrive unordered, ending at `total`.
    pub fn run_parallel<F>(&self, symbols: &[Symbol], on_progress: F) -> ScreenReport
    where
        F: Fn(Progress) + Sync,
    {
        let total = symbols.len();
        let (start, end) = self.date_range();
        tracing::info!(total, %start, %end, "parallel screening started");

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<_> = symbols
            .par_iter()
            .map(|symbol| {
                let outcome = self.evaluate(symbol);
                log_outcome(symbol, &outcome);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                on_progress(Progress {
                    completed: done,
                    total,
                });
                outcome
            })
            .collect();

        let mut report = ScreenReport {
            total,
            ..ScreenReport::default()
        };
        for (symbol, outcome) in symbols.iter().zip(outcomes) {
            report.record(symbol, outcome);
        }

        log_summary(&report);
        report
    }
}

/// Histories must be usable as-is: finite prices, strictly increasing timestamps.
fn check_history(bars: &[PriceBar]) -> Result<(), ScreenError> {
    for (index, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::InvalidOHLCV { reason, .. } => {
                PatternError::InvalidOHLCV { index, reason }
            }
            other => other,
        })?;
    }

    for (i, pair) in bars.windows(2).enumerate() {
        if let (Some(prev), Some(next)) = (pair[0].timestamp, pair[1].timestamp) {
            if next <= prev {
                return Err(ScreenError::Unordered { index: i + 1 });
            }
        }
    }
    Ok(())
}

fn log_outcome(symbol: &Symbol, outcome: &Result<Option<ScreenHit>, ScreenError>) {
    match outcome {
        Ok(_) => tracing::debug!(ticker = %symbol.ticker, "evaluated"),
        Err(e @ ScreenError::InsufficientData { .. }) => {
            tracing::warn!(ticker = %symbol.ticker, "{e}")
        }
        Err(e) => tracing::error!(ticker = %symbol.ticker, error = %e, "skipping ticker"),
    }
}

fn log_summary(report: &ScreenReport) {
    tracing::info!(
        total = report.total,
        hits = report.hits.len(),
        skipped = report.skipped.len(),
        "screening finished"
    );
}

// ============================================================
// TESTS
// ============================================================
