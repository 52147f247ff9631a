//! End-to-end screening: ticker spreadsheet -> provider -> detector -> report.

use std::{
    collections::HashMap,
    io::Write,
    sync::Mutex,
};

use chrono::NaiveDate;
use mathold::{
    prelude::*,
    report::{write_report, ScreenHit},
    tickers::with_suffix,
};

/// In-memory provider that records every request
struct RecordingProvider {
    histories: HashMap<String, Vec<PriceBar>>,
    requests: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl RecordingProvider {
    fn new(histories: &[(&str, Vec<PriceBar>)]) -> Self {
        Self {
            histories: histories
                .iter()
                .map(|(s, bars)| (s.to_string(), bars.clone()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl PriceHistoryProvider for RecordingProvider {
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end));
        self.histories
            .get(symbol)
            .cloned()
            .ok_or(ProviderError::NoData)
    }
}

fn bar(o: f64, c: f64, day: i64) -> PriceBar {
    PriceBar::new(o, o.max(c) + 0.5, o.min(c) - 0.5, c).at(1_717_200_000 + day * 86_400)
}

/// Twelve sessions ending in a Mat Hold
fn matching_history() -> Vec<PriceBar> {
    let mut bars: Vec<PriceBar> = (0..7).map(|d| bar(100.0, 100.5, d)).collect();
    let opens = [97.0, 99.0, 97.0, 96.0, 95.0];
    let closes = [100.0, 98.0, 96.0, 95.0, 102.0];
    for i in 0..5 {
        bars.push(bar(opens[i], closes[i], 7 + i as i64));
    }
    bars
}

/// Same sessions but the last close stays under the first candle's close
fn failing_history() -> Vec<PriceBar> {
    let mut bars = matching_history();
    if let Some(last) = bars.last_mut() {
        last.close = 99.0;
    }
    bars
}

fn analysis_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn provider() -> RecordingProvider {
    RecordingProvider::new(&[
        ("BBCA.JK", matching_history()),
        ("BBRI.JK", failing_history()),
        ("TLKM.JK", matching_history()[..3].to_vec()),
        ("ASII.JK", matching_history()),
    ])
}

fn write_ticker_csv(rows: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(rows.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_spreadsheet_to_report() {
    let file = write_ticker_csv("Ticker,Name\nBBCA,Bank Central Asia\nBBRI,Bank Rakyat\nTLKM,Telkom\nGOTO,GoTo\nASII,Astra\n");
    let source = TickerSource::parse(file.path().to_str().unwrap());
    let tickers = source.load().unwrap();
    let symbols = with_suffix(&tickers, ".JK");

    let screener = Screener::new(provider(), analysis_date(), Period::new(30).unwrap());
    let mut progress = Vec::new();
    let report = screener.run(&symbols, |p| progress.push(p));

    let hit_tickers: Vec<&str> = report.hits.iter().map(|h| h.ticker.as_str()).collect();
    assert_eq!(hit_tickers, vec!["BBCA", "ASII"]);
    assert!(report.hits.iter().all(|h| h.pattern == "Mat Hold" && h.last_close == 102.0));

    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.ticker.as_str()).collect();
    assert_eq!(skipped, vec!["TLKM", "GOTO"]);
    assert!(matches!(
        report.skipped[0].error,
        ScreenError::InsufficientData { got: 3 }
    ));
    assert!(matches!(report.skipped[1].error, ScreenError::Fetch(ProviderError::NoData)));

    assert_eq!(progress.len(), 5);
    assert_eq!(progress.last().map(|p| p.fraction()), Some(1.0));
    assert!(progress.windows(2).all(|w| w[0].fraction() < w[1].fraction()));

    let mut out = Vec::new();
    write_report(OutputFormat::Csv, &report.hits, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Ticker,Last Close,Pattern Detected\nBBCA,102.0,Mat Hold\nASII,102.0,Mat Hold\n"
    );
}

#[test]
fn test_requests_use_suffix_and_trailing_range() {
    let provider = provider();
    let screener = Screener::new(&provider, analysis_date(), Period::new(30).unwrap());
    screener.run(&with_suffix(&["BBCA", "bbri.JK"], ".JK"), |_| {});

    let start = NaiveDate::from_ymd_opt(2024, 5, 29).unwrap();
    let requests = provider.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![
            ("BBCA.JK".to_string(), start, analysis_date()),
            ("bbri.JK".to_string(), start, analysis_date()),
        ]
    );
}

#[test]
fn test_parallel_matches_sequential() {
    let symbols = with_suffix(&["BBCA", "BBRI", "TLKM", "GOTO", "ASII", "BBCA"], ".JK");

    let sequential = Screener::new(provider(), analysis_date(), Period::new(30).unwrap())
        .run(&symbols, |_| {});

    let reported = Mutex::new(Vec::new());
    let parallel = Screener::new(provider(), analysis_date(), Period::new(30).unwrap())
        .run_parallel(&symbols, |p| reported.lock().unwrap().push(p.completed));

    assert_eq!(parallel.hits, sequential.hits);
    assert_eq!(parallel.total, sequential.total);
    let skipped = |r: &ScreenReport| -> Vec<String> {
        r.skipped.iter().map(|s| s.ticker.clone()).collect()
    };
    assert_eq!(skipped(&parallel), skipped(&sequential));

    let mut reported = reported.into_inner().unwrap();
    reported.sort_unstable();
    assert_eq!(reported, (1..=symbols.len()).collect::<Vec<_>>());
}

/// Five sessions where the last close finishes above the first
struct NetGainDetector;

impl PatternDetector for NetGainDetector {
    fn id(&self) -> PatternId {
        PatternId("NET_GAIN")
    }

    fn label(&self) -> &'static str {
        "Net Gain"
    }

    fn window_len(&self) -> usize {
        WINDOW_LEN
    }

    fn matches<T: OHLCV>(&self, bars: &[T]) -> bool {
        bars.len() == WINDOW_LEN && bars[WINDOW_LEN - 1].close() > bars[0].close()
    }
}

#[test]
fn test_swapped_detector_labels_hits() {
    let symbols = with_suffix(&["BBCA", "BBRI"], ".JK");
    let report = Screener::new(provider(), analysis_date(), Period::new(30).unwrap())
        .detector(NetGainDetector)
        .run(&symbols, |_| {});

    let hits: Vec<(&str, &str)> = report
        .hits
        .iter()
        .map(|h| (h.ticker.as_str(), h.pattern.as_str()))
        .collect();
    assert_eq!(hits, vec![("BBCA", "Net Gain")]);
}

#[test]
fn test_empty_ticker_list() {
    let screener = Screener::new(provider(), analysis_date(), Period::new(30).unwrap());
    let mut calls = 0;
    let report = screener.run(&[], |_| calls += 1);

    assert_eq!(report.total, 0);
    assert!(report.hits.is_empty());
    assert_eq!(calls, 0);
}

#[test]
fn test_missing_ticker_column_file() {
    let file = write_ticker_csv("Code,Name\nBBCA,Bank Central Asia\n");
    let source = TickerSource::parse(file.path().to_str().unwrap());
    assert!(matches!(source.load(), Err(TickerError::MissingColumn(_))));
}

#[test]
fn test_hits_serialize_for_json_sink() {
    let hits = vec![ScreenHit {
        ticker: "BBCA".into(),
        last_close: 102.0,
        pattern: "Mat Hold".into(),
    }];
    let mut out = Vec::new();
    write_report(OutputFormat::Json, &hits, &mut out).unwrap();

    let parsed: Vec<ScreenHit> = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed, hits);
}
