//! Price history providers
//!
//! [`PriceHistoryProvider`] is the seam between the screener and a market-data source.
//! [`YahooFinance`] implements it against the Yahoo chart API with daily bars.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::PriceBar;

/// Default Yahoo chart endpoint
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ============================================================
// ERRORS
// ============================================================

/// Errors from a price history source
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error [{code}]: {description}")]
    Api { code: String, description: String },

    #[error("No data returned")]
    NoData,

    #[error("Invalid date range: {start} .. {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Request(e.to_string())
    }
}

// ============================================================
// PROVIDER TRAIT
// ============================================================

/// Source of daily bars for one symbol.
pub trait PriceHistoryProvider: Send + Sync {
    /// Daily bars in `[start, end)`, oldest first.
    ///
    /// An empty vector is a valid answer (no sessions in range); the caller decides
    /// whether that is enough data.
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError>;
}

impl<P: PriceHistoryProvider + ?Sized> PriceHistoryProvider for &P {
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        (**self).history(symbol, start, end)
    }
}

// ============================================================
// YAHOO FINANCE
// ============================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance chart client (blocking)
#[derive(Debug, Clone)]
pub struct YahooFinance {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl YahooFinance {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(YAHOO_CHART_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// UTC midnight of `date` as Unix seconds
    fn unix_midnight(date: NaiveDate) -> Option<i64> {
        date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp())
    }

    fn build_url(&self, symbol: &str, period1: i64, period2: i64) -> String {
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        )
    }

    fn parse_response(json: &str) -> Result<Vec<PriceBar>, ProviderError> {
        let response: ChartResponse =
            serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(error) = response.chart.error {
            return Err(ProviderError::Api {
                code: error.code,
                description: error.description,
            });
        }

        let results = response.chart.result.ok_or(ProviderError::NoData)?;
        let data = results.first().ok_or(ProviderError::NoData)?;
        let empty = QuoteData::default();
        let quote = data.indicators.quote.first().unwrap_or(&empty);

        let field = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();

        let bars = data
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                // Sessions with a null price are holidays or halts
                let open = field(&quote.open, i)?;
                let high = field(&quote.high, i)?;
                let low = field(&quote.low, i)?;
                let close = field(&quote.close, i)?;
                let volume = field(&quote.volume, i).unwrap_or(0.0);
                Some(PriceBar::new(open, high, low, close).with_volume(volume).at(ts))
            })
            .collect();

        Ok(bars)
    }
}

impl PriceHistoryProvider for YahooFinance {
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let invalid = || ProviderError::InvalidRange { start, end };
        if start >= end {
            return Err(invalid());
        }
        let period1 = Self::unix_midnight(start).ok_or_else(invalid)?;
        let period2 = Self::unix_midnight(end).ok_or_else(invalid)?;
        let url = self.build_url(symbol, period1, period2);

        tracing::debug!(symbol, %url, "fetching price history");

        let text = self.client.get(&url).send()?.text()?;
        let bars = Self::parse_response(&text)?;

        tracing::debug!(symbol, bars = bars.len(), "price history received");
        Ok(bars)
    }
}

// ============================================================
// TESTS
// ============================================================
