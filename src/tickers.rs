//! Ticker list ingestion
//!
//! Reads a spreadsheet with a `Ticker` column, from disk or over HTTP. `.xlsx` workbooks
//! and CSV exports are both accepted.
//! Google Sheets and Google Drive share links are rewritten to their download form.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use calamine::{Reader, Xlsx};

/// Header of the column holding ticker codes
pub const TICKER_COLUMN: &str = "Ticker";

/// Default market suffix (Indonesia Stock Exchange)
pub const DEFAULT_MARKET_SUFFIX: &str = ".JK";

/// Errors while loading a ticker list
#[derive(Debug, thiserror::Error)]
pub enum TickerError {
    #[error("Failed to read ticker list '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to download ticker list: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed ticker spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    #[error("The '{0}' column is missing in the ticker spreadsheet")]
    MissingColumn(&'static str),

    #[error("Unreadable ticker workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("The ticker workbook has no worksheet")]
    NoWorksheet,

    #[error("Ticker list is empty")]
    Empty,
}

// ============================================================
// SYMBOL
// ============================================================

/// A ticker as displayed and as requested from the price provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Symbol {
    /// Bare code shown in results, e.g. `BBCA`
    pub ticker: String,
    /// Code sent to the provider, e.g. `BBCA.JK`
    pub provider_symbol: String,
}

impl Symbol {
    /// Attach `suffix` for the provider; a ticker that already carries it is not doubled.
    pub fn new(ticker: &str, suffix: &str) -> Self {
        let ticker = ticker.trim();
        let bare = if suffix.is_empty() {
            ticker
        } else {
            ticker.strip_suffix(suffix).unwrap_or(ticker)
        };
        Self {
            ticker: bare.to_string(),
            provider_symbol: format!("{bare}{suffix}"),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ticker)
    }
}

/// Map raw tickers to provider symbols
pub fn with_suffix<S: AsRef<str>>(tickers: &[S], suffix: &str) -> Vec<Symbol> {
    tickers.iter().map(|t| Symbol::new(t.as_ref(), suffix)).collect()
}

// ============================================================
// SOURCE
// ============================================================

/// Where the ticker spreadsheet lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerSource {
    Path(PathBuf),
    Url(String),
}

impl TickerSource {
    /// `http(s)://` values become (rewritten) URLs, everything else a local path.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            TickerSource::Url(resolve_share_url(value))
        } else {
            TickerSource::Path(PathBuf::from(value))
        }
    }

    pub fn load(&self) -> Result<Vec<String>, TickerError> {
        match self {
            TickerSource::Path(path) => load_path(path),
            TickerSource::Url(url) => load_url(url),
        }
    }
}

impl fmt::Display for TickerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerSource::Path(path) => write!(f, "{}", path.display()),
            TickerSource::Url(url) => f.write_str(url),
        }
    }
}

/// File id following `/d/` in a Google share link
fn google_file_id(url: &str) -> Option<&str> {
    let rest = url.split("/d/").nth(1)?;
    rest.split(['/', '?', '#']).next().filter(|id| !id.is_empty())
}

/// Rewrite Google share links to a direct CSV / download URL. Other URLs pass through.
pub fn resolve_share_url(url: &str) -> String {
    if url.contains("docs.google.com/spreadsheets/") {
        if let Some(id) = google_file_id(url) {
            return format!("https://docs.google.com/spreadsheets/d/{id}/export?format=csv");
        }
    }
    if url.contains("drive.google.com/file/") {
        if let Some(id) = google_file_id(url) {
            return format!("https://drive.google.com/uc?export=download&id={id}");
        }
    }
    url.to_string()
}

/// Leading bytes of a zip archive, i.e. an `.xlsx` workbook
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

fn load_path(path: &Path) -> Result<Vec<String>, TickerError> {
    let file = std::fs::File::open(path).map_err(|source| TickerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if is_workbook_path(path) {
        read_workbook_tickers(file)
    } else {
        read_tickers(file)
    }
}

fn load_url(url: &str) -> Result<Vec<String>, TickerError> {
    tracing::info!(%url, "downloading ticker list");
    let body = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    if body.starts_with(ZIP_MAGIC) {
        read_workbook_tickers(io::Cursor::new(body))
    } else {
        read_tickers(body.as_ref())
    }
}

/// Header row to column index, or `MissingColumn`
fn ticker_column<'a>(mut headers: impl Iterator<Item = &'a str>) -> Result<usize, TickerError> {
    headers
        .position(|h| h.trim_start_matches('\u{feff}').trim() == TICKER_COLUMN)
        .ok_or(TickerError::MissingColumn(TICKER_COLUMN))
}

fn finish(
    tickers: Vec<String>,
    rows: usize,
    columns: &[String],
) -> Result<Vec<String>, TickerError> {
    tracing::info!(rows, columns = %columns.join(", "), "ticker list loaded");

    if tickers.is_empty() {
        return Err(TickerError::Empty);
    }
    Ok(tickers)
}

// ============================================================
// CSV
// ============================================================

/// Read the `Ticker` column from CSV text. Blank cells are skipped.
pub fn read_tickers<R: io::Read>(reader: R) -> Result<Vec<String>, TickerError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = ticker_column(headers.iter())?;

    let mut rows = 0usize;
    let mut tickers = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows += 1;
        if let Some(value) = record.get(column).filter(|v| !v.is_empty()) {
            tickers.push(value.to_string());
        }
    }

    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    finish(tickers, rows, &columns)
}

// ============================================================
// XLSX
// ============================================================

/// Read the `Ticker` column from the first worksheet of an `.xlsx` workbook.
///
/// The first row holds the headers. Blank cells are skipped, numbers are read as text.
pub fn read_workbook_tickers<RS>(reader: RS) -> Result<Vec<String>, TickerError>
where
    RS: io::Read + io::Seek,
{
    let mut workbook: Xlsx<RS> = Xlsx::new(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TickerError::NoWorksheet)??;

    let mut sheet_rows = range.rows();
    let columns: Vec<String> = sheet_rows
        .next()
        .map(|header| header.iter().map(|cell| cell.to_string()).collect())
        .unwrap_or_default();
    let column = ticker_column(columns.iter().map(String::as_str))?;

    let mut rows = 0usize;
    let mut tickers = Vec::new();
    for row in sheet_rows {
        rows += 1;
        if let Some(value) = row.get(column).map(|cell| cell.to_string()) {
            let value = value.trim();
            if !value.is_empty() {
                tickers.push(value.to_string());
            }
        }
    }

    finish(tickers, rows, &columns)
}

// ============================================================
// TESTS
// ============================================================
