//! Screening configuration
//!
//! Every field has a default, so a JSON file only needs the values it changes:
//!
//! ```json
//! {
//!   "tickers": "https://docs.google.com/spreadsheets/d/<id>/edit",
//!   "analysis_date": "2024-06-28",
//!   "lookback_days": 30,
//!   "market_suffix": ".JK"
//! }
//! ```
//!
//! Command-line flags are applied on top of the file, then [`ScreenConfig::validate`] runs.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{provider::YAHOO_CHART_URL, tickers::DEFAULT_MARKET_SUFFIX, Period, WINDOW_LEN};

/// Calendar days fetched before the analysis date
pub const DEFAULT_LOOKBACK_DAYS: usize = 30;

/// Upper bound on the lookback, roughly ten years of calendar days
pub const MAX_LOOKBACK_DAYS: usize = 3650;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenConfig {
    /// Spreadsheet with a `Ticker` column: local CSV path or URL
    pub tickers: Option<String>,
    /// Last day of the analysis (exclusive bound of the fetch); today when unset
    pub analysis_date: Option<NaiveDate>,
    pub lookback_days: Period,
    /// Appended to each ticker for the provider, e.g. `.JK`
    pub market_suffix: String,
    pub provider_base_url: String,
    /// Fetch tickers on the rayon pool instead of one by one
    pub parallel: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            tickers: None,
            analysis_date: None,
            lookback_days: Period::new_const(DEFAULT_LOOKBACK_DAYS),
            market_suffix: DEFAULT_MARKET_SUFFIX.to_string(),
            provider_base_url: YAHOO_CHART_URL.to_string(),
            parallel: false,
        }
    }
}

impl ScreenConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Configured analysis date, or today's local date
    pub fn analysis_date(&self) -> NaiveDate {
        self.analysis_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.tickers.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(ConfigError::Invalid("no ticker list configured".into()));
            }
            Some(_) => {}
        }

        let lookback = self.lookback_days.get();
        if !(WINDOW_LEN..=MAX_LOOKBACK_DAYS).contains(&lookback) {
            return Err(ConfigError::Invalid(format!(
                "lookback_days = {lookback} out of range [{WINDOW_LEN}, {MAX_LOOKBACK_DAYS}]"
            )));
        }

        if !(self.provider_base_url.starts_with("http://")
            || self.provider_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "provider_base_url must be an http(s) URL, got '{}'",
                self.provider_base_url
            )));
        }

        Ok(())
    }
}
