//! Result sink: screening hits as a table, CSV or JSON.

use std::io;

use serde::{Deserialize, Serialize};

/// Printed when a run finds nothing
pub const NO_MATCHES_MESSAGE: &str = "No stocks match the Mat Hold pattern.";

const TABLE_TITLE: &str = "Results: Stocks Meeting Criteria";

/// One ticker that matched the pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenHit {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Last Close")]
    pub last_close: f64,
    #[serde(rename = "Pattern Detected")]
    pub pattern: String,
}

/// Output encoding for screening results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("CSV output failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Plain-text table with aligned columns
pub fn render_table(hits: &[ScreenHit]) -> String {
    if hits.is_empty() {
        return format!("{NO_MATCHES_MESSAGE}\n");
    }

    let headers = ["Ticker", "Last Close", "Pattern Detected"];
    let rows: Vec<[String; 3]> = hits
        .iter()
        .map(|h| [h.ticker.clone(), format!("{:.2}", h.last_close), h.pattern.clone()])
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = format!("{TABLE_TITLE}\n");
    out.push_str(&format!(
        "{:<w0$}  {:>w1$}  {:<w2$}\n",
        headers[0],
        headers[1],
        headers[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    ));
    for [ticker, close, pattern] in &rows {
        out.push_str(&format!(
            "{:<w0$}  {:>w1$}  {:<w2$}\n",
            ticker,
            close,
            pattern,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        ));
    }
    out
}

pub fn write_csv<W: io::Write>(hits: &[ScreenHit], writer: W) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if hits.is_empty() {
        wtr.write_record(["Ticker", "Last Close", "Pattern Detected"])?;
    }
    for hit in hits {
        wtr.serialize(hit)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: io::Write>(hits: &[ScreenHit], mut writer: W) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(&mut writer, hits)?;
    writeln!(writer)?;
    Ok(())
}

/// Write `hits` in the chosen format
pub fn write_report<W: io::Write>(
    format: OutputFormat,
    hits: &[ScreenHit],
    mut writer: W,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Table => Ok(writer.write_all(render_table(hits).as_bytes())?),
        OutputFormat::Csv => write_csv(hits, writer),
        OutputFormat::Json => write_json(hits, writer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits() -> Vec<ScreenHit> {
        vec![
            ScreenHit {
                ticker: "BBCA".into(),
                last_close: 9875.0,
                pattern: "Mat Hold".into(),
            },
            ScreenHit {
                ticker: "TLKM".into(),
                last_close: 3120.5,
                pattern: "Mat Hold".into(),
            },
        ]
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&hits());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Results: Stocks Meeting Criteria");
        assert_eq!(lines[1], "Ticker  Last Close  Pattern Detected");
        assert_eq!(lines[2], "BBCA       9875.00  Mat Hold        ");
        assert_eq!(lines[3], "TLKM       3120.50  Mat Hold        ");
    }

    #[test]
    fn test_render_empty_table() {
        assert_eq!(render_table(&[]), "No stocks match the Mat Hold pattern.\n");
    }

    #[test]
    fn test_csv_uses_result_column_names() {
        let mut buf = Vec::new();
        write_csv(&hits(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("Ticker,Last Close,Pattern Detected\n"));
        assert!(text.contains("BBCA,9875.0,Mat Hold\n"));
    }

    #[test]
    fn test_csv_empty_keeps_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Ticker,Last Close,Pattern Detected\n");
    }

    #[test]
    fn test_json_roundtrip_keys() {
        let mut buf = Vec::new();
        write_json(&hits(), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value[0]["Ticker"], "BBCA");
        assert_eq!(value[1]["Last Close"], 3120.5);
        assert_eq!(value[1]["Pattern Detected"], "Mat Hold");
    }

    #[test]
    fn test_write_report_dispatch() {
        let mut buf = Vec::new();
        write_report(OutputFormat::Table, &[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), format!("{NO_MATCHES_MESSAGE}\n"));
    }
}
