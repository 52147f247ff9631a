//! `mathold` - screen a ticker list for the Mat Hold pattern
//!
//! # Usage
//!
//! ```bash
//! mathold --tickers tickers.csv --date 2024-06-28
//! mathold --config mathold.json --format csv --output hits.csv
//! ```
//!
//! Progress and logs go to stderr, results to stdout (or `--output`).
//! `RUST_LOG` overrides the log filter (default: info, `--verbose`: debug).

use std::{
    fs::File,
    io,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use mathold::{
    config::ScreenConfig,
    provider::YahooFinance,
    report::{write_report, OutputFormat},
    screener::{Progress, Screener},
    tickers::{with_suffix, TickerSource},
    Period,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mathold", version)]
#[command(about = "Screen stocks for the Mat Hold candlestick pattern")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ticker spreadsheet (CSV with a 'Ticker' column): path or URL
    #[arg(short, long)]
    tickers: Option<String>,

    /// Analysis date, YYYY-MM-DD (default: today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Calendar days of history fetched before the analysis date
    #[arg(long)]
    lookback_days: Option<usize>,

    /// Market suffix appended to each ticker for the data source
    #[arg(long)]
    suffix: Option<String>,

    /// Fetch tickers in parallel
    #[arg(long)]
    parallel: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Set while a `\r` progress line sits on stderr without its newline
static PROGRESS_OPEN: AtomicBool = AtomicBool::new(false);

/// Terminate an open progress line so the next write starts on a fresh line.
fn close_progress_line<W: io::Write>(open: &AtomicBool, out: &mut W) -> io::Result<()> {
    if open.swap(false, Ordering::Relaxed) {
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Log writer: stderr, after breaking any progress line in flight
fn log_writer() -> io::Stderr {
    let mut stderr = io::stderr();
    // Losing the separator only costs layout
    let _ = close_progress_line(&PROGRESS_OPEN, &mut stderr);
    stderr
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_writer)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<ScreenConfig> {
    let config = match &args.config {
        Some(path) => ScreenConfig::from_json_file(path)?,
        None => ScreenConfig::default(),
    };
    apply_overrides(config, args)
}

/// Flags win over file values; `--parallel` can only switch parallelism on.
fn apply_overrides(mut config: ScreenConfig, args: &Args) -> Result<ScreenConfig> {
    if let Some(tickers) = &args.tickers {
        config.tickers = Some(tickers.clone());
    }
    if let Some(date) = args.date {
        config.analysis_date = Some(date);
    }
    if let Some(days) = args.lookback_days {
        config.lookback_days = Period::new(days).context("invalid --lookback-days")?;
    }
    if let Some(suffix) = &args.suffix {
        config.market_suffix = suffix.clone();
    }
    config.parallel |= args.parallel;

    config.validate()?;
    Ok(config)
}

fn print_progress(progress: Progress) {
    eprint!("\rProgress: {}%", progress.percent());
    PROGRESS_OPEN.store(true, Ordering::Relaxed);
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let source = TickerSource::parse(config.tickers.as_deref().unwrap_or_default());

    tracing::info!(%source, "loading ticker list");
    let tickers = source
        .load()
        .context("Failed to load data or 'Ticker' column is missing")?;
    let symbols = with_suffix(&tickers, &config.market_suffix);

    let provider = YahooFinance::with_base_url(config.provider_base_url.as_str())
        .context("failed to build price data client")?;
    let screener = Screener::from_config(provider, &config);

    let report = if config.parallel {
        screener.run_parallel(&symbols, print_progress)
    } else {
        screener.run(&symbols, print_progress)
    };
    close_progress_line(&PROGRESS_OPEN, &mut io::stderr())?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_report(args.format, &report.hits, file)?;
            tracing::info!(path = %path.display(), hits = report.hits.len(), "results written");
        }
        None => write_report(args.format, &report.hits, io::stdout().lock())?,
    }

    Ok(())
}
