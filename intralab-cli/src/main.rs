//! IntraLab CLI — run, report and synth commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file or a bare bars CSV
//! - `report`: monthly and rolling tables from an exported trades CSV
//! - `synth`: write seeded synthetic session bars as CSV

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use intralab_core::summary::{summarize, summarize_latest};
use intralab_core::synthetic::{synthetic_session_bars, SyntheticSpec};
use intralab_runner::data_loader::write_bars;
use intralab_runner::export::{load_trades_csv, render_report, render_summary};
use intralab_runner::{run_single_backtest, save_artifacts, RunConfig};

#[derive(Parser)]
#[command(
    name = "intralab",
    about = "IntraLab CLI: intraday momentum backtester"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file or a bars CSV.
    Run {
        /// Path to a TOML run config.
        #[arg(long, conflicts_with = "bars")]
        config: Option<PathBuf>,

        /// Bars CSV (timestamp,open,high,low,close); runs default strategy parameters.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Symbol label for reports and artifact names.
        #[arg(long)]
        symbol: Option<String>,

        /// Lookback in 30-day months.
        #[arg(long)]
        months: Option<u32>,

        /// Anchor for lookback and rolling windows (RFC 3339). Defaults to the last bar.
        #[arg(long)]
        as_of: Option<String>,

        /// Exchange UTC offset; bar timestamps are converted to it. Defaults to +05:30.
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,

        /// Output directory for artifacts.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the result manifest as JSON instead of the text report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Summarize an exported trades CSV.
    Report {
        /// trades.csv written by `run`.
        #[arg(long)]
        trades: PathBuf,

        /// Anchor for the rolling windows (RFC 3339). Defaults to the latest entry.
        #[arg(long)]
        as_of: Option<String>,

        /// Print the summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate seeded synthetic session bars.
    Synth {
        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        /// First calendar day (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Calendar days to cover; weekends are skipped.
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Bar interval in minutes.
        #[arg(long, default_value_t = 5)]
        interval: u32,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// UTC offset of the session clock.
        #[arg(long, default_value = "+05:30", allow_hyphen_values = true)]
        offset: String,

        #[arg(long, default_value_t = 22_000.0)]
        start_price: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            bars,
            symbol,
            months,
            as_of,
            offset,
            output,
            json,
        } => run_backtest_cmd(config, bars, symbol, months, as_of, offset, output, json),
        Commands::Report {
            trades,
            as_of,
            json,
        } => run_report(trades, as_of, json),
        Commands::Synth {
            out,
            start,
            days,
            interval,
            seed,
            offset,
            start_price,
        } => run_synth(out, &start, days, interval, seed, &offset, start_price),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_as_of(s: Option<String>) -> Result<Option<DateTime<FixedOffset>>> {
    s.as_deref()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("invalid --as-of '{s}' (expected RFC 3339)"))
        })
        .transpose()
}

fn parse_offset(s: &str) -> Result<FixedOffset> {
    s.parse()
        .with_context(|| format!("invalid --offset '{s}' (expected e.g. +05:30)"))
}

#[allow(clippy::too_many_arguments)]
fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    bars: Option<PathBuf>,
    symbol: Option<String>,
    months: Option<u32>,
    as_of: Option<String>,
    offset: Option<String>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = match (config_path, bars) {
        (Some(path), _) => RunConfig::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        (None, Some(bars)) => RunConfig::for_bars(bars),
        (None, None) => bail!("one of --config or --bars is required"),
    };

    // Flags override the file.
    if let Some(symbol) = symbol {
        config.data.symbol = symbol;
    }
    if months.is_some() {
        config.data.months = months;
    }
    if let Some(as_of) = parse_as_of(as_of)? {
        config.data.as_of = Some(as_of);
    }
    if let Some(offset) = offset {
        config.data.utc_offset = parse_offset(&offset)?;
    }
    if let Some(output) = output {
        config.output.dir = output;
    }

    let result = run_single_backtest(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_report(&result));
    }

    let run_dir = save_artifacts(&result, &config.output.dir)?;
    eprintln!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_report(trades: PathBuf, as_of: Option<String>, json: bool) -> Result<()> {
    let ledger = load_trades_csv(&trades)?;
    let summary = match parse_as_of(as_of)? {
        Some(as_of) => summarize(&ledger, as_of),
        None => summarize_latest(&ledger),
    };
    tracing::info!(trades = ledger.len(), pnl = ledger.total_pnl(), "ledger loaded");

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }
    Ok(())
}

fn run_synth(
    out: PathBuf,
    start: &str,
    days: u32,
    interval: u32,
    seed: u64,
    offset: &str,
    start_price: f64,
) -> Result<()> {
    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}' (expected YYYY-MM-DD)"))?;
    let offset = parse_offset(offset)?;
    if interval == 0 {
        bail!("--interval must be at least 1 minute");
    }
    if !(start_price.is_finite() && start_price > 0.0) {
        bail!("--start-price must be positive");
    }

    let spec = SyntheticSpec {
        start_date,
        days,
        interval_minutes: interval,
        utc_offset_secs: offset.local_minus_utc(),
        start_price,
        seed,
        ..Default::default()
    };
    let bars = synthetic_session_bars(&spec);

    let file = std::fs::File::create(&out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_bars(&bars, file).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(bars = bars.len(), path = %out.display(), "synthetic bars written");
    Ok(())
}
