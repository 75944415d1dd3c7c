//! Reporting and export — JSON, CSV, and text artifact generation.
//!
//! An artifact directory holds:
//! - `manifest.json`: the full `BacktestResult`, schema-versioned
//! - `trades.csv`: one row per `TradeRecord`, plus the symbol
//! - `monthly.csv`: `month,trades,pnl`
//! - `summary.json`: rolling-window sums and headline statistics
//!
//! A trades CSV can be read back into a `TradeLedger`, so reports can be
//! regenerated without re-running the backtest.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use intralab_core::domain::{Direction, ExitReason, TradeLedger, TradeRecord};
use intralab_core::summary::{MonthlyRow, RollingWindowSummary, Summary, TradeStats};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub symbol: String,
    pub rolling: RollingWindowSummary,
    pub stats: TradeStats,
}

pub fn export_summary_json(result: &BacktestResult) -> Result<String> {
    let file = SummaryFile {
        symbol: result.symbol.clone(),
        rolling: result.summary.rolling.clone(),
        stats: result.stats.clone(),
    };
    serde_json::to_string_pretty(&file).context("failed to serialize summary to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One line of `trades.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TradeRow {
    #[serde(default)]
    symbol: String,
    entry_timestamp: DateTime<FixedOffset>,
    entry_price: f64,
    exit_timestamp: DateTime<FixedOffset>,
    exit_price: f64,
    exit_reason: ExitReason,
    direction: Direction,
    quantity: u32,
    pnl: f64,
    daily_stop_loss_count_at_exit: u32,
    #[serde(default)]
    counted_stop_loss: bool,
}

impl TradeRow {
    fn new(symbol: &str, t: &TradeRecord) -> Self {
        Self {
            symbol: symbol.to_string(),
            entry_timestamp: t.entry_timestamp,
            entry_price: t.entry_price,
            exit_timestamp: t.exit_timestamp,
            exit_price: t.exit_price,
            exit_reason: t.exit_reason,
            direction: t.direction,
            quantity: t.quantity,
            pnl: t.pnl,
            daily_stop_loss_count_at_exit: t.daily_stop_loss_count_at_exit,
            counted_stop_loss: t.counted_stop_loss,
        }
    }

    fn into_record(self) -> TradeRecord {
        TradeRecord {
            entry_timestamp: self.entry_timestamp,
            entry_price: self.entry_price,
            exit_timestamp: self.exit_timestamp,
            exit_price: self.exit_price,
            exit_reason: self.exit_reason,
            direction: self.direction,
            quantity: self.quantity,
            pnl: self.pnl,
            daily_stop_loss_count_at_exit: self.daily_stop_loss_count_at_exit,
            counted_stop_loss: self.counted_stop_loss,
        }
    }
}

/// Export a trade ledger as CSV.
///
/// Columns: symbol, entry_timestamp, entry_price, exit_timestamp, exit_price,
/// exit_reason, direction, quantity, pnl, daily_stop_loss_count_at_exit,
/// counted_stop_loss
pub fn export_trades_csv(symbol: &str, ledger: &TradeLedger) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if ledger.is_empty() {
        wtr.write_record([
            "symbol",
            "entry_timestamp",
            "entry_price",
            "exit_timestamp",
            "exit_price",
            "exit_reason",
            "direction",
            "quantity",
            "pnl",
            "daily_stop_loss_count_at_exit",
            "counted_stop_loss",
        ])?;
    }
    for t in ledger {
        wtr.serialize(TradeRow::new(symbol, t))?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the monthly table as CSV with `month,trades,pnl` columns.
pub fn export_monthly_csv(rows: &[MonthlyRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if rows.is_empty() {
        wtr.write_record(["month", "trades", "pnl"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Read a trades CSV back into a ledger, ordered by exit timestamp.
///
/// The `symbol` column is optional.
pub fn import_trades_csv<R: io::Read>(reader: R) -> Result<TradeLedger> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (i, row) in rdr.deserialize::<TradeRow>().enumerate() {
        let row = row.with_context(|| format!("invalid trade row {}", i + 1))?;
        records.push(row.into_record());
    }
    records.sort_by_key(|t| t.exit_timestamp);
    Ok(TradeLedger::from_records(records))
}

pub fn load_trades_csv(path: &Path) -> Result<TradeLedger> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    import_trades_csv(file).with_context(|| format!("failed to read trades from {}", path.display()))
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_{fingerprint}/` under `output_dir`.
/// Identical inputs write to the same directory.
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", result.symbol, result.fingerprint.short());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("manifest.json"), &export_json(result)?)?;
    write(
        &run_dir.join("trades.csv"),
        &export_trades_csv(&result.symbol, &result.trades)?,
    )?;
    write(
        &run_dir.join("monthly.csv"),
        &export_monthly_csv(&result.summary.monthly)?,
    )?;
    write(&run_dir.join("summary.json"), &export_summary_json(result)?)?;

    tracing::info!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Text reports ───────────────────────────────────────────────────

/// Plain-text monthly and rolling tables for the terminal.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::with_capacity(512);

    out.push_str("Monthly\n");
    out.push_str(&format!("{:<8} {:>7} {:>14}\n", "month", "trades", "pnl"));
    if summary.monthly.is_empty() {
        out.push_str("(no trades)\n");
    }
    for row in &summary.monthly {
        out.push_str(&format!("{:<8} {:>7} {:>14.2}\n", row.month, row.trades, row.pnl));
    }

    out.push('\n');
    match summary.rolling.as_of {
        Some(as_of) => out.push_str(&format!("Rolling (as of {})\n", as_of.to_rfc3339())),
        None => out.push_str("Rolling\n"),
    }
    out.push_str(&format!("{:<8} {:>7} {:>14}\n", "window", "trades", "pnl"));
    for w in &summary.rolling.windows {
        out.push_str(&format!("{:<8} {:>7} {:>14.2}\n", w.label, w.trades, w.pnl));
    }
    out
}

/// Plain-text report for a completed run: headline stats then the tables.
pub fn render_report(result: &BacktestResult) -> String {
    let s = &result.stats;
    let mut out = String::with_capacity(1024);
    out.push_str(&format!("Symbol       {}\n", result.symbol));
    if let (Some(first), Some(last)) = (result.first_bar, result.last_bar) {
        out.push_str(&format!(
            "Period       {} to {}\n",
            first.to_rfc3339(),
            last.to_rfc3339()
        ));
    }
    out.push_str(&format!(
        "Bars         {} ({} in session, {} sessions)\n",
        result.run_stats.bars, result.run_stats.in_session_bars, result.run_stats.sessions
    ));
    out.push_str(&format!(
        "Trades       {} ({} won, {} lost, win rate {:.1}%)\n",
        s.trade_count,
        s.winners,
        s.losers,
        s.win_rate * 100.0
    ));
    out.push_str(&format!("Total P&L    {:.2}\n", s.total_pnl));
    out.push_str(&format!(
        "Exits        stop {} / trail {} / session {} / end {}\n",
        s.stop_loss_exits, s.trailing_stop_exits, s.session_close_exits, s.end_of_data_exits
    ));
    out.push_str(&format!("Lockouts     {}\n", result.run_stats.lockouts));
    out.push_str(&format!("Fingerprint  {}\n", result.fingerprint.short()));
    for warning in &result.data_quality_warnings {
        out.push_str(&format!("Warning      {warning}\n"));
    }
    out.push('\n');
    out.push_str(&render_summary(&result.summary));
    out
}
