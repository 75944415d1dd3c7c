//! Backtest runner — wires together data loading, the engine and aggregation.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads bars from the configured CSV, then runs. Used by CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars, no I/O.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use intralab_core::config::StrategyConfig;
use intralab_core::domain::{Bar, TradeLedger};
use intralab_core::engine::{run_with_stats, EngineError, RunStats};
use intralab_core::fingerprint::RunFingerprint;
use intralab_core::summary::{summarize, summarize_latest, Summary, TradeStats};

use crate::config::{RunConfig, RunConfigError};
use crate::data_loader::{load_bars_csv, LoadError, LoadOptions};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] RunConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub fingerprint: RunFingerprint,
    pub config: StrategyConfig,
    pub first_bar: Option<DateTime<FixedOffset>>,
    pub last_bar: Option<DateTime<FixedOffset>>,
    /// Anchor of the rolling windows.
    pub as_of: Option<DateTime<FixedOffset>>,
    pub run_stats: RunStats,
    pub stats: TradeStats,
    pub summary: Summary,
    pub trades: TradeLedger,
    #[serde(default)]
    pub data_quality_warnings: Vec<String>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest from a `RunConfig` (loads bars from disk).
pub fn run_single_backtest(config: &RunConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let offset = config.data.utc_offset;
    let as_of = config.data.as_of.map(|t| t.with_timezone(&offset));
    let opts = LoadOptions {
        months: config.data.months,
        as_of,
        utc_offset: Some(offset),
    };
    let loaded = load_bars_csv(&config.data.bars, &opts)?;
    let mut result =
        run_backtest_from_bars(&loaded.bars, &config.strategy, &config.data.symbol, as_of)?;
    result.data_quality_warnings = loaded.warnings;
    if result.run_stats.bars > 0 && result.run_stats.in_session_bars == 0 {
        let msg = format!(
            "no bar falls inside the {}-{} session at UTC{offset}",
            config.strategy.session_start().format("%H:%M"),
            config.strategy.session_end().format("%H:%M"),
        );
        warn!(symbol = %config.data.symbol, "{msg}");
        result.data_quality_warnings.push(msg);
    }
    Ok(result)
}

/// Run a backtest over pre-loaded bars. No I/O.
///
/// Rolling windows are anchored at `as_of`, or the last bar when `None`.
pub fn run_backtest_from_bars(
    bars: &[Bar],
    strategy: &StrategyConfig,
    symbol: &str,
    as_of: Option<DateTime<FixedOffset>>,
) -> Result<BacktestResult, EngineError> {
    let fingerprint = RunFingerprint::new(strategy, bars);
    let result = run_with_stats(bars, strategy)?;

    let first_bar = bars.first().map(|b| b.timestamp);
    let last_bar = bars.last().map(|b| b.timestamp);
    let as_of = as_of.or(last_bar);
    let summary = match as_of {
        Some(as_of) => summarize(&result.ledger, as_of),
        None => summarize_latest(&result.ledger),
    };
    let stats = TradeStats::compute(&result.ledger);

    info!(
        symbol,
        run = %fingerprint.short(),
        bars = result.stats.bars,
        sessions = result.stats.sessions,
        trades = stats.trade_count,
        pnl = stats.total_pnl,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: symbol.to_string(),
        fingerprint,
        config: strategy.clone(),
        first_bar,
        last_bar,
        as_of,
        run_stats: result.stats,
        stats,
        summary,
        trades: result.ledger,
        data_quality_warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, h, m, 0)
            .unwrap()
    }

    #[test]
    fn empty_bars_give_empty_result() {
        let result =
            run_backtest_from_bars(&[], &StrategyConfig::default(), "NIFTY", None).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.as_of, None);
        assert!(result.summary.monthly.is_empty());
        assert!(result.summary.rolling.windows.iter().all(|w| w.pnl == 0.0));
    }

    #[test]
    fn as_of_defaults_to_last_bar() {
        let bars = vec![
            Bar::new(at(9, 15), 84.0, 101.0, 83.0, 100.0),
            Bar::new(at(9, 20), 100.0, 107.0, 99.0, 106.0),
            Bar::new(at(9, 25), 106.0, 107.0, 84.0, 85.0),
        ];
        let result =
            run_backtest_from_bars(&bars, &StrategyConfig::default(), "NIFTY", None).unwrap();
        assert_eq!(result.as_of, Some(at(9, 25)));
        assert_eq!(result.stats.total_pnl, -1125.0);
        assert_eq!(result.summary.rolling.pnl("1m"), -1125.0);
        assert_eq!(result.summary.monthly[0].month, "2024-03");
        assert_eq!(result.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn engine_error_propagates() {
        let bars = vec![
            Bar::new(at(9, 20), 1.0, 1.0, 1.0, 1.0),
            Bar::new(at(9, 15), 1.0, 1.0, 1.0, 1.0),
        ];
        let err = run_backtest_from_bars(&bars, &StrategyConfig::default(), "X", None);
        assert!(matches!(err, Err(EngineError::InputOrdering { .. })));
    }
}
