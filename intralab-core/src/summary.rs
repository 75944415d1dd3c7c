//! Ledger aggregation — calendar-month group-by and rolling-window sums.
//!
//! Every function here is pure: ledger in, table out. An empty ledger yields
//! an empty monthly table and all-zero rolling sums, never an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, TradeLedger, TradeRecord};

/// Backward-looking windows as `(label, days)`.
pub const ROLLING_WINDOWS: [(&str, i64); 5] =
    [("1m", 30), ("2m", 60), ("3m", 90), ("6m", 180), ("12m", 360)];

/// Trade count and summed P&L for one calendar month of entry timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRow {
    /// `YYYY-MM` on the entry timestamp's own clock.
    pub month: String,
    pub trades: usize,
    pub pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow {
    pub label: String,
    pub days: i64,
    pub trades: usize,
    pub pnl: f64,
}

/// Cumulative sums over every window in `ROLLING_WINDOWS`, shortest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindowSummary {
    pub as_of: Option<DateTime<FixedOffset>>,
    pub windows: Vec<RollingWindow>,
}

impl RollingWindowSummary {
    pub fn get(&self, label: &str) -> Option<&RollingWindow> {
        self.windows.iter().find(|w| w.label == label)
    }

    /// P&L for `label`, or 0 when no such window exists.
    pub fn pnl(&self, label: &str) -> f64 {
        self.get(label).map_or(0.0, |w| w.pnl)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub monthly: Vec<MonthlyRow>,
    pub rolling: RollingWindowSummary,
}

/// Monthly table plus rolling sums measured backward from `as_of`.
pub fn summarize(ledger: &TradeLedger, as_of: DateTime<FixedOffset>) -> Summary {
    Summary {
        monthly: monthly_table(ledger),
        rolling: rolling_window_summary(ledger, as_of),
    }
}

/// Same as `summarize`, anchored at the latest entry in the ledger.
pub fn summarize_latest(ledger: &TradeLedger) -> Summary {
    match latest_entry(ledger) {
        Some(as_of) => summarize(ledger, as_of),
        None => Summary {
            monthly: Vec::new(),
            rolling: empty_rolling(None),
        },
    }
}

pub fn latest_entry(ledger: &TradeLedger) -> Option<DateTime<FixedOffset>> {
    ledger.iter().map(|t| t.entry_timestamp).max()
}

pub fn month_key(record: &TradeRecord) -> String {
    let ts = record.entry_timestamp;
    format!("{:04}-{:02}", ts.year(), ts.month())
}

pub fn monthly_table(ledger: &TradeLedger) -> Vec<MonthlyRow> {
    // Zero-padded `YYYY-MM` keys sort chronologically.
    let mut months: BTreeMap<String, (usize, f64)> = BTreeMap::new();
    for record in ledger {
        let slot = months.entry(month_key(record)).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += record.pnl;
    }
    months
        .into_iter()
        .map(|(month, (trades, pnl))| MonthlyRow { month, trades, pnl })
        .collect()
}

/// Sums over records whose entry is at or after `as_of - days`.
///
/// There is no upper bound: trades entered after `as_of` are included.
pub fn rolling_window_summary(
    ledger: &TradeLedger,
    as_of: DateTime<FixedOffset>,
) -> RollingWindowSummary {
    let mut summary = empty_rolling(Some(as_of));
    for window in &mut summary.windows {
        let cutoff = as_of - Duration::days(window.days);
        for record in ledger.iter().filter(|t| t.entry_timestamp >= cutoff) {
            window.trades += 1;
            window.pnl += record.pnl;
        }
    }
    summary
}

fn empty_rolling(as_of: Option<DateTime<FixedOffset>>) -> RollingWindowSummary {
    RollingWindowSummary {
        as_of,
        windows: ROLLING_WINDOWS
            .iter()
            .map(|&(label, days)| RollingWindow {
                label: label.to_string(),
                days,
                trades: 0,
                pnl: 0.0,
            })
            .collect(),
    }
}

// ─── Trade statistics ───────────────────────────────────────────────

/// Headline statistics over a whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trade_count: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_consecutive_losses: usize,
    pub stop_loss_exits: usize,
    pub trailing_stop_exits: usize,
    pub session_close_exits: usize,
    pub end_of_data_exits: usize,
}

impl TradeStats {
    pub fn compute(ledger: &TradeLedger) -> Self {
        let mut stats = TradeStats::default();
        if ledger.is_empty() {
            return stats;
        }
        stats.best_trade = f64::NEG_INFINITY;
        stats.worst_trade = f64::INFINITY;

        let mut streak = 0;
        for record in ledger {
            stats.trade_count += 1;
            stats.total_pnl += record.pnl;
            stats.best_trade = stats.best_trade.max(record.pnl);
            stats.worst_trade = stats.worst_trade.min(record.pnl);
            if record.is_winner() {
                stats.winners += 1;
            }
            // A flat trade ends a losing streak like a winner does.
            if record.is_loser() {
                stats.losers += 1;
                streak += 1;
                stats.max_consecutive_losses = stats.max_consecutive_losses.max(streak);
            } else {
                streak = 0;
            }
            match record.exit_reason {
                ExitReason::StopLoss => stats.stop_loss_exits += 1,
                ExitReason::TrailingStop => stats.trailing_stop_exits += 1,
                ExitReason::SessionClose => stats.session_close_exits += 1,
                ExitReason::EndOfData => stats.end_of_data_exits += 1,
            }
        }
        stats.win_rate = stats.winners as f64 / stats.trade_count as f64;
        stats
    }
}
