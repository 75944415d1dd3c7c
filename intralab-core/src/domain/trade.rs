//! TradeRecord — a completed round-trip trade.

use super::position::Direction;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close fell to the initial stop (no trailing tier reached).
    StopLoss,
    /// Close fell to a stop raised by a trailing tier.
    TrailingStop,
    /// Position flattened at the last bar of its session.
    SessionClose,
    /// Position flattened because the bar sequence ended.
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::SessionClose => "session_close",
            ExitReason::EndOfData => "end_of_data",
        }
    }

    /// True for exits triggered by the stop rather than by a flatten.
    pub fn is_stop(self) -> bool {
        matches!(self, ExitReason::StopLoss | ExitReason::TrailingStop)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExitReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop_loss" => Ok(ExitReason::StopLoss),
            "trailing_stop" => Ok(ExitReason::TrailingStop),
            "session_close" => Ok(ExitReason::SessionClose),
            "end_of_data" => Ok(ExitReason::EndOfData),
            other => Err(format!("unknown exit reason: {other}")),
        }
    }
}

/// A complete round-trip trade: entry → exit. Never mutated once in a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Entry ──
    pub entry_timestamp: DateTime<FixedOffset>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_timestamp: DateTime<FixedOffset>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub direction: Direction,
    pub quantity: u32,

    // ── PnL ──
    pub pnl: f64,

    /// Session stop-loss count when the exit fired, before this exit is booked.
    pub daily_stop_loss_count_at_exit: u32,
    /// Whether this exit was booked against the daily stop-loss cap.
    #[serde(default)]
    pub counted_stop_loss: bool,
}

impl TradeRecord {
    /// Realized result per unit of quantity.
    pub fn pnl_per_unit(&self) -> f64 {
        self.exit_price - self.entry_price
    }

    /// Session stop-loss count once this exit is booked.
    pub fn stop_losses_after(&self) -> u32 {
        self.daily_stop_loss_count_at_exit + u32::from(self.counted_stop_loss)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}
