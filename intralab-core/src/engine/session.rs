//! Per-day session state.
//!
//! One `SessionState` lives for the duration of a replay and is re-initialized
//! at the first in-window bar of every new calendar day. Nothing in it survives
//! across days except the date it belongs to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::OpenPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// No in-window bar seen yet.
    AwaitingSessionStart,
    InSessionFlat,
    InSessionPositioned,
    /// Daily stop-loss cap reached; no more entries today.
    SessionLockedOut,
    /// Last bar was outside the session window.
    SessionClosed,
}

impl SessionPhase {
    pub fn is_in_session(self) -> bool {
        matches!(
            self,
            SessionPhase::InSessionFlat
                | SessionPhase::InSessionPositioned
                | SessionPhase::SessionLockedOut
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Calendar day of the current (or most recent) session.
    pub date: Option<NaiveDate>,
    pub daily_stop_loss_count: u32,
    pub position: Option<OpenPosition>,
    phase: SessionPhase,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            date: None,
            daily_stop_loss_count: 0,
            position: None,
            phase: SessionPhase::AwaitingSessionStart,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True when an in-window bar dated `date` starts a session.
    pub fn is_new_session(&self, date: NaiveDate) -> bool {
        self.date != Some(date)
    }

    /// Reset for a new trading day. Any open position must be settled first.
    pub fn begin(&mut self, date: NaiveDate) {
        debug_assert!(self.position.is_none(), "position carried into a new session");
        self.date = Some(date);
        self.daily_stop_loss_count = 0;
        self.position = None;
        self.phase = SessionPhase::InSessionFlat;
    }

    /// Mark the session window as closed for the rest of the day.
    pub fn close(&mut self) {
        debug_assert!(self.position.is_none(), "position left open at session close");
        self.phase = SessionPhase::SessionClosed;
    }

    /// Gate an entry attempt. Moves a flat session whose stop-loss count has
    /// reached `max_daily_stop_losses` into lockout and returns whether entries
    /// are still allowed.
    pub fn entries_allowed(&mut self, max_daily_stop_losses: u32) -> bool {
        match self.phase {
            SessionPhase::InSessionFlat => {
                if self.daily_stop_loss_count >= max_daily_stop_losses {
                    self.phase = SessionPhase::SessionLockedOut;
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    pub fn open(&mut self, position: OpenPosition) {
        debug_assert_eq!(self.phase, SessionPhase::InSessionFlat);
        self.position = Some(position);
        self.phase = SessionPhase::InSessionPositioned;
    }

    pub fn take_position(&mut self) -> Option<OpenPosition> {
        self.position.take()
    }

    /// Book an exit. Returns the stop-loss count including this exit.
    pub fn record_exit(&mut self, counts_as_stop_loss: bool, max_daily_stop_losses: u32) -> u32 {
        if counts_as_stop_loss {
            self.daily_stop_loss_count += 1;
        }
        self.phase = if self.daily_stop_loss_count >= max_daily_stop_losses {
            SessionPhase::SessionLockedOut
        } else {
            SessionPhase::InSessionFlat
        };
        self.daily_stop_loss_count
    }
}
