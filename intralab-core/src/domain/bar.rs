//! Bar — the fundamental market data unit.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar for the simulated underlying over one fixed interval.
///
/// The timestamp carries its UTC offset. That offset defines the session-local
/// clock: `time_of_day()` and `session_date()` are read in it, so the feed is
/// expected to normalize every bar to the exchange's offset before replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<FixedOffset>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Why a bar was rejected by validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{field} is not finite ({value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

impl Bar {
    pub fn new(
        timestamp: DateTime<FixedOffset>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Signed candle body: `close - open`.
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    /// Time of day on the session-local clock.
    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Calendar day on the session-local clock.
    pub fn session_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Check that every price is finite and strictly positive.
    ///
    /// OHLC ordering (high >= low, etc.) is not enforced here; the feed owns that.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field, value });
            }
            if value <= 0.0 {
                return Err(BarError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
    }
}
