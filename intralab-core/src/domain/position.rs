//! Direction and the single open position held during a session.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which option-equivalent leg a momentum entry buys.
///
/// Both legs are held long the simulated price series: a CALL profits when the
/// series rises, and so does a PUT once the series is a PUT premium proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    /// +1.0 for CALL, -1.0 for PUT: the sign of the underlying move that helps the leg.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Call => 1.0,
            Direction::Put => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Call => "CALL",
            Direction::Put => "PUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The open position. At most one exists at a time.
///
/// `high_water_mark` is the highest simulated price observed since entry and
/// `current_stop` the highest stop applied so far; both only ever rise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry_timestamp: DateTime<FixedOffset>,
    pub entry_price: f64,
    /// Underlying close on the entry bar, the anchor for premium proxies.
    pub entry_spot: f64,
    pub high_water_mark: f64,
    pub direction: Direction,
    pub quantity: u32,
    pub current_stop: Option<f64>,
}

impl OpenPosition {
    pub fn open(
        entry_timestamp: DateTime<FixedOffset>,
        entry_price: f64,
        entry_spot: f64,
        direction: Direction,
        quantity: u32,
    ) -> Self {
        Self {
            entry_timestamp,
            entry_price,
            entry_spot,
            high_water_mark: entry_price,
            direction,
            quantity,
            current_stop: None,
        }
    }

    /// Fold a newly observed price into the high-water mark.
    pub fn observe(&mut self, price: f64) {
        self.high_water_mark = self.high_water_mark.max(price);
    }

    /// Record a proposed stop; the stored stop can only tighten (rise).
    pub fn ratchet_stop(&mut self, proposed: f64) -> f64 {
        let stop = match self.current_stop {
            Some(current) => current.max(proposed),
            None => proposed,
        };
        self.current_stop = Some(stop);
        stop
    }

    /// Largest move in the position's favor so far.
    pub fn favorable_move(&self) -> f64 {
        self.high_water_mark - self.entry_price
    }
}
