//! Errors that abort a replay.

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::domain::BarError;

/// A replay fails fast on the first malformed or out-of-order bar. No partial
/// ledger is returned alongside these errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("bar {index} at {current} is not after the previous bar at {previous}")]
    InputOrdering {
        index: usize,
        previous: DateTime<FixedOffset>,
        current: DateTime<FixedOffset>,
    },

    #[error("bar {index} at {timestamp} is invalid: {reason}")]
    InvalidBar {
        index: usize,
        timestamp: DateTime<FixedOffset>,
        #[source]
        reason: BarError,
    },
}

impl EngineError {
    /// Position of the offending bar in the input sequence.
    pub fn index(&self) -> usize {
        match self {
            EngineError::InputOrdering { index, .. } | EngineError::InvalidBar { index, .. } => {
                *index
            }
        }
    }
}
