//! Backtesting engine — session state machine and the bar-by-bar replay loop.
//!
//! The engine consumes validated, time-ordered bars and produces a
//! `TradeLedger`. All mutable state for one run lives in a `Simulator`.

pub mod error;
pub mod loop_runner;
pub mod session;

pub use error::EngineError;
pub use loop_runner::{run, run_with_stats, RunResult, RunStats, Simulator};
pub use session::{SessionPhase, SessionState};
