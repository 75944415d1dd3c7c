//! IntraLab Core — intraday momentum strategy engine.
//!
//! This crate contains the pure, I/O-free part of the backtester:
//! - Domain types (bars, open positions, trade records, the trade ledger)
//! - Validated strategy configuration
//! - Momentum entry signal, tiered trailing stop and price proxies
//! - Per-day session state machine with the daily stop-loss cap
//! - Bar-by-bar replay loop (`Simulator`, `run`)
//! - Ledger aggregation, run fingerprinting and seeded synthetic bars

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod summary;
pub mod synthetic;

pub use config::{ConfigError, StopCounting, StrategyConfig, StrategyParams, TrailingStep};
pub use domain::{Bar, Direction, ExitReason, TradeLedger, TradeRecord};
pub use engine::{run, EngineError, Simulator};
pub use summary::{summarize, Summary};
