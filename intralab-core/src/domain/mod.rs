//! Domain types for IntraLab

pub mod bar;
pub mod ledger;
pub mod position;
pub mod trade;

pub use bar::{Bar, BarError};
pub use ledger::TradeLedger;
pub use position::{Direction, OpenPosition};
pub use trade::{ExitReason, TradeRecord};
