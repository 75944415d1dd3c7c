//! Strategy components.
//!
//! - Signal generator: decides entries from bar history alone
//! - Tiered trailing stop: maps entry price + high-water mark to a stop price
//! - Price proxy: maps the underlying close to the price of the held instrument

pub mod proxy;
pub mod signal;
pub mod trailing;

pub use proxy::PriceProxy;
pub use signal::{MomentumSignal, Signal, SignalGenerator};
pub use trailing::{compute_effective_stop, StopLevel, TieredTrailingStop};
