//! Signal generation — decides whether the latest bar warrants an entry.
//!
//! Signals are position-agnostic: they receive bar history only, never session
//! or position state. Gating (session window, daily loss cap, one position at a
//! time) is the session state machine's job.

use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::domain::{Bar, Direction};

/// Outcome of evaluating a signal on the most recent bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub enter: bool,
    /// Set iff `enter` is true.
    pub direction: Option<Direction>,
    pub reason: String,
}

impl Signal {
    pub fn hold() -> Self {
        Self {
            enter: false,
            direction: None,
            reason: String::new(),
        }
    }

    pub fn enter(direction: Direction, reason: impl Into<String>) -> Self {
        Self {
            enter: true,
            direction: Some(direction),
            reason: reason.into(),
        }
    }
}

/// Trait for entry signal generators.
///
/// `window` is the bar history up to and including the bar being evaluated,
/// oldest first. Implementations must be pure: the same window always yields
/// the same signal.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "momentum").
    fn name(&self) -> &str;

    /// Number of trailing bars the generator reads (1 = latest bar only).
    fn lookback(&self) -> usize;

    fn evaluate(&self, window: &[Bar]) -> Signal;
}

/// Big-candle momentum entry.
///
/// Fires when `|close - open| >= threshold`: CALL on a green body, PUT on a red
/// one. The comparison is inclusive. A flat body never fires.
#[derive(Debug, Clone)]
pub struct MomentumSignal {
    pub threshold: f64,
}

impl MomentumSignal {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.momentum_threshold())
    }

    /// Evaluate a single bar.
    pub fn evaluate_bar(&self, bar: &Bar) -> Signal {
        let body = bar.body();
        if !body.is_finite() || body == 0.0 || body.abs() < self.threshold {
            return Signal::hold();
        }
        let direction = if body > 0.0 {
            Direction::Call
        } else {
            Direction::Put
        };
        Signal::enter(direction, format!("momentum {body:+.1}pts"))
    }
}

impl SignalGenerator for MomentumSignal {
    fn name(&self) -> &str {
        "momentum"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn evaluate(&self, window: &[Bar]) -> Signal {
        match window.last() {
            Some(bar) => self.evaluate_bar(bar),
            None => Signal::hold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn bar(open: f64, close: f64) -> Bar {
        let ts = FixedOffset::east_opt(19800)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 4, 9, 20, 0)
            .unwrap();
        Bar::new(ts, open, open.max(close) + 1.0, open.min(close) - 1.0, close)
    }

    #[test]
    fn green_body_above_threshold_is_call() {
        let sig = MomentumSignal::new(15.0);
        let s = sig.evaluate(&[bar(84.0, 100.0)]);
        assert!(s.enter);
        assert_eq!(s.direction, Some(Direction::Call));
        assert_eq!(s.reason, "momentum +16.0pts");
    }

    #[test]
    fn red_body_above_threshold_is_put() {
        let sig = MomentumSignal::new(15.0);
        let s = sig.evaluate(&[bar(120.0, 100.0)]);
        assert!(s.enter);
        assert_eq!(s.direction, Some(Direction::Put));
    }

    #[test]
    fn threshold_is_inclusive() {
        let sig = MomentumSignal::new(15.0);
        assert!(sig.evaluate(&[bar(100.0, 115.0)]).enter);
        assert!(sig.evaluate(&[bar(115.0, 100.0)]).enter);
    }

    #[test]
    fn small_body_holds() {
        let sig = MomentumSignal::new(15.0);
        let s = sig.evaluate(&[bar(100.0, 114.9)]);
        assert_eq!(s, Signal::hold());
    }

    #[test]
    fn flat_body_never_fires_even_with_zero_threshold() {
        let sig = MomentumSignal::new(0.0);
        assert!(!sig.evaluate(&[bar(100.0, 100.0)]).enter);
    }

    #[test]
    fn only_the_latest_bar_matters() {
        let sig = MomentumSignal::new(15.0);
        let window = [bar(80.0, 100.0), bar(100.0, 101.0)];
        assert!(!sig.evaluate(&window).enter);
    }

    #[test]
    fn empty_window_holds() {
        assert!(!MomentumSignal::new(15.0).evaluate(&[]).enter);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let sig = MomentumSignal::new(15.0);
        let b = bar(100.0, 80.0);
        assert_eq!(sig.evaluate_bar(&b), sig.evaluate_bar(&b));
    }
}
