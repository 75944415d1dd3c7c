//! Tiered trailing stop.
//!
//! The stop starts at `entry - stop_loss_per_unit`. Each tier whose
//! `favorable_move` has been reached by the high-water mark proposes
//! `entry - stop_loss_per_unit + stop_offset`; the effective stop is the
//! highest of the baseline and every satisfied tier. Since the high-water mark
//! only rises, the effective stop only rises: it is a ratchet.

use serde::{Deserialize, Serialize};

use crate::config::{StrategyConfig, TrailingStep};

/// Stop price plus the tier that produced it (`None` = initial baseline).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLevel {
    pub price: f64,
    pub tier: Option<usize>,
}

impl StopLevel {
    pub fn is_trailing(&self) -> bool {
        self.tier.is_some()
    }
}

/// Effective stop for a position, as a pure function of its inputs.
pub fn compute_effective_stop(entry_price: f64, high_water_mark: f64, config: &StrategyConfig) -> f64 {
    TieredTrailingStop::from_config(config)
        .level(entry_price, high_water_mark)
        .price
}

/// Borrowed view over the stop parameters of a config.
#[derive(Debug, Clone, Copy)]
pub struct TieredTrailingStop<'a> {
    stop_loss_per_unit: f64,
    steps: &'a [TrailingStep],
}

impl<'a> TieredTrailingStop<'a> {
    pub fn new(stop_loss_per_unit: f64, steps: &'a [TrailingStep]) -> Self {
        Self {
            stop_loss_per_unit,
            steps,
        }
    }

    pub fn from_config(config: &'a StrategyConfig) -> Self {
        Self::new(config.stop_loss_per_unit(), config.trailing_steps())
    }

    pub fn baseline(&self, entry_price: f64) -> f64 {
        entry_price - self.stop_loss_per_unit
    }

    pub fn level(&self, entry_price: f64, high_water_mark: f64) -> StopLevel {
        let baseline = self.baseline(entry_price);
        let favorable_move = high_water_mark - entry_price;

        let mut best = StopLevel {
            price: baseline,
            tier: None,
        };
        for (index, step) in self.steps.iter().enumerate() {
            if favorable_move >= step.favorable_move {
                let candidate = baseline + step.stop_offset;
                if candidate > best.price {
                    best = StopLevel {
                        price: candidate,
                        tier: Some(index),
                    };
                }
            }
        }
        best
    }
}
