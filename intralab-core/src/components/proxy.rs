//! Price proxies — which price series the position is marked against.
//!
//! The signal always reads the underlying bar. The proxy maps the underlying
//! close to the price of the instrument actually held, so stop and P&L logic
//! never needs to know whether it is trading spot or an option premium.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::domain::Direction;

/// Smallest premium the delta proxy will quote.
pub const MIN_PREMIUM: f64 = 0.05;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceProxy {
    /// Hold the underlying close itself.
    #[default]
    Spot,
    /// Linear premium model: `premium + sign * delta * (spot - entry_spot)`,
    /// floored at `MIN_PREMIUM`. `sign` is +1 for CALL, -1 for PUT.
    DeltaProxy { delta: f64, premium: f64 },
}

impl PriceProxy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            PriceProxy::Spot => Ok(()),
            PriceProxy::DeltaProxy { delta, premium } => {
                if !(delta.is_finite() && delta > 0.0 && delta <= 1.0) {
                    return Err(ConfigError::InvalidProxy(format!(
                        "delta must be in (0, 1], got {delta}"
                    )));
                }
                if !(premium.is_finite() && premium >= MIN_PREMIUM) {
                    return Err(ConfigError::InvalidProxy(format!(
                        "premium must be at least {MIN_PREMIUM}, got {premium}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Price paid on the entry bar.
    pub fn entry_price(&self, spot: f64) -> f64 {
        match *self {
            PriceProxy::Spot => spot,
            PriceProxy::DeltaProxy { premium, .. } => premium,
        }
    }

    /// Price of the held instrument given the current underlying close.
    pub fn price(&self, direction: Direction, entry_spot: f64, spot: f64) -> f64 {
        match *self {
            PriceProxy::Spot => spot,
            PriceProxy::DeltaProxy { delta, premium } => {
                (premium + direction.sign() * delta * (spot - entry_spot)).max(MIN_PREMIUM)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PriceProxy::Spot => "spot",
            PriceProxy::DeltaProxy { .. } => "delta_proxy",
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.name().as_bytes());
        if let PriceProxy::DeltaProxy { delta, premium } = *self {
            hasher.update(&delta.to_le_bytes());
            hasher.update(&premium.to_le_bytes());
        }
    }
}
