//! Strategy configuration, validated at construction.
//!
//! `StrategyParams` is the plain, serializable parameter set (what a TOML file
//! holds). `StrategyConfig` is the validated, immutable form the engine runs
//! on; the only ways to obtain one are `StrategyParams::build()`,
//! `StrategyConfig::default()`, or deserialization, which validates through
//! the same path. An invalid parameter set is rejected at load time, never
//! in the middle of a run.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::proxy::PriceProxy;

/// Tolerance used when comparing realized per-unit results with stop distances.
pub const STOP_EPSILON: f64 = 1e-6;

/// Errors raised while validating a strategy configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("lot_quantity must be at least 1")]
    ZeroLotQuantity,

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("trailing step {index}: {field} must be positive, got {value}")]
    NonPositiveStep {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("trailing step {index}: {field} must increase ({previous} -> {current})")]
    StepNotIncreasing {
        index: usize,
        field: &'static str,
        previous: f64,
        current: f64,
    },

    #[error("session_start {start} must be before session_end {end}")]
    EmptySession { start: NaiveTime, end: NaiveTime },

    #[error("price proxy: {0}")]
    InvalidProxy(String),
}

/// One ratchet tier: once the high-water mark is `favorable_move` above entry,
/// the stop becomes `entry - stop_loss_per_unit + stop_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStep {
    pub favorable_move: f64,
    pub stop_offset: f64,
}

impl TrailingStep {
    pub const fn new(favorable_move: f64, stop_offset: f64) -> Self {
        Self {
            favorable_move,
            stop_offset,
        }
    }
}

/// Which stop-triggered exits count toward `max_daily_stop_losses`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCounting {
    /// Any stop exit that realizes a loss.
    #[default]
    AnyLoss,
    /// Only exits whose per-unit loss reaches the full `stop_loss_per_unit`.
    FullStop,
}

impl StopCounting {
    /// Whether an exit with the given per-unit result counts as a stop-loss.
    pub fn counts(self, pnl_per_unit: f64, stop_loss_per_unit: f64) -> bool {
        match self {
            StopCounting::AnyLoss => pnl_per_unit <= -STOP_EPSILON,
            StopCounting::FullStop => pnl_per_unit <= -stop_loss_per_unit + STOP_EPSILON,
        }
    }
}

/// Raw strategy parameters. Defaults are the reference intraday setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyParams {
    pub lot_quantity: u32,
    pub stop_loss_per_unit: f64,
    pub max_daily_stop_losses: u32,
    #[serde(with = "time_of_day")]
    pub session_start: NaiveTime,
    #[serde(with = "time_of_day")]
    pub session_end: NaiveTime,
    pub momentum_threshold: f64,
    pub stop_counting: StopCounting,
    pub trailing_steps: Vec<TrailingStep>,
    pub price_proxy: PriceProxy,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            lot_quantity: 75,
            stop_loss_per_unit: 20.0,
            max_daily_stop_losses: 3,
            session_start: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            session_end: NaiveTime::from_hms_opt(15, 15, 0).unwrap_or_default(),
            momentum_threshold: 15.0,
            stop_counting: StopCounting::AnyLoss,
            trailing_steps: vec![
                TrailingStep::new(5.0, 10.0),
                TrailingStep::new(13.0, 20.0),
                TrailingStep::new(20.0, 30.0),
            ],
            price_proxy: PriceProxy::Spot,
        }
    }
}

impl StrategyParams {
    /// Validate and freeze the parameters.
    pub fn build(self) -> Result<StrategyConfig, ConfigError> {
        self.validate()?;
        Ok(StrategyConfig { params: self })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lot_quantity == 0 {
            return Err(ConfigError::ZeroLotQuantity);
        }
        positive("stop_loss_per_unit", self.stop_loss_per_unit)?;
        positive("momentum_threshold", self.momentum_threshold)?;

        let mut previous: Option<TrailingStep> = None;
        for (index, step) in self.trailing_steps.iter().enumerate() {
            for (field, value) in [
                ("favorable_move", step.favorable_move),
                ("stop_offset", step.stop_offset),
            ] {
                if !value.is_finite() {
                    return Err(ConfigError::NonFinite { field, value });
                }
                if value <= 0.0 {
                    return Err(ConfigError::NonPositiveStep {
                        index,
                        field,
                        value,
                    });
                }
            }
            if let Some(prev) = previous {
                if step.favorable_move <= prev.favorable_move {
                    return Err(ConfigError::StepNotIncreasing {
                        index,
                        field: "favorable_move",
                        previous: prev.favorable_move,
                        current: step.favorable_move,
                    });
                }
                if step.stop_offset <= prev.stop_offset {
                    return Err(ConfigError::StepNotIncreasing {
                        index,
                        field: "stop_offset",
                        previous: prev.stop_offset,
                        current: step.stop_offset,
                    });
                }
            }
            previous = Some(*step);
        }

        if self.session_start >= self.session_end {
            return Err(ConfigError::EmptySession {
                start: self.session_start,
                end: self.session_end,
            });
        }

        self.price_proxy.validate()
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field, value });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

/// Validated, immutable strategy configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StrategyParams", into = "StrategyParams")]
pub struct StrategyConfig {
    params: StrategyParams,
}

impl TryFrom<StrategyParams> for StrategyConfig {
    type Error = ConfigError;

    fn try_from(params: StrategyParams) -> Result<Self, Self::Error> {
        params.build()
    }
}

impl From<StrategyConfig> for StrategyParams {
    fn from(config: StrategyConfig) -> Self {
        config.params
    }
}

impl StrategyConfig {
    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn lot_quantity(&self) -> u32 {
        self.params.lot_quantity
    }

    pub fn stop_loss_per_unit(&self) -> f64 {
        self.params.stop_loss_per_unit
    }

    pub fn trailing_steps(&self) -> &[TrailingStep] {
        &self.params.trailing_steps
    }

    pub fn max_daily_stop_losses(&self) -> u32 {
        self.params.max_daily_stop_losses
    }

    pub fn session_start(&self) -> NaiveTime {
        self.params.session_start
    }

    pub fn session_end(&self) -> NaiveTime {
        self.params.session_end
    }

    pub fn momentum_threshold(&self) -> f64 {
        self.params.momentum_threshold
    }

    pub fn stop_counting(&self) -> StopCounting {
        self.params.stop_counting
    }

    pub fn price_proxy(&self) -> PriceProxy {
        self.params.price_proxy
    }

    /// Whether a time of day falls inside `[session_start, session_end]`.
    pub fn in_session(&self, time: NaiveTime) -> bool {
        time >= self.params.session_start && time <= self.params.session_end
    }

    /// Feed every parameter into a hasher in a fixed order.
    pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
        let p = &self.params;
        hasher.update(&p.lot_quantity.to_le_bytes());
        hasher.update(&p.stop_loss_per_unit.to_le_bytes());
        hasher.update(&(p.trailing_steps.len() as u64).to_le_bytes());
        for step in &p.trailing_steps {
            hasher.update(&step.favorable_move.to_le_bytes());
            hasher.update(&step.stop_offset.to_le_bytes());
        }
        hasher.update(&p.max_daily_stop_losses.to_le_bytes());
        hasher.update(p.session_start.format("%H:%M:%S").to_string().as_bytes());
        hasher.update(p.session_end.format("%H:%M:%S").to_string().as_bytes());
        hasher.update(&p.momentum_threshold.to_le_bytes());
        hasher.update(match p.stop_counting {
            StopCounting::AnyLoss => b"any_loss".as_slice(),
            StopCounting::FullStop => b"full_stop".as_slice(),
        });
        p.price_proxy.hash_into(hasher);
    }
}

/// Serde helpers for `"HH:MM"` / `"HH:MM:SS"` times of day.
pub mod time_of_day {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(s, "%H:%M:%S").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = if time.second() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S").to_string()
        };
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(|e| serde::de::Error::custom(format!("invalid time '{text}': {e}")))
    }
}
