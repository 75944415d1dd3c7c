//! Run fingerprinting — deterministic identification of a replay's inputs.
//!
//! - `config_hash`: BLAKE3 over every strategy parameter in a fixed order.
//! - `dataset_hash`: BLAKE3 over every bar's timestamp and OHLC bytes.
//!
//! Two runs with equal fingerprints replay identical inputs and therefore
//! produce identical ledgers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::StrategyConfig;
use crate::domain::Bar;

/// Hex-encoded BLAKE3 digest of a strategy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigHash(pub String);

/// Hex-encoded BLAKE3 digest of a bar sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetHash(pub String);

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn config_hash(config: &StrategyConfig) -> ConfigHash {
    let mut hasher = blake3::Hasher::new();
    config.hash_into(&mut hasher);
    ConfigHash(hasher.finalize().to_hex().to_string())
}

pub fn dataset_hash(bars: &[Bar]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(bars.len() as u64).to_le_bytes());
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp().to_le_bytes());
        hasher.update(&bar.timestamp.timestamp_subsec_nanos().to_le_bytes());
        hasher.update(&bar.timestamp.offset().local_minus_utc().to_le_bytes());
        for value in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&value.to_le_bytes());
        }
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}

/// Identity of one replay: which parameters ran over which bars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
}

impl RunFingerprint {
    pub fn new(config: &StrategyConfig, bars: &[Bar]) -> Self {
        Self {
            config_hash: config_hash(config),
            dataset_hash: dataset_hash(bars),
        }
    }

    /// Short form for log lines and file names.
    pub fn short(&self) -> String {
        format!(
            "{}-{}",
            &self.config_hash.0[..12.min(self.config_hash.0.len())],
            &self.dataset_hash.0[..12.min(self.dataset_hash.0.len())]
        )
    }
}
