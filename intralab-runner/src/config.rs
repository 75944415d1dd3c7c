//! TOML run configuration.
//!
//! ```toml
//! [data]
//! bars = "data/nifty_5m.csv"   # relative paths resolve against this file
//! symbol = "NIFTY"
//! months = 6                   # optional lookback
//! utc_offset = "+05:30"        # exchange clock; CSV timestamps are converted to it
//! as_of = "2024-06-28T15:15:00+05:30"
//!
//! [strategy]
//! lot_quantity = 75
//! stop_loss_per_unit = 20.0
//! session_start = "09:15"
//! session_end = "15:15"
//!
//! [output]
//! dir = "output"
//! ```
//!
//! The `[strategy]` table is validated while it is parsed; a file that breaks
//! any strategy invariant never produces a `RunConfig`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use intralab_core::config::StrategyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid run config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("lookback months must be at least 1")]
    ZeroLookback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Bars CSV: `timestamp,open,high,low,close`.
    pub bars: PathBuf,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Keep only bars within `30 * months` days of `as_of`.
    #[serde(default)]
    pub months: Option<u32>,
    /// Anchor for the lookback and the rolling windows. Defaults to the last bar.
    #[serde(default)]
    pub as_of: Option<DateTime<FixedOffset>>,
    /// Exchange offset. Session times and calendar days are read on this clock.
    #[serde(default = "default_utc_offset", with = "utc_offset")]
    pub utc_offset: FixedOffset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_symbol() -> String {
    "NIFTY".to_string()
}

/// IST (+05:30), the clock of the default 09:15-15:15 session.
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl RunConfig {
    /// Config for a bare bars file with default strategy parameters.
    pub fn for_bars(bars: impl Into<PathBuf>) -> Self {
        Self {
            data: DataConfig {
                bars: bars.into(),
                symbol: default_symbol(),
                months: None,
                as_of: None,
                utc_offset: default_utc_offset(),
            },
            strategy: StrategyConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. Relative data and output paths are resolved
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.data.bars = resolve(base, &config.data.bars);
            config.output.dir = resolve(base, &config.output.dir);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        if self.data.months == Some(0) {
            return Err(RunConfigError::ZeroLookback);
        }
        Ok(())
    }
}

/// `"+05:30"`-style serde for a fixed UTC offset.
pub mod utc_offset {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&offset.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FixedOffset, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid utc_offset '{text}': {e}")))
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
