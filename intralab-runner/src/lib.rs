//! IntraLab Runner — run orchestration and artifact I/O.
//!
//! This crate builds on `intralab-core` to provide:
//! - TOML run configuration
//! - CSV bar loading with canonicalization and lookback filtering
//! - Single-backtest runner with fingerprinting and aggregation
//! - Artifact export (trades, monthly, rolling summary, manifest) and trade-CSV import

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{DataConfig, OutputConfig, RunConfig, RunConfigError};
pub use data_loader::{load_bars_csv, LoadError, LoadOptions, LoadedData};
pub use export::{load_artifacts, load_trades_csv, save_artifacts};
pub use runner::{run_backtest_from_bars, run_single_backtest, BacktestResult, RunError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
