//! Kaizen Runner: run orchestration on top of `kaizen-core`.
//!
//! This crate provides:
//! - TOML run configuration and the CSV bar loading adapter
//! - Single-run runner with metrics and expectancy statistics
//! - Expansion-multiplier sweep (parallel with rayon)
//! - Survivors-vs-dead stratification and the strategy-vs-null comparison
//! - JSON, CSV and Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod null_compare;
pub mod runner;
pub mod stratify;
pub mod sweep;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{dataset_hash, load_bars_csv, read_bars, LoadError};
pub use metrics::{ExpectancyStats, PerformanceMetrics};
pub use null_compare::{
    run_null_comparison, run_null_trials, EdgeComparison, NullReport, NullTrial, NullTrials,
    SessionBucket,
};
pub use runner::{run_backtest, run_from_files, BacktestResult, RunError, SCHEMA_VERSION};
pub use stratify::{
    stratify, ClassifiedTrade, Cohort, CohortSummary, FilterEffect, StratifyReport,
};
pub use sweep::{ExpansionSweep, SweepRow, DEFAULT_MULTIPLIERS};
