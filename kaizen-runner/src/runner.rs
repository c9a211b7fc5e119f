//! Single-run runner: configuration and bars in, a persisted-ready result out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use kaizen_core::{replay, Bar, ClosedTrade, Position, ReplayError};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{dataset_hash, load_bars_csv, LoadError};
use crate::metrics::{ExpectancyStats, PerformanceMetrics};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid twin configuration: {0}")]
    Twin(#[from] kaizen_core::ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one replay run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    /// `SAMPLING`, `STRICT`, `NULL` or `CUSTOM`.
    pub mode: String,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub first_bar: Option<DateTime<Utc>>,
    pub last_bar: Option<DateTime<Utc>>,
    pub signal_count: usize,
    pub discarded_signals: usize,
    pub metrics: PerformanceMetrics,
    pub stats: ExpectancyStats,
    pub trades: Vec<ClosedTrade>,
    pub open_position: Option<Position>,
    pub config: RunConfig,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Span between the first and last bar, in years. Zero for fewer than two bars.
    pub fn years_covered(&self) -> f64 {
        match (self.first_bar, self.last_bar) {
            (Some(first), Some(last)) if last > first => {
                (last - first).num_seconds() as f64 / (365.25 * 24.0 * 3600.0)
            }
            _ => 0.0,
        }
    }

    pub fn trades_per_year(&self) -> f64 {
        let years = self.years_covered();
        if years > 0.0 {
            self.metrics.trade_count as f64 / years
        } else {
            0.0
        }
    }
}

/// Replay `bars` under `config` and compute metrics.
pub fn run_backtest(bars: &[Bar], config: &RunConfig) -> Result<BacktestResult, RunError> {
    run_backtest_with_hash(bars, config, &dataset_hash(bars))
}

/// Same as [`run_backtest`] with a precomputed dataset hash, for callers that
/// run many configurations over one feed.
pub fn run_backtest_with_hash(
    bars: &[Bar],
    config: &RunConfig,
    hash: &str,
) -> Result<BacktestResult, RunError> {
    let twin_config = config.to_twin_config()?;
    let out = replay(bars, &twin_config)?;

    let metrics = PerformanceMetrics::compute(&out.trades, config.execution.initial_equity);
    let stats = ExpectancyStats::from_trades(&out.trades);

    info!(
        mode = config.mode_label(),
        bars = out.bar_count,
        signals = out.signals.len(),
        trades = metrics.trade_count,
        total_pnl = metrics.total_pnl,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        mode: config.mode_label().to_string(),
        dataset_hash: hash.to_string(),
        bar_count: out.bar_count,
        first_bar: bars.first().map(|b| b.timestamp),
        last_bar: bars.last().map(|b| b.timestamp),
        signal_count: out.signals.len(),
        discarded_signals: out.discarded_signals,
        metrics,
        stats,
        trades: out.trades,
        open_position: out.open_position,
        config: config.clone(),
    })
}

/// Load a configuration file and a CSV feed, then run.
pub fn run_from_files(config_path: &Path, data_path: &Path) -> Result<BacktestResult, RunError> {
    let config = RunConfig::from_file(config_path)?;
    let bars = load_bars_csv(data_path)?;
    run_backtest(&bars, &config)
}
