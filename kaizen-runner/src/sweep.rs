//! Expansion-multiplier sweep: strict-mode replays over a list of multipliers.
//!
//! Each instance owns its own twin and simulator, so the parallel and
//! sequential paths produce identical rows.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use kaizen_core::Bar;

use crate::config::RunConfig;
use crate::data_loader::dataset_hash;
use crate::runner::{run_backtest_with_hash, BacktestResult, RunError};

/// Multipliers tested when none are given, from tightest gate to loosest.
pub const DEFAULT_MULTIPLIERS: [f64; 8] = [1.5, 1.4, 1.3, 1.2, 1.1, 1.0, 0.9, 0.8];

/// One row of the sweep table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub multiplier: f64,
    pub trades: usize,
    pub trades_per_year: f64,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub max_drawdown: f64,
}

impl SweepRow {
    fn from_result(multiplier: f64, result: &BacktestResult) -> Self {
        let m = &result.metrics;
        Self {
            multiplier,
            trades: m.trade_count,
            trades_per_year: result.trades_per_year(),
            win_rate: m.win_rate,
            total_pnl: m.total_pnl,
            avg_pnl: m.avg_pnl,
            max_drawdown: m.max_drawdown,
        }
    }
}

/// Sweep executor.
pub struct ExpansionSweep {
    multipliers: Vec<f64>,
    parallel: bool,
}

impl Default for ExpansionSweep {
    fn default() -> Self {
        Self::new(DEFAULT_MULTIPLIERS.to_vec())
    }
}

impl ExpansionSweep {
    pub fn new(multipliers: Vec<f64>) -> Self {
        Self {
            multipliers,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn multipliers(&self) -> &[f64] {
        &self.multipliers
    }

    /// Configuration for one instance: strict gates, the given multiplier,
    /// everything else taken from `base`.
    pub fn instance_config(base: &RunConfig, multiplier: f64) -> RunConfig {
        let mut config = base.clone();
        config.gates = RunConfig::strict().gates;
        config.gates.cooldown_minutes = base.gates.cooldown_minutes;
        config.strategy.expansion_mult = multiplier;
        config.null_mode.enabled = false;
        config
    }

    /// Run every multiplier over `bars`. Rows come back in multiplier order.
    pub fn run(&self, bars: &[Bar], base: &RunConfig) -> Result<Vec<SweepRow>, RunError> {
        let hash = dataset_hash(bars);
        let run_one = |&multiplier: &f64| -> Result<SweepRow, RunError> {
            let config = Self::instance_config(base, multiplier);
            let result = run_backtest_with_hash(bars, &config, &hash)?;
            Ok(SweepRow::from_result(multiplier, &result))
        };

        let rows: Vec<SweepRow> = if self.parallel {
            self.multipliers
                .par_iter()
                .map(run_one)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            self.multipliers
                .iter()
                .map(run_one)
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(instances = rows.len(), parallel = self.parallel, "sweep complete");
        Ok(rows)
    }
}

/// Row with the highest total PnL, if any.
pub fn best_row(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter()
        .max_by(|a, b| a.total_pnl.total_cmp(&b.total_pnl))
}
