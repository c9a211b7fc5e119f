//! Survivors vs dead: which sampling-mode trades the strict gates keep.
//!
//! A sampling trade survives when strict mode closes a trade at the same exit
//! time on the same level (side and id). Dead trades are further broken down by
//! the gate that most plausibly removed them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::info;

use chrono::{DateTime, Utc};
use kaizen_core::{Bar, ClosedTrade, LevelId, LevelSide};

use crate::config::{GatesSection, RunConfig};
use crate::data_loader::dataset_hash;
use crate::runner::{run_backtest_with_hash, BacktestResult, RunError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cohort {
    Survivor,
    Dead,
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cohort::Survivor => write!(f, "SURVIVOR"),
            Cohort::Dead => write!(f, "DEAD"),
        }
    }
}

/// A sampling-mode trade and the cohort it landed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTrade {
    pub cohort: Cohort,
    pub trade: ClosedTrade,
}

/// Aggregate of one cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub cohort: Cohort,
    pub count: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_structure_age: f64,
    pub avg_retest_count: f64,
    /// Share of trades opened while an expansion regime was active, in [0, 1].
    pub expansion_share: f64,
}

impl CohortSummary {
    fn compute(cohort: Cohort, trades: &[&ClosedTrade]) -> Self {
        Self {
            cohort,
            count: trades.len(),
            win_rate: mean_of(trades, |t| if t.is_winner() { 1.0 } else { 0.0 }),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            avg_structure_age: mean_of(trades, |t| t.context.structure_age as f64),
            avg_retest_count: mean_of(trades, |t| f64::from(t.context.retest_count)),
            expansion_share: mean_of(trades, |t| if t.context.is_expansion { 1.0 } else { 0.0 }),
        }
    }
}

fn mean_of(trades: &[&ClosedTrade], f: impl Fn(&ClosedTrade) -> f64) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|&t| f(t)).sum::<f64>() / trades.len() as f64
}

/// Dead trades attributed to one gate, judged against the sampling win rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEffect {
    pub gate: String,
    pub removed_count: usize,
    pub removed_win_rate: f64,
    pub baseline_win_rate: f64,
}

impl FilterEffect {
    fn compute(
        gate: &str,
        classified: &[ClassifiedTrade],
        baseline_win_rate: f64,
        removed_by: impl Fn(&ClosedTrade) -> bool,
    ) -> Self {
        let removed: Vec<&ClosedTrade> = classified
            .iter()
            .filter(|c| c.cohort == Cohort::Dead && removed_by(&c.trade))
            .map(|c| &c.trade)
            .collect();
        Self {
            gate: gate.to_string(),
            removed_count: removed.len(),
            removed_win_rate: mean_of(&removed, |t| if t.is_winner() { 1.0 } else { 0.0 }),
            baseline_win_rate,
        }
    }

    /// Removing these trades helped when they won less often than the baseline.
    pub fn improved(&self) -> bool {
        self.removed_win_rate < self.baseline_win_rate
    }
}

/// Usage gate: dead trades on a level already retested. Expansion gate: dead
/// trades opened inside an expansion regime.
pub fn filter_effects(
    classified: &[ClassifiedTrade],
    baseline_win_rate: f64,
) -> Vec<FilterEffect> {
    vec![
        FilterEffect::compute("USAGE", classified, baseline_win_rate, |t| {
            t.context.retest_count > 1
        }),
        FilterEffect::compute("EXPANSION", classified, baseline_win_rate, |t| {
            t.context.is_expansion
        }),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifyReport {
    pub sampling: BacktestResult,
    pub strict: BacktestResult,
    pub classified: Vec<ClassifiedTrade>,
    pub survivors: CohortSummary,
    pub dead: CohortSummary,
    pub filters: Vec<FilterEffect>,
}

// Level ids are only unique per side.
fn trade_key(trade: &ClosedTrade) -> (DateTime<Utc>, LevelSide, LevelId) {
    (trade.exit_time, trade.context.level_side, trade.context.level_id)
}

/// Label each sampling trade by whether strict mode kept it.
pub fn classify(sampling: &[ClosedTrade], strict: &[ClosedTrade]) -> Vec<ClassifiedTrade> {
    let kept: HashSet<_> = strict.iter().map(trade_key).collect();
    sampling
        .iter()
        .map(|trade| ClassifiedTrade {
            cohort: if kept.contains(&trade_key(trade)) {
                Cohort::Survivor
            } else {
                Cohort::Dead
            },
            trade: trade.clone(),
        })
        .collect()
}

pub fn summarize(classified: &[ClassifiedTrade], cohort: Cohort) -> CohortSummary {
    let trades: Vec<&ClosedTrade> = classified
        .iter()
        .filter(|c| c.cohort == cohort)
        .map(|c| &c.trade)
        .collect();
    CohortSummary::compute(cohort, &trades)
}

/// Run sampling and strict variants of `base` over `bars` and compare.
pub fn stratify(bars: &[Bar], base: &RunConfig) -> Result<StratifyReport, RunError> {
    let hash = dataset_hash(bars);
    let with_gates = |gates: GatesSection| {
        let mut config = base.clone();
        config.gates = GatesSection {
            cooldown_minutes: base.gates.cooldown_minutes,
            ..gates
        };
        config.null_mode.enabled = false;
        config
    };

    let (sampling, strict) = rayon::join(
        || run_backtest_with_hash(bars, &with_gates(RunConfig::sampling().gates), &hash),
        || run_backtest_with_hash(bars, &with_gates(RunConfig::strict().gates), &hash),
    );
    let (sampling, strict) = (sampling?, strict?);

    let classified = classify(&sampling.trades, &strict.trades);
    let survivors = summarize(&classified, Cohort::Survivor);
    let dead = summarize(&classified, Cohort::Dead);
    let filters = filter_effects(&classified, sampling.metrics.win_rate);
    info!(
        survivors = survivors.count,
        dead = dead.count,
        "stratification complete"
    );

    Ok(StratifyReport {
        sampling,
        strict,
        classified,
        survivors,
        dead,
        filters,
    })
}
