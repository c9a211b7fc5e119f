//! Strategy vs null: does the structural direction beat a coin flip?
//!
//! Both runs share every setting except the direction draw, so they trade the
//! same trigger points with the same risk. The edge is the difference in
//! expectancy, overall and per session bucket of the exit time.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::America::New_York;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use kaizen_core::rng::RngHierarchy;
use kaizen_core::{Bar, ClosedTrade};

use crate::config::RunConfig;
use crate::data_loader::dataset_hash;
use crate::metrics::{pnl_series, ExpectancyStats};
use crate::runner::{run_backtest_with_hash, BacktestResult, RunError};

/// Trading session by New York wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionBucket {
    /// 18:00 through 02:59.
    Asia,
    /// 03:00 through 09:29.
    London,
    /// 09:30 through 17:00.
    Ny,
    Other,
}

impl SessionBucket {
    pub const ALL: [SessionBucket; 4] = [
        SessionBucket::Asia,
        SessionBucket::London,
        SessionBucket::Ny,
        SessionBucket::Other,
    ];

    pub fn of(timestamp: DateTime<Utc>) -> Self {
        let local = timestamp.with_timezone(&New_York);
        let minute = local.hour() * 60 + local.minute();
        match minute {
            m if m >= 18 * 60 || m < 3 * 60 => SessionBucket::Asia,
            m if m < 9 * 60 + 30 => SessionBucket::London,
            m if m <= 17 * 60 => SessionBucket::Ny,
            _ => SessionBucket::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBucket::Asia => "ASIA",
            SessionBucket::London => "LONDON",
            SessionBucket::Ny => "NY",
            SessionBucket::Other => "OTHER",
        }
    }
}

impl fmt::Display for SessionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expectancy of both runs over one slice of trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeComparison {
    /// `None` for the overall row.
    pub bucket: Option<SessionBucket>,
    pub strategy: ExpectancyStats,
    pub null: ExpectancyStats,
    /// Strategy mean minus null mean.
    pub edge: f64,
}

impl EdgeComparison {
    pub fn compute(
        bucket: Option<SessionBucket>,
        strategy: &[ClosedTrade],
        null: &[ClosedTrade],
    ) -> Self {
        let strategy = ExpectancyStats::compute(&pnl_series(strategy));
        let null = ExpectancyStats::compute(&pnl_series(null));
        Self {
            bucket,
            edge: strategy.mean - null.mean,
            strategy,
            null,
        }
    }

    pub fn label(&self) -> &'static str {
        self.bucket.map_or("ALL", |b| b.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullReport {
    pub strategy: BacktestResult,
    pub null: BacktestResult,
    pub overall: EdgeComparison,
    /// One row per bucket that has trades in either run.
    pub by_session: Vec<EdgeComparison>,
}

fn in_bucket(trades: &[ClosedTrade], bucket: SessionBucket) -> Vec<ClosedTrade> {
    trades
        .iter()
        .filter(|t| SessionBucket::of(t.exit_time) == bucket)
        .cloned()
        .collect()
}

/// Compare two trade logs overall and per session bucket.
pub fn compare(
    strategy: &[ClosedTrade],
    null: &[ClosedTrade],
) -> (EdgeComparison, Vec<EdgeComparison>) {
    let overall = EdgeComparison::compute(None, strategy, null);
    let by_session = SessionBucket::ALL
        .iter()
        .filter_map(|&bucket| {
            let s = in_bucket(strategy, bucket);
            let n = in_bucket(null, bucket);
            if s.is_empty() && n.is_empty() {
                None
            } else {
                Some(EdgeComparison::compute(Some(bucket), &s, &n))
            }
        })
        .collect();
    (overall, by_session)
}

/// Run `base` and its null counterpart over `bars`.
pub fn run_null_comparison(
    bars: &[Bar],
    base: &RunConfig,
    seed: u64,
) -> Result<NullReport, RunError> {
    let hash = dataset_hash(bars);
    let mut strategy_config = base.clone();
    strategy_config.null_mode.enabled = false;
    let null_config = strategy_config.as_null(seed);

    let (strategy, null) = rayon::join(
        || run_backtest_with_hash(bars, &strategy_config, &hash),
        || run_backtest_with_hash(bars, &null_config, &hash),
    );
    let (strategy, null) = (strategy?, null?);

    let (overall, by_session) = compare(&strategy.trades, &null.trades);
    info!(
        strategy_mean = overall.strategy.mean,
        null_mean = overall.null.mean,
        edge = overall.edge,
        "null comparison complete"
    );

    Ok(NullReport {
        strategy,
        null,
        overall,
        by_session,
    })
}

/// One null replay in a multi-seed trial set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullTrial {
    pub iteration: u64,
    pub seed: u64,
    pub trades: usize,
    pub mean_pnl: f64,
}

/// Strategy expectancy against the distribution of many null replays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullTrials {
    pub master_seed: u64,
    pub strategy_mean: f64,
    pub trials: Vec<NullTrial>,
    /// Fraction of trials whose mean PnL is strictly below the strategy's.
    pub percentile: f64,
}

/// Replay `trials` null instances with seeds derived from `master_seed`.
///
/// Seeds depend only on the iteration number, so the result is the same
/// however rayon schedules the instances.
pub fn run_null_trials(
    bars: &[Bar],
    base: &RunConfig,
    master_seed: u64,
    trials: u64,
) -> Result<NullTrials, RunError> {
    let hash = dataset_hash(bars);
    let mut strategy_config = base.clone();
    strategy_config.null_mode.enabled = false;
    let strategy = run_backtest_with_hash(bars, &strategy_config, &hash)?;
    let strategy_mean = strategy.stats.mean;

    let seeds = RngHierarchy::new(master_seed);
    let trials: Vec<NullTrial> = (0..trials)
        .into_par_iter()
        .map(|iteration| -> Result<NullTrial, RunError> {
            let seed = seeds.sub_seed("null_direction", iteration);
            let result = run_backtest_with_hash(bars, &strategy_config.as_null(seed), &hash)?;
            Ok(NullTrial {
                iteration,
                seed,
                trades: result.metrics.trade_count,
                mean_pnl: result.stats.mean,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let below = trials.iter().filter(|t| t.mean_pnl < strategy_mean).count();
    let percentile = if trials.is_empty() {
        0.0
    } else {
        below as f64 / trials.len() as f64
    };
    info!(
        trials = trials.len(),
        strategy_mean,
        percentile,
        "null trials complete"
    );

    Ok(NullTrials {
        master_seed,
        strategy_mean,
        trials,
        percentile,
    })
}
