//! Performance metrics: pure functions over a trade log.
//!
//! Nothing here knows about the replay engine or the file system.

use kaizen_core::{ClosedTrade, ExitReason};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// z for a two-sided 95% normal interval.
const Z_95: f64 = 1.96;

/// Aggregate performance of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    /// Fraction of trades with PnL > 0, in [0, 1].
    pub win_rate: f64,
    pub total_pnl: f64,
    /// Expectancy per trade.
    pub avg_pnl: f64,
    /// Gross profit over gross loss, capped at 100.
    pub profit_factor: f64,
    /// Largest peak-to-trough fall of the equity curve, in currency (>= 0).
    pub max_drawdown: f64,
    pub max_consecutive_losses: usize,
    pub pnl_by_reason: BTreeMap<String, f64>,
}

impl PerformanceMetrics {
    pub fn compute(trades: &[ClosedTrade], initial_equity: f64) -> Self {
        let pnls = pnl_series(trades);
        Self {
            trade_count: trades.len(),
            wins: trades.iter().filter(|t| t.is_winner()).count(),
            losses: trades.iter().filter(|t| !t.is_winner()).count(),
            win_rate: win_rate(&pnls),
            total_pnl: pnls.iter().sum(),
            avg_pnl: mean(&pnls),
            profit_factor: profit_factor(&pnls),
            max_drawdown: max_drawdown(&equity_curve(&pnls, initial_equity)),
            max_consecutive_losses: max_consecutive_losses(&pnls),
            pnl_by_reason: pnl_by_reason(trades),
        }
    }
}

/// Confidence statistics of the per-trade PnL distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectancyStats {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std_dev: f64,
    pub std_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub median: f64,
    pub zero_in_ci: bool,
    /// Trades needed for the lower bound to clear zero; `None` when the mean is not positive.
    pub n_for_significance: Option<f64>,
}

impl ExpectancyStats {
    pub fn compute(pnls: &[f64]) -> Self {
        let n = pnls.len();
        let mean = mean(pnls);
        let std_dev = sample_std_dev(pnls);
        let std_error = if n > 0 { std_dev / (n as f64).sqrt() } else { 0.0 };
        let margin = Z_95 * std_error;
        let ci_lower = mean - margin;
        let ci_upper = mean + margin;
        Self {
            n,
            mean,
            std_dev,
            std_error,
            ci_lower,
            ci_upper,
            median: median(pnls),
            zero_in_ci: ci_lower <= 0.0 && 0.0 <= ci_upper,
            n_for_significance: (mean > 0.0).then(|| (Z_95 * std_dev / mean).powi(2)),
        }
    }

    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        Self::compute(&pnl_series(trades))
    }

    /// Already past the trade count needed for significance.
    pub fn is_significant(&self) -> bool {
        self.n_for_significance
            .is_some_and(|needed| self.n as f64 > needed)
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn pnl_series(trades: &[ClosedTrade]) -> Vec<f64> {
    trades.iter().map(|t| t.pnl).collect()
}

/// Equity after each trade, starting with `initial_equity`.
pub fn equity_curve(pnls: &[f64], initial_equity: f64) -> Vec<f64> {
    let mut curve = Vec::with_capacity(pnls.len() + 1);
    let mut equity = initial_equity;
    curve.push(equity);
    for pnl in pnls {
        equity += pnl;
        curve.push(equity);
    }
    curve
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation. Zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

/// Gross profit / gross loss, capped at 100. 100 when there are wins but no losses.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Largest peak-to-trough decline, in currency, as a positive number.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        max_dd = max_dd.max(peak - eq);
    }
    max_dd
}

/// Longest run of trades with PnL <= 0.
pub fn max_consecutive_losses(pnls: &[f64]) -> usize {
    let mut max_run = 0;
    let mut current = 0;
    for &p in pnls {
        if p > 0.0 {
            current = 0;
        } else {
            current += 1;
            max_run = max_run.max(current);
        }
    }
    max_run
}

pub fn pnl_by_reason(trades: &[ClosedTrade]) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for trade in trades {
        *out.entry(trade.reason.as_str().to_string()).or_insert(0.0) += trade.pnl;
    }
    out
}

/// Trade count for one exit reason.
pub fn count_by_reason(trades: &[ClosedTrade], reason: ExitReason) -> usize {
    trades.iter().filter(|t| t.reason == reason).count()
}
