//! Reporting and export: JSON, CSV and Markdown artifacts.
//!
//! - **JSON**: the full run result, schema-versioned; newer versions are rejected on load
//! - **CSV**: the primary `exit_time,pnl,reason` tape, an enriched tape with
//!   level metadata, and the sweep / stratification / null tables
//! - **Markdown**: single-run, sweep, stratification and null reports

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use kaizen_core::ClosedTrade;

use crate::metrics::ExpectancyStats;
use crate::null_compare::{EdgeComparison, NullReport, NullTrials};
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::stratify::{ClassifiedTrade, CohortSummary, FilterEffect, StratifyReport};
use crate::sweep::SweepRow;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting schema versions newer than ours.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Primary trade tape. Columns: exit_time, pnl, reason.
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["exit_time", "pnl", "reason"])?;
    for t in trades {
        wtr.write_record([
            t.exit_time.to_rfc3339(),
            t.pnl.to_string(),
            t.reason.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

const ENRICHED_HEADER: [&str; 18] = [
    "mode",
    "exit_time",
    "pnl",
    "reason",
    "direction",
    "entry_time",
    "entry_price",
    "exit_price",
    "stop",
    "target",
    "bars_held",
    "level_id",
    "level_side",
    "level_status",
    "structure_age",
    "retest_count",
    "reclaim_depth",
    "is_expansion",
];

fn enriched_record(mode: &str, t: &ClosedTrade) -> Vec<String> {
    let c = &t.context;
    vec![
        mode.to_string(),
        t.exit_time.to_rfc3339(),
        format!("{:.2}", t.pnl),
        t.reason.to_string(),
        t.direction.to_string(),
        t.entry_time.to_rfc3339(),
        format!("{:.4}", t.entry_price),
        format!("{:.4}", t.exit_price),
        format!("{:.4}", t.stop),
        format!("{:.4}", t.target),
        t.bars_held().to_string(),
        c.level_id.to_string(),
        format!("{:?}", c.level_side).to_uppercase(),
        format!("{:?}", c.level_status).to_uppercase(),
        c.structure_age.to_string(),
        c.retest_count.to_string(),
        format!("{:.4}", c.reclaim_depth),
        c.is_expansion.to_string(),
    ]
}

/// Trade tape with the level metadata of the signal that opened each trade.
pub fn export_enriched_csv(mode: &str, trades: &[ClosedTrade]) -> Result<String> {
    export_enriched_runs(&[(mode, trades)])
}

/// Several runs in one enriched tape, told apart by the `mode` column.
pub fn export_enriched_runs(runs: &[(&str, &[ClosedTrade])]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(ENRICHED_HEADER)?;
    for (mode, trades) in runs {
        for t in trades.iter() {
            wtr.write_record(enriched_record(mode, t))?;
        }
    }
    finish_csv(wtr)
}

pub fn export_sweep_csv(rows: &[SweepRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "multiplier",
        "trades",
        "trades_per_year",
        "win_rate",
        "total_pnl",
        "avg_pnl",
        "max_drawdown",
    ])?;
    for r in rows {
        wtr.write_record([
            format!("{:.2}", r.multiplier),
            r.trades.to_string(),
            format!("{:.1}", r.trades_per_year),
            format!("{:.4}", r.win_rate),
            format!("{:.2}", r.total_pnl),
            format!("{:.2}", r.avg_pnl),
            format!("{:.2}", r.max_drawdown),
        ])?;
    }
    finish_csv(wtr)
}

/// `survivors_vs_dead.csv`: the enriched columns with a leading status column.
pub fn export_stratify_csv(classified: &[ClassifiedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["status"];
    header.extend(ENRICHED_HEADER);
    wtr.write_record(&header)?;
    for c in classified {
        let mut record = vec![c.cohort.to_string()];
        record.extend(enriched_record("SAMPLING", &c.trade));
        wtr.write_record(&record)?;
    }
    finish_csv(wtr)
}

pub fn export_null_csv(report: &NullReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bucket",
        "strategy_n",
        "strategy_mean",
        "strategy_ci_lower",
        "strategy_ci_upper",
        "null_n",
        "null_mean",
        "null_ci_lower",
        "null_ci_upper",
        "edge",
    ])?;
    for row in std::iter::once(&report.overall).chain(&report.by_session) {
        let (s, n) = (&row.strategy, &row.null);
        wtr.write_record([
            row.label().to_string(),
            s.n.to_string(),
            format!("{:.4}", s.mean),
            format!("{:.4}", s.ci_lower),
            format!("{:.4}", s.ci_upper),
            n.n.to_string(),
            format!("{:.4}", n.mean),
            format!("{:.4}", n.ci_lower),
            format!("{:.4}", n.ci_upper),
            format!("{:.4}", row.edge),
        ])?;
    }
    finish_csv(wtr)
}

/// One row per null trial, with the strategy mean repeated for plotting.
pub fn export_null_trials_csv(trials: &NullTrials) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["iteration", "seed", "trades", "mean_pnl", "strategy_mean"])?;
    for t in &trials.trials {
        wtr.write_record([
            t.iteration.to_string(),
            t.seed.to_string(),
            t.trades.to_string(),
            format!("{:.4}", t.mean_pnl),
            format!("{:.4}", trials.strategy_mean),
        ])?;
    }
    finish_csv(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))
}

/// Save `result.json`, `trades.csv`, `trades_enriched.csv` and `report.md` under `dir`.
pub fn save_run_artifacts(result: &BacktestResult, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    Ok(vec![
        write_file(dir, "result.json", &export_json(result)?)?,
        write_file(dir, "trades.csv", &export_trades_csv(&result.trades)?)?,
        write_file(
            dir,
            "trades_enriched.csv",
            &export_enriched_csv(&result.mode, &result.trades)?,
        )?,
        write_file(dir, "report.md", &generate_report(result))?,
    ])
}

/// Load `result.json` from an artifact directory. Rejects unknown schema versions.
pub fn load_run_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

pub fn save_sweep_artifacts(rows: &[SweepRow], dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    Ok(vec![
        write_file(dir, "expansion_sweep.csv", &export_sweep_csv(rows)?)?,
        write_file(dir, "expansion_sweep.md", &generate_sweep_report(rows))?,
    ])
}

pub fn save_stratify_artifacts(report: &StratifyReport, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    Ok(vec![
        write_file(
            dir,
            "survivors_vs_dead.csv",
            &export_stratify_csv(&report.classified)?,
        )?,
        write_file(dir, "survivors_vs_dead.md", &generate_stratify_report(report))?,
        write_file(
            dir,
            "filters_effectiveness.md",
            &generate_filters_report(&report.filters),
        )?,
    ])
}

pub fn save_null_artifacts(report: &NullReport, dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    Ok(vec![
        write_file(dir, "null_comparison.csv", &export_null_csv(report)?)?,
        write_file(dir, "null_comparison.md", &generate_null_report(report))?,
        write_file(
            dir,
            "trades_enriched.csv",
            &export_enriched_runs(&[
                (report.strategy.mode.as_str(), report.strategy.trades.as_slice()),
                ("NULL", report.null.trades.as_slice()),
            ])?,
        )?,
    ])
}

pub fn save_null_trials(trials: &NullTrials, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    write_file(dir, "null_trials.csv", &export_null_trials_csv(trials)?)
}

// ─── Markdown reports ───────────────────────────────────────────────

fn pct(v: f64) -> String {
    format!("{:.1}%", v * 100.0)
}

pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Replay Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Mode | {} |\n", result.mode));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    if let (Some(first), Some(last)) = (result.first_bar, result.last_bar) {
        md.push_str(&format!("| Period | {} to {} |\n", first, last));
    }
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!(
        "| Signals | {} ({} discarded) |\n",
        result.signal_count, result.discarded_signals
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.open_position.is_some() {
        md.push_str("| Open Position | yes |\n");
    }
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Trades/Year | {:.1} |\n", result.trades_per_year()));
    md.push_str(&format!("| Win Rate | {} |\n", pct(m.win_rate)));
    md.push_str(&format!("| Total PnL | {:.2} |\n", m.total_pnl));
    md.push_str(&format!("| Avg PnL | {:.2} |\n", m.avg_pnl));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Max Drawdown | {:.2} |\n", m.max_drawdown));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        m.max_consecutive_losses
    ));
    md.push('\n');

    if !m.pnl_by_reason.is_empty() {
        md.push_str("## PnL by Exit Reason\n\n");
        md.push_str("| Reason | PnL |\n");
        md.push_str("| --- | --- |\n");
        for (reason, pnl) in &m.pnl_by_reason {
            md.push_str(&format!("| {} | {:.2} |\n", reason, pnl));
        }
        md.push('\n');
    }

    md.push_str("## Expectancy\n\n");
    md.push_str(&stats_table(&result.stats));
    md
}

fn stats_table(s: &ExpectancyStats) -> String {
    let mut md = String::new();
    md.push_str("| Statistic | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| N | {} |\n", s.n));
    md.push_str(&format!("| Mean | {:.4} |\n", s.mean));
    md.push_str(&format!("| Median | {:.4} |\n", s.median));
    md.push_str(&format!("| Std Dev | {:.4} |\n", s.std_dev));
    md.push_str(&format!(
        "| 95% CI | [{:.4}, {:.4}] |\n",
        s.ci_lower, s.ci_upper
    ));
    md.push_str(&format!(
        "| Zero in CI | {} |\n",
        if s.zero_in_ci { "yes" } else { "no" }
    ));
    md.push_str(&format!(
        "| N for Significance | {} |\n",
        s.n_for_significance
            .map_or_else(|| "never (mean <= 0)".to_string(), |n| format!("{:.0}", n.ceil()))
    ));
    md
}

pub fn generate_sweep_report(rows: &[SweepRow]) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Expansion Multiplier Sweep\n\n");
    md.push_str("| Multiplier | Trades | Trades/Year | Win Rate | Total PnL | Avg PnL | Max DD |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
    for r in rows {
        md.push_str(&format!(
            "| {:.1} | {} | {:.1} | {} | {:.2} | {:.2} | {:.2} |\n",
            r.multiplier,
            r.trades,
            r.trades_per_year,
            pct(r.win_rate),
            r.total_pnl,
            r.avg_pnl,
            r.max_drawdown
        ));
    }
    md
}

fn cohort_row(c: &CohortSummary) -> String {
    format!(
        "| {} | {} | {} | {:.2} | {:.1} | {:.2} | {} |\n",
        c.cohort,
        c.count,
        pct(c.win_rate),
        c.total_pnl,
        c.avg_structure_age,
        c.avg_retest_count,
        pct(c.expansion_share)
    )
}

pub fn generate_stratify_report(report: &StratifyReport) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Survivors vs Dead\n\n");
    md.push_str(&format!(
        "Sampling trades: {}. Strict trades: {}.\n\n",
        report.sampling.metrics.trade_count, report.strict.metrics.trade_count
    ));
    md.push_str("| Cohort | Count | Win Rate | Total PnL | Avg Age | Avg Retests | Expansion |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
    md.push_str(&cohort_row(&report.survivors));
    md.push_str(&cohort_row(&report.dead));
    md
}

/// Per-gate view of the dead cohort: how many trades each gate removed and
/// whether they won less often than the sampling baseline.
pub fn generate_filters_report(filters: &[FilterEffect]) -> String {
    let mut md = String::with_capacity(512);
    md.push_str("# Filters Effectiveness\n\n");
    md.push_str("| Gate | Removed | Removed Win Rate | Baseline Win Rate | Verdict |\n");
    md.push_str("| --- | --- | --- | --- | --- |\n");
    for f in filters {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            f.gate,
            f.removed_count,
            pct(f.removed_win_rate),
            pct(f.baseline_win_rate),
            if f.improved() { "IMPROVED" } else { "HURT" }
        ));
    }
    md
}

fn edge_row(row: &EdgeComparison) -> String {
    format!(
        "| {} | {} | {:.4} | {} | {:.4} | {:+.4} |\n",
        row.label(),
        row.strategy.n,
        row.strategy.mean,
        row.null.n,
        row.null.mean,
        row.edge
    )
}

pub fn generate_null_report(report: &NullReport) -> String {
    let mut md = String::with_capacity(1024);
    md.push_str("# Strategy vs Null\n\n");
    md.push_str("| Bucket | Strategy N | Strategy Mean | Null N | Null Mean | Edge |\n");
    md.push_str("| --- | --- | --- | --- | --- | --- |\n");
    md.push_str(&edge_row(&report.overall));
    for row in &report.by_session {
        md.push_str(&edge_row(row));
    }
    md.push_str("\n## Strategy Expectancy\n\n");
    md.push_str(&stats_table(&report.overall.strategy));
    md.push_str("\n## Null Expectancy\n\n");
    md.push_str(&stats_table(&report.overall.null));
    md
}
