//! Kaizen CLI: replay commands over a CSV bar feed.
//!
//! Commands:
//! - `run`: one replay from a TOML config file or named preset
//! - `sweep`: strict-mode replays over a list of expansion multipliers
//! - `stratify`: sampling vs strict, survivors vs dead
//! - `null`: the configured strategy against its random-direction twin

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use kaizen_core::ExitReason;
use kaizen_runner::export::{
    save_null_artifacts, save_null_trials, save_run_artifacts, save_stratify_artifacts,
    save_sweep_artifacts,
};
use kaizen_runner::metrics::count_by_reason;
use kaizen_runner::sweep::best_row;
use kaizen_runner::{
    load_bars_csv, run_backtest, run_null_comparison, run_null_trials, stratify, BacktestResult,
    ExpansionSweep, RunConfig, DEFAULT_MULTIPLIERS,
};

#[derive(Parser)]
#[command(name = "kaizen", about = "Kaizen live-twin replay engine")]
struct Cli {
    /// Log at DEBUG instead of INFO.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the configuration and bars come from.
#[derive(Args)]
struct Source {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named preset: strict, sampling.
    #[arg(long)]
    preset: Option<String>,

    /// CSV bar file with time,open,high,low,close,volume columns.
    #[arg(long)]
    data: PathBuf,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    out: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay once and export the trade log.
    Run {
        #[command(flatten)]
        source: Source,
    },
    /// Replay in strict mode over several expansion multipliers.
    Sweep {
        #[command(flatten)]
        source: Source,

        /// Comma-separated multipliers. Defaults to 1.5 down to 0.8.
        #[arg(long, value_delimiter = ',')]
        multipliers: Vec<f64>,

        /// Run instances one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Split sampling-mode trades into those strict mode keeps and those it drops.
    Stratify {
        #[command(flatten)]
        source: Source,
    },
    /// Compare the strategy with the same triggers traded in a random direction.
    Null {
        #[command(flatten)]
        source: Source,

        /// Seed for the direction draw. Defaults to the config's null_mode.seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Additional null replays with seeds derived from the seed.
        #[arg(long, default_value_t = 0)]
        trials: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { source } => run_cmd(&source),
        Commands::Sweep {
            source,
            multipliers,
            sequential,
        } => sweep_cmd(&source, multipliers, sequential),
        Commands::Stratify { source } => stratify_cmd(&source),
        Commands::Null {
            source,
            seed,
            trials,
        } => null_cmd(&source, seed, trials),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(source: &Source) -> Result<RunConfig> {
    match (&source.config, source.preset.as_deref()) {
        (Some(_), Some(_)) => bail!("--config and --preset are mutually exclusive"),
        (Some(path), None) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        (None, Some("strict")) | (None, None) => Ok(RunConfig::strict()),
        (None, Some("sampling")) => Ok(RunConfig::sampling()),
        (None, Some(name)) => bail!("unknown preset '{name}'. Valid: strict, sampling"),
    }
}

fn load(source: &Source) -> Result<(RunConfig, Vec<kaizen_core::Bar>)> {
    let config = load_config(source)?;
    let bars = load_bars_csv(&source.data)
        .with_context(|| format!("failed to load bars from {}", source.data.display()))?;
    Ok((config, bars))
}

fn print_saved(paths: &[PathBuf], dir: &Path) {
    println!("Artifacts saved to: {} ({} files)", dir.display(), paths.len());
}

fn run_cmd(source: &Source) -> Result<()> {
    let (config, bars) = load(source)?;
    let result = run_backtest(&bars, &config)?;
    print_summary(&result);
    let paths = save_run_artifacts(&result, &source.out)?;
    print_saved(&paths, &source.out);
    Ok(())
}

fn sweep_cmd(source: &Source, multipliers: Vec<f64>, sequential: bool) -> Result<()> {
    let (config, bars) = load(source)?;
    let multipliers = if multipliers.is_empty() {
        DEFAULT_MULTIPLIERS.to_vec()
    } else {
        multipliers
    };
    let rows = ExpansionSweep::new(multipliers)
        .with_parallelism(!sequential)
        .run(&bars, &config)?;

    println!();
    println!("=== Expansion Sweep ===");
    println!(
        "{:>10} {:>7} {:>10} {:>8} {:>11} {:>9} {:>9}",
        "Multiplier", "Trades", "Trades/Yr", "WinRate", "Total PnL", "Avg PnL", "Max DD"
    );
    for r in &rows {
        println!(
            "{:>10.2} {:>7} {:>10.1} {:>7.1}% {:>11.2} {:>9.2} {:>9.2}",
            r.multiplier,
            r.trades,
            r.trades_per_year,
            r.win_rate * 100.0,
            r.total_pnl,
            r.avg_pnl,
            r.max_drawdown
        );
    }
    if let Some(best) = best_row(&rows) {
        println!("Best total PnL at multiplier {:.2}", best.multiplier);
    }

    let paths = save_sweep_artifacts(&rows, &source.out)?;
    print_saved(&paths, &source.out);
    Ok(())
}

fn stratify_cmd(source: &Source) -> Result<()> {
    let (config, bars) = load(source)?;
    let report = stratify(&bars, &config)?;

    println!();
    println!("=== Survivors vs Dead ===");
    for c in [&report.survivors, &report.dead] {
        println!(
            "{:<9} n={:<5} win={:>5.1}% pnl={:>10.2} age={:>6.1} retests={:>4.2} expansion={:>5.1}%",
            c.cohort.to_string(),
            c.count,
            c.win_rate * 100.0,
            c.total_pnl,
            c.avg_structure_age,
            c.avg_retest_count,
            c.expansion_share * 100.0
        );
    }
    for f in &report.filters {
        println!(
            "{:<9} removed={:<5} win={:>5.1}% baseline={:>5.1}% {}",
            f.gate,
            f.removed_count,
            f.removed_win_rate * 100.0,
            f.baseline_win_rate * 100.0,
            if f.improved() { "IMPROVED" } else { "HURT" }
        );
    }

    let paths = save_stratify_artifacts(&report, &source.out)?;
    print_saved(&paths, &source.out);
    Ok(())
}

fn null_cmd(source: &Source, seed: Option<u64>, trials: u64) -> Result<()> {
    let (config, bars) = load(source)?;
    let seed = seed.unwrap_or(config.null_mode.seed);
    let report = run_null_comparison(&bars, &config, seed)?;

    println!();
    println!("=== Strategy vs Null (seed {seed}) ===");
    for row in std::iter::once(&report.overall).chain(&report.by_session) {
        println!(
            "{:<7} strategy n={:<5} mean={:>8.3}  null n={:<5} mean={:>8.3}  edge={:>+8.3}",
            row.label(),
            row.strategy.n,
            row.strategy.mean,
            row.null.n,
            row.null.mean,
            row.edge
        );
    }

    let mut paths = save_null_artifacts(&report, &source.out)?;
    if trials > 0 {
        let dist = run_null_trials(&bars, &config, seed, trials)?;
        println!(
            "Strategy mean {:.3} beats {:.1}% of {} null trials",
            dist.strategy_mean,
            dist.percentile * 100.0,
            dist.trials.len()
        );
        paths.push(save_null_trials(&dist, &source.out)?);
    }
    print_saved(&paths, &source.out);
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    let s = &result.stats;
    println!();
    println!("=== Replay Result ===");
    println!("Mode:           {}", result.mode);
    if let (Some(first), Some(last)) = (result.first_bar, result.last_bar) {
        println!("Period:         {first} to {last}");
    }
    println!("Bars:           {}", result.bar_count);
    println!(
        "Signals:        {} ({} discarded)",
        result.signal_count, result.discarded_signals
    );
    println!("Trades:         {}", m.trade_count);
    println!(
        "Same-bar stops: {}",
        count_by_reason(&result.trades, ExitReason::StopSameBar)
    );
    println!();
    println!("--- Performance ---");
    println!("Total PnL:      {:.2}", m.total_pnl);
    println!("Avg PnL:        {:.2}", m.avg_pnl);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Max Drawdown:   {:.2}", m.max_drawdown);
    println!("Max Consec Loss:{}", m.max_consecutive_losses);
    println!(
        "95% CI:         [{:.3}, {:.3}]{}",
        s.ci_lower,
        s.ci_upper,
        if s.zero_in_ci { " (includes zero)" } else { "" }
    );
    if result.open_position.is_some() {
        println!();
        println!("NOTE: a position was still open at the end of data");
    }
}
