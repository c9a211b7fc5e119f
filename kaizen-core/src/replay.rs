//! Replay driver: one twin, one simulator, one ordered pass over the bars.
//!
//! Per bar: observe, then execute, then decide. A signal decided at bar t
//! can only fill at bar t+1.

use crate::config::{ConfigError, TwinConfig};
use crate::domain::{Bar, BarError, ClosedTrade, Position, Signal};
use crate::execution::{ExecutionConfig, ExecutionSimulator};
use crate::twin::KaizenTwin;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// A fatal problem with the input feed. The run stops at the offending bar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("bar {index}: {source}")]
    InvalidBar {
        index: usize,
        #[source]
        source: BarError,
    },
    #[error("bar {index}: timestamp {timestamp} does not advance past {previous}")]
    NonMonotonic {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything one replay produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub signals: Vec<Signal>,
    pub trades: Vec<ClosedTrade>,
    pub bar_count: usize,
    /// Position still open when the feed ended; never force-closed.
    pub open_position: Option<Position>,
    /// Signals overwritten by a newer one before they filled.
    pub discarded_signals: usize,
}

impl ReplayResult {
    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}

pub struct Replay {
    twin: KaizenTwin,
    simulator: ExecutionSimulator,
    signals: Vec<Signal>,
    last_timestamp: Option<DateTime<Utc>>,
    bar_count: usize,
}

impl Replay {
    pub fn new(config: TwinConfig) -> Result<Self, ConfigError> {
        let simulator = ExecutionSimulator::new(ExecutionConfig::from(&config));
        Ok(Self {
            twin: KaizenTwin::new(config)?,
            simulator,
            signals: Vec::new(),
            last_timestamp: None,
            bar_count: 0,
        })
    }

    /// Process one bar. On error the replay must not be continued.
    pub fn step(&mut self, bar: &Bar) -> Result<Option<&Signal>, ReplayError> {
        let index = self.bar_count;
        bar.validate()
            .map_err(|source| ReplayError::InvalidBar { index, source })?;
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(ReplayError::NonMonotonic {
                    index,
                    timestamp: bar.timestamp,
                    previous,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        self.bar_count += 1;

        let bar_index = self.twin.observe(bar);
        self.simulator.on_bar(bar_index, bar, &mut self.twin);

        match self.twin.decide(bar) {
            Some(signal) => {
                self.simulator.queue(signal.clone());
                self.signals.push(signal);
                Ok(self.signals.last())
            }
            None => Ok(None),
        }
    }

    pub fn run<'a>(mut self, bars: impl IntoIterator<Item = &'a Bar>) -> Result<ReplayResult, ReplayError> {
        for bar in bars {
            self.step(bar)?;
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> ReplayResult {
        let discarded_signals = self.simulator.discarded();
        let (trades, open_position) = self.simulator.finish();
        if let Some(position) = &open_position {
            warn!(
                direction = %position.direction,
                entry_bar = position.entry_bar,
                "position still open at end of data"
            );
        }
        info!(
            bars = self.bar_count,
            signals = self.signals.len(),
            trades = trades.len(),
            "replay complete"
        );
        ReplayResult {
            signals: self.signals,
            trades,
            bar_count: self.bar_count,
            open_position,
            discarded_signals,
        }
    }

    pub fn twin(&self) -> &KaizenTwin {
        &self.twin
    }

    pub fn simulator(&self) -> &ExecutionSimulator {
        &self.simulator
    }
}

/// Replay `bars` under `config` from a fresh state.
pub fn replay(bars: &[Bar], config: &TwinConfig) -> Result<ReplayResult, ReplayError> {
    Replay::new(config.clone())?.run(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 12, 2, 14, 30, 0).unwrap();
        (0..n)
            .map(|i| Bar {
                timestamp: start + Duration::minutes(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn flat_feed_replays_cleanly() {
        let result = replay(&bars(60), &TwinConfig::sampling()).unwrap();
        assert_eq!(result.bar_count, 60);
        assert!(result.signals.is_empty());
        assert!(result.trades.is_empty());
        assert!(result.open_position.is_none());
    }

    #[test]
    fn repeated_timestamp_is_fatal() {
        let mut feed = bars(10);
        feed[6].timestamp = feed[5].timestamp;
        let err = replay(&feed, &TwinConfig::sampling()).unwrap_err();
        assert!(matches!(err, ReplayError::NonMonotonic { index: 6, .. }));
    }

    #[test]
    fn nan_close_is_fatal_with_index() {
        let mut feed = bars(10);
        feed[3].close = f64::NAN;
        let err = replay(&feed, &TwinConfig::sampling()).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::InvalidBar {
                index: 3,
                source: BarError::NonFinite { field: "close", .. }
            }
        ));
    }

    #[test]
    fn invalid_config_rejected_before_bars() {
        let config = TwinConfig {
            min_tick: -1.0,
            ..TwinConfig::sampling()
        };
        assert!(matches!(
            replay(&bars(5), &config),
            Err(ReplayError::Config(_))
        ));
    }
}
