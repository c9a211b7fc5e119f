//! ClosedTrade: an immutable record in the trade log.

use super::signal::{Direction, SignalContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Stop,
    Target,
    Reversal,
    /// Stop touched within the bar that filled the entry.
    StopSameBar,
    /// Target touched within the bar that filled the entry.
    TargetSameBar,
}

impl ExitReason {
    pub fn is_stop(&self) -> bool {
        matches!(self, ExitReason::Stop | ExitReason::StopSameBar)
    }

    pub fn is_target(&self) -> bool {
        matches!(self, ExitReason::Target | ExitReason::TargetSameBar)
    }

    pub fn is_same_bar(&self) -> bool {
        matches!(self, ExitReason::StopSameBar | ExitReason::TargetSameBar)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Stop => "STOP",
            ExitReason::Target => "TARGET",
            ExitReason::Reversal => "REVERSAL",
            ExitReason::StopSameBar => "STOP_SAME_BAR",
            ExitReason::TargetSameBar => "TARGET_SAME_BAR",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed trade: entry at some bar's open, exit on stop, target or reversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub exit_time: DateTime<Utc>,
    pub pnl: f64,
    pub reason: ExitReason,

    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub stop: f64,
    pub target: f64,
    pub context: SignalContext,
}

impl ClosedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}
