use super::signal::{Direction, SignalContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single open position held by the execution simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop: f64,
    pub target: f64,
    /// Context of the signal that opened this position.
    pub context: SignalContext,
}

impl Position {
    /// Realized PnL if closed at `exit_price`.
    pub fn pnl_at(&self, exit_price: f64, point_value: f64) -> f64 {
        (exit_price - self.entry_price) * self.direction.sign() * point_value
    }

    /// True when this bar's range reaches the stop.
    pub fn stop_touched(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.stop,
            Direction::Short => high >= self.stop,
        }
    }

    /// True when this bar's range reaches the target.
    pub fn target_touched(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Long => high >= self.target,
            Direction::Short => low <= self.target,
        }
    }
}
