//! Signals: directional intent decided at a bar close, filled at the next open.

use super::ids::LevelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Which side of structure a level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelSide {
    High,
    Low,
}

/// Lifecycle status of a pivot level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelStatus {
    Provisional,
    Confirmed,
}

/// Structural context captured when a signal fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContext {
    pub level_id: LevelId,
    pub level_side: LevelSide,
    pub level_price: f64,
    pub level_status: LevelStatus,
    /// Bars between the level's origin and the signal bar.
    pub structure_age: usize,
    /// Sweeps of this level seen before the triggering bar.
    pub retest_count: u32,
    /// How far the close sits back inside the level (positive = inside).
    pub reclaim_depth: f64,
    /// Whether an expansion regime was active at the signal bar.
    pub is_expansion: bool,
}

/// A trade signal emitted at a bar close.
///
/// `direction` is what the simulator trades; `structural_direction` is what the
/// sweep implied. They only differ in null mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub structural_direction: Direction,
    /// Protective stop reference price on the structural side.
    pub stop: f64,
    /// Smoothed true range at emission.
    pub atr: f64,
    pub context: SignalContext,
}

impl Signal {
    pub fn is_randomized(&self) -> bool {
        self.direction != self.structural_direction
    }
}
