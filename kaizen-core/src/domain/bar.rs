//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-interval OHLCV bar, already normalized to UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Reasons a single bar is unusable by the replay engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("non-finite {field} value {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("high {high} is below low {low}")]
    InvertedRange { high: f64, low: f64 },
    #[error("negative volume {0}")]
    NegativeVolume(f64),
}

impl Bar {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Structural integrity check: finite OHLCV, high >= low, volume >= 0.
    ///
    /// Open/close outside [low, high] is tolerated; vendors disagree on that
    /// and the engine only relies on the range for stop/target checks.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if !value.is_finite() {
                return Err(BarError::NonFinite { field, value });
            }
        }
        if self.high < self.low {
            return Err(BarError::InvertedRange {
                high: self.high,
                low: self.low,
            });
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume));
        }
        Ok(())
    }
}
