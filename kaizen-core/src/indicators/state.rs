//! Per-run indicator state: bar ring buffer, Wilder ATR, volume average.

use super::atr::{true_range, WilderAtr};
use super::ring::RingBuffer;
use crate::config::TwinConfig;
use crate::domain::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fields of a bar the twin keeps in its rolling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSample {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Indicator values at one bar, only produced once warm-up is complete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub bar_index: usize,
    /// Smoothed true range.
    pub atr: f64,
    /// Simple mean of the last `volume_period` volumes.
    pub volume_ma: f64,
}

#[derive(Debug, Clone)]
pub struct IndicatorState {
    window: RingBuffer<BarSample>,
    atr: WilderAtr,
    prev_close: Option<f64>,
    next_index: usize,
    min_history: usize,
    volume_period: usize,
}

impl IndicatorState {
    pub fn new(config: &TwinConfig) -> Self {
        Self {
            window: RingBuffer::new(config.buffer_capacity()),
            atr: WilderAtr::new(config.atr_period),
            prev_close: None,
            next_index: 0,
            min_history: config.min_history,
            volume_period: config.volume_period,
        }
    }

    /// Advance by one bar. `None` means indicators are still warming up.
    pub fn update(&mut self, bar: &Bar) -> Option<IndicatorSnapshot> {
        let index = self.next_index;
        self.next_index += 1;

        self.window.push(BarSample {
            index,
            timestamp: bar.timestamp,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        });

        let tr = true_range(bar.high, bar.low, self.prev_close);
        self.prev_close = Some(bar.close);
        let atr = self.atr.update(tr);

        if self.window.len() < self.min_history {
            return None;
        }
        let atr = atr?;

        Some(IndicatorSnapshot {
            bar_index: index,
            atr,
            volume_ma: self.volume_ma(),
        })
    }

    fn volume_ma(&self) -> f64 {
        let n = self.volume_period.min(self.window.len());
        if n == 0 {
            return 0.0;
        }
        self.window.last_n(n).map(|s| s.volume).sum::<f64>() / n as f64
    }

    /// Index of the most recent bar, `None` before the first update.
    pub fn bar_index(&self) -> Option<usize> {
        self.next_index.checked_sub(1)
    }

    pub fn atr(&self) -> Option<f64> {
        self.atr.value()
    }

    pub fn window(&self) -> &RingBuffer<BarSample> {
        &self.window
    }
}
