//! Expansion regime: a volatility/volume burst suppresses entries for a fixed
//! number of bars.

use crate::domain::Bar;
use crate::indicators::IndicatorSnapshot;

/// Tracks the bar index until which the expansion regime is active.
#[derive(Debug, Clone)]
pub struct ExpansionRegime {
    mult: f64,
    bars: usize,
    floor: f64,
    active_until: usize,
}

impl ExpansionRegime {
    pub fn new(mult: f64, bars: usize, floor: f64) -> Self {
        Self {
            mult,
            bars,
            floor,
            active_until: 0,
        }
    }

    /// An expansion event: ATR above the floor, range >= mult × ATR, volume >= its average.
    pub fn is_event(&self, bar: &Bar, snapshot: &IndicatorSnapshot) -> bool {
        snapshot.atr >= self.floor
            && bar.range() >= self.mult * snapshot.atr
            && bar.volume >= snapshot.volume_ma
    }

    /// Test the bar and extend the regime on an event.
    pub fn observe(&mut self, bar_index: usize, bar: &Bar, snapshot: &IndicatorSnapshot) -> bool {
        let event = self.is_event(bar, snapshot);
        if event {
            self.active_until = bar_index + self.bars;
        }
        event
    }

    pub fn is_active(&self, bar_index: usize) -> bool {
        bar_index < self.active_until
    }

    pub fn active_until(&self) -> usize {
        self.active_until
    }
}
