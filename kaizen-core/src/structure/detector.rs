//! Incremental strict-pivot detector.
//!
//! Per bar, in this order:
//! 1. arm: test the bar `pivot_right` places back against its full window;
//!    a qualifying pivot becomes provisional unless that side already has one
//! 2. invalidate: drop a provisional level the current bar trades through
//! 3. promote: a provisional level aged `confirm_bars` replaces the confirmed one
//! 4. count sweeps of the active levels
//!
//! Invalidation precedes promotion, so a level breached on its confirmation
//! bar never confirms.

use super::pivot::{is_strict_pivot, PivotLevel};
use crate::config::TwinConfig;
use crate::domain::{LevelId, LevelSide};
use crate::indicators::RingBuffer;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct WindowBar {
    index: usize,
    high: f64,
    low: f64,
}

#[derive(Debug, Clone, Default)]
struct SideState {
    provisional: Option<PivotLevel>,
    confirmed: Option<PivotLevel>,
}

impl SideState {
    /// Confirmed wins over provisional.
    fn active(&self) -> Option<&PivotLevel> {
        self.confirmed.as_ref().or(self.provisional.as_ref())
    }

    fn active_mut(&mut self) -> Option<&mut PivotLevel> {
        match self.confirmed {
            Some(ref mut level) => Some(level),
            None => self.provisional.as_mut(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructureDetector {
    pivot_left: usize,
    pivot_right: usize,
    confirm_bars: usize,
    window: RingBuffer<WindowBar>,
    highs: SideState,
    lows: SideState,
}

impl StructureDetector {
    pub fn new(config: &TwinConfig) -> Self {
        Self {
            pivot_left: config.pivot_left,
            pivot_right: config.pivot_right,
            confirm_bars: config.confirm_bars,
            window: RingBuffer::new(config.pivot_left + config.pivot_right + 1),
            highs: SideState::default(),
            lows: SideState::default(),
        }
    }

    pub fn update(&mut self, bar_index: usize, high: f64, low: f64) {
        self.window.push(WindowBar {
            index: bar_index,
            high,
            low,
        });

        if self.window.is_full() {
            self.arm(LevelSide::High);
            self.arm(LevelSide::Low);
        }

        for side in [LevelSide::High, LevelSide::Low] {
            let state = self.side_mut(side);
            if state
                .provisional
                .as_ref()
                .is_some_and(|level| level.is_breached_by(high, low))
            {
                if let Some(level) = state.provisional.take() {
                    debug!(?side, id = %level.id, price = level.price, bar_index, "provisional level invalidated");
                }
            }
        }

        let confirm_bars = self.confirm_bars;
        for side in [LevelSide::High, LevelSide::Low] {
            let state = self.side_mut(side);
            let due = state
                .provisional
                .as_ref()
                .is_some_and(|level| level.age(bar_index) >= confirm_bars);
            if due {
                if let Some(mut level) = state.provisional.take() {
                    level.confirm(bar_index);
                    debug!(?side, id = %level.id, price = level.price, bar_index, "level confirmed");
                    state.confirmed = Some(level);
                }
            }
        }

        for side in [LevelSide::High, LevelSide::Low] {
            if let Some(level) = self.side_mut(side).active_mut() {
                if level.is_breached_by(high, low) {
                    level.sweeps += 1;
                }
            }
        }
    }

    fn arm(&mut self, side: LevelSide) {
        if self.side(side).provisional.is_some() {
            return;
        }
        let Some(candidate) = self.window.back(self.pivot_right).copied() else {
            return;
        };
        let value = |bar: &WindowBar| match side {
            LevelSide::High => bar.high,
            LevelSide::Low => bar.low,
        };
        let neighbors = self
            .window
            .iter()
            .filter(|bar| bar.index != candidate.index)
            .map(value);
        let price = value(&candidate);
        if is_strict_pivot(side, price, neighbors) {
            debug!(?side, origin = candidate.index, price, "provisional level armed");
            self.side_mut(side).provisional = Some(PivotLevel::provisional(side, candidate.index, price));
        }
    }

    fn side(&self, side: LevelSide) -> &SideState {
        match side {
            LevelSide::High => &self.highs,
            LevelSide::Low => &self.lows,
        }
    }

    fn side_mut(&mut self, side: LevelSide) -> &mut SideState {
        match side {
            LevelSide::High => &mut self.highs,
            LevelSide::Low => &mut self.lows,
        }
    }

    /// The level signals are tested against: confirmed if any, else provisional.
    pub fn active(&self, side: LevelSide) -> Option<&PivotLevel> {
        self.side(side).active()
    }

    pub fn active_high(&self) -> Option<(f64, LevelId)> {
        self.active(LevelSide::High).map(|l| (l.price, l.id))
    }

    pub fn active_low(&self) -> Option<(f64, LevelId)> {
        self.active(LevelSide::Low).map(|l| (l.price, l.id))
    }

    pub fn provisional(&self, side: LevelSide) -> Option<&PivotLevel> {
        self.side(side).provisional.as_ref()
    }

    pub fn confirmed(&self, side: LevelSide) -> Option<&PivotLevel> {
        self.side(side).confirmed.as_ref()
    }

    /// Flag the active level on `side` as consumed. Returns false if `id` is no longer active.
    pub fn mark_used(&mut self, side: LevelSide, id: LevelId) -> bool {
        match self.side_mut(side).active_mut() {
            Some(level) if level.id == id => {
                level.used = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LevelStatus;

    /// Flat highs at 101, lows at 99, with a V-shaped dip bottoming at `pivot`.
    fn v_lows(n: usize, pivot: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| {
                let dist = i.abs_diff(pivot);
                let low = if dist <= 4 { 97.0 + 0.5 * dist as f64 } else { 99.0 };
                (101.0, low)
            })
            .collect()
    }

    fn feed(detector: &mut StructureDetector, bars: &[(f64, f64)]) {
        for (i, (h, l)) in bars.iter().enumerate() {
            detector.update(i, *h, *l);
        }
    }

    #[test]
    fn low_is_armed_after_right_bars_and_confirmed_at_age() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        let bars = v_lows(30, 10);

        feed(&mut detector, &bars[..15]);
        assert!(detector.provisional(LevelSide::Low).is_none());

        detector.update(15, bars[15].0, bars[15].1);
        let level = detector.provisional(LevelSide::Low).unwrap();
        assert_eq!(level.id, LevelId(10));
        assert_eq!(level.price, 97.0);

        for (i, (h, l)) in bars.iter().enumerate().take(25).skip(16) {
            detector.update(i, *h, *l);
        }
        assert_eq!(detector.provisional(LevelSide::Low).map(|l| l.id), Some(LevelId(10)));
        assert!(detector.confirmed(LevelSide::Low).is_none());

        detector.update(25, bars[25].0, bars[25].1);
        let confirmed = detector.confirmed(LevelSide::Low).unwrap();
        assert_eq!(confirmed.status, LevelStatus::Confirmed);
        assert_eq!(confirmed.confirmed_at, Some(25));
        assert!(detector.provisional(LevelSide::Low).is_none());
        assert_eq!(detector.active_low(), Some((97.0, LevelId(10))));
    }

    #[test]
    fn flat_series_has_no_pivots() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        feed(&mut detector, &vec![(101.0, 99.0); 40]);
        assert!(detector.active_high().is_none());
        assert!(detector.active_low().is_none());
    }

    #[test]
    fn provisional_low_is_invalidated_by_lower_low() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        let mut bars = v_lows(30, 10);
        bars[20].1 = 96.5;
        feed(&mut detector, &bars[..20]);
        assert!(detector.provisional(LevelSide::Low).is_some());
        detector.update(20, bars[20].0, bars[20].1);
        assert!(detector.provisional(LevelSide::Low).is_none());
        feed_from(&mut detector, &bars, 21);
        assert!(detector.confirmed(LevelSide::Low).is_none());
    }

    fn feed_from(detector: &mut StructureDetector, bars: &[(f64, f64)], start: usize) {
        for (i, (h, l)) in bars.iter().enumerate().skip(start) {
            detector.update(i, *h, *l);
        }
    }

    #[test]
    fn confirmed_level_survives_breach_and_counts_sweeps() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        let mut bars = v_lows(40, 10);
        bars[30].1 = 96.0;
        bars[32].1 = 96.5;
        feed(&mut detector, &bars);
        let level = detector.confirmed(LevelSide::Low).unwrap();
        assert_eq!(level.id, LevelId(10));
        assert_eq!(level.sweeps, 2);
    }

    #[test]
    fn second_candidate_waits_while_one_is_armed() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        let mut bars = v_lows(40, 10);
        // Another, shallower dip at 18 while 10 is still provisional.
        bars[17].1 = 98.5;
        bars[18].1 = 98.0;
        bars[19].1 = 98.5;
        feed(&mut detector, &bars[..24]);
        assert_eq!(detector.provisional(LevelSide::Low).map(|l| l.id), Some(LevelId(10)));
    }

    #[test]
    fn newer_confirmation_supersedes() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        let first = v_lows(30, 10);
        let mut bars = first.clone();
        // A second V, bottoming at 40 above the first level, confirmed at 55.
        for i in 30..60usize {
            let dist = i.abs_diff(40);
            let low = if dist <= 4 { 97.5 + 0.25 * dist as f64 } else { 99.0 };
            bars.push((101.0, low));
        }
        feed(&mut detector, &bars);
        let level = detector.confirmed(LevelSide::Low).unwrap();
        assert_eq!(level.id, LevelId(40));
        assert_eq!(level.price, 97.5);
    }

    #[test]
    fn mark_used_only_hits_active_level() {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        feed(&mut detector, &v_lows(30, 10));
        assert!(!detector.mark_used(LevelSide::Low, LevelId(3)));
        assert!(detector.mark_used(LevelSide::Low, LevelId(10)));
        assert!(detector.active(LevelSide::Low).unwrap().used);
    }
}
