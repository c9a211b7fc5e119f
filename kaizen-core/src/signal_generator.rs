//! Sweep-and-reclaim trigger evaluated at each bar close.
//!
//! A sweep trades through the active level; a reclaim closes back within
//! `reclaim_tolerance_atr` ATRs of it. The high side is tested first and the
//! low side only when the high side did not fire, so one bar yields at most
//! one signal.

use crate::config::TwinConfig;
use crate::domain::{Bar, Direction, LevelSide, Signal, SignalContext};
use crate::indicators::IndicatorSnapshot;
use crate::structure::{PivotLevel, StructureDetector};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SweepSignalGenerator {
    reclaim_tolerance_atr: f64,
    stop_buffer_atr: f64,
    usage_gate: bool,
}

impl SweepSignalGenerator {
    pub fn new(config: &TwinConfig) -> Self {
        Self {
            reclaim_tolerance_atr: config.reclaim_tolerance_atr,
            stop_buffer_atr: config.stop_buffer_atr,
            usage_gate: config.gates.usage,
        }
    }

    /// Test the active levels against the bar just closed.
    ///
    /// The caller has already established that gates permit trading. A level
    /// that fires is marked used on the detector. The returned signal trades
    /// the structural direction; null mode rewrites `direction` afterwards.
    pub fn evaluate(
        &self,
        bar_index: usize,
        bar: &Bar,
        snapshot: &IndicatorSnapshot,
        structure: &mut StructureDetector,
        is_expansion: bool,
    ) -> Option<Signal> {
        let signal = [LevelSide::High, LevelSide::Low].into_iter().find_map(|side| {
            let level = structure.active(side)?;
            self.trigger(bar_index, bar, snapshot, level, is_expansion)
        })?;

        structure.mark_used(signal.context.level_side, signal.context.level_id);
        debug!(
            bar_index,
            direction = %signal.direction,
            level = %signal.context.level_id,
            level_price = signal.context.level_price,
            stop = signal.stop,
            "signal emitted"
        );
        Some(signal)
    }

    fn trigger(
        &self,
        bar_index: usize,
        bar: &Bar,
        snapshot: &IndicatorSnapshot,
        level: &PivotLevel,
        is_expansion: bool,
    ) -> Option<Signal> {
        if self.usage_gate && level.used {
            return None;
        }
        if !level.is_breached_by(bar.high, bar.low) {
            return None;
        }

        let atr = snapshot.atr;
        let tolerance = atr * self.reclaim_tolerance_atr;
        let buffer = atr * self.stop_buffer_atr;
        let (direction, stop, reclaim_depth) = match level.side {
            LevelSide::High => {
                if bar.close > level.price + tolerance {
                    return None;
                }
                (Direction::Short, level.price + buffer, level.price - bar.close)
            }
            LevelSide::Low => {
                if bar.close < level.price - tolerance {
                    return None;
                }
                (Direction::Long, level.price - buffer, bar.close - level.price)
            }
        };

        Some(Signal {
            bar_index,
            timestamp: bar.timestamp,
            direction,
            structural_direction: direction,
            stop,
            atr,
            context: SignalContext {
                level_id: level.id,
                level_side: level.side,
                level_price: level.price,
                level_status: level.status,
                structure_age: level.age(bar_index),
                // The triggering bar is itself counted as a sweep.
                retest_count: level.sweeps.saturating_sub(1),
                reclaim_depth,
                is_expansion,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LevelId;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 12, 2, 15, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    fn snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            bar_index: 30,
            atr: 2.0,
            volume_ma: 100.0,
        }
    }

    /// Detector with a confirmed high at 103 (origin 10) and low at 97 (origin 12).
    fn structured() -> StructureDetector {
        let mut detector = StructureDetector::new(&TwinConfig::default());
        for i in 0..30usize {
            let high = if i == 10 { 103.0 } else { 101.0 };
            let low = if i == 12 { 97.0 } else { 99.0 };
            detector.update(i, high, low);
        }
        detector
    }

    #[test]
    fn sweep_of_high_with_reclaim_is_short() {
        let generator = SweepSignalGenerator::new(&TwinConfig::sampling());
        let mut detector = structured();
        let swept = bar(103.5, 100.0, 103.05);
        detector.update(30, swept.high, swept.low);

        let signal = generator
            .evaluate(30, &swept, &snapshot(), &mut detector, false)
            .unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert_eq!(signal.context.level_id, LevelId(10));
        assert!((signal.stop - 103.5).abs() < 1e-12);
        assert_eq!(signal.context.structure_age, 20);
        assert_eq!(signal.context.retest_count, 0);
        assert!(detector.active(LevelSide::High).unwrap().used);
    }

    #[test]
    fn close_beyond_tolerance_is_no_signal() {
        let generator = SweepSignalGenerator::new(&TwinConfig::sampling());
        let mut detector = structured();
        // tolerance is 0.1 above 103
        let breakout = bar(104.0, 100.0, 103.2);
        detector.update(30, breakout.high, breakout.low);
        assert!(generator
            .evaluate(30, &breakout, &snapshot(), &mut detector, false)
            .is_none());
    }

    #[test]
    fn high_side_wins_when_both_fire() {
        let generator = SweepSignalGenerator::new(&TwinConfig::sampling());
        let mut detector = structured();
        let outside = bar(103.5, 96.5, 100.0);
        detector.update(30, outside.high, outside.low);
        let signal = generator
            .evaluate(30, &outside, &snapshot(), &mut detector, false)
            .unwrap();
        assert_eq!(signal.direction, Direction::Short);
        assert!(!detector.active(LevelSide::Low).unwrap().used);
    }

    #[test]
    fn used_level_fires_once() {
        let generator = SweepSignalGenerator::new(&TwinConfig::sampling());
        let mut detector = structured();
        let swept = bar(98.0, 96.5, 97.5);
        detector.update(30, swept.high, swept.low);
        let first = generator
            .evaluate(30, &swept, &snapshot(), &mut detector, false)
            .unwrap();
        assert_eq!(first.direction, Direction::Long);
        assert!((first.stop - 96.5).abs() < 1e-12);

        detector.update(31, swept.high, swept.low);
        assert!(generator
            .evaluate(31, &swept, &snapshot(), &mut detector, false)
            .is_none());
    }

    #[test]
    fn disabled_usage_gate_allows_refire_and_counts_retests() {
        let mut config = TwinConfig::sampling();
        config.gates.usage = false;
        let generator = SweepSignalGenerator::new(&config);
        let mut detector = structured();
        let swept = bar(98.0, 96.5, 97.5);
        detector.update(30, swept.high, swept.low);
        assert!(generator
            .evaluate(30, &swept, &snapshot(), &mut detector, false)
            .is_some());
        detector.update(31, swept.high, swept.low);
        let again = generator
            .evaluate(31, &swept, &snapshot(), &mut detector, true)
            .unwrap();
        assert_eq!(again.context.retest_count, 1);
        assert!(again.context.is_expansion);
    }
}
