//! Execution simulator integration: tie-breaks, reversal accounting and the
//! loss notification path back into the twin's cooldown gate.

use chrono::{DateTime, Duration, TimeZone, Utc};
use kaizen_core::domain::{LevelId, LevelSide, LevelStatus, SignalContext};
use kaizen_core::execution::{ExecutionConfig, ExecutionSimulator};
use kaizen_core::gates::LossListener;
use kaizen_core::{Bar, Direction, ExitReason, GateToggles, KaizenTwin, Signal, TwinConfig};

struct NoLosses;

impl LossListener for NoLosses {
    fn record_loss(&mut self, _timestamp: DateTime<Utc>) {}
}

fn ts(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 2, 15, 0, 0).unwrap() + Duration::minutes(i as i64)
}

fn bar(i: usize, open: f64, high: f64, low: f64) -> Bar {
    Bar {
        timestamp: ts(i),
        open,
        high,
        low,
        close: open,
        volume: 1000.0,
    }
}

fn signal(direction: Direction, stop: f64) -> Signal {
    Signal {
        bar_index: 0,
        timestamp: ts(0),
        direction,
        structural_direction: direction,
        stop,
        atr: 4.0,
        context: SignalContext {
            level_id: LevelId(0),
            level_side: match direction {
                Direction::Long => LevelSide::Low,
                Direction::Short => LevelSide::High,
            },
            level_price: stop,
            level_status: LevelStatus::Confirmed,
            structure_age: 20,
            retest_count: 0,
            reclaim_depth: 0.5,
            is_expansion: false,
        },
    }
}

fn simulator() -> ExecutionSimulator {
    ExecutionSimulator::new(ExecutionConfig::from(&TwinConfig::default()))
}

#[test]
fn bar_touching_stop_and_target_is_a_stop() {
    for (direction, stop, tie) in [
        (Direction::Long, 98.0, bar(2, 100.0, 110.0, 90.0)),
        (Direction::Short, 102.0, bar(2, 100.0, 110.0, 90.0)),
    ] {
        let mut sim = simulator();
        sim.queue(signal(direction, stop));
        sim.on_bar(1, &bar(1, 100.0, 100.5, 99.5), &mut NoLosses);
        let pos = sim.position().unwrap().clone();
        assert!(tie.low <= pos.stop.min(pos.target) && tie.high >= pos.stop.max(pos.target));

        let closed = sim.on_bar(2, &tie, &mut NoLosses).to_vec();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].reason, ExitReason::Stop, "{direction}");
        assert_eq!(closed[0].exit_price, stop);
    }
}

#[test]
fn same_bar_tie_is_a_stop() {
    let mut sim = simulator();
    sim.queue(signal(Direction::Short, 102.0));
    let closed = sim.on_bar(1, &bar(1, 100.0, 120.0, 80.0), &mut NoLosses).to_vec();
    assert_eq!(closed[0].reason, ExitReason::StopSameBar);
    assert_eq!(closed[0].pnl, -4.0);
}

#[test]
fn reversal_pnl_is_signed_fill_delta() {
    for (first, second, entry, fill) in [
        (Direction::Long, Direction::Short, 100.0, 103.0),
        (Direction::Long, Direction::Short, 100.0, 98.5),
        (Direction::Short, Direction::Long, 100.0, 97.0),
        (Direction::Short, Direction::Long, 100.0, 101.5),
    ] {
        let mut sim = simulator();
        let far = 50.0 * -first.sign();
        sim.queue(signal(first, entry + far));
        sim.on_bar(1, &bar(1, entry, entry, entry), &mut NoLosses);

        sim.queue(signal(second, fill - second.sign() * 50.0));
        let closed = sim.on_bar(2, &bar(2, fill, fill, fill), &mut NoLosses).to_vec();

        assert_eq!(closed.len(), 1, "{first} -> {second}");
        assert_eq!(closed[0].reason, ExitReason::Reversal);
        assert_eq!(closed[0].pnl, (fill - entry) * first.sign() * 2.0);
        assert_eq!(sim.position().unwrap().direction, second);
        assert_eq!(sim.position().unwrap().entry_price, fill);
    }
}

#[test]
fn reversal_bar_can_yield_two_records() {
    let mut sim = simulator();
    sim.queue(signal(Direction::Long, 98.0));
    sim.on_bar(1, &bar(1, 100.0, 100.5, 99.5), &mut NoLosses);

    sim.queue(signal(Direction::Short, 101.5));
    let closed = sim.on_bar(2, &bar(2, 101.0, 103.0, 100.8), &mut NoLosses).to_vec();
    let reasons: Vec<_> = closed.iter().map(|t| t.reason).collect();
    assert_eq!(reasons, vec![ExitReason::Reversal, ExitReason::StopSameBar]);
    assert!(closed.iter().all(|t| t.exit_time == ts(2)));
    assert_eq!(sim.trades().len(), 2);
}

#[test]
fn stop_arms_twin_cooldown() {
    let gates = GateToggles {
        cooldown: true,
        ..GateToggles::sampling()
    };
    let mut twin = KaizenTwin::new(TwinConfig::default().with_gates(gates)).unwrap();
    let mut sim = simulator();

    sim.queue(signal(Direction::Long, 98.0));
    sim.on_bar(1, &bar(1, 100.0, 100.5, 99.5), &mut twin);
    assert!(twin.gates().last_loss().is_none());

    sim.on_bar(2, &bar(2, 99.0, 99.5, 97.0), &mut twin);
    assert_eq!(twin.gates().last_loss(), Some(ts(2)));
    assert!(!twin.gates().can_trade(ts(16), 16));
    assert!(twin.gates().can_trade(ts(17), 17));
}

#[test]
fn open_position_is_reported_not_closed() {
    let mut sim = simulator();
    sim.queue(signal(Direction::Long, 98.0));
    sim.on_bar(1, &bar(1, 100.0, 100.5, 99.5), &mut NoLosses);
    let (trades, open) = sim.finish();
    assert!(trades.is_empty());
    assert_eq!(open.unwrap().entry_price, 100.0);
}
