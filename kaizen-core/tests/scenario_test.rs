//! End-to-end scenarios on hand-built one-minute bars.
//!
//! The main scenario: a V-shaped dip with its low at bar 10 is armed at bar 15
//! and confirmed at bar 25; bar 30 sweeps it and closes back above, giving one
//! LONG decided at bar 30 and filled at bar 31's open.

use chrono::{DateTime, Duration, TimeZone, Utc};
use kaizen_core::domain::{LevelId, LevelSide, LevelStatus};
use kaizen_core::{Bar, Direction, ExitReason, KaizenTwin, Replay, TwinConfig};

fn minute(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 2, 15, 0, 0).unwrap() + Duration::minutes(i as i64)
}

fn flat_bar(i: usize) -> Bar {
    Bar {
        timestamp: minute(i),
        open: 100.0,
        high: 101.0,
        low: 99.0,
        close: 100.0,
        volume: 100.0,
    }
}

fn scenario_bars() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..50).map(flat_bar).collect();

    let dip = [98.5, 98.0, 97.5, 97.2, 97.0, 97.2, 97.5, 98.0, 98.5];
    for (offset, low) in dip.iter().enumerate() {
        bars[6 + offset].low = *low;
    }

    // Sweep of the confirmed low with a reclaim.
    bars[30].open = 99.5;
    bars[30].low = 96.5;
    bars[30].close = 97.5;

    bars[31].open = 97.6;
    bars[31].high = 98.0;
    bars[31].low = 97.4;
    bars[31].close = 97.7;

    for bar in bars.iter_mut().skip(32) {
        bar.open = 97.7;
        bar.high = 98.0;
        bar.low = 97.4;
        bar.close = 97.7;
    }
    bars[40].high = 105.0;
    bars
}

/// Independent Wilder ATR(14) over the whole series, `None` before bar 13.
fn reference_atr(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    let mut trs = Vec::new();
    let mut atr: Option<f64> = None;
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            let pc = bars[i - 1].close;
            (bar.high - bar.low)
                .max((bar.high - pc).abs())
                .max((bar.low - pc).abs())
        };
        atr = match atr {
            None => {
                trs.push(tr);
                if trs.len() == 14 {
                    Some(trs.iter().sum::<f64>() / 14.0)
                } else {
                    None
                }
            }
            Some(prev) => Some((prev * 13.0 + tr) / 14.0),
        };
        out.push(atr);
    }
    out
}

#[test]
fn confirmed_low_sweep_produces_single_long() {
    let bars = scenario_bars();
    let mut replay = Replay::new(TwinConfig::sampling()).unwrap();

    for bar in &bars[..25] {
        replay.step(bar).unwrap();
    }
    let provisional = replay.twin().structure().provisional(LevelSide::Low).unwrap();
    assert_eq!(provisional.id, LevelId(10));
    assert_eq!(provisional.price, 97.0);
    assert!(replay.twin().structure().confirmed(LevelSide::Low).is_none());

    replay.step(&bars[25]).unwrap();
    let confirmed = replay.twin().structure().confirmed(LevelSide::Low).unwrap();
    assert_eq!(confirmed.id, LevelId(10));
    assert_eq!(confirmed.status, LevelStatus::Confirmed);

    for bar in &bars[26..] {
        replay.step(bar).unwrap();
    }
    let result = replay.finish();

    assert_eq!(result.signals.len(), 1);
    let signal = &result.signals[0];
    let atr = reference_atr(&bars)[30].unwrap();
    assert_eq!(signal.bar_index, 30);
    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.context.level_id, LevelId(10));
    assert_eq!(signal.context.structure_age, 20);
    assert!((signal.atr - atr).abs() < 1e-9);
    assert!((signal.stop - (97.0 - 0.25 * atr)).abs() < 1e-9);

    let fill = 97.6;
    let risk = (fill - signal.stop).abs().max(0.25 * 5.0);
    let target = fill + 2.0 * risk;

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.entry_bar, 31);
    assert_eq!(trade.entry_price, fill);
    assert!((trade.stop - signal.stop).abs() < 1e-12);
    assert!((trade.target - target).abs() < 1e-9);
    assert_eq!(trade.reason, ExitReason::Target);
    assert_eq!(trade.exit_bar, 40);
    assert_eq!(trade.exit_time, minute(40));
    assert!((trade.pnl - (target - fill) * 2.0).abs() < 1e-9);
    assert!(result.open_position.is_none());
}

#[test]
fn thirteen_bars_never_warm_up() {
    let mut twin = KaizenTwin::new(TwinConfig::sampling()).unwrap();
    let mut signals = 0;
    for i in 0..13 {
        if twin.on_bar_close(&flat_bar(i)).is_some() {
            signals += 1;
        }
        assert!(twin.snapshot().is_none(), "indicators available at bar {i}");
    }
    assert_eq!(signals, 0);
}

#[test]
fn strict_mode_blocks_scenario_outside_session() {
    // 15:00 UTC on 2024-12-02 is 10:00 New York, inside the session; shift the
    // whole feed to 03:00 UTC (22:00 New York) and the signal disappears.
    let bars: Vec<Bar> = scenario_bars()
        .into_iter()
        .map(|mut b| {
            b.timestamp = b.timestamp - Duration::hours(12);
            b
        })
        .collect();
    let config = TwinConfig::sampling().with_gates(kaizen_core::GateToggles {
        session: true,
        ..kaizen_core::GateToggles::sampling()
    });
    let result = kaizen_core::replay(&bars, &config).unwrap();
    assert!(result.signals.is_empty());
    assert!(result.trades.is_empty());

    let in_session = kaizen_core::replay(&scenario_bars(), &config).unwrap();
    assert_eq!(in_session.signals.len(), 1);
}
