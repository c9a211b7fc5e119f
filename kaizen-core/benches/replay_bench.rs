//! Criterion benchmarks for the replay hot path.
//!
//! 1. Full replay (twin + simulator) in sampling and strict mode
//! 2. Twin bar-close alone, without execution

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kaizen_core::{replay, Bar, KaizenTwin, TwinConfig};

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 5000.0 + (t * 0.05).sin() * 20.0 + (t * 0.31).sin() * 4.0;
            let open = close - (t * 0.7).cos();
            Bar {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0 + (t * 0.13).sin().abs(),
                low: open.min(close) - 1.0 - (t * 0.17).cos().abs(),
                close,
                volume: 1000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    for &n in &[10_000usize, 100_000] {
        let bars = make_bars(n);
        for (label, config) in [("sampling", TwinConfig::sampling()), ("strict", TwinConfig::strict())] {
            group.bench_with_input(BenchmarkId::new(label, n), &bars, |b, bars| {
                b.iter(|| replay(black_box(bars), &config).map(|r| r.trades.len()))
            });
        }
    }
    group.finish();
}

fn bench_twin(c: &mut Criterion) {
    let bars = make_bars(50_000);
    c.bench_function("twin_on_bar_close_50k", |b| {
        b.iter(|| {
            let mut twin = match KaizenTwin::new(TwinConfig::sampling()) {
                Ok(twin) => twin,
                Err(_) => return 0,
            };
            bars.iter()
                .filter(|bar| twin.on_bar_close(black_box(bar)).is_some())
                .count()
        })
    });
}

criterion_group!(benches, bench_replay, bench_twin);
criterion_main!(benches);
