//! Criterion benchmarks for IntraLab hot paths.
//!
//! Benchmarks:
//! 1. Replay loop over synthetic sessions (batch `run`)
//! 2. Streaming `Simulator::push`
//! 3. Effective-stop computation
//! 4. Ledger aggregation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use intralab_core::components::compute_effective_stop;
use intralab_core::config::StrategyConfig;
use intralab_core::engine::{run, Simulator};
use intralab_core::summary::{summarize, summarize_latest};
use intralab_core::synthetic::{synthetic_session_bars, SyntheticSpec};

fn bars_for(days: u32) -> Vec<intralab_core::domain::Bar> {
    synthetic_session_bars(&SyntheticSpec {
        days,
        ..Default::default()
    })
}

// ── 1. Replay loop ───────────────────────────────────────────────────

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    let config = StrategyConfig::default();

    for days in [30_u32, 180, 365] {
        let bars = bars_for(days);
        group.bench_with_input(BenchmarkId::new("run", bars.len()), &bars, |b, bars| {
            b.iter(|| run(black_box(bars), black_box(&config)))
        });
    }
    group.finish();
}

// ── 2. Streaming push ────────────────────────────────────────────────

fn bench_streaming(c: &mut Criterion) {
    let bars = bars_for(180);
    let config = StrategyConfig::default();

    c.bench_function("simulator_push_180d", |b| {
        b.iter(|| {
            let mut sim = Simulator::new(config.clone());
            for bar in &bars {
                let _ = black_box(sim.push(bar));
            }
            sim.finish()
        })
    });
}

// ── 3. Effective stop ────────────────────────────────────────────────

fn bench_effective_stop(c: &mut Criterion) {
    let config = StrategyConfig::default();
    c.bench_function("effective_stop_1000", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1000 {
                acc += compute_effective_stop(100.0, black_box(100.0 + i as f64 * 0.03), &config);
            }
            acc
        })
    });
}

// ── 4. Aggregation ───────────────────────────────────────────────────

fn bench_summarize(c: &mut Criterion) {
    let ledger = match run(&bars_for(365), &StrategyConfig::default()) {
        Ok(ledger) => ledger,
        Err(err) => panic!("synthetic replay failed: {err}"),
    };
    let as_of = summarize_latest(&ledger).rolling.as_of;

    c.bench_function("summarize_365d", |b| {
        b.iter(|| match as_of {
            Some(as_of) => summarize(black_box(&ledger), as_of),
            None => summarize_latest(black_box(&ledger)),
        })
    });
}

criterion_group!(
    benches,
    bench_replay,
    bench_streaming,
    bench_effective_stop,
    bench_summarize,
);
criterion_main!(benches);
