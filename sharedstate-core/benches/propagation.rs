//! Benchmarks for write propagation.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use sharedstate_core::{SharedState, Tracker, TrackerConfig};

fn observed_state(tracker: &Tracker, observers: usize) -> SharedState {
    let state = SharedState::new(tracker).unwrap();
    for _ in 0..observers {
        let state = state.clone();
        let runs = Rc::new(Cell::new(0u64));
        tracker
            .effect(move || {
                state.start()?;
                state.selected_areas()?.len();
                runs.set(runs.get() + 1);
                Ok(())
            })
            .unwrap();
    }
    state
}

fn bench_field_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_write");

    for observers in [1, 10, 100] {
        let tracker = Tracker::default();
        let state = observed_state(&tracker, observers);
        let range = state.date_range().unwrap();
        let mut flip = false;

        group.bench_with_input(
            BenchmarkId::new("immediate", observers),
            &observers,
            |b, _| {
                b.iter(|| {
                    flip = !flip;
                    let value = if flip { "2024-01-01" } else { "2024-01-02" };
                    range.set("start", black_box(value)).unwrap();
                })
            },
        );
    }

    group.finish();
}

fn bench_deferred_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("deferred_batch");

    for writes in [1, 10, 100] {
        let tracker = Tracker::new(TrackerConfig::deferred());
        let state = observed_state(&tracker, 10);
        let areas = state.selected_areas().unwrap();

        group.bench_with_input(BenchmarkId::new("append_then_flush", writes), &writes, |b, &n| {
            b.iter(|| {
                for i in 0..n {
                    areas.append(json!(i)).unwrap();
                }
                tracker.flush().unwrap();
                areas.clear().unwrap();
                tracker.flush().unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_field_write, bench_deferred_batch);
criterion_main!(benches);
