//! Integration Tests for the Reactive Engine
//!
//! These tests drive cells, computations and flushes together through the
//! public API, with a `ManualScheduler` standing in for the host task queue:
//! every `tick` is one turn of that queue.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use reactor_core::{Cell, ComputationId, Engine, EngineConfig, EngineError, FlushPolicy};

use common::{engine, engine_with, Log};

/// Reading `x` inside a computation makes it re-run after `x` changes.
#[test]
fn doubling_scenario() {
    let (engine, scheduler) = engine();
    let x = engine.cell(1);
    let y = Log::new();

    engine.run({
        let (x, y) = (x.clone(), y.clone());
        move |_| y.push(x.get() * 2)
    });
    assert_eq!(y.entries(), vec![2]);

    // Same value: nothing is scheduled.
    x.set(1);
    assert!(scheduler.is_idle());
    assert!(engine.pending().is_empty());

    x.set(2);
    // Deferred, not synchronous.
    assert_eq!(y.entries(), vec![2]);

    scheduler.tick().unwrap().unwrap();
    assert_eq!(y.entries(), vec![2, 4]);
}

#[test]
fn equal_writes_never_schedule() {
    let (engine, scheduler) = engine();
    let name = engine.cell(String::from("reactor"));
    let maybe = engine.cell(Some(3));

    engine.run({
        let (name, maybe) = (name.clone(), maybe.clone());
        move |_| {
            name.get();
            maybe.get();
        }
    });

    name.set(String::from("reactor"));
    maybe.set(Some(3));
    maybe.update(|v| *v);

    assert!(scheduler.is_idle());
    assert!(!engine.is_flush_scheduled());
}

/// A computation that stops reading a cell is no longer scheduled by it.
#[test]
fn stale_edges_are_dropped() {
    let (engine, scheduler) = engine();
    let use_a = engine.cell(true);
    let a = engine.cell(1);
    let b = engine.cell(10);
    let seen = Log::new();

    let f = engine.run({
        let (use_a, a, b, seen) = (use_a.clone(), a.clone(), b.clone(), seen.clone());
        move |_| {
            let value = if use_a.get() { a.get() } else { b.get() };
            seen.push(value);
        }
    });
    assert!(a.has_dependent(f));
    assert!(!b.has_dependent(f));

    use_a.set(false);
    scheduler.tick().unwrap().unwrap();
    assert_eq!(seen.entries(), vec![1, 10]);
    assert!(!a.has_dependent(f));
    assert!(b.has_dependent(f));

    a.set(2);
    assert!(scheduler.is_idle());
    assert!(!engine.is_flush_scheduled());

    b.set(20);
    scheduler.tick().unwrap().unwrap();
    assert_eq!(seen.entries(), vec![1, 10, 20]);
}

/// Writes to several cells within one tick produce a single re-run.
#[test]
fn writes_coalesce_into_one_flush() {
    let (engine, scheduler) = engine();
    let cells: Vec<Cell<i32>> = (0..3).map(|i| engine.cell(i)).collect();
    let sums = Log::new();

    let f = engine.run({
        let (cells, sums) = (cells.clone(), sums.clone());
        move |_| sums.push(cells.iter().map(Cell::get).sum::<i32>())
    });

    for cell in &cells {
        cell.update(|v| v + 10);
    }
    assert_eq!(scheduler.queued(), 1);
    assert_eq!(engine.pending(), vec![f]);

    let report = scheduler.tick().unwrap().unwrap();
    assert_eq!(report.ran, vec![f]);
    assert_eq!(sums.entries(), vec![3, 33]);
    assert!(scheduler.is_idle());
}

/// Unrelated computations re-run in the order they were first scheduled.
#[test]
fn unrelated_computations_run_in_scheduling_order() {
    let (engine, scheduler) = engine();
    let x = engine.cell(0);
    let y = engine.cell(0);
    let order = Log::new();

    let f = engine.run({
        let (x, order) = (x.clone(), order.clone());
        move |_| {
            x.get();
            order.push("f");
        }
    });
    let g = engine.run({
        let (y, order) = (y.clone(), order.clone());
        move |_| {
            y.get();
            order.push("g");
        }
    });

    y.set(1);
    x.set(1);
    let report = scheduler.tick().unwrap().unwrap();

    assert_eq!(report.ran, vec![g, f]);
    assert_eq!(order.entries(), vec!["f", "g", "g", "f"]);
}

/// A pending child whose parent is also pending waits for the parent to
/// recreate it.
#[test]
fn parent_skip_recreates_child_once() {
    let (engine, scheduler) = engine();
    let a = engine.cell(0);
    let child_runs: Log<(ComputationId, i32)> = Log::new();

    let parent = engine.run({
        let (a, child_runs) = (a.clone(), child_runs.clone());
        move |rx| {
            rx.run({
                let (a, child_runs) = (a.clone(), child_runs.clone());
                move |rx| child_runs.push((rx.current().unwrap(), a.get()))
            });
            a.get();
        }
    });
    let first_child = child_runs.entries()[0].0;
    assert_eq!(a.dependents(), vec![first_child, parent]);

    a.set(1);
    let report = scheduler.tick().unwrap().unwrap();

    assert_eq!(report.skipped, vec![first_child]);
    assert_eq!(report.ran, vec![parent]);

    let runs = child_runs.entries();
    assert_eq!(runs.len(), 2);
    let second_child = runs[1].0;
    assert_ne!(first_child, second_child);
    assert_eq!(runs[1].1, 1);
    assert!(!engine.is_alive(first_child));
    assert_eq!(engine.children(parent), vec![second_child]);
}

/// If the parent's re-run no longer creates the child, the child does not
/// run at all in that flush.
#[test]
fn parent_skip_drops_child_that_is_not_recreated() {
    let (engine, scheduler) = engine();
    let show = engine.cell(true);
    let a = engine.cell(0);
    let child_runs = Log::new();

    let parent = engine.run({
        let (show, a, child_runs) = (show.clone(), a.clone(), child_runs.clone());
        move |rx| {
            if show.get() {
                rx.run({
                    let (a, child_runs) = (a.clone(), child_runs.clone());
                    move |_| child_runs.push(a.get())
                });
            }
            a.get();
        }
    });
    let child = engine.children(parent)[0];

    a.set(1);
    show.set(false);
    let report = scheduler.tick().unwrap().unwrap();

    assert_eq!(report.skipped, vec![child]);
    assert_eq!(report.ran, vec![parent]);
    assert_eq!(child_runs.entries(), vec![0]);
    assert!(engine.children(parent).is_empty());
    assert_eq!(a.dependents(), vec![parent]);
}

/// When the parent is scheduled ahead of its child, the parent's re-run
/// disposes the old child, which is then stale for the rest of the flush.
#[test]
fn child_disposed_by_earlier_parent_run_is_stale() {
    let (engine, scheduler) = engine();
    let a = engine.cell(0);
    let child_runs: Log<(ComputationId, i32)> = Log::new();

    let parent = engine.run({
        let (a, child_runs) = (a.clone(), child_runs.clone());
        move |rx| {
            a.get();
            rx.run({
                let (a, child_runs) = (a.clone(), child_runs.clone());
                move |rx| child_runs.push((rx.current().unwrap(), a.get()))
            });
        }
    });
    let first_child = child_runs.entries()[0].0;
    assert_eq!(a.dependents(), vec![parent, first_child]);

    a.set(1);
    assert_eq!(engine.pending(), vec![parent, first_child]);
    let report = scheduler.tick().unwrap().unwrap();

    assert_eq!(report.ran, vec![parent]);
    assert_eq!(report.stale, vec![first_child]);
    assert!(report.skipped.is_empty());

    // One child execution this flush: the fresh child created by the parent.
    let runs = child_runs.entries();
    assert_eq!(runs.len(), 2);
    let second_child = runs[1].0;
    assert_ne!(second_child, first_child);
    assert_eq!(runs[1].1, 1);
    assert_eq!(engine.children(parent), vec![second_child]);
    assert!(scheduler.is_idle());
}

/// Nested computations are rebuilt from scratch when the outer one re-runs.
#[test]
fn nested_computation_is_recreated_with_outer() {
    let (engine, scheduler) = engine();
    let a = engine.cell(0);
    let b = engine.cell(0);
    let inner_ids = Log::new();

    let outer = engine.run({
        let (a, b, inner_ids) = (a.clone(), b.clone(), inner_ids.clone());
        move |rx| {
            b.get();
            rx.run({
                let (a, inner_ids) = (a.clone(), inner_ids.clone());
                move |rx| {
                    a.get();
                    inner_ids.push(rx.current().unwrap());
                }
            });
        }
    });

    b.set(1);
    scheduler.tick().unwrap().unwrap();

    let ids = inner_ids.entries();
    assert_eq!(ids.len(), 2);
    let (old, new) = (ids[0], ids[1]);
    assert_ne!(old, new);
    assert!(!engine.is_alive(old));
    assert_eq!(engine.parent(new), Some(outer));
    assert_eq!(a.dependents(), vec![new]);

    // The inner computation alone reacts to `a`, and stays attached to outer.
    a.set(1);
    assert_eq!(engine.pending(), vec![new]);
    let report = scheduler.tick().unwrap().unwrap();
    assert_eq!(report.ran, vec![new]);
    assert_eq!(inner_ids.entries(), vec![old, new, new]);
    assert_eq!(engine.run_count(outer), Some(2));
    assert_eq!(engine.children(outer), vec![new]);
}

/// A computation writing a cell it reads re-runs on the next tick, once per tick.
#[test]
fn reentrant_write_is_deferred_to_next_flush() {
    let (engine, scheduler) = engine();
    let counter = engine.cell(0);

    let f = engine.run({
        let counter = counter.clone();
        move |_| {
            let value = counter.get();
            if value < 3 {
                counter.set(value + 1);
            }
        }
    });
    assert_eq!(counter.get_untracked(), 1);
    assert_eq!(scheduler.queued(), 1);

    for expected in 2..=3 {
        let report = scheduler.tick().unwrap().unwrap();
        assert_eq!(report.ran, vec![f]);
        assert_eq!(counter.get_untracked(), expected);
        // A fresh flush was scheduled rather than folded into the running one.
        assert_eq!(scheduler.queued(), 1);
    }

    scheduler.tick().unwrap().unwrap();
    assert!(scheduler.is_idle());
    assert_eq!(engine.run_count(f), Some(4));
}

/// Writes performed by one reaction are picked up by the next flush.
#[test]
fn reaction_writes_feed_the_next_flush() {
    let (engine, scheduler) = engine();
    let source = engine.cell(1);
    let mirror = engine.cell(1);
    let seen = Log::new();

    engine.run({
        let (source, mirror) = (source.clone(), mirror.clone());
        move |_| mirror.set(source.get())
    });
    let reader = engine.run({
        let (mirror, seen) = (mirror.clone(), seen.clone());
        move |_| seen.push(mirror.get())
    });

    source.set(7);
    let first = scheduler.tick().unwrap().unwrap();
    assert!(!first.ran.contains(&reader));
    assert_eq!(engine.pending(), vec![reader]);

    let second = scheduler.tick().unwrap().unwrap();
    assert_eq!(second.ran, vec![reader]);
    assert_eq!(seen.entries(), vec![1, 7]);
}

fn panicking_pair(engine: &Engine, x: &Cell<i32>, good_runs: &Log<i32>) -> (ComputationId, ComputationId) {
    let bad = engine.run({
        let x = x.clone();
        move |_| {
            if x.get() == 2 {
                panic!("bad value");
            }
        }
    });
    let good = engine.run({
        let (x, good_runs) = (x.clone(), good_runs.clone());
        move |_| good_runs.push(x.get())
    });
    (bad, good)
}

#[test]
fn abort_policy_stops_batch_and_reports_dropped() {
    let (engine, scheduler) = engine();
    let x = engine.cell(1);
    let good_runs = Log::new();
    let (bad, good) = panicking_pair(&engine, &x, &good_runs);

    x.set(2);
    let err = scheduler.tick().unwrap().unwrap_err();

    let dropped = match err {
        EngineError::FlushAborted { id, message, dropped } => {
            assert_eq!(id, bad);
            assert_eq!(message, "bad value");
            dropped
        }
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(dropped, vec![good]);
    assert_eq!(good_runs.entries(), vec![1]);
    assert!(engine.current().is_none());
    assert!(scheduler.is_idle());

    // The unreached computation can be retried without another write.
    engine.reschedule(&dropped);
    assert_eq!(engine.pending(), vec![good]);
    let retry = scheduler.tick().unwrap().unwrap();
    assert_eq!(retry.ran, vec![good]);
    assert_eq!(good_runs.entries(), vec![1, 2]);

    // Bookkeeping survived: both computations still react.
    x.set(3);
    let report = scheduler.tick().unwrap().unwrap();
    assert_eq!(report.ran, vec![bad, good]);
    assert_eq!(good_runs.entries(), vec![1, 2, 3]);
}

#[test]
fn isolate_policy_runs_remaining_computations() {
    let config = EngineConfig::default().with_flush_policy(FlushPolicy::IsolateAndContinue);
    let (engine, scheduler) = engine_with(config);
    let x = engine.cell(1);
    let good_runs = Log::new();
    let (bad, good) = panicking_pair(&engine, &x, &good_runs);

    x.set(2);
    let err = scheduler.tick().unwrap().unwrap_err();

    match err {
        EngineError::FlushFailed { failures, report } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].id, bad);
            assert_eq!(report.ran, vec![good]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(good_runs.entries(), vec![1, 2]);
    assert_eq!(engine.stats().depth, 0);
}

#[test]
fn panic_in_direct_run_reaches_the_caller() {
    let (engine, _) = engine();
    let x = engine.cell(0);

    let result = catch_unwind(AssertUnwindSafe(|| {
        engine.run({
            let x = x.clone();
            move |_| {
                x.get();
                panic!("first run failed");
            }
        })
    }));

    assert!(result.is_err());
    assert!(engine.current().is_none());
    // The read before the panic was still attributed to the failed computation.
    assert_eq!(x.dependent_count(), 1);
}

#[test]
fn disposed_computation_never_runs_again() {
    let (engine, scheduler) = engine();
    let x = engine.cell(0);
    let runs = Log::new();

    let f = engine.run({
        let (x, runs) = (x.clone(), runs.clone());
        move |rx| {
            runs.push(x.get());
            rx.run({
                let x = x.clone();
                move |_| {
                    x.get();
                }
            });
        }
    });
    assert_eq!(engine.stats().computations, 2);

    engine.dispose(f).unwrap();

    assert_eq!(engine.stats().computations, 0);
    assert_eq!(x.dependent_count(), 0);
    x.set(1);
    assert!(scheduler.is_idle());
    assert_eq!(runs.len(), 1);
}

fn nest(rx: &Engine, depth: usize, leaf: Cell<i32>) {
    if depth == 0 {
        leaf.get();
        return;
    }
    rx.run(move |rx| nest(rx, depth - 1, leaf.clone()));
}

#[test]
fn deep_nesting_is_rebuilt_and_leaf_reacts_alone() {
    let (engine, scheduler) = engine();
    let rebuild = engine.cell(0);
    let leaf = engine.cell(0);

    let root = engine.run({
        let (rebuild, leaf) = (rebuild.clone(), leaf.clone());
        move |rx| {
            rebuild.get();
            nest(rx, 200, leaf.clone());
        }
    });
    assert_eq!(engine.stats().computations, 201);

    let deepest = leaf.dependents()[0];
    leaf.set(1);
    let report = scheduler.tick().unwrap().unwrap();
    assert_eq!(report.ran, vec![deepest]);

    rebuild.set(1);
    let report = scheduler.tick().unwrap().unwrap();
    assert_eq!(report.ran, vec![root]);
    assert_eq!(engine.stats().computations, 201);
    assert!(!engine.is_alive(deepest));
    assert_eq!(leaf.dependent_count(), 1);
}

#[test]
fn flush_report_serializes() {
    let (engine, scheduler) = engine();
    let x = engine.cell(0);
    let f = engine.run({
        let x = x.clone();
        move |_| {
            x.get();
        }
    });

    x.set(1);
    let report = scheduler.tick().unwrap().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["ran"][0], f.raw());
    assert_eq!(json["skipped"].as_array().unwrap().len(), 0);
}
