//! Reactive Runtime
//!
//! The engine is the central coordinator that connects cells and
//! computations. It owns the dependency graph, the context stack and the
//! pending set, and decides when computations re-run.
//!
//! # How It Works
//!
//! 1. `run` creates a computation and executes it immediately. While it
//!    runs it is on top of the context stack, so every cell it reads records
//!    it as a dependent.
//!
//! 2. A write to a cell adds the cell's dependents to the pending set and,
//!    if no flush is scheduled yet, hands a flush task to the scheduler.
//!
//! 3. The flush takes the pending set, empties it, and re-runs each pending
//!    computation whose ancestors are not pending themselves. A re-run first
//!    clears the edges and children of the previous run, so only the reads
//!    of the latest run survive.
//!
//! # Borrowing
//!
//! Engine state sits behind `RefCell`s. No borrow is ever held while user
//! code runs, which is what allows bodies to read and write cells, start
//! nested computations and dispose others.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, debug_span, trace, warn};

use super::cell::Cell;
use super::context::{ContextGuard, ContextStack};
use super::id::IdCounter;
use super::{CellId, ComputationId};
use crate::config::{EngineConfig, FlushPolicy};
use crate::error::{ComputationFailure, EngineError, Result};
use crate::graph::{Body, ComputationNode, DependencyGraph, Dependents, Disposed};
use crate::schedule::{FlushReport, FlushTask, Scheduler};

/// Mutable engine state, borrowed only between user callbacks.
#[derive(Debug, Default)]
struct EngineState {
    graph: DependencyGraph,
    pending: IndexSet<ComputationId>,
    flush_scheduled: bool,
    computation_ids: IdCounter,
    cell_ids: IdCounter,
    flushes: u64,
}

pub(crate) struct EngineInner {
    state: RefCell<EngineState>,
    context: RefCell<ContextStack>,
    scheduler: Box<dyn Scheduler>,
    config: EngineConfig,
}

/// Snapshot of an engine's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub computations: usize,
    pub edges: usize,
    pub pending: usize,
    pub flush_scheduled: bool,
    pub flushes: u64,
    pub cells_created: u64,
    pub depth: usize,
}

/// Handle to a reactive engine.
///
/// Cloning is cheap and yields another handle to the same engine. Bodies
/// receive a `&Engine` argument, so they never need to capture one.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell as Slot;
/// use std::rc::Rc;
///
/// use reactor_core::reactive::Engine;
/// use reactor_core::schedule::ManualScheduler;
///
/// let scheduler = ManualScheduler::new();
/// let engine = Engine::new(scheduler.clone());
///
/// let x = engine.cell(1);
/// let y = Rc::new(Slot::new(0));
///
/// engine.run({
///     let (x, y) = (x.clone(), Rc::clone(&y));
///     move |_| y.set(x.get() * 2)
/// });
/// assert_eq!(y.get(), 2);
///
/// x.set(2);
/// scheduler.tick().unwrap().unwrap();
/// assert_eq!(y.get(), 4);
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::with_config(EngineConfig::default(), scheduler)
    }

    pub fn with_config(config: EngineConfig, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                state: RefCell::new(EngineState::default()),
                context: RefCell::new(ContextStack::default()),
                scheduler: Box::new(scheduler),
                config,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<EngineInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<EngineInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Create a new cell with the given initial value.
    pub fn cell<T: 'static>(&self, value: T) -> Cell<T> {
        let id = CellId::from_raw(self.inner.state.borrow_mut().cell_ids.allocate());
        Cell::new(self.downgrade(), id, value)
    }

    /// Run `body` as a computation.
    ///
    /// Called outside any computation, this creates a top-level computation.
    /// Called from inside a running body, the new computation becomes a child
    /// of the running one and is disposed whenever that parent re-runs.
    /// Either way it executes immediately, before `run` returns.
    ///
    /// A panic in `body` propagates to the caller once the context stack
    /// has been restored.
    pub fn run<F>(&self, body: F) -> ComputationId
    where
        F: Fn(&Engine) + 'static,
    {
        let body: Body = Rc::new(body);
        let id = {
            let mut state = self.inner.state.borrow_mut();
            let id = ComputationId::from_raw(state.computation_ids.allocate());
            state.graph.insert(id, ComputationNode::new(body, None));
            id
        };

        self.execute(id);
        id
    }

    /// Run `body` against `context`, like [`Engine::run`].
    ///
    /// Every re-run receives the same context value.
    pub fn run_with<C, F>(&self, context: C, body: F) -> ComputationId
    where
        C: 'static,
        F: Fn(&Engine, &C) + 'static,
    {
        self.run(move |engine| body(engine, &context))
    }

    /// The computation currently executing, if any.
    pub fn current(&self) -> Option<ComputationId> {
        self.inner.context.borrow().current()
    }

    /// Check if we're inside a running computation.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.borrow().is_active()
    }

    /// Whether `id` refers to a computation that has not been disposed.
    pub fn is_alive(&self, id: ComputationId) -> bool {
        self.inner.state.borrow().graph.contains(id)
    }

    /// Number of times the body of `id` has been entered.
    pub fn run_count(&self, id: ComputationId) -> Option<u64> {
        self.inner.state.borrow().graph.get(id).map(|node| node.run_count)
    }

    pub fn parent(&self, id: ComputationId) -> Option<ComputationId> {
        self.inner.state.borrow().graph.get(id).and_then(|node| node.parent)
    }

    /// Nested computations created by the latest run of `id`.
    pub fn children(&self, id: ComputationId) -> Vec<ComputationId> {
        self.inner
            .state
            .borrow()
            .graph
            .get(id)
            .map(|node| node.children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Computations waiting for the next flush, in scheduling order.
    pub fn pending(&self) -> Vec<ComputationId> {
        self.inner.state.borrow().pending.iter().copied().collect()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.state.borrow().flush_scheduled
    }

    pub fn stats(&self) -> EngineStats {
        let state = self.inner.state.borrow();
        EngineStats {
            computations: state.graph.len(),
            edges: state.graph.edge_count(),
            pending: state.pending.len(),
            flush_scheduled: state.flush_scheduled,
            flushes: state.flushes,
            cells_created: state.cell_ids.issued(),
            depth: self.inner.context.borrow().depth(),
        }
    }

    /// Put `ids` back into the pending set and make sure a flush is scheduled.
    ///
    /// Used to retry the computations an aborted flush never reached (the
    /// `dropped` list of [`EngineError::FlushAborted`]). Ids that are no
    /// longer alive are ignored.
    pub fn reschedule(&self, ids: &[ComputationId]) {
        let schedule = {
            let mut state = self.inner.state.borrow_mut();
            let EngineState { graph, pending, .. } = &mut *state;
            pending.extend(ids.iter().copied().filter(|&id| graph.contains(id)));
            if pending.is_empty() {
                return;
            }
            !std::mem::replace(&mut state.flush_scheduled, true)
        };

        if schedule {
            self.schedule_flush();
        }
    }

    /// Dispose a computation and everything it created.
    ///
    /// Its edges are removed, it leaves the pending set and it will never run
    /// again. A computation cannot be disposed while it, or one of its
    /// descendants, is executing.
    pub fn dispose(&self, id: ComputationId) -> Result<()> {
        let disposed = {
            let mut state = self.inner.state.borrow_mut();
            if !state.graph.contains(id) {
                return Err(EngineError::UnknownComputation(id));
            }

            let running = self
                .inner
                .context
                .borrow()
                .iter()
                .any(|entry| state.graph.is_within(entry, id));
            if running {
                return Err(EngineError::ComputationRunning(id));
            }

            let disposed = state.graph.remove(id);
            forget_pending(&mut state, &disposed);
            disposed
        };

        debug!(computation = %id, disposed = disposed.len(), "computation disposed");
        drop(disposed);
        Ok(())
    }

    /// Re-run every pending computation once.
    ///
    /// Normally invoked through a [`FlushTask`] by the scheduler, but a host
    /// may call it directly. Writes made while the flush runs are collected
    /// for the next flush.
    ///
    /// A panicking body is handled according to [`EngineConfig::flush_policy`].
    pub fn flush(&self) -> Result<FlushReport> {
        if let Some(running) = self.current() {
            return Err(EngineError::FlushWhileRunning(running));
        }

        let batch = {
            let mut state = self.inner.state.borrow_mut();
            state.flush_scheduled = false;
            state.flushes += 1;
            std::mem::take(&mut state.pending)
        };

        let span = debug_span!("flush", pending = batch.len());
        let _enter = span.enter();

        let mut report = FlushReport::default();
        let mut failures = Vec::new();

        for (index, &id) in batch.iter().enumerate() {
            let step = {
                let state = self.inner.state.borrow();
                if !state.graph.contains(id) {
                    Step::Stale
                } else if state.graph.has_ancestor_in(id, &batch) {
                    Step::Skip
                } else {
                    Step::Run
                }
            };

            match step {
                Step::Stale => report.stale.push(id),
                Step::Skip => {
                    trace!(computation = %id, "skipped: ancestor pending");
                    report.skipped.push(id);
                }
                Step::Run => match self.execute_isolated(id) {
                    Ok(()) => report.ran.push(id),
                    Err(message) => {
                        warn!(computation = %id, %message, "computation panicked during flush");
                        match self.inner.config.flush_policy {
                            FlushPolicy::AbortBatch => {
                                let dropped = batch.iter().skip(index + 1).copied().collect();
                                return Err(EngineError::FlushAborted { id, message, dropped });
                            }
                            FlushPolicy::IsolateAndContinue => {
                                failures.push(ComputationFailure { id, message });
                            }
                        }
                    }
                },
            }
        }

        debug!(
            ran = report.ran.len(),
            skipped = report.skipped.len(),
            stale = report.stale.len(),
            failed = failures.len(),
            "flush complete"
        );

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(EngineError::FlushFailed { failures, report })
        }
    }

    /// Record that the current computation read `cell`.
    pub(crate) fn track(&self, cell: CellId, dependents: &Rc<Dependents>) {
        let Some(current) = self.current() else {
            return;
        };

        if dependents.insert(current) {
            trace!(computation = %current, %cell, "edge created");
            self.inner
                .state
                .borrow_mut()
                .graph
                .record_read(current, cell, dependents);
        }
    }

    /// Schedule every dependent of `cell`.
    pub(crate) fn notify(&self, cell: CellId, dependents: &Dependents) {
        let ids = dependents.snapshot();
        if ids.is_empty() {
            return;
        }

        let schedule = {
            let mut state = self.inner.state.borrow_mut();
            state.pending.extend(ids.iter().copied());
            !std::mem::replace(&mut state.flush_scheduled, true)
        };
        trace!(%cell, dependents = ids.len(), "cell changed");

        if schedule {
            self.schedule_flush();
        }
    }

    /// Hand a new flush task to the scheduler.
    pub(crate) fn schedule_flush(&self) {
        debug!("scheduling flush");
        self.inner.scheduler.schedule_soon(FlushTask::new(self.downgrade()));
    }

    /// Clear, link, push, execute, pop.
    fn execute(&self, id: ComputationId) {
        let parent = self.current();
        let (body, disposed) = {
            let mut state = self.inner.state.borrow_mut();
            let disposed = state.graph.clear(id);
            forget_pending(&mut state, &disposed);

            if let Some(parent) = parent {
                state.graph.adopt(parent, id);
            }

            let Some(node) = state.graph.get_mut(id) else {
                return;
            };
            node.run_count += 1;
            (Rc::clone(&node.body), disposed)
        };
        // Release the previous children (and their captures) outside the borrow.
        drop(disposed);

        trace!(computation = %id, parent = ?parent, "running computation");
        let _ctx = ContextGuard::enter(&self.inner.context, id);
        body(self);
    }

    /// Execute `id`, turning a panic into its message.
    fn execute_isolated(&self, id: ComputationId) -> std::result::Result<(), String> {
        catch_unwind(AssertUnwindSafe(|| self.execute(id))).map_err(panic_message)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

enum Step {
    Run,
    Skip,
    Stale,
}

fn forget_pending(state: &mut EngineState, disposed: &Disposed) {
    for (id, _) in disposed {
        state.pending.shift_remove(id);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
