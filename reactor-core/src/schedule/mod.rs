//! Flush Scheduling
//!
//! A write never re-runs computations synchronously. Instead the engine asks
//! its [`Scheduler`] to run a [`FlushTask`] "soon": after the current
//! synchronous execution has finished. All writes that happen before the task
//! runs are coalesced into that single flush.
//!
//! The engine does not care which host queue is used, only that:
//!
//! - the task never runs synchronously inside `schedule_soon`, and
//! - each task runs at most once.
//!
//! Two implementations are provided:
//!
//! - [`ManualScheduler`] queues tasks until the host calls `tick`.
//! - [`LocalSetScheduler`] spawns tasks onto the current tokio `LocalSet`.

mod local_set;
mod manual;

use std::rc::Weak;

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::reactive::{ComputationId, Engine, EngineInner};

pub use local_set::LocalSetScheduler;
pub use manual::ManualScheduler;

/// The host's "run soon" primitive.
pub trait Scheduler {
    /// Run `task` exactly once, asynchronously, no sooner than the end of the
    /// current synchronous execution.
    fn schedule_soon(&self, task: FlushTask);
}

/// A pending flush of one engine.
///
/// Holds the engine weakly: if the engine is gone by the time the host runs
/// the task, running it reports [`EngineError::EngineDropped`].
pub struct FlushTask {
    engine: Weak<EngineInner>,
}

impl FlushTask {
    pub(crate) fn new(engine: Weak<EngineInner>) -> Self {
        Self { engine }
    }

    pub(crate) fn handle(&self) -> Weak<EngineInner> {
        Weak::clone(&self.engine)
    }

    /// Execute the flush.
    ///
    /// A task run from inside a computation cannot flush. It hands a fresh
    /// task back to the scheduler, so the pending work runs on a later turn,
    /// and reports [`EngineError::FlushWhileRunning`].
    pub fn run(self) -> Result<FlushReport> {
        let inner = self.engine.upgrade().ok_or(EngineError::EngineDropped)?;
        let engine = Engine::from_inner(inner);
        match engine.flush() {
            Err(err @ EngineError::FlushWhileRunning(_)) => {
                engine.schedule_flush();
                Err(err)
            }
            result => result,
        }
    }
}

impl std::fmt::Debug for FlushTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushTask")
            .field("engine_alive", &(self.engine.strong_count() > 0))
            .finish()
    }
}

/// What a single flush did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Computations re-run, in execution order.
    pub ran: Vec<ComputationId>,

    /// Computations skipped because an ancestor was pending in the same flush.
    pub skipped: Vec<ComputationId>,

    /// Computations disposed before their turn came.
    pub stale: Vec<ComputationId>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.ran.is_empty() && self.skipped.is_empty() && self.stale.is_empty()
    }
}
