//! Tokio-backed scheduler.
//!
//! Each flush is spawned as a local task, so it runs on a later turn of the
//! current `LocalSet` once the code that performed the writes yields.

use tracing::{debug, error, trace};

use super::{FlushTask, Scheduler};
use crate::error::EngineError;
use crate::reactive::Engine;

/// Spawns flushes with [`tokio::task::spawn_local`].
///
/// The engine is `!Send`, so flushes must stay on the thread that owns it.
/// `schedule_soon` therefore has to be called from within a
/// [`tokio::task::LocalSet`]; spawning outside of one panics.
///
/// There is no caller to return a failed flush to, so failures are reported
/// through `tracing` at error level. When a flush is aborted by a panicking
/// computation, the computations it never reached are rescheduled with
/// [`Engine::reschedule`] and run on a later turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSetScheduler;

impl LocalSetScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for LocalSetScheduler {
    fn schedule_soon(&self, task: FlushTask) {
        tokio::task::spawn_local(async move {
            let handle = task.handle();
            match task.run() {
                Ok(report) => debug!(
                    ran = report.ran.len(),
                    skipped = report.skipped.len(),
                    "local flush finished"
                ),
                Err(EngineError::EngineDropped) => trace!("engine dropped before flush"),
                Err(EngineError::FlushAborted { id, message, dropped }) => {
                    error!(computation = %id, %message, dropped = dropped.len(), "reactive flush aborted");
                    if let Some(inner) = handle.upgrade() {
                        Engine::from_inner(inner).reschedule(&dropped);
                    }
                }
                Err(err) => error!(error = %err, "reactive flush failed"),
            }
        });
    }
}
