//! Host-driven scheduler.
//!
//! Flush tasks are queued and only run when the host asks for it. This is the
//! scheduler to use from an existing event loop, and in tests where each
//! `tick` stands for one turn of the task queue.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

use super::{FlushReport, FlushTask, Scheduler};
use crate::error::{EngineError, Result};

/// A scheduler whose queue is drained explicitly.
///
/// Cloning shares the queue, so one clone can be handed to the engine while
/// the host keeps another to drive it.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    queue: Rc<RefCell<VecDeque<FlushTask>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flush tasks waiting to run.
    pub fn queued(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run the oldest queued task. Returns `None` when the queue is empty.
    pub fn tick(&self) -> Option<Result<FlushReport>> {
        // Release the queue before running: the flush may schedule again.
        let task = self.queue.borrow_mut().pop_front()?;
        Some(task.run())
    }

    /// Tick until no task is queued, stopping at the first failed flush.
    ///
    /// Computations that keep writing cells they read would schedule forever,
    /// so at most `max_ticks` tasks are run.
    pub fn run_until_idle(&self, max_ticks: usize) -> Result<Vec<FlushReport>> {
        let mut reports = Vec::new();
        for _ in 0..max_ticks {
            match self.tick() {
                Some(result) => reports.push(result?),
                None => return Ok(reports),
            }
        }

        if self.is_idle() {
            Ok(reports)
        } else {
            Err(EngineError::TickLimitExceeded(max_ticks))
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_soon(&self, task: FlushTask) {
        trace!(queued = self.queued() + 1, "flush queued");
        self.queue.borrow_mut().push_back(task);
    }
}
