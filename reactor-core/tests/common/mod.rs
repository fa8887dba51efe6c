//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use reactor_core::{Engine, EngineConfig, ManualScheduler};
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber, filtered by `REACTOR_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("REACTOR_LOG"))
        .with_test_writer()
        .try_init();
}

pub fn engine() -> (Engine, ManualScheduler) {
    init_tracing();
    let scheduler = ManualScheduler::new();
    (Engine::new(scheduler.clone()), scheduler)
}

pub fn engine_with(config: EngineConfig) -> (Engine, ManualScheduler) {
    init_tracing();
    let scheduler = ManualScheduler::new();
    (Engine::with_config(config, scheduler.clone()), scheduler)
}

/// A shared, append-only record of what bodies observed.
#[derive(Clone)]
pub struct Log<T>(Rc<RefCell<Vec<T>>>);

impl<T: Clone> Log<T> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn push(&self, entry: T) {
        self.0.borrow_mut().push(entry);
    }

    pub fn entries(&self) -> Vec<T> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}
