//! Reactor Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! It implements:
//!
//! - Reactive cells with implicit dependency capture on read
//! - Re-runnable computations, including nested computations
//! - Coalesced, deferred flushes with parent-skip scheduling
//! - Pluggable "run soon" schedulers (host-driven and tokio `LocalSet`)
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Cells, the engine, the context stack and memos
//! - `graph`: Edge bookkeeping between cells and computations
//! - `schedule`: The scheduler seam and its implementations
//! - `config`: Engine configuration
//! - `error`: The crate's error type
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use reactor_core::reactive::Engine;
//! use reactor_core::schedule::ManualScheduler;
//!
//! let scheduler = ManualScheduler::new();
//! let engine = Engine::new(scheduler.clone());
//!
//! let count = engine.cell(0);
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! engine.run({
//!     let (count, log) = (count.clone(), Rc::clone(&log));
//!     move |_| log.borrow_mut().push(format!("count is {}", count.get()))
//! });
//!
//! count.set(1);
//! count.set(2);
//! scheduler.tick().unwrap().unwrap();
//!
//! // Both writes were coalesced into one re-run.
//! assert_eq!(*log.borrow(), vec!["count is 0", "count is 2"]);
//! ```

pub mod config;
pub mod error;
mod graph;
pub mod reactive;
pub mod schedule;

pub use config::{EngineConfig, FlushPolicy};
pub use error::{ComputationFailure, EngineError, Result};
pub use reactive::{Cell, CellId, ComputationId, Engine, EngineStats};
pub use schedule::{FlushReport, FlushTask, LocalSetScheduler, ManualScheduler, Scheduler};
