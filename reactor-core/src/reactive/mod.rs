//! Reactive Primitives
//!
//! This module implements the core reactive system: cells, computations and
//! the engine that connects them.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] is a container for mutable state. When a cell is read while a
//! computation is running, the cell records that computation as a dependent.
//! When the cell's value changes, all dependents are scheduled to re-run.
//!
//! ## Computations
//!
//! A computation is a closure run through [`Engine::run`]. It runs once
//! immediately, and again after any cell it read changes. Computations
//! started from inside another computation are its children: they are
//! recreated from scratch every time the parent re-runs.
//!
//! ## Memos
//!
//! A memo ([`Engine::memo`]) is a cell kept up to date by a computation.
//!
//! # Implementation Notes
//!
//! Re-runs are never synchronous. A write adds the dependents to the pending
//! set, and the engine's scheduler runs one coalesced flush "soon". See
//! [`crate::schedule`].

mod cell;
mod context;
mod id;
mod memo;
mod runtime;

pub use cell::Cell;
pub use id::{CellId, ComputationId};
pub use runtime::{Engine, EngineStats};

pub(crate) use runtime::EngineInner;
