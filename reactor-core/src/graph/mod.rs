//! Dependency Graph
//!
//! This module implements the bookkeeping that connects cells to the
//! computations that read them.
//!
//! # Overview
//!
//! Edges are stored on both sides:
//!
//! - Each cell owns a `Dependents` set: the computations that read it during
//!   their latest run. A write schedules exactly this set.
//! - Each computation keeps `read_cells`, the reverse index, so a re-run can
//!   unsubscribe cleanly before subscribing again.
//!
//! Computations also form a forest through `parent`/`children` links. A
//! computation created while another one is running becomes its child, and
//! is disposed whenever the parent re-runs.
//!
//! # Design Decisions
//!
//! 1. Computations are addressed by integer ids and live in a single table
//!    owned by the engine, rather than being referenced by pointer.
//!
//! 2. Cells are not registered in the table. Computations hold weak
//!    references to their dependent sets, so cells stay caller-owned.

mod node;
mod store;

pub(crate) use node::{Body, ComputationNode, Dependents};
pub(crate) use store::{DependencyGraph, Disposed};
