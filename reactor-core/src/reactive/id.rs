//! Identifier types for the reactive system.
//!
//! Computations and cells are addressed by plain integer handles rather than
//! by pointer identity. Each engine hands out its own ids from a monotonic
//! counter, so two engines in the same process never share bookkeeping.

use std::fmt;

use serde::Serialize;

/// Unique identifier for a computation.
///
/// Assigned when the computation is first run and stable for its whole
/// lifetime. Ids are never reused by the engine that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComputationId(u64);

impl ComputationId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Unique identifier for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CellId(u64);

impl CellId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Monotonic counter backing an engine's id space.
#[derive(Debug, Default)]
pub(crate) struct IdCounter(u64);

impl IdCounter {
    pub(crate) fn allocate(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }

    /// Number of ids handed out so far.
    pub(crate) fn issued(&self) -> u64 {
        self.0
    }
}
