//! Memo Implementation
//!
//! A memo is a derived cell: a computation re-evaluates a function of other
//! cells and writes the result into an output cell that other computations
//! can read like any cell.
//!
//! # Propagation
//!
//! The output is written from inside a computation, and writes never run
//! dependents synchronously. A computation reading the memo therefore sees a
//! new value one flush after the memo's inputs changed. Because the write
//! goes through [`Cell::set`], a recomputation that yields an equal value
//! notifies nobody.
//!
//! # Lifetime
//!
//! A memo created inside another computation is a child of it, like any
//! nested computation, and stops updating once that parent re-runs.

use super::{Cell, Engine};

impl Engine {
    /// Create a cell that always holds `compute()` of the current inputs.
    ///
    /// `compute` runs once immediately and again after any cell it read
    /// changes. The cell is created holding `T::default()`, which the first
    /// run replaces before `memo` returns. It has no dependents at that point,
    /// so that first write notifies nobody.
    pub fn memo<T, F>(&self, compute: F) -> Cell<T>
    where
        T: Default + PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        let output = self.cell(T::default());

        self.run({
            let output = output.clone();
            move |_| output.set(compute())
        });

        output
    }
}
