//! Graph Nodes
//!
//! This module defines the records that live in the dependency graph: the
//! per-cell dependent set and the per-computation bookkeeping.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use crate::reactive::{CellId, ComputationId, Engine};

/// The callback a computation re-runs.
pub(crate) type Body = Rc<dyn Fn(&Engine)>;

/// The set of computations that read a cell since their last (re)run.
///
/// Owned by the cell. Computations only hold weak references to it, so a
/// dropped cell takes its edges with it.
#[derive(Debug, Default)]
pub(crate) struct Dependents {
    set: RefCell<IndexSet<ComputationId>>,
}

impl Dependents {
    /// Record an edge. Returns `false` if it already existed.
    pub(crate) fn insert(&self, id: ComputationId) -> bool {
        self.set.borrow_mut().insert(id)
    }

    pub(crate) fn remove(&self, id: ComputationId) -> bool {
        // O(1). Order among a cell's dependents carries no meaning.
        self.set.borrow_mut().swap_remove(&id)
    }

    pub(crate) fn contains(&self, id: ComputationId) -> bool {
        self.set.borrow().contains(&id)
    }

    pub(crate) fn snapshot(&self) -> Vec<ComputationId> {
        self.set.borrow().iter().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.set.borrow().len()
    }
}

/// A computation in the dependency graph.
pub(crate) struct ComputationNode {
    /// The callback, with its bound context already captured.
    pub(crate) body: Body,

    /// The computation that was current when this one was created.
    /// `None` for top-level computations.
    pub(crate) parent: Option<ComputationId>,

    /// Nested computations created during the latest run.
    pub(crate) children: IndexSet<ComputationId>,

    /// Cells read during the latest run. Used to unsubscribe before re-running.
    pub(crate) read_cells: IndexMap<CellId, Weak<Dependents>>,

    /// Number of times the body has been entered.
    pub(crate) run_count: u64,
}

impl ComputationNode {
    pub(crate) fn new(body: Body, parent: Option<ComputationId>) -> Self {
        Self {
            body,
            parent,
            children: IndexSet::new(),
            read_cells: IndexMap::new(),
            run_count: 0,
        }
    }
}

impl fmt::Debug for ComputationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationNode")
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("read_cells", &self.read_cells.keys().collect::<Vec<_>>())
            .field("run_count", &self.run_count)
            .finish()
    }
}
