//! Dependency Graph Store
//!
//! Owns every live computation record and keeps both directions of each
//! edge consistent: the cell side (`Dependents`) and the computation side
//! (`read_cells`).
//!
//! # Clearing
//!
//! Before a computation re-runs, everything its previous run established is
//! torn down:
//!
//! 1. Its id is removed from the dependent set of every cell it read.
//! 2. Every child it created is disposed, together with the child's own
//!    subtree. Children are recreated (or not) by the re-run itself.
//!
//! The subtree walk uses an explicit worklist, so arbitrarily deep nesting
//! does not grow the call stack.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::node::{ComputationNode, Dependents};
use crate::reactive::{CellId, ComputationId};

/// Computation records removed from the graph.
///
/// Returned to the caller so that the bodies (and whatever they captured)
/// are dropped after the engine releases its state borrow.
pub(crate) type Disposed = Vec<(ComputationId, ComputationNode)>;

/// The set of live computations and their edges.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    computations: HashMap<ComputationId, ComputationNode>,
}

impl DependencyGraph {
    pub(crate) fn insert(&mut self, id: ComputationId, node: ComputationNode) {
        self.computations.insert(id, node);
    }

    pub(crate) fn contains(&self, id: ComputationId) -> bool {
        self.computations.contains_key(&id)
    }

    pub(crate) fn get(&self, id: ComputationId) -> Option<&ComputationNode> {
        self.computations.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ComputationId) -> Option<&mut ComputationNode> {
        self.computations.get_mut(&id)
    }

    /// Get the total number of live computations.
    pub(crate) fn len(&self) -> usize {
        self.computations.len()
    }

    /// Total number of cell→computation edges.
    pub(crate) fn edge_count(&self) -> usize {
        self.computations
            .values()
            .map(|node| node.read_cells.len())
            .sum()
    }

    /// Mirror a cell read on the computation side.
    ///
    /// The cell side is recorded by the caller through `Dependents::insert`.
    pub(crate) fn record_read(
        &mut self,
        computation: ComputationId,
        cell: CellId,
        dependents: &Rc<Dependents>,
    ) {
        if let Some(node) = self.computations.get_mut(&computation) {
            node.read_cells
                .entry(cell)
                .or_insert_with(|| Rc::downgrade(dependents));
        }
    }

    /// Register `child` as a nested computation of `parent`.
    pub(crate) fn adopt(&mut self, parent: ComputationId, child: ComputationId) {
        if let Some(node) = self.computations.get_mut(&parent) {
            node.children.insert(child);
        }
        if let Some(node) = self.computations.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    /// Drop every subscription and child established by the latest run of `id`.
    ///
    /// The record for `id` itself stays in the graph. Returns the disposed
    /// descendants.
    pub(crate) fn clear(&mut self, id: ComputationId) -> Disposed {
        let mut disposed = Vec::new();

        let Some(root) = self.computations.get_mut(&id) else {
            return disposed;
        };
        let cells = std::mem::take(&mut root.read_cells);
        let mut worklist: SmallVec<[ComputationId; 8]> = root.children.drain(..).collect();
        unsubscribe(id, cells);

        while let Some(child) = worklist.pop() {
            if let Some(mut node) = self.computations.remove(&child) {
                unsubscribe(child, std::mem::take(&mut node.read_cells));
                worklist.extend(node.children.drain(..));
                disposed.push((child, node));
            }
        }

        disposed
    }

    /// Remove `id` and its whole subtree from the graph.
    pub(crate) fn remove(&mut self, id: ComputationId) -> Disposed {
        let mut disposed = self.clear(id);

        if let Some(node) = self.computations.remove(&id) {
            if let Some(parent) = node.parent.and_then(|p| self.computations.get_mut(&p)) {
                parent.children.shift_remove(&id);
            }
            disposed.push((id, node));
        }

        disposed
    }

    /// Iterate over the ancestors of `id`, nearest first.
    pub(crate) fn ancestors(&self, id: ComputationId) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            cursor: self.computations.get(&id).and_then(|node| node.parent),
        }
    }

    /// Whether any ancestor of `id` is part of `batch`.
    pub(crate) fn has_ancestor_in(&self, id: ComputationId, batch: &IndexSet<ComputationId>) -> bool {
        self.ancestors(id).any(|ancestor| batch.contains(&ancestor))
    }

    /// Whether `candidate` is `id` or lives somewhere in the subtree of `id`.
    pub(crate) fn is_within(&self, candidate: ComputationId, id: ComputationId) -> bool {
        candidate == id || self.ancestors(candidate).any(|ancestor| ancestor == id)
    }
}

/// Walks parent links upwards. See [`DependencyGraph::ancestors`].
pub(crate) struct Ancestors<'a> {
    graph: &'a DependencyGraph,
    cursor: Option<ComputationId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ComputationId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = self.graph.get(current).and_then(|node| node.parent);
        Some(current)
    }
}

fn unsubscribe(id: ComputationId, cells: IndexMap<CellId, Weak<Dependents>>) {
    for dependents in cells.into_values() {
        // A dropped cell took its dependent set with it.
        if let Some(dependents) = dependents.upgrade() {
            dependents.remove(id);
        }
    }
}
