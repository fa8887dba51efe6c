//! Reactive Context
//!
//! The context stack tracks which computation is currently running. This
//! enables automatic dependency tracking: when a cell is read, the engine
//! registers the computation on top of the stack as a dependent.
//!
//! # Implementation
//!
//! The stack is owned by the engine rather than living in a thread-local, so
//! independent engines never see each other's computations. Entering a
//! computation pushes its id and returns a guard; dropping the guard pops it.
//! Because the pop happens in `Drop`, the stack is restored even when the
//! computation's body panics.

use std::cell::RefCell;

use super::ComputationId;

/// Stack of running computations, innermost last.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    entries: Vec<ComputationId>,
}

impl ContextStack {
    /// The computation currently executing, if any.
    pub fn current(&self) -> Option<ComputationId> {
        self.entries.last().copied()
    }

    /// Check if there is an active reactive context.
    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of nested computations currently executing.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Running computations, outermost first.
    pub fn iter(&self) -> impl Iterator<Item = ComputationId> + '_ {
        self.entries.iter().copied()
    }

    fn push(&mut self, id: ComputationId) {
        self.entries.push(id);
    }

    fn pop(&mut self) -> Option<ComputationId> {
        self.entries.pop()
    }
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub(crate) struct ContextGuard<'a> {
    stack: &'a RefCell<ContextStack>,
    id: ComputationId,
}

impl<'a> ContextGuard<'a> {
    /// Make `id` the current computation until the guard is dropped.
    pub(crate) fn enter(stack: &'a RefCell<ContextStack>, id: ComputationId) -> Self {
        stack.borrow_mut().push(id);
        Self { stack, id }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();

        // Guards are strictly nested; anything else is an engine bug.
        debug_assert_eq!(
            popped,
            Some(self.id),
            "context mismatch: expected {:?}, got {:?}",
            self.id,
            popped
        );
    }
}
