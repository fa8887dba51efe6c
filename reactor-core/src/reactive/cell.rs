//! Cell Implementation
//!
//! A Cell is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Cells Work
//!
//! 1. When a cell is read while a computation is running, the cell records
//!    that computation as a dependent (once, however often it is read).
//!
//! 2. When a cell is written with a value that differs from the current one,
//!    every dependent is handed to the engine, which schedules a flush.
//!
//! 3. Writing an equal value does nothing at all.
//!
//! # Ownership
//!
//! Cells are owned by the caller. A cell keeps only a weak reference to its
//! engine, and the engine keeps only weak references to cells, so closures
//! may capture cells freely without creating reference cycles. A cell whose
//! engine has been dropped keeps working as a plain value holder.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::{CellId, ComputationId, Engine, EngineInner};
use crate::graph::Dependents;

/// A reactive cell holding a value of type T.
///
/// Cloning a cell produces another handle to the same value.
///
/// # Example
///
/// ```rust
/// use reactor_core::reactive::Engine;
/// use reactor_core::schedule::ManualScheduler;
///
/// let engine = Engine::new(ManualScheduler::new());
/// let count = engine.cell(0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (schedules dependents)
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Cell<T> {
    inner: Rc<CellInner<T>>,
}

struct CellInner<T> {
    id: CellId,
    value: RefCell<T>,
    dependents: Rc<Dependents>,
    engine: Weak<EngineInner>,
}

impl<T: 'static> Cell<T> {
    pub(crate) fn new(engine: Weak<EngineInner>, id: CellId, value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                id,
                value: RefCell::new(value),
                dependents: Rc::new(Dependents::default()),
                engine,
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called while a computation is running, this also registers that
    /// computation as a dependent.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value, tracking the read like [`Cell::get`].
    ///
    /// Writing to this same cell from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Set a new value and notify dependents.
    ///
    /// Nothing happens if `value` equals the current value.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            trace!(cell = %self.inner.id, "write suppressed: value unchanged");
            return;
        }

        // Drop the old value only once the borrow is released.
        let _previous = self.inner.value.replace(value);
        self.trigger();
    }

    /// Update the value using a function of the current value.
    ///
    /// Goes through [`Cell::set`], so an unchanged result notifies nobody.
    pub fn update<F>(&self, f: F)
    where
        T: PartialEq,
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.inner.value.borrow();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Mutate the value in place and notify dependents unconditionally.
    pub fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.inner.value.borrow_mut());
        self.trigger();
    }

    /// Notify the current dependents without touching the value.
    ///
    /// Use after mutating the stored value through interior mutability.
    pub fn trigger(&self) {
        if let Some(engine) = self.engine() {
            engine.notify(self.inner.id, &self.inner.dependents);
        }
    }

    /// Computations that read this cell during their latest run.
    pub fn dependents(&self) -> Vec<ComputationId> {
        self.inner.dependents.snapshot()
    }

    pub fn has_dependent(&self, id: ComputationId) -> bool {
        self.inner.dependents.contains(id)
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    fn track(&self) {
        if let Some(engine) = self.engine() {
            engine.track(self.inner.id, &self.inner.dependents);
        }
    }

    fn engine(&self) -> Option<Engine> {
        self.inner.engine.upgrade().map(Engine::from_inner)
    }
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("dependent_count", &self.inner.dependents.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
