//! Derived Values
//!
//! A [`Derived`] caches the result of a computation over reactive fields and
//! is itself observable.
//!
//! # How Derived Values Work
//!
//! 1. On creation, the compute function runs once under tracking and the
//!    result is cached.
//!
//! 2. When one of its inputs changes, the tracker re-runs the compute function
//!    along with every other scheduled computation.
//!
//! 3. If the new result equals the cached one, nothing else happens. Readers of
//!    the derived value only re-run when the result actually changed.
//!
//! Unlike a lazily pulled memo, recomputation happens at flush time. In
//! deferred mode a read between a write and the next flush sees the previous
//! result.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::computation::ComputationId;
use super::tracker::Tracker;
use crate::error::Result;
use crate::graph::{ContainerId, Field};

/// A cached, observable value computed from other reactive fields.
///
/// Clones share the cache. The underlying computation is stopped when the last
/// clone is dropped, or earlier through [`dispose`](Self::dispose).
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

struct DerivedInner<T> {
    /// Identifies the output field readers depend on.
    id: ContainerId,
    computation: ComputationId,
    value: Rc<RefCell<Option<T>>>,
    tracker: Tracker,
}

impl<T> Derived<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a derived value and compute it immediately.
    ///
    /// Fails with the compute function's error if the first run fails.
    pub fn new<F>(tracker: &Tracker, compute: F) -> Result<Self>
    where
        F: Fn() -> Result<T> + 'static,
    {
        let id = ContainerId::new();
        let value = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&value);
        let notifier = tracker.clone();
        let computation = tracker.effect(move || {
            let next = compute()?;
            let changed = {
                let mut slot = slot.borrow_mut();
                if slot.as_ref() == Some(&next) {
                    false
                } else {
                    *slot = Some(next);
                    true
                }
            };

            if changed {
                trace!(derived = %id, "derived value changed");
                notifier.notify(Field::whole(id))?;
            }
            Ok(())
        })?;

        Ok(Self {
            inner: Rc::new(DerivedInner {
                id,
                computation,
                value,
                tracker: tracker.clone(),
            }),
        })
    }

    /// The cached value, recording a dependency on it.
    ///
    /// `None` only if the value was never computed successfully.
    pub fn get(&self) -> Option<T> {
        self.inner
            .tracker
            .record_read(Field::whole(self.inner.id));
        self.get_untracked()
    }

    pub fn get_untracked(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }
}

impl<T> Derived<T> {
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// The computation that keeps this value up to date.
    pub fn computation(&self) -> ComputationId {
        self.inner.computation
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.inner.tracker.stop(self.inner.computation);
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Drop for DerivedInner<T> {
    fn drop(&mut self) {
        self.tracker.stop(self.computation);
    }
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("id", &self.inner.id)
            .field("value", &self.inner.value.borrow())
            .field("computation", &self.inner.computation)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
