//! Reactive Context
//!
//! The context stack tracks which computation is currently running so that a
//! field read can be attributed to it.
//!
//! # Implementation
//!
//! Each tracker owns one stack. Running a computation pushes it; finishing
//! pops it. Nested runs attribute reads to the innermost computation, and the
//! outer one becomes current again once the inner run returns. An entry with
//! no computation suspends attribution (see `Tracker::untrack`).
//!
//! Pushes and pops are paired by [`TrackingScope`], which also pops on unwind
//! so a panicking computation cannot leave itself installed.

use std::cell::RefCell;

use tracing::error;

use super::ComputationId;
use crate::error::{ReactiveError, Result};

/// An entry in the context stack.
#[derive(Debug, Clone, Copy)]
struct ContextEntry {
    /// `None` while attribution is suspended.
    computation: Option<ComputationId>,
}

/// Stack of currently executing computations.
#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    entries: RefCell<Vec<ContextEntry>>,
}

impl ContextStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&self, computation: Option<ComputationId>) {
        self.entries.borrow_mut().push(ContextEntry { computation });
    }

    /// Pop the top entry, verifying it belongs to `expected`.
    fn pop(&self, expected: Option<ComputationId>) -> Result<()> {
        let popped = self.entries.borrow_mut().pop();

        match popped {
            Some(entry) if entry.computation == expected => Ok(()),
            Some(entry) => Err(ReactiveError::ReentrantTrackingViolation {
                expected,
                found: entry.computation,
            }),
            None => Err(ReactiveError::ReentrantTrackingViolation {
                expected,
                found: None,
            }),
        }
    }

    /// The computation reads are currently attributed to, if any.
    pub(crate) fn current(&self) -> Option<ComputationId> {
        self.entries
            .borrow()
            .last()
            .and_then(|entry| entry.computation)
    }

    /// The innermost computation on the stack, looking through suspended
    /// entries. Inside `untrack` this is still the computation that called it.
    pub(crate) fn running(&self) -> Option<ComputationId> {
        self.entries
            .borrow()
            .iter()
            .rev()
            .find_map(|entry| entry.computation)
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether `computation` is running anywhere on the stack.
    pub(crate) fn contains(&self, computation: ComputationId) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.computation == Some(computation))
    }
}

/// Guard that pops its entry when dropped.
///
/// Call [`exit`](Self::exit) on the normal path to get the mismatch check as
/// an error; the drop path only logs.
pub(crate) struct TrackingScope<'a> {
    stack: &'a ContextStack,
    computation: Option<ComputationId>,
    exited: bool,
}

impl<'a> TrackingScope<'a> {
    pub(crate) fn enter(stack: &'a ContextStack, computation: Option<ComputationId>) -> Self {
        stack.push(computation);
        Self {
            stack,
            computation,
            exited: false,
        }
    }

    pub(crate) fn exit(mut self) -> Result<()> {
        self.exited = true;
        self.stack.pop(self.computation)
    }
}

impl Drop for TrackingScope<'_> {
    fn drop(&mut self) {
        if self.exited {
            return;
        }
        if let Err(err) = self.stack.pop(self.computation) {
            error!(error = %err, "tracking scope unwound out of order");
        }
    }
}
