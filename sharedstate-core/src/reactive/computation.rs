//! Computation types for the reactive system.
//!
//! A computation is any re-runnable unit of work that reads reactive fields:
//! a UI render, a derived value, a logging hook.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;

/// Unique identifier for a computation.
///
/// Each computation gets a unique ID when registered with a tracker. The ID
/// keys its dependency edges and its slot in the pending-run set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

impl ComputationId {
    /// Generate a new unique computation ID.
    ///
    /// Uses an atomic counter so IDs stay unique across trackers.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ComputationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation#{}", self.0)
    }
}

/// Lifecycle of a computation.
///
/// ```text
/// Idle -> Tracking -> Idle
/// Idle -> Scheduled -> Tracking -> Idle
/// (any) -> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationState {
    Idle,
    /// Waiting in the pending set for the next flush.
    Scheduled,
    /// Its body is running right now.
    Tracking,
    /// Terminal. No edges, never notified again. The tracker keeps no record
    /// of stopped computations, so this is also what unknown ids report.
    Stopped,
}

/// The work a computation re-runs.
pub(crate) type Body = Rc<dyn Fn() -> Result<()>>;

/// Tracker-side bookkeeping for one live computation.
///
/// Stopping a computation removes its record, which also releases the body
/// and whatever containers the closure captured.
pub(crate) struct ComputationRecord {
    pub(crate) body: Body,
    pub(crate) state: ComputationState,
    pub(crate) runs: usize,
}

impl ComputationRecord {
    pub(crate) fn new(body: Body) -> Self {
        Self {
            body,
            state: ComputationState::Idle,
            runs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computation_ids_are_unique() {
        let id1 = ComputationId::new();
        let id2 = ComputationId::new();
        let id3 = ComputationId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn new_record_is_idle() {
        let record = ComputationRecord::new(Rc::new(|| Ok(())));
        assert_eq!(record.state, ComputationState::Idle);
        assert_eq!(record.runs, 0);
        assert!((record.body)().is_ok());
    }
}
