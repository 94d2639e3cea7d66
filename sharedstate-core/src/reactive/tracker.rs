//! Dependency Tracker
//!
//! The tracker is the central coordinator that connects containers and
//! computations. It owns the dependency graph, the active-computation stack and
//! the set of computations waiting to re-run.
//!
//! # How It Works
//!
//! 1. A computation runs under [`Tracker::track`]. Its previous edges are
//!    cleared first, then it is pushed on the context stack.
//!
//! 2. Every container read calls [`Tracker::record_read`], which adds an edge
//!    from the current computation to the field that was read.
//!
//! 3. Every container write that actually changes a value triggers the written
//!    fields. Dependents of those fields go into the pending set.
//!
//! 4. [`Tracker::flush`] drains the pending set, re-running each computation
//!    once no matter how many of its fields were written.
//!
//! # Flushing
//!
//! With [`FlushMode::Immediate`] the tracker flushes at the end of every
//! outermost write, or at the end of a [`Tracker::batch`]. With
//! [`FlushMode::Deferred`] nothing runs until the host calls `flush` at a turn
//! boundary. A write made while a flush is running only enqueues; the running
//! flush picks the work up, so flushes never nest.
//!
//! # Threading
//!
//! Everything here is single-threaded: handles are `Rc`-based and `!Send`. No
//! `RefCell` borrow is held while a computation body runs, so bodies are free
//! to read, write, track and stop.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, error, trace, warn};

use super::computation::{Body, ComputationId, ComputationRecord, ComputationState};
use super::context::{ContextStack, TrackingScope};
use crate::config::{FlushMode, TrackerConfig};
use crate::error::{ReactiveError, Result};
use crate::graph::{DependencyGraph, Field};

/// Handle to a dependency tracker.
///
/// Cloning is cheap and every clone refers to the same tracker. Containers keep
/// a clone so their reads and writes reach the graph without any global state.
#[derive(Clone)]
pub struct Tracker {
    inner: Rc<TrackerInner>,
}

struct TrackerInner {
    config: TrackerConfig,
    graph: RefCell<DependencyGraph>,
    context: ContextStack,
    computations: RefCell<HashMap<ComputationId, ComputationRecord>>,
    pending: RefCell<IndexSet<ComputationId>>,
    flushing: Cell<bool>,
    batch_depth: Cell<usize>,
}

/// Clears a `Cell<bool>` flag when dropped.
struct FlagReset<'a>(&'a Cell<bool>);

impl Drop for FlagReset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Decrements the batch depth when dropped.
struct BatchScope<'a>(&'a Cell<usize>);

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Settles a computation's record when its run ends, also on unwind.
///
/// The run counts as completed either way. The computation goes back to
/// `Scheduled` if something queued it during the run, otherwise to `Idle`.
struct RunScope<'a> {
    inner: &'a TrackerInner,
    id: ComputationId,
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        // An outer run of the same computation is still going.
        if self.inner.context.contains(self.id) {
            return;
        }
        let rescheduled = self
            .inner
            .pending
            .try_borrow()
            .is_ok_and(|pending| pending.contains(&self.id));
        let Ok(mut computations) = self.inner.computations.try_borrow_mut() else {
            return;
        };
        if let Some(record) = computations.get_mut(&self.id) {
            record.runs += 1;
            record.state = if rescheduled {
                ComputationState::Scheduled
            } else {
                ComputationState::Idle
            };
        }
    }
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            inner: Rc::new(TrackerInner {
                config,
                graph: RefCell::new(DependencyGraph::new()),
                context: ContextStack::new(),
                computations: RefCell::new(HashMap::new()),
                pending: RefCell::new(IndexSet::new()),
                flushing: Cell::new(false),
                batch_depth: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Whether two handles refer to the same tracker.
    pub fn ptr_eq(&self, other: &Tracker) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Computations
    // ------------------------------------------------------------------

    /// Register a computation without running it.
    ///
    /// The body is what the tracker re-runs when a dependency changes. It has
    /// no dependencies until it first runs via [`run`](Self::run).
    pub fn computation<F>(&self, body: F) -> ComputationId
    where
        F: Fn() -> Result<()> + 'static,
    {
        let id = ComputationId::new();
        let body: Body = Rc::new(body);
        self.inner
            .computations
            .borrow_mut()
            .insert(id, ComputationRecord::new(body));
        trace!(%id, "computation registered");
        id
    }

    /// Register a computation and run it once to establish its dependencies.
    ///
    /// If the first run fails, including re-runs its own writes set off before
    /// `effect` returns, the computation is stopped and the error is returned.
    pub fn effect<F>(&self, body: F) -> Result<ComputationId>
    where
        F: Fn() -> Result<()> + 'static,
    {
        let id = self.computation(body);
        if let Err(err) = self.run(id) {
            self.stop(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Run a registered computation's stored body under tracking.
    pub fn run(&self, id: ComputationId) -> Result<()> {
        let body = self
            .inner
            .computations
            .borrow()
            .get(&id)
            .map(|record| Rc::clone(&record.body))
            .ok_or(ReactiveError::ComputationStopped(id))?;

        self.track(id, || body())?
    }

    /// Run `body` with `id` installed as the active computation.
    ///
    /// All of the computation's previously recorded edges are removed before
    /// `body` starts, so only the reads made during this run remain afterwards.
    /// The previous active computation and the computation's own state are
    /// restored when `body` returns, and also if it panics.
    ///
    /// If the run wrote a field this computation depends on through another
    /// computation, it re-runs right after (in immediate mode), and a failure
    /// of that follow-up flush is returned here.
    pub fn track<R>(&self, id: ComputationId, body: impl FnOnce() -> R) -> Result<R> {
        {
            let mut computations = self.inner.computations.borrow_mut();
            let record = computations
                .get_mut(&id)
                .ok_or(ReactiveError::ComputationStopped(id))?;
            record.state = ComputationState::Tracking;
        }
        // A run satisfies any pending request for the same computation.
        self.inner.pending.borrow_mut().shift_remove(&id);

        let cleared = self.inner.graph.borrow_mut().remove_computation(id);
        trace!(%id, cleared, depth = self.inner.context.depth(), "tracking computation");

        let run = RunScope {
            inner: &self.inner,
            id,
        };
        let scope = TrackingScope::enter(&self.inner.context, Some(id));
        let output = body();
        scope.exit()?;
        drop(run);

        // Written by something nested inside this run; it could not re-run
        // while still on the stack.
        let rescheduled = self.inner.pending.borrow().contains(&id);
        if rescheduled && self.flushes_immediately() {
            debug!(%id, "re-running computation rescheduled by its own run");
            self.flush()?;
        }

        Ok(output)
    }

    /// Run `f` without attributing its reads to the active computation.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let scope = TrackingScope::enter(&self.inner.context, None);
        let output = f();
        if let Err(err) = scope.exit() {
            error!(error = %err, "untracked scope unwound out of order");
        }
        output
    }

    /// Stop a computation permanently.
    ///
    /// Its record, edges and pending run are removed and it will never be
    /// notified again. A run already in progress finishes, but its remaining
    /// reads record nothing. Stopping twice is a no-op.
    pub fn stop(&self, id: ComputationId) {
        let record = self.inner.computations.borrow_mut().remove(&id);
        let Some(record) = record else {
            return;
        };
        // Dropped outside the borrow: the closure may own containers.
        drop(record);

        self.inner.pending.borrow_mut().shift_remove(&id);
        let removed = self.inner.graph.borrow_mut().remove_computation(id);
        debug!(%id, removed, "computation stopped");
    }

    // ------------------------------------------------------------------
    // Reads and writes
    // ------------------------------------------------------------------

    /// Record that the active computation, if any, read `field`.
    pub fn record_read(&self, field: Field) {
        let Some(id) = self.inner.context.current() else {
            return;
        };

        if !self.inner.computations.borrow().contains_key(&id) {
            return;
        }

        if self.inner.graph.borrow_mut().add_edge(id, field.clone()) {
            trace!(%id, %field, "dependency recorded");
        }
    }

    /// Schedule every dependent of `field` for a re-run.
    ///
    /// In immediate mode this also flushes, unless a flush or batch is
    /// already in progress.
    pub fn notify(&self, field: Field) -> Result<()> {
        self.trigger([field])
    }

    /// Schedule the dependents of all `fields`, then flush once if the
    /// configuration asks for it.
    pub(crate) fn trigger<I>(&self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = Field>,
    {
        let mut scheduled = 0usize;
        for field in fields {
            let dependents = self.inner.graph.borrow().dependents(&field);
            for id in dependents {
                if self.schedule(id) {
                    scheduled += 1;
                }
            }
            trace!(%field, "field written");
        }

        if scheduled > 0 {
            trace!(scheduled, "computations scheduled");
        }

        if self.flushes_immediately() {
            self.flush()?;
        }
        Ok(())
    }

    fn flushes_immediately(&self) -> bool {
        self.inner.config.flush == FlushMode::Immediate && self.inner.batch_depth.get() == 0
    }

    /// Put `id` in the pending set. Returns whether it was newly added.
    fn schedule(&self, id: ComputationId) -> bool {
        // A computation does not re-trigger itself by writing a field it read,
        // even from inside `untrack`.
        if self.inner.context.running() == Some(id) {
            return false;
        }

        {
            let mut computations = self.inner.computations.borrow_mut();
            let Some(record) = computations.get_mut(&id) else {
                return false;
            };
            if record.state == ComputationState::Idle {
                record.state = ComputationState::Scheduled;
            }
        }

        self.inner.pending.borrow_mut().insert(id)
    }

    /// Run `f` with immediate flushing held back, then flush once.
    ///
    /// Batches nest; only the outermost one flushes. In deferred mode this
    /// only groups writes and the host still decides when to flush.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        let depth = &self.inner.batch_depth;
        depth.set(depth.get() + 1);
        let output = {
            let _scope = BatchScope(depth);
            f()
        };

        if depth.get() == 0 && self.inner.config.flush == FlushMode::Immediate {
            self.flush()?;
        }
        Ok(output)
    }

    /// Re-run every pending computation.
    ///
    /// Computations scheduled while the flush runs are picked up by the same
    /// flush. A computation that is pending when it gets its turn runs exactly
    /// once. Failing bodies do not stop the flush: the remaining computations
    /// still run and the first error is returned at the end.
    ///
    /// Returns the number of computation runs. A nested call (from inside a
    /// running flush) returns `Ok(0)` immediately.
    pub fn flush(&self) -> Result<usize> {
        if self.inner.flushing.replace(true) {
            return Ok(0);
        }
        let _flushing = FlagReset(&self.inner.flushing);

        let limit = self.inner.config.max_flush_runs;
        let mut runs = 0usize;
        let mut first_error = None;
        // Pending computations that are still on the context stack.
        let mut busy = Vec::new();

        loop {
            let next = self.inner.pending.borrow_mut().shift_remove_index(0);
            let Some(id) = next else {
                break;
            };

            if runs >= limit {
                let dropped = self.abandon_pending() + 1;
                self.mark_idle(id);
                warn!(limit, dropped, "flush did not settle, dropping pending runs");
                first_error.get_or_insert(ReactiveError::FlushLimitExceeded { limit });
                break;
            }

            if self.inner.context.contains(id) {
                busy.push(id);
                continue;
            }

            let body = self
                .inner
                .computations
                .borrow()
                .get(&id)
                .map(|record| Rc::clone(&record.body));
            let Some(body) = body else {
                continue;
            };

            runs += 1;
            match self.track(id, || body()) {
                Ok(Ok(())) => {}
                Ok(Err(err)) | Err(err) => {
                    warn!(%id, error = %err, "computation failed during flush");
                    first_error.get_or_insert(err);
                }
            }
        }

        if !busy.is_empty() {
            self.inner.pending.borrow_mut().extend(busy);
        }

        if runs > 0 {
            debug!(runs, "flush complete");
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(runs),
        }
    }

    fn abandon_pending(&self) -> usize {
        let dropped: Vec<_> = self.inner.pending.borrow_mut().drain(..).collect();
        for id in &dropped {
            self.mark_idle(*id);
        }
        dropped.len()
    }

    fn mark_idle(&self, id: ComputationId) {
        if let Some(record) = self.inner.computations.borrow_mut().get_mut(&id) {
            if record.state == ComputationState::Scheduled {
                record.state = ComputationState::Idle;
            }
        }
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The computation reads are currently attributed to.
    pub fn active_computation(&self) -> Option<ComputationId> {
        self.inner.context.current()
    }

    pub fn is_tracking(&self) -> bool {
        self.active_computation().is_some()
    }

    /// Whether `id` is running, possibly with other computations nested inside.
    pub fn is_running(&self, id: ComputationId) -> bool {
        self.inner.context.contains(id)
    }

    /// Current state of `id`. Stopped computations leave no record behind, so
    /// any id this tracker does not know reports [`ComputationState::Stopped`].
    pub fn state(&self, id: ComputationId) -> ComputationState {
        self.inner
            .computations
            .borrow()
            .get(&id)
            .map_or(ComputationState::Stopped, |record| record.state)
    }

    /// Number of computations that have not been stopped.
    pub fn computation_count(&self) -> usize {
        self.inner.computations.borrow().len()
    }

    /// Number of completed runs of `id`, including the first.
    pub fn run_count(&self, id: ComputationId) -> usize {
        self.inner
            .computations
            .borrow()
            .get(&id)
            .map_or(0, |record| record.runs)
    }

    pub fn dependencies_of(&self, id: ComputationId) -> Vec<Field> {
        self.inner.graph.borrow().dependencies(id)
    }

    pub fn dependents_of(&self, field: &Field) -> Vec<ComputationId> {
        self.inner.graph.borrow().dependents(field)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.graph.borrow().edge_count()
    }

    /// Check the dependency graph's forward and reverse indices agree.
    pub fn is_consistent(&self) -> bool {
        self.inner.graph.borrow().is_consistent()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("flush", &self.inner.config.flush)
            .field("computations", &self.computation_count())
            .field("edges", &self.edge_count())
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
