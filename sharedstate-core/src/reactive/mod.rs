//! Reactive Primitives
//!
//! This module implements the observation mechanism: containers whose reads
//! are tracked, computations that re-run when what they read changes, and the
//! tracker connecting the two.
//!
//! # Concepts
//!
//! ## Containers
//!
//! [`Record`]s (fixed named fields) and [`List`]s (ordered items) hold
//! [`Value`]s. Reading a field inside a computation registers that computation
//! as a dependent of the field; writing a different value notifies every
//! dependent. Plain JSON objects and arrays written into a container become
//! nested containers, so observation reaches all the way down.
//!
//! ## Computations
//!
//! A computation is a re-runnable closure registered with the [`Tracker`].
//! Each run starts from a clean slate: the edges from the previous run are
//! dropped and the edges of the new run are recorded as it reads.
//!
//! ## Derived values
//!
//! A [`Derived`] is a computation whose result is cached and observable.
//!
//! # Implementation Notes
//!
//! Containers hold an explicit [`Tracker`] handle instead of reaching for a
//! global runtime, so independent trackers (one per test, for example) never
//! see each other's state.

mod computation;
mod context;
mod derived;
mod list;
mod record;
mod tracker;
mod value;

pub use computation::{ComputationId, ComputationState};
pub use derived::Derived;
pub use list::List;
pub use record::Record;
pub use tracker::Tracker;
pub use value::{Input, Value};
