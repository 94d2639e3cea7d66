//! Dependency Graph
//!
//! This module holds the data side of dependency tracking: the [`Field`]s that
//! can be observed and the [`DependencyGraph`] recording which computation
//! read which field.
//!
//! # Overview
//!
//! The graph is bipartite:
//!
//! - Fields are `(container, key)` slots inside records, lists and derived
//!   values
//! - Computations are re-runnable units of work registered with a tracker
//!
//! An edge from a computation to a field means "re-run this computation when
//! the field is written". We maintain both forward (dependencies) and reverse
//! (dependents) edges: the reverse index answers "who must re-run" on a write,
//! the forward index lets a re-run clear its stale edges in time proportional
//! to its own dependency count.

mod dependency_graph;
mod field;

pub use dependency_graph::DependencyGraph;
pub use field::{ContainerId, Field, FieldKey};
