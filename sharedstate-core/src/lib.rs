//! Sharedstate Core
//!
//! This crate provides an observable, process-wide state container for
//! interactive applications. It implements:
//!
//! - Reactive containers (records, lists) with per-field dependency tracking
//! - A dependency tracker that re-runs computations when what they read changes
//! - Batched, coalesced re-runs with immediate or host-driven flushing
//! - The shared application state (`dateRange`, `selectedAreas`)
//!
//! # Architecture
//!
//! - `graph`: fields and the computation/field dependency graph
//! - `reactive`: containers, computations, derived values and the tracker
//! - `store`: the shared root record built on top of `reactive`
//! - `config`: tracker configuration
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use sharedstate_core::{SharedState, Tracker};
//!
//! let tracker = Tracker::default();
//! let state = SharedState::new(&tracker).unwrap();
//!
//! // A computation that reads `dateRange.start`
//! let seen = Rc::new(Cell::new(0));
//! let observer = {
//!     let state = state.clone();
//!     let seen = Rc::clone(&seen);
//!     tracker
//!         .effect(move || {
//!             state.start()?;
//!             seen.set(seen.get() + 1);
//!             Ok(())
//!         })
//!         .unwrap()
//! };
//!
//! // Changing the field re-runs it
//! state.date_range().unwrap().set("start", "2024-02-01").unwrap();
//! assert_eq!(seen.get(), 2);
//!
//! // Stopped computations are never notified again
//! tracker.stop(observer);
//! state.date_range().unwrap().set("start", "2024-03-01").unwrap();
//! assert_eq!(seen.get(), 2);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod store;

pub use config::{FlushMode, TrackerConfig};
pub use error::{ReactiveError, Result};
pub use graph::{ContainerId, Field, FieldKey};
pub use reactive::{
    ComputationId, ComputationState, Derived, Input, List, Record, Tracker, Value,
};
pub use store::{DateRange, SharedSnapshot, SharedState};
