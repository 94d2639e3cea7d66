//! Fields: the unit of observability.
//!
//! A field is a `(container, key)` pair. Reads of a field inside a tracked
//! computation create an edge to it; writes to a field notify every
//! computation holding such an edge.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a reactive container (record, list or derived value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Generate a new unique container ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// Identifies a slot within a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// A declared property of a keyed record.
    Name(Rc<str>),
    /// A single position in an ordered collection.
    Index(usize),
    /// The size of an ordered collection.
    Length,
    /// The container as a whole: any structural change to a collection, or
    /// the output of a derived value.
    Whole,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => write!(f, ".{name}"),
            FieldKey::Index(index) => write!(f, "[{index}]"),
            FieldKey::Length => f.write_str(".length"),
            FieldKey::Whole => f.write_str(".*"),
        }
    }
}

/// A single observable `(container, key)` slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    container: ContainerId,
    key: FieldKey,
}

impl Field {
    pub fn new(container: ContainerId, key: FieldKey) -> Self {
        Self { container, key }
    }

    pub fn named(container: ContainerId, name: Rc<str>) -> Self {
        Self::new(container, FieldKey::Name(name))
    }

    pub fn index(container: ContainerId, index: usize) -> Self {
        Self::new(container, FieldKey::Index(index))
    }

    pub fn length(container: ContainerId) -> Self {
        Self::new(container, FieldKey::Length)
    }

    pub fn whole(container: ContainerId) -> Self {
        Self::new(container, FieldKey::Whole)
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn key(&self) -> &FieldKey {
        &self.key
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.container, self.key)
    }
}
