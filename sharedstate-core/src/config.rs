//! Tracker configuration.
//!
//! Configuration is a plain serde struct so hosts can load it from JSON next
//! to the rest of their settings. Every field has a default; an empty object
//! yields [`TrackerConfig::default`].
//!
//! ```rust
//! use sharedstate_core::{FlushMode, TrackerConfig};
//!
//! let config = TrackerConfig::from_json(r#"{ "flush": "deferred" }"#).unwrap();
//! assert_eq!(config.flush, FlushMode::Deferred);
//! assert!(!config.deep_compare);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// When scheduled computations actually re-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Flush at the end of every outermost write (or [`batch`]).
    ///
    /// [`batch`]: crate::reactive::Tracker::batch
    #[default]
    Immediate,
    /// Leave computations pending until the host calls
    /// [`flush`](crate::reactive::Tracker::flush) at a turn boundary.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub flush: FlushMode,

    /// Compare nested records and lists structurally instead of by identity
    /// when deciding whether a write changed anything.
    pub deep_compare: bool,

    /// Maximum nesting of records/lists in an assigned plain value.
    pub max_depth: usize,

    /// Maximum computation runs in one flush before giving up.
    pub max_flush_runs: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            flush: FlushMode::Immediate,
            deep_compare: false,
            max_depth: 32,
            max_flush_runs: 10_000,
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn deferred() -> Self {
        Self::default().with_flush(FlushMode::Deferred)
    }

    pub fn with_flush(mut self, flush: FlushMode) -> Self {
        self.flush = flush;
        self
    }

    pub fn with_deep_compare(mut self, deep_compare: bool) -> Self {
        self.deep_compare = deep_compare;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_flush_runs(mut self, max_flush_runs: usize) -> Self {
        self.max_flush_runs = max_flush_runs;
        self
    }
}
