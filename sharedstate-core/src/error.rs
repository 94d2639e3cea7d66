//! Error types.
//!
//! Every error here signals a bug in the calling code rather than a transient
//! condition, so nothing is retried and nothing is swallowed.

use thiserror::Error;

use crate::graph::ContainerId;
use crate::reactive::ComputationId;

#[derive(Debug, Error)]
pub enum ReactiveError {
    /// Read or write of a key that is not part of a record's declared shape.
    #[error("field `{field}` is not declared on {container}")]
    InvalidField { container: ContainerId, field: String },

    #[error("index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A typed accessor found a value of another shape.
    #[error("field `{field}` holds a {found}, expected a {expected}")]
    ShapeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The active-computation stack did not unwind in the order it was built.
    #[error("tracking stack corrupted: expected {expected:?} on top, found {found:?}")]
    ReentrantTrackingViolation {
        expected: Option<ComputationId>,
        found: Option<ComputationId>,
    },

    #[error("{0} has been stopped")]
    ComputationStopped(ComputationId),

    #[error("assigning this value into {0} would make it contain itself")]
    CyclicValue(ContainerId),

    #[error("value nesting exceeds the depth limit of {limit}")]
    DepthLimitExceeded { limit: usize },

    /// A flush kept scheduling work after the configured number of runs.
    #[error("flush did not settle after {limit} computation runs")]
    FlushLimitExceeded { limit: usize },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReactiveError>;
