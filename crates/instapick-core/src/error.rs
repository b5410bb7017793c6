//! Error types for instapick.

use thiserror::Error;

use crate::id::ObjectId;

/// The main error type for instapick operations.
#[derive(Error, Debug)]
pub enum InstapickError {
    /// An instance index fell outside `[0, count)`.
    #[error("instance index {index} out of range for instance set of {count}")]
    OutOfRange { index: usize, count: usize },

    /// The pixel buffer was queried before the first refresh produced it.
    #[error("pick buffer not ready - refresh has not run yet")]
    UnreadyBuffer,

    /// The object has no drawable geometry and cannot take part in picking.
    #[error("object {0} has no drawable geometry")]
    UnsupportedGeometry(ObjectId),

    /// No object with this identifier exists in the scene.
    #[error("object {0} not found in scene")]
    UnknownObject(ObjectId),

    /// Per-instance attribute data does not match the instance count.
    #[error("{attribute} data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An instance set is too large to address with 32-bit identifiers.
    #[error("instance count {count} exceeds the 32-bit identifier range")]
    TooManyInstances { count: usize },

    /// Geometry data is malformed (e.g. an index past the vertex count).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for instapick operations.
pub type Result<T> = std::result::Result<T, InstapickError>;
