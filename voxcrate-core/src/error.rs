//! Error types for voxcrate

use thiserror::Error;

/// Main error type for voxcrate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    /// A broken internal invariant, e.g. an edge vertex requested before it was created.
    #[error("Internal consistency failure: {0}")]
    InternalConsistency(String),
}

/// Result type alias for voxcrate operations
pub type Result<T> = std::result::Result<T, Error>;
