//! Error types for kindle-stages

use thiserror::Error;

/// General-purpose error for plugins built on this crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// An input item was rejected
    #[error("Rejected item: {0}")]
    Rejected(String),

    /// A custom error occurred
    #[error("{0}")]
    Custom(String),
}

/// Result type for stage operations
pub type Result<T> = std::result::Result<T, StageError>;
