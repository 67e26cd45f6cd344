use crate::worker::StageKind;
use std::error::Error;
use thiserror::Error;

/// Boxed error raised by a stage plugin.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by the pipeline runtime.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage's startup hook failed; the pipeline did not start
    #[error("{stage} startup failed: {source}")]
    StartupFailure {
        stage: StageKind,
        #[source]
        source: BoxError,
    },

    /// An action failure that the error policy escalated
    #[error("{stage} action failed: {source}")]
    ActionFailure {
        stage: StageKind,
        #[source]
        source: BoxError,
    },

    /// A stage's finalise hook failed after its queue was drained
    #[error("{stage} finalise failed: {source}")]
    FinaliseFailure {
        stage: StageKind,
        #[source]
        source: BoxError,
    },

    /// Queue used after close, or a lifecycle call made in the wrong state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Pipeline has already been started
    #[error("Pipeline has already been started")]
    AlreadyStarted,

    /// Pipeline was never started
    #[error("Pipeline has not been started")]
    NotStarted,

    /// A stage task panicked or was aborted
    #[error("{stage} task failed: {message}")]
    Join { stage: StageKind, message: String },
}

impl PipelineError {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// The stage the error originated from, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<StageKind> {
        match self {
            Self::StartupFailure { stage, .. }
            | Self::ActionFailure { stage, .. }
            | Self::FinaliseFailure { stage, .. }
            | Self::Join { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
