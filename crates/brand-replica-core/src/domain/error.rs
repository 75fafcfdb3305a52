//! Error taxonomy for the brand replication pipeline.

use serde::{Deserialize, Serialize};

/// Coarse classification of a [`PipelineError`], used by collaborators to
/// decide between remediation and silently accepting a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Malformed input or configuration, rejected before any external call.
    InvalidInput,
    /// A single unit of work (one component, one section) failed.
    Unit,
    /// The phase could not produce a usable output.
    PhaseFailure,
    /// The caller cancelled the run.
    Cancellation,
}

/// Brand pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid {phase} input: {reason}")]
    InvalidInput { phase: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{phase} phase failed: {reason}")]
    PhaseFailed { phase: String, reason: String },

    #[error("{phase} phase cancelled by caller")]
    Cancelled { phase: String },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("unparseable html: {0}")]
    UnparseableHtml(String),

    #[error("illegal status transition: {0}")]
    StatusTransition(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_input(phase: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            phase: phase.to_string(),
            reason: reason.into(),
        }
    }

    pub fn phase_failed(phase: &str, reason: impl Into<String>) -> Self {
        Self::PhaseFailed {
            phase: phase.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } | Self::InvalidConfig(_) => ErrorKind::InvalidInput,
            Self::Timeout { .. } | Self::Collaborator(_) => ErrorKind::Unit,
            Self::Cancelled { .. } => ErrorKind::Cancellation,
            Self::PhaseFailed { .. }
            | Self::UnparseableHtml(_)
            | Self::StatusTransition(_)
            | Self::DigestMismatch { .. }
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::PhaseFailure,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::invalid_input("codegen", "no discovered components");
        assert!(err.to_string().contains("invalid codegen input"));

        let err = PipelineError::Timeout {
            operation: "generate hero".to_string(),
            after_ms: 500,
        };
        assert!(err.to_string().contains("500ms"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PipelineError::InvalidConfig("weights".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            PipelineError::Collaborator("503".into()).kind(),
            ErrorKind::Unit
        );
        assert!(PipelineError::Cancelled {
            phase: "intelligence".into()
        }
        .is_cancellation());
        assert_eq!(
            PipelineError::phase_failed("discovery", "nothing found").kind(),
            ErrorKind::PhaseFailure
        );
    }
}
