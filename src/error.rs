//! Error taxonomy for the loss pipeline
//!
//! - `Validation`: malformed or out-of-range person record (fatal)
//! - `DataUnavailable`: a reference source could not answer (recovered by fallback at the agent)
//! - `Computation`: no usable value even after fallback, or degenerate timeline inputs (fatal)
//! - `NotFound`: unknown session id
//! - `DuplicateSession` / `InvalidTransition`: misuse of the session state machine
//! - `Report`: the report collaborator failed to persist its artifacts (fatal for that step)

use crate::reference::DataUnavailable;
use crate::session::{RunStatus, SessionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Reference data unavailable: {0}")]
    DataUnavailable(#[from] DataUnavailable),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session already exists: {0}")]
    DuplicateSession(SessionId),

    #[error("Session {session}: {what} cannot move from {from} to {to}")]
    InvalidTransition {
        session: SessionId,
        what: String,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),
}

impl PipelineError {
    /// Short label for the error class, used in step messages
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "ValidationError",
            PipelineError::DataUnavailable(_) => "DataUnavailableError",
            PipelineError::Computation(_) => "ComputationError",
            PipelineError::NotFound(_) => "NotFoundError",
            PipelineError::DuplicateSession(_) | PipelineError::InvalidTransition { .. } => "SessionStateError",
            PipelineError::Report(_) => "ReportError",
        }
    }
}

/// Failures writing report artifacts
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_all_problems() {
        let err = PipelineError::Validation(vec![
            "annual salary must be positive".to_string(),
            "date of death precedes date of birth".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("annual salary must be positive"));
        assert!(msg.contains("; date of death precedes"));
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_data_unavailable_converts() {
        let err: PipelineError = DataUnavailable::Missing("life table row for age 44".into()).into();
        assert_eq!(err.kind(), "DataUnavailableError");
    }
}
