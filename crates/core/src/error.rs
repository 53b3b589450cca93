//! Error types for the decision pipeline.

use thiserror::Error;

/// Errors the pipeline reports to its caller.
///
/// Classifier unavailability and unparsable classifier output never show up
/// here: they are recovered by the fallback heuristics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    /// Malformed or empty input.
    #[error("{0}")]
    Validation(String),
    /// Missing credentials or settings; fixable by the operator.
    #[error("{0}")]
    Configuration(String),
    /// The classifier failed in a way that is not plain unavailability.
    #[error("classifier call failed: {0}")]
    Adapter(String),
}

pub type Result<T> = std::result::Result<T, DecisionError>;

/// Failure modes of an external classifier call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    /// Network failure, timeout or non-success status.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    /// A required credential is not configured. Holds the variable name.
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("unexpected classifier error: {0}")]
    Unexpected(String),
}

impl From<ClassifierError> for DecisionError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::MissingCredential(var) => {
                DecisionError::Configuration(format!("Server missing {} env var", var))
            }
            ClassifierError::Unavailable(detail) | ClassifierError::Unexpected(detail) => {
                DecisionError::Adapter(detail)
            }
        }
    }
}
