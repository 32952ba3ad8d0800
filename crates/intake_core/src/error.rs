use thiserror::Error;

use crate::{
    constraints::ValidationErrors,
    coordinator::{IntakePath, SubmissionFailure, SubmissionStage},
    document::DocumentError,
    reconcile::ReconcileError,
};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission is only possible from the review step")]
    NotOnReviewStep,
    #[error("profile has invalid fields: {0}")]
    Invalid(ValidationErrors),
    #[error("a submission is already in progress")]
    InFlight,
    #[error("{operation} is not available on the {path} path")]
    WrongPath {
        operation: &'static str,
        path: IntakePath,
    },
    #[error("no extraction session to confirm; upload a document first")]
    NoReviewSession,
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("{stage} failed: {}", .failure.message)]
    Failed {
        stage: SubmissionStage,
        failure: SubmissionFailure,
    },
    #[error("submission was cancelled")]
    Cancelled,
}

impl SubmissionError {
    pub fn failure(&self) -> Option<&SubmissionFailure> {
        match self {
            SubmissionError::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            SubmissionError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for SubmissionError {
    fn from(errors: ValidationErrors) -> Self {
        SubmissionError::Invalid(errors)
    }
}
