//! Intake and submission orchestration for the tax profile flow.
//!
//! Two intake paths feed one submission protocol: manual entry through a
//! step-wise wizard, and document upload followed by confidence-tiered review.
//! Both end in a one-shot handoff of the calculation result to the
//! presentation view.

pub mod backend;
pub mod config;
pub mod constraints;
pub mod coordinator;
pub mod document;
pub mod draft;
pub mod error;
pub mod handoff;
pub mod orchestration;
pub mod presentation;
pub mod profile_store;
pub mod progress;
pub mod reconcile;
pub mod transport;
pub mod wizard;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

pub use backend::{BackendError, IntakeBackend};
pub use config::{load_settings, load_settings_from, ClientSettings};
pub use constraints::{FieldConstraintSet, IntakeStep, ValidationErrors};
pub use coordinator::{
    IntakePath, SubmissionCoordinator, SubmissionFailure, SubmissionPhase, SubmissionReceipt,
    SubmissionSession, SubmissionStage,
};
pub use document::{DocumentKind, DocumentUpload};
pub use draft::FinancialProfileDraft;
pub use error::SubmissionError;
pub use handoff::{transition, HandoffPublisher, HandoffReceiver, ResultHandoffPacket};
pub use orchestration::{CompletedSubmission, IntakeController};
pub use presentation::{PresentationAction, PresentationState, PresentationView};
pub use profile_store::{DurableProfileIdStore, InMemoryProfileIdStore, ProfileIdStore};
pub use progress::{ProgressPhase, ProgressSequencer, ProgressStatus};
pub use reconcile::ConfidenceFieldReconciler;
pub use transport::HttpIntakeBackend;
pub use wizard::ProfileDraftBuilder;
