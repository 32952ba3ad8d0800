use std::sync::Arc;

use shared::protocol::FinancialProfile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    constraints::{FieldConstraintSet, ValidationErrors},
    coordinator::{SubmissionCoordinator, SubmissionReceipt},
    document::DocumentUpload,
    draft::FinancialProfileDraft,
    error::SubmissionError,
    handoff::{transition, HandoffReceiver},
    progress::{ProgressCanceller, ProgressSequencer},
    reconcile::ConfidenceFieldReconciler,
    wizard::ProfileDraftBuilder,
};

/// A finished submission. The receiver holds the result packet for the
/// presentation view.
#[derive(Debug)]
pub struct CompletedSubmission {
    pub receipt: SubmissionReceipt,
    pub handoff: HandoffReceiver,
}

/// Joins the backend protocol with the progress schedule. Navigation to the
/// result view is allowed only once both the calculation succeeded and every
/// progress phase has been shown.
pub struct IntakeController {
    coordinator: Arc<SubmissionCoordinator>,
    sequencer: ProgressSequencer,
    constraints: Arc<FieldConstraintSet>,
    active_progress: Mutex<Option<ProgressCanceller>>,
}

impl IntakeController {
    pub fn new(
        coordinator: Arc<SubmissionCoordinator>,
        sequencer: ProgressSequencer,
        constraints: Arc<FieldConstraintSet>,
    ) -> Self {
        Self {
            coordinator,
            sequencer,
            constraints,
            active_progress: Mutex::new(None),
        }
    }

    pub fn coordinator(&self) -> &SubmissionCoordinator {
        &self.coordinator
    }

    pub fn constraints(&self) -> &FieldConstraintSet {
        &self.constraints
    }

    pub fn progress(&self) -> &ProgressSequencer {
        &self.sequencer
    }

    pub fn new_wizard(&self) -> ProfileDraftBuilder {
        ProfileDraftBuilder::new(Arc::clone(&self.constraints))
    }

    pub fn new_wizard_with(&self, draft: FinancialProfileDraft) -> ProfileDraftBuilder {
        ProfileDraftBuilder::with_draft(Arc::clone(&self.constraints), draft)
    }

    /// Sends a document for extraction and returns the review state.
    pub async fn upload(
        &self,
        document: &DocumentUpload,
    ) -> Result<ConfidenceFieldReconciler, SubmissionError> {
        let permit = self.coordinator.begin_upload()?;
        permit.upload(document).await
    }

    pub async fn submit_manual(
        &self,
        profile: FinancialProfile,
    ) -> Result<CompletedSubmission, SubmissionError> {
        let permit = self.coordinator.begin_submission()?;
        let (publisher, handoff) = transition();
        let outcome = self
            .with_progress(permit.submit_manual(&profile, publisher))
            .await?;
        Ok(CompletedSubmission {
            receipt: outcome,
            handoff,
        })
    }

    /// Validates the reviewed values, then confirms and calculates. Client
    /// and server field messages are left on the reconciler for display.
    pub async fn confirm(
        &self,
        reconciler: &mut ConfidenceFieldReconciler,
    ) -> Result<CompletedSubmission, SubmissionError> {
        if let Err(errors) = reconciler.validate(&self.constraints) {
            reconciler.record_errors(errors.clone());
            return Err(errors.into());
        }
        reconciler.record_errors(ValidationErrors::default());
        let permit = self.coordinator.begin_submission()?;
        let (publisher, handoff) = transition();
        let outcome = self
            .with_progress(permit.confirm(reconciler.edited_fields(), publisher))
            .await;
        match outcome {
            Ok(receipt) => Ok(CompletedSubmission { receipt, handoff }),
            Err(err) => {
                reconciler.apply_server_errors(&err);
                Err(err)
            }
        }
    }

    /// Stops any running progress playback, e.g. when the hosting view closes.
    pub async fn teardown(&self) {
        if let Some(canceller) = self.active_progress.lock().await.take() {
            canceller.cancel();
            debug!("controller: progress cancelled on teardown");
        }
    }

    async fn with_progress(
        &self,
        work: impl std::future::Future<Output = Result<SubmissionReceipt, SubmissionError>>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut run = self.sequencer.start();
        *self.active_progress.lock().await = Some(run.canceller());

        let outcome = work.await;
        let outcome = match outcome {
            Ok(receipt) => {
                // The real result is buffered until the schedule completes.
                if run.wait_finished().await {
                    Ok(receipt)
                } else {
                    info!(profile_id = %receipt.profile_id, "controller: view torn down before progress finished");
                    Err(SubmissionError::Cancelled)
                }
            }
            Err(err) => {
                run.cancel();
                Err(err)
            }
        };

        self.active_progress.lock().await.take();
        outcome
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
