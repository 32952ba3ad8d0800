//! Drives the backend protocol for one intake instance.
//!
//! Manual path: create profile, then calculate. Upload path: upload, review,
//! confirm profile, then calculate. The session held in the watch channel is
//! the only record of whether a call is in flight; a caller must hold a
//! [`SubmissionPermit`] to talk to the backend, and only one permit can exist
//! at a time.

use std::{collections::BTreeMap, fmt, sync::Arc};

use shared::{
    domain::{OcrSessionId, ProfileField, ProfileId},
    error::ErrorCode,
    protocol::{CalculationResult, ConfirmProfileRequest, FieldValue, FinancialProfile},
};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    backend::{BackendError, IntakeBackend},
    document::DocumentUpload,
    error::SubmissionError,
    handoff::{HandoffPublisher, ResultHandoffPacket},
    reconcile::{ConfidenceFieldReconciler, ReconcileError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakePath {
    Manual,
    Upload,
}

impl fmt::Display for IntakePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntakePath::Manual => "manual",
            IntakePath::Upload => "upload",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Uploading,
    Reviewing,
    Submitting,
    Done,
    Failed,
}

impl SubmissionPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmissionPhase::Uploading | SubmissionPhase::Submitting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Upload,
    CreateProfile,
    ConfirmProfile,
    Calculate,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmissionStage::Upload => "document upload",
            SubmissionStage::CreateProfile => "profile creation",
            SubmissionStage::ConfirmProfile => "profile confirmation",
            SubmissionStage::Calculate => "tax calculation",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// The server explained what was wrong, possibly per field.
    Structured {
        code: ErrorCode,
        field_errors: BTreeMap<ProfileField, String>,
        general: Vec<String>,
    },
    Unstructured,
}

/// What the user is shown after a failed call.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionFailure {
    pub stage: SubmissionStage,
    pub message: String,
    pub kind: FailureKind,
}

impl SubmissionFailure {
    pub fn from_backend(stage: SubmissionStage, err: &BackendError) -> Self {
        match err {
            BackendError::Api { error, .. } => {
                let mut field_errors = BTreeMap::new();
                let mut general = Vec::new();
                for detail in &error.details {
                    match detail.field.as_deref().and_then(ProfileField::from_location) {
                        Some(field) => {
                            field_errors.insert(field, detail.issue.clone());
                        }
                        None => general.push(detail.issue.clone()),
                    }
                }
                Self {
                    stage,
                    message: error.message.clone(),
                    kind: FailureKind::Structured {
                        code: error.code.clone(),
                        field_errors,
                        general,
                    },
                }
            }
            BackendError::Timeout => Self::unstructured(
                stage,
                "The server took too long to respond. Please try again.",
            ),
            BackendError::Network(_) => Self::unstructured(
                stage,
                "Could not reach the server. Check your connection and try again.",
            ),
            BackendError::Status { message, .. } | BackendError::Malformed(message) => {
                Self::unstructured(stage, message.clone())
            }
        }
    }

    fn unstructured(stage: SubmissionStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            kind: FailureKind::Unstructured,
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<ProfileField, String>> {
        match &self.kind {
            FailureKind::Structured { field_errors, .. } => Some(field_errors),
            FailureKind::Unstructured => None,
        }
    }

    /// Server details that name no known attribute.
    pub fn general_messages(&self) -> &[String] {
        match &self.kind {
            FailureKind::Structured { general, .. } => general,
            FailureKind::Unstructured => &[],
        }
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        match &self.kind {
            FailureKind::Structured { code, .. } => Some(code),
            FailureKind::Unstructured => None,
        }
    }

    /// The extraction session is gone server-side; the document has to be
    /// uploaded again.
    pub fn requires_new_upload(&self) -> bool {
        self.code() == Some(&ErrorCode::SessionNotFound)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionSession {
    pub phase: SubmissionPhase,
    pub last_error: Option<SubmissionFailure>,
    pub session_id: Option<OcrSessionId>,
    pub profile_id: Option<ProfileId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub profile_id: ProfileId,
    /// Soft warnings from confirmation; shown, never blocking.
    pub warnings: Vec<String>,
}

pub struct SubmissionCoordinator {
    backend: Arc<dyn IntakeBackend>,
    path: IntakePath,
    session: watch::Sender<SubmissionSession>,
}

impl SubmissionCoordinator {
    pub fn new(backend: Arc<dyn IntakeBackend>, path: IntakePath) -> Self {
        let (session, _) = watch::channel(SubmissionSession::default());
        Self {
            backend,
            path,
            session,
        }
    }

    pub fn path(&self) -> IntakePath {
        self.path
    }

    pub fn session(&self) -> SubmissionSession {
        self.session.borrow().clone()
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.session.borrow().phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase().is_in_flight()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionSession> {
        self.session.subscribe()
    }

    /// Claims the coordinator for a document upload.
    pub fn begin_upload(&self) -> Result<SubmissionPermit<'_>, SubmissionError> {
        self.require_path(IntakePath::Upload, "document upload")?;
        self.acquire(SubmissionPhase::Uploading, |_| Ok(()))
    }

    /// Claims the coordinator for the create/confirm + calculate protocol.
    pub fn begin_submission(&self) -> Result<SubmissionPermit<'_>, SubmissionError> {
        let path = self.path;
        self.acquire(SubmissionPhase::Submitting, move |session| {
            if path == IntakePath::Upload && session.session_id.is_none() {
                return Err(SubmissionError::NoReviewSession);
            }
            Ok(())
        })
    }

    fn require_path(&self, path: IntakePath, operation: &'static str) -> Result<(), SubmissionError> {
        if self.path == path {
            Ok(())
        } else {
            Err(SubmissionError::WrongPath {
                operation,
                path: self.path,
            })
        }
    }

    fn acquire(
        &self,
        next: SubmissionPhase,
        check: impl FnOnce(&SubmissionSession) -> Result<(), SubmissionError>,
    ) -> Result<SubmissionPermit<'_>, SubmissionError> {
        let mut outcome = Err(SubmissionError::InFlight);
        self.session.send_if_modified(|session| {
            if session.phase.is_in_flight() {
                return false;
            }
            if let Err(err) = check(session) {
                outcome = Err(err);
                return false;
            }
            outcome = Ok(std::mem::replace(&mut session.phase, next));
            true
        });

        match outcome {
            Ok(previous) => Ok(SubmissionPermit {
                coordinator: self,
                previous,
                settled: false,
            }),
            Err(err) => {
                if matches!(err, SubmissionError::InFlight) {
                    warn!(path = %self.path, "submission: ignored trigger while a call is in flight");
                }
                Err(err)
            }
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SubmissionSession)) {
        self.session.send_modify(apply);
    }
}

/// Exclusive right to run one backend protocol. Dropping an unsettled permit
/// (for example when its future is cancelled) returns the session to the
/// phase it had before.
pub struct SubmissionPermit<'a> {
    coordinator: &'a SubmissionCoordinator,
    previous: SubmissionPhase,
    settled: bool,
}

impl SubmissionPermit<'_> {
    pub async fn upload(
        mut self,
        document: &DocumentUpload,
    ) -> Result<ConfidenceFieldReconciler, SubmissionError> {
        let coordinator = self.coordinator;
        let response = match coordinator.backend.upload_document(document).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(SubmissionStage::Upload, &err)),
        };

        match ConfidenceFieldReconciler::from_upload(&response) {
            Ok(reconciler) => {
                info!(
                    session_id = %response.session_id,
                    fields = response.summary.field_count,
                    "submission: extraction ready for review"
                );
                coordinator.update(|session| {
                    session.phase = SubmissionPhase::Reviewing;
                    session.last_error = None;
                    session.session_id = Some(response.session_id.clone());
                    session.profile_id = None;
                });
                self.settled = true;
                Ok(reconciler)
            }
            Err(ReconcileError::NothingExtracted) => {
                info!(session_id = %response.session_id, "submission: nothing extracted, suggest manual entry");
                coordinator.update(|session| {
                    session.phase = SubmissionPhase::Idle;
                    session.last_error = None;
                    session.session_id = None;
                });
                self.settled = true;
                Err(ReconcileError::NothingExtracted.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Manual path: stores the profile, then calculates it.
    pub async fn submit_manual(
        mut self,
        profile: &FinancialProfile,
        publisher: HandoffPublisher,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let coordinator = self.coordinator;
        coordinator.require_path(IntakePath::Manual, "profile creation")?;

        let created = match coordinator.backend.create_profile(profile).await {
            Ok(created) => created,
            Err(err) => return Err(self.fail(SubmissionStage::CreateProfile, &err)),
        };
        info!(profile_id = %created.profile_id, "submission: profile stored");
        coordinator.update(|session| session.profile_id = Some(created.profile_id.clone()));

        self.calculate_and_publish(created.profile_id, Vec::new(), publisher)
            .await
    }

    /// Upload path: confirms the reviewed values, then calculates.
    pub async fn confirm(
        mut self,
        edited_fields: BTreeMap<ProfileField, FieldValue>,
        publisher: HandoffPublisher,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let coordinator = self.coordinator;
        coordinator.require_path(IntakePath::Upload, "profile confirmation")?;
        let Some(session_id) = coordinator.session.borrow().session_id.clone() else {
            return Err(SubmissionError::NoReviewSession);
        };

        let request = ConfirmProfileRequest {
            session_id,
            edited_fields,
        };
        let confirmed = match coordinator.backend.confirm_profile(&request).await {
            Ok(confirmed) => confirmed,
            Err(err) => return Err(self.fail(SubmissionStage::ConfirmProfile, &err)),
        };
        info!(
            profile_id = %confirmed.profile_id,
            warnings = confirmed.warnings.len(),
            "submission: profile confirmed"
        );
        coordinator.update(|session| session.profile_id = Some(confirmed.profile_id.clone()));

        self.calculate_and_publish(confirmed.profile_id, confirmed.warnings, publisher)
            .await
    }

    async fn calculate_and_publish(
        mut self,
        profile_id: ProfileId,
        warnings: Vec<String>,
        publisher: HandoffPublisher,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let coordinator = self.coordinator;
        let result: CalculationResult = match coordinator.backend.calculate(&profile_id).await {
            Ok(result) => result,
            Err(err) => return Err(self.fail(SubmissionStage::Calculate, &err)),
        };

        if publisher
            .publish(ResultHandoffPacket::new(profile_id.clone(), result))
            .is_err()
        {
            warn!(profile_id = %profile_id, "submission: result view is gone, packet dropped");
        }
        coordinator.update(|session| {
            session.phase = SubmissionPhase::Done;
            session.last_error = None;
            session.profile_id = Some(profile_id.clone());
        });
        self.settled = true;
        info!(profile_id = %profile_id, "submission: result handed off");

        Ok(SubmissionReceipt {
            profile_id,
            warnings,
        })
    }

    fn fail(&mut self, stage: SubmissionStage, err: &BackendError) -> SubmissionError {
        let failure = SubmissionFailure::from_backend(stage, err);
        error!(%stage, error = %err, "submission: backend call failed");
        self.coordinator.update(|session| {
            session.phase = SubmissionPhase::Failed;
            session.last_error = Some(failure.clone());
        });
        self.settled = true;
        SubmissionError::Failed { stage, failure }
    }
}

impl Drop for SubmissionPermit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let previous = self.previous;
        self.coordinator.session.send_if_modified(|session| {
            if session.phase.is_in_flight() {
                session.phase = previous;
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
