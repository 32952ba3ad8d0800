use std::{sync::atomic::Ordering, time::Duration};

use shared::{domain::Confidence, error::ApiError};
use tokio::sync::Notify;

use super::*;
use crate::{
    handoff::transition,
    test_support::{document, profile, ScriptedBackend},
};

#[tokio::test]
async fn manual_submission_creates_then_calculates() {
    let backend = Arc::new(ScriptedBackend::ok());
    let coordinator = SubmissionCoordinator::new(backend.clone(), IntakePath::Manual);
    let (publisher, mut receiver) = transition();

    let receipt = coordinator
        .begin_submission()
        .expect("permit")
        .submit_manual(&profile(), publisher)
        .await
        .expect("submitted");

    assert_eq!(receipt.profile_id.as_str(), "p-client");
    assert_eq!(backend.calls.create.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls.calculate.load(Ordering::SeqCst), 1);
    let session = coordinator.session();
    assert_eq!(session.phase, SubmissionPhase::Done);
    assert_eq!(session.profile_id, Some(ProfileId::from("p-client")));

    let packet = receiver.consume().expect("packet published");
    assert_eq!(packet.result.savings_amount(), Some(18_200.0));
}

#[tokio::test]
async fn second_submit_while_in_flight_makes_no_network_call() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(gate.clone()));
    let coordinator = Arc::new(SubmissionCoordinator::new(backend.clone(), IntakePath::Manual));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let (publisher, _receiver) = transition();
            coordinator
                .begin_submission()
                .expect("first permit")
                .submit_manual(&profile(), publisher)
                .await
        })
    };

    let mut rx = coordinator.subscribe();
    rx.wait_for(|s| s.phase == SubmissionPhase::Submitting)
        .await
        .expect("phase");
    while backend.calls.create.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    assert!(coordinator.is_in_flight());
    assert!(matches!(
        coordinator.begin_submission(),
        Err(SubmissionError::InFlight)
    ));

    gate.notify_one();
    first.await.expect("join").expect("first submission");
    assert_eq!(backend.calls.create.load(Ordering::SeqCst), 1);
    assert_eq!(backend.calls.calculate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_then_confirm_carries_warnings() {
    let backend = Arc::new(ScriptedBackend::ok());
    let coordinator = SubmissionCoordinator::new(backend.clone(), IntakePath::Upload);

    let mut reconciler = coordinator
        .begin_upload()
        .expect("permit")
        .upload(&document())
        .await
        .expect("uploaded");
    assert_eq!(coordinator.phase(), SubmissionPhase::Reviewing);
    assert_eq!(
        coordinator.session().session_id,
        Some(OcrSessionId::from("ocr-1"))
    );

    reconciler
        .set_override(ProfileField::HraReceived, Some(60_000.0))
        .expect("override");
    let (publisher, mut receiver) = transition();
    let receipt = coordinator
        .begin_submission()
        .expect("permit")
        .confirm(reconciler.edited_fields(), publisher)
        .await
        .expect("confirmed");

    assert_eq!(receipt.profile_id.as_str(), "p1");
    assert_eq!(receipt.warnings.len(), 1);
    assert_eq!(coordinator.phase(), SubmissionPhase::Done);
    assert!(receiver.consume().is_some());
}

#[tokio::test]
async fn confirm_requires_a_review_session() {
    let backend = Arc::new(ScriptedBackend::ok());
    let coordinator = SubmissionCoordinator::new(backend.clone(), IntakePath::Upload);
    assert!(matches!(
        coordinator.begin_submission(),
        Err(SubmissionError::NoReviewSession)
    ));
    assert_eq!(coordinator.phase(), SubmissionPhase::Idle);
}

#[tokio::test]
async fn manual_coordinator_refuses_uploads() {
    let coordinator =
        SubmissionCoordinator::new(Arc::new(ScriptedBackend::ok()), IntakePath::Manual);
    assert!(matches!(
        coordinator.begin_upload(),
        Err(SubmissionError::WrongPath { path: IntakePath::Manual, .. })
    ));
}

#[tokio::test]
async fn empty_extraction_returns_to_idle() {
    let backend = Arc::new(ScriptedBackend {
        extracted: vec![("basic_salary", None, Confidence::Red)],
        ..ScriptedBackend::ok()
    });
    let coordinator = SubmissionCoordinator::new(backend, IntakePath::Upload);

    let err = coordinator
        .begin_upload()
        .expect("permit")
        .upload(&document())
        .await
        .expect_err("nothing extracted");
    assert!(matches!(
        err,
        SubmissionError::Reconcile(ReconcileError::NothingExtracted)
    ));
    let session = coordinator.session();
    assert_eq!(session.phase, SubmissionPhase::Idle);
    assert_eq!(session.last_error, None);
}

#[tokio::test]
async fn calculate_timeout_after_confirm_fails_without_publishing() {
    let backend = Arc::new(ScriptedBackend {
        calculate_error: Some(BackendError::Timeout),
        ..ScriptedBackend::ok()
    });
    let coordinator = SubmissionCoordinator::new(backend.clone(), IntakePath::Upload);
    let reconciler = coordinator
        .begin_upload()
        .expect("permit")
        .upload(&document())
        .await
        .expect("uploaded");

    let (publisher, mut receiver) = transition();
    let err = coordinator
        .begin_submission()
        .expect("permit")
        .confirm(reconciler.edited_fields(), publisher)
        .await
        .expect_err("calculate fails");

    match err {
        SubmissionError::Failed { stage, failure } => {
            assert_eq!(stage, SubmissionStage::Calculate);
            assert_eq!(failure.kind, FailureKind::Unstructured);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    let session = coordinator.session();
    assert_eq!(session.phase, SubmissionPhase::Failed);
    assert_eq!(session.profile_id, Some(ProfileId::from("p1")));
    assert!(session.last_error.is_some());
    assert_eq!(receiver.consume(), None);
    // The review session is kept so the user can confirm again.
    assert!(coordinator.begin_submission().is_ok());
}

#[tokio::test]
async fn structured_errors_are_split_by_field() {
    let error = ApiError::new(ErrorCode::ValidationError, "Profile is invalid")
        .with_detail(Some("body.basic_salary"), "must be greater than zero")
        .with_detail(Some("body.__root__"), "profile incomplete")
        .with_detail(None, "try again later");
    let backend = Arc::new(ScriptedBackend {
        create_error: Some(BackendError::Api {
            status: reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            error,
        }),
        ..ScriptedBackend::ok()
    });
    let coordinator = SubmissionCoordinator::new(backend.clone(), IntakePath::Manual);
    let (publisher, _receiver) = transition();

    let err = coordinator
        .begin_submission()
        .expect("permit")
        .submit_manual(&profile(), publisher)
        .await
        .expect_err("rejected");
    let failure = err.failure().expect("failure");
    assert_eq!(failure.stage, SubmissionStage::CreateProfile);
    assert_eq!(failure.message, "Profile is invalid");
    match &failure.kind {
        FailureKind::Structured {
            code,
            field_errors,
            general,
        } => {
            assert_eq!(code, &ErrorCode::ValidationError);
            assert_eq!(
                field_errors.get(&ProfileField::BasicSalary).map(String::as_str),
                Some("must be greater than zero")
            );
            assert_eq!(general.len(), 2);
        }
        other => panic!("expected structured failure, got {other:?}"),
    }
    assert_eq!(backend.calls.calculate.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dropped_permit_restores_previous_phase() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(gate));
    let coordinator = SubmissionCoordinator::new(backend, IntakePath::Manual);
    let (publisher, _receiver) = transition();

    let permit = coordinator.begin_submission().expect("permit");
    let profile = profile();
    let attempt = permit.submit_manual(&profile, publisher);
    let timed_out = tokio::time::timeout(Duration::from_millis(20), attempt).await;
    assert!(timed_out.is_err());

    assert_eq!(coordinator.phase(), SubmissionPhase::Idle);
    assert!(coordinator.begin_submission().is_ok());
}

#[test]
fn transient_failures_get_generic_messages() {
    let timeout = SubmissionFailure::from_backend(SubmissionStage::Calculate, &BackendError::Timeout);
    assert!(timeout.message.contains("too long"));
    let network = SubmissionFailure::from_backend(
        SubmissionStage::Upload,
        &BackendError::Network("connection refused".into()),
    );
    assert!(network.message.contains("Could not reach"));
    assert!(!network.requires_new_upload());
}
