//! Scripted backend shared by the unit tests of this crate.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::{AgeBracket, CityType, Confidence, InputMethod, OcrSessionId, ProfileId},
    protocol::{
        CalculationResult, ConfirmProfileRequest, ConfirmProfileResponse, CreateProfileResponse,
        ExtractedField, FinancialProfile, UploadResponse,
    },
};
use tokio::sync::Notify;

use crate::{
    backend::{BackendError, IntakeBackend},
    document::DocumentUpload,
};

#[derive(Default)]
pub(crate) struct Calls {
    pub upload: AtomicUsize,
    pub confirm: AtomicUsize,
    pub create: AtomicUsize,
    pub calculate: AtomicUsize,
}

pub(crate) struct ScriptedBackend {
    pub calls: Calls,
    pub gate: Option<Arc<Notify>>,
    pub extracted: Vec<(&'static str, Option<f64>, Confidence)>,
    pub missing: Vec<&'static str>,
    pub confirm_error: Option<BackendError>,
    pub create_error: Option<BackendError>,
    pub calculate_error: Option<BackendError>,
}

impl ScriptedBackend {
    pub fn ok() -> Self {
        Self {
            calls: Calls::default(),
            gate: None,
            extracted: vec![
                ("basic_salary", Some(1_200_000.0), Confidence::Green),
                ("hra_received", Some(50_000.0), Confidence::Yellow),
            ],
            missing: Vec::new(),
            confirm_error: None,
            create_error: None,
            calculate_error: None,
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok()
        }
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl IntakeBackend for ScriptedBackend {
    async fn upload_document(
        &self,
        _document: &DocumentUpload,
    ) -> Result<UploadResponse, BackendError> {
        self.calls.upload.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        Ok(UploadResponse {
            session_id: OcrSessionId::from("ocr-1"),
            extracted_fields: self
                .extracted
                .iter()
                .map(|(name, value, confidence)| {
                    (
                        name.to_string(),
                        ExtractedField {
                            value: *value,
                            confidence: *confidence,
                        },
                    )
                })
                .collect(),
            reference_fields: Default::default(),
            missing_profile_fields: self.missing.iter().map(|name| name.to_string()).collect(),
            summary: Default::default(),
            warnings: Vec::new(),
        })
    }

    async fn confirm_profile(
        &self,
        request: &ConfirmProfileRequest,
    ) -> Result<ConfirmProfileResponse, BackendError> {
        self.calls.confirm.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.session_id.as_str(), "ocr-1");
        self.pass_gate().await;
        if let Some(err) = &self.confirm_error {
            return Err(err.clone());
        }
        Ok(ConfirmProfileResponse {
            profile_id: ProfileId::from("p1"),
            status: Some("confirmed".into()),
            warnings: vec!["HRA exceeds rent-based exemption".into()],
        })
    }

    async fn create_profile(
        &self,
        profile: &FinancialProfile,
    ) -> Result<CreateProfileResponse, BackendError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        if let Some(err) = &self.create_error {
            return Err(err.clone());
        }
        Ok(CreateProfileResponse {
            profile_id: profile
                .profile_id
                .clone()
                .unwrap_or_else(|| ProfileId::from("p-server")),
            session_id: None,
            status: None,
        })
    }

    async fn calculate(&self, profile_id: &ProfileId) -> Result<CalculationResult, BackendError> {
        self.calls.calculate.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.calculate_error {
            return Err(err.clone());
        }
        Ok(CalculationResult(json!({
            "profile_id": profile_id.as_str(),
            "recommended_regime": "new",
            "savings_amount": 18_200.0
        })))
    }
}

pub(crate) fn profile() -> FinancialProfile {
    FinancialProfile {
        profile_id: Some(ProfileId::from("p-client")),
        basic_salary: 1_200_000.0,
        hra_received: 0.0,
        special_allowance: 0.0,
        lta: 0.0,
        other_allowances: 0.0,
        professional_tax: 0.0,
        monthly_rent_paid: 0.0,
        city_type: CityType::Metro,
        other_income: 0.0,
        investments_80c: 150_000.0,
        ppf_contribution: 0.0,
        home_loan_principal: 0.0,
        health_insurance_self: 0.0,
        health_insurance_parents: 0.0,
        employee_nps_80ccd1b: 0.0,
        employer_nps_80ccd2: 0.0,
        home_loan_interest: 0.0,
        savings_interest_80tta: 0.0,
        age_bracket: AgeBracket::Under60,
        parent_senior_citizen: false,
        input_method: InputMethod::Manual,
    }
}

pub(crate) fn document() -> DocumentUpload {
    DocumentUpload::from_bytes("form16.pdf", b"%PDF-1.7 form".to_vec()).expect("document")
}
