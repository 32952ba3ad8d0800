use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    AgeBracket, CityType, Confidence, InputMethod, OcrSessionId, ProfileField, ProfileId,
};

/// Complete profile as accepted by `POST api/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<ProfileId>,
    pub basic_salary: f64,
    pub hra_received: f64,
    pub special_allowance: f64,
    pub lta: f64,
    pub other_allowances: f64,
    pub professional_tax: f64,
    pub monthly_rent_paid: f64,
    pub city_type: CityType,
    pub other_income: f64,
    pub investments_80c: f64,
    pub ppf_contribution: f64,
    pub home_loan_principal: f64,
    pub health_insurance_self: f64,
    pub health_insurance_parents: f64,
    pub employee_nps_80ccd1b: f64,
    pub employer_nps_80ccd2: f64,
    pub home_loan_interest: f64,
    pub savings_interest_80tta: f64,
    pub age_bracket: AgeBracket,
    pub parent_senior_citizen: bool,
    pub input_method: InputMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Amount(f64),
    Flag(bool),
    City(CityType),
    Age(AgeBracket),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    #[serde(default)]
    pub value: Option<f64>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub field_count: u32,
    pub green_count: u32,
    pub yellow_count: u32,
    pub red_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionWarning {
    pub code: String,
    pub message: String,
}

/// Response of `POST api/upload`. Field names stay raw strings so unknown
/// attributes from newer extractors do not fail the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: OcrSessionId,
    #[serde(default)]
    pub extracted_fields: BTreeMap<String, ExtractedField>,
    #[serde(default)]
    pub reference_fields: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub missing_profile_fields: Vec<String>,
    #[serde(default)]
    pub summary: ExtractionSummary,
    #[serde(default)]
    pub warnings: Vec<ExtractionWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmProfileRequest {
    pub session_id: OcrSessionId,
    pub edited_fields: BTreeMap<ProfileField, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmProfileResponse {
    pub profile_id: ProfileId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProfileResponse {
    pub profile_id: ProfileId,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub profile_id: ProfileId,
}

/// Calculation output. Opaque to the intake flow; the presentation view
/// reads a couple of headline values from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculationResult(pub Value);

impl CalculationResult {
    pub fn recommended_regime(&self) -> Option<&str> {
        self.0.get("recommended_regime").and_then(Value::as_str)
    }

    pub fn savings_amount(&self) -> Option<f64> {
        self.0.get("savings_amount").and_then(Value::as_f64)
    }

    pub fn rationale(&self) -> Option<&str> {
        self.0.get("rationale").and_then(Value::as_str)
    }
}
