//! Merges document-extracted values with the reviewer's overrides.
//!
//! Green values are authoritative and locked. Yellow and red values are
//! offered for review, and an override always wins over the extracted value.
//! Attributes the document cannot provide (rent, city, age, parents' age) are
//! collected separately and submitted alongside the reviewed values, as are
//! any amounts the server lists as missing from the extraction.

use std::collections::BTreeMap;

use shared::{
    domain::{AgeBracket, CityType, Confidence, ProfileField},
    protocol::{
        ExtractedField, ExtractionSummary, ExtractionWarning, FieldValue, UploadResponse,
    },
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    constraints::{FieldConstraintSet, ValidationErrors},
    draft::FinancialProfileDraft,
    error::SubmissionError,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("no values could be extracted from the document")]
    NothingExtracted,
    #[error("{0} was extracted with high confidence and cannot be edited")]
    Locked(ProfileField),
    #[error("{0} is not part of the extraction review")]
    NotReviewable(ProfileField),
}

/// Values entered next to the review grid for attributes that never come
/// from the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplementaryFields {
    pub monthly_rent_paid: Option<f64>,
    pub city_type: Option<CityType>,
    pub age_bracket: Option<AgeBracket>,
    pub parent_senior_citizen: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledField {
    pub field: ProfileField,
    pub confidence: Confidence,
    pub extracted: Option<f64>,
    pub effective: Option<f64>,
    pub editable: bool,
    pub overridden: bool,
}

#[derive(Debug, Clone)]
pub struct ConfidenceFieldReconciler {
    extracted: BTreeMap<ProfileField, ExtractedField>,
    overrides: BTreeMap<ProfileField, Option<f64>>,
    supplementary: SupplementaryFields,
    summary: ExtractionSummary,
    warnings: Vec<ExtractionWarning>,
    reference_fields: BTreeMap<String, Option<f64>>,
    /// Amounts the extraction could not provide, entered by hand.
    missing: BTreeMap<ProfileField, Option<f64>>,
    errors: ValidationErrors,
}

impl ConfidenceFieldReconciler {
    pub fn from_upload(response: &UploadResponse) -> Result<Self, ReconcileError> {
        let mut reconciler = Self::new(&response.extracted_fields)?;
        reconciler.summary = response.summary.clone();
        reconciler.warnings = response.warnings.clone();
        reconciler.reference_fields = response.reference_fields.clone();
        reconciler.seed_missing(&response.missing_profile_fields);
        Ok(reconciler)
    }

    /// Opens a manual input for every listed amount that is not already on
    /// the review grid. Rent keeps its supplementary slot; the choice and flag
    /// attributes are always collected.
    pub fn seed_missing(&mut self, names: &[String]) {
        for name in names {
            match name.parse::<ProfileField>() {
                Ok(ProfileField::MonthlyRentPaid) => {}
                Ok(field) if field.is_amount() => {
                    if !self.extracted.contains_key(&field) {
                        self.missing.entry(field).or_insert(None);
                    }
                }
                Ok(_) => {}
                Err(_) => warn!(field = %name, "reconcile: ignoring unrecognised missing attribute"),
            }
        }
        debug!(missing = self.missing.len(), "reconcile: manual inputs opened");
    }

    pub fn new(extracted_fields: &BTreeMap<String, ExtractedField>) -> Result<Self, ReconcileError> {
        let mut extracted = BTreeMap::new();
        for (name, value) in extracted_fields {
            match name.parse::<ProfileField>() {
                Ok(field) if field.is_amount() => {
                    extracted.insert(field, *value);
                }
                _ => warn!(field = %name, "reconcile: ignoring unrecognised extracted attribute"),
            }
        }

        if !extracted.values().any(|value| value.value.is_some()) {
            return Err(ReconcileError::NothingExtracted);
        }

        debug!(
            fields = extracted.len(),
            locked = extracted.values().filter(|v| v.confidence.is_locked()).count(),
            "reconcile: extraction accepted for review"
        );
        Ok(Self {
            extracted,
            overrides: BTreeMap::new(),
            supplementary: SupplementaryFields::default(),
            summary: ExtractionSummary::default(),
            warnings: Vec::new(),
            reference_fields: BTreeMap::new(),
            missing: BTreeMap::new(),
            errors: ValidationErrors::default(),
        })
    }

    pub fn effective_value(&self, field: ProfileField) -> Option<f64> {
        if let Some(value) = self.missing.get(&field) {
            return *value;
        }
        match self.overrides.get(&field) {
            Some(value) => *value,
            None => self.extracted.get(&field).and_then(|e| e.value),
        }
    }

    pub fn confidence(&self, field: ProfileField) -> Option<Confidence> {
        self.extracted.get(&field).map(|e| e.confidence)
    }

    pub fn is_editable(&self, field: ProfileField) -> bool {
        self.missing.contains_key(&field)
            || self.confidence(field).is_some_and(|c| !c.is_locked())
    }

    /// Sets (or with `None`, blanks) the reviewer's value for a yellow or red
    /// field, or for an amount the extraction listed as missing.
    pub fn set_override(
        &mut self,
        field: ProfileField,
        value: Option<f64>,
    ) -> Result<(), ReconcileError> {
        if let Some(slot) = self.missing.get_mut(&field) {
            *slot = value;
            self.errors.remove(field);
            return Ok(());
        }
        match self.confidence(field) {
            None => Err(ReconcileError::NotReviewable(field)),
            Some(confidence) if confidence.is_locked() => Err(ReconcileError::Locked(field)),
            Some(_) => {
                self.overrides.insert(field, value);
                self.errors.remove(field);
                Ok(())
            }
        }
    }

    pub fn clear_override(&mut self, field: ProfileField) {
        if let Some(slot) = self.missing.get_mut(&field) {
            *slot = None;
        }
        self.overrides.remove(&field);
    }

    /// Manual inputs for amounts the extraction did not provide.
    pub fn missing_fields(&self) -> impl Iterator<Item = (ProfileField, Option<f64>)> + '_ {
        self.missing.iter().map(|(field, value)| (*field, *value))
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error_for(&self, field: ProfileField) -> Option<&str> {
        self.errors.get(field)
    }

    /// Keeps client-side messages for display next to the review grid.
    pub fn record_errors(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    /// Attaches per-field server messages from a failed confirmation.
    pub fn apply_server_errors(&mut self, err: &SubmissionError) {
        let Some(field_errors) = err.failure().and_then(|f| f.field_errors()) else {
            return;
        };
        for (field, message) in field_errors {
            self.errors.insert(*field, message.clone());
        }
    }

    pub fn review_grid(&self) -> Vec<ReconciledField> {
        self.extracted
            .iter()
            .map(|(field, extracted)| ReconciledField {
                field: *field,
                confidence: extracted.confidence,
                extracted: extracted.value,
                effective: self.effective_value(*field),
                editable: !extracted.confidence.is_locked(),
                overridden: self.overrides.contains_key(field),
            })
            .collect()
    }

    pub fn supplementary(&self) -> &SupplementaryFields {
        &self.supplementary
    }

    pub fn supplementary_mut(&mut self) -> &mut SupplementaryFields {
        &mut self.supplementary
    }

    pub fn summary(&self) -> &ExtractionSummary {
        &self.summary
    }

    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.warnings
    }

    pub fn reference_fields(&self) -> &BTreeMap<String, Option<f64>> {
        &self.reference_fields
    }

    /// Effective values and supplementary inputs as one draft, so the shared
    /// constraint rules (including cross-field caps) can be applied.
    pub fn merged_draft(&self) -> FinancialProfileDraft {
        let mut draft = FinancialProfileDraft::default();
        draft.city_type = self.supplementary.city_type;
        draft.age_bracket = self.supplementary.age_bracket;
        draft.parent_senior_citizen = self.supplementary.parent_senior_citizen;
        for field in self.extracted.keys().chain(self.missing.keys()) {
            // Both maps hold amount fields only.
            let _ = draft.set_amount(*field, self.effective_value(*field));
        }
        if !self.extracted.contains_key(&ProfileField::MonthlyRentPaid) {
            let _ = draft.set_amount(
                ProfileField::MonthlyRentPaid,
                self.supplementary.monthly_rent_paid,
            );
        }
        draft
    }

    /// Checks the fields the reviewer is responsible for. Locked values are
    /// not re-validated here; the server is the authority on those.
    pub fn validate(&self, constraints: &FieldConstraintSet) -> Result<(), ValidationErrors> {
        let draft = self.merged_draft();
        let reviewable = self
            .extracted
            .iter()
            .filter(|(_, e)| !e.confidence.is_locked())
            .map(|(field, _)| *field)
            .chain(self.missing.keys().copied());
        let supplementary = [
            ProfileField::MonthlyRentPaid,
            ProfileField::CityType,
            ProfileField::AgeBracket,
            ProfileField::ParentSeniorCitizen,
        ];
        constraints.validate_fields(reviewable.chain(supplementary), &draft)
    }

    /// The `edited_fields` map for profile confirmation: every reviewable
    /// value, every manual input and the supplementary inputs. Blank amounts
    /// are sent as zero.
    pub fn edited_fields(&self) -> BTreeMap<ProfileField, FieldValue> {
        let mut fields: BTreeMap<ProfileField, FieldValue> = self
            .extracted
            .iter()
            .filter(|(_, e)| !e.confidence.is_locked())
            .map(|(field, _)| *field)
            .chain(self.missing.keys().copied())
            .map(|field| {
                let value = self.effective_value(field).unwrap_or(0.0);
                (field, FieldValue::Amount(value))
            })
            .collect();

        fields
            .entry(ProfileField::MonthlyRentPaid)
            .or_insert(FieldValue::Amount(
                self.supplementary.monthly_rent_paid.unwrap_or(0.0),
            ));
        if let Some(city) = self.supplementary.city_type {
            fields.insert(ProfileField::CityType, FieldValue::City(city));
        }
        if let Some(age) = self.supplementary.age_bracket {
            fields.insert(ProfileField::AgeBracket, FieldValue::Age(age));
        }
        fields.insert(
            ProfileField::ParentSeniorCitizen,
            FieldValue::Flag(self.supplementary.parent_senior_citizen),
        );
        fields
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
