//! Step-wise manual entry of a financial profile.

use std::sync::Arc;

use shared::{
    domain::{AgeBracket, CityType, InputMethod, ProfileField, ProfileId},
    protocol::FinancialProfile,
};
use tracing::{debug, info};

use crate::{
    constraints::{ActiveCap, FieldConstraintSet, IntakeStep, ValidationErrors},
    draft::{DraftError, FinancialProfileDraft},
    error::SubmissionError,
    orchestration::{CompletedSubmission, IntakeController},
};

/// One line of the review step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLine {
    pub step: IntakeStep,
    pub field: ProfileField,
    pub label: &'static str,
    pub value: String,
}

/// Wizard state for the manual intake path.
///
/// Advancing validates only the current step. The draft lives until a result
/// has been handed off, at which point the builder starts over with a fresh
/// profile id.
#[derive(Debug, Clone)]
pub struct ProfileDraftBuilder {
    constraints: Arc<FieldConstraintSet>,
    draft: FinancialProfileDraft,
    profile_id: ProfileId,
    step: IntakeStep,
    errors: ValidationErrors,
}

impl ProfileDraftBuilder {
    pub fn new(constraints: Arc<FieldConstraintSet>) -> Self {
        Self::with_draft(constraints, FinancialProfileDraft::default())
    }

    /// Starts from a pre-filled draft, for example one loaded from disk.
    pub fn with_draft(constraints: Arc<FieldConstraintSet>, draft: FinancialProfileDraft) -> Self {
        Self {
            constraints,
            draft,
            profile_id: ProfileId::generate(),
            step: IntakeStep::Income,
            errors: ValidationErrors::default(),
        }
    }

    pub fn step(&self) -> IntakeStep {
        self.step
    }

    pub fn draft(&self) -> &FinancialProfileDraft {
        &self.draft
    }

    pub fn profile_id(&self) -> &ProfileId {
        &self.profile_id
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error_for(&self, field: ProfileField) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn fields_on_step(&self) -> Vec<ProfileField> {
        self.constraints
            .for_step(self.step)
            .map(|c| c.field)
            .collect()
    }

    /// Moves to the next step if the current one is valid. On failure the
    /// step is unchanged and the messages are kept for display.
    pub fn advance(&mut self) -> Result<IntakeStep, ValidationErrors> {
        let Some(next) = self.step.next() else {
            return Ok(self.step);
        };
        if let Err(errors) = self.constraints.validate_step(self.step, &self.draft) {
            debug!(step = %self.step, invalid = errors.len(), "wizard: step blocked");
            self.errors = errors.clone();
            return Err(errors);
        }
        self.errors.clear();
        self.step = next;
        Ok(next)
    }

    /// Moves back one step. Going back never validates.
    pub fn retreat(&mut self) -> IntakeStep {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.step
    }

    pub fn set_amount(&mut self, field: ProfileField, value: Option<f64>) -> Result<(), DraftError> {
        self.draft.set_amount(field, value)?;
        self.after_edit(field);
        Ok(())
    }

    pub fn set_city_type(&mut self, city: Option<CityType>) {
        self.draft.city_type = city;
        self.after_edit(ProfileField::CityType);
    }

    pub fn set_age_bracket(&mut self, age: Option<AgeBracket>) {
        self.draft.age_bracket = age;
        self.after_edit(ProfileField::AgeBracket);
    }

    pub fn set_parent_senior_citizen(&mut self, parent_senior_citizen: bool) {
        self.draft.parent_senior_citizen = parent_senior_citizen;
        self.after_edit(ProfileField::ParentSeniorCitizen);
    }

    /// Re-checks the edited field when it holds a value (a blank is only
    /// reported on advance), then every field whose cap depends on it, so a
    /// sibling change is reflected immediately.
    fn after_edit(&mut self, field: ProfileField) {
        match self
            .draft
            .value(field)
            .and_then(|_| self.constraints.get(field))
            .and_then(|c| c.check(&self.draft))
        {
            Some(message) => self.errors.insert(field, message),
            None => {
                self.errors.remove(field);
            }
        }
        let dependents: Vec<ProfileField> = self
            .constraints
            .dependents_of(field)
            .map(|c| c.field)
            .filter(|dep| self.draft.value(*dep).is_some() || self.errors.contains(*dep))
            .collect();
        for dependent in dependents {
            match self.constraints.get(dependent).and_then(|c| c.check(&self.draft)) {
                Some(message) => self.errors.insert(dependent, message),
                None => {
                    self.errors.remove(dependent);
                }
            }
        }
    }

    pub fn active_cap(&self, field: ProfileField) -> Option<ActiveCap> {
        self.constraints.get(field)?.active_cap(&self.draft)
    }

    pub fn help_text(&self, field: ProfileField) -> Option<String> {
        self.constraints.get(field)?.help_text(&self.draft)
    }

    /// Every field of the draft grouped in step order, with display values.
    pub fn review_summary(&self) -> Vec<ReviewLine> {
        IntakeStep::ALL
            .into_iter()
            .flat_map(move |step| {
                self.constraints.for_step(step).map(move |c| ReviewLine {
                    step,
                    field: c.field,
                    label: c.field.label(),
                    value: self.draft.display_value(c.field),
                })
            })
            .collect()
    }

    /// Whole-draft validation for the terminal step.
    pub fn prepare_submission(&mut self) -> Result<FinancialProfile, SubmissionError> {
        if !self.step.is_terminal() {
            return Err(SubmissionError::NotOnReviewStep);
        }
        if let Err(errors) = self.constraints.validate_all(&self.draft) {
            self.errors = errors.clone();
            return Err(SubmissionError::Invalid(errors));
        }
        let profile = self
            .draft
            .to_profile(InputMethod::Manual, Some(self.profile_id.clone()))?;
        Ok(profile)
    }

    /// Submits the draft. On success the draft is discarded; on failure it is
    /// left as it was, with any per-field server messages attached.
    pub async fn submit(
        &mut self,
        controller: &IntakeController,
    ) -> Result<CompletedSubmission, SubmissionError> {
        let profile = self.prepare_submission()?;
        match controller.submit_manual(profile).await {
            Ok(completed) => {
                info!(profile_id = %completed.receipt.profile_id, "wizard: draft submitted, discarding");
                self.reset();
                Ok(completed)
            }
            Err(err) => {
                self.apply_server_errors(&err);
                Err(err)
            }
        }
    }

    fn apply_server_errors(&mut self, err: &SubmissionError) {
        let Some(field_errors) = err.failure().and_then(|f| f.field_errors()) else {
            return;
        };
        for (field, message) in field_errors {
            self.errors.insert(*field, message.clone());
        }
    }

    /// Empties the draft and starts a new profile at the first step.
    pub fn reset(&mut self) {
        self.draft = FinancialProfileDraft::default();
        self.profile_id = ProfileId::generate();
        self.step = IntakeStep::Income;
        self.errors.clear();
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
