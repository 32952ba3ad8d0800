use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{AgeBracket, CityType, InputMethod, ProfileField, ProfileId},
    protocol::{FieldValue, FinancialProfile},
};
use thiserror::Error;

use crate::constraints::{describe_age, describe_city, format_inr, ValidationErrors};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DraftError {
    #[error("{0} is not a currency field")]
    NotAnAmount(ProfileField),
}

/// The profile being assembled by whichever intake path is active.
///
/// A blank currency field is absent from `amounts`; it becomes zero only when
/// the draft is turned into a [`FinancialProfile`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfileDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_type: Option<CityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_bracket: Option<AgeBracket>,
    #[serde(default)]
    pub parent_senior_citizen: bool,
    #[serde(flatten)]
    amounts: BTreeMap<ProfileField, f64>,
}

impl FinancialProfileDraft {
    pub fn amount(&self, field: ProfileField) -> Option<f64> {
        self.amounts.get(&field).copied()
    }

    pub fn set_amount(&mut self, field: ProfileField, value: Option<f64>) -> Result<(), DraftError> {
        if !field.is_amount() {
            return Err(DraftError::NotAnAmount(field));
        }
        match value {
            Some(value) => self.amounts.insert(field, value),
            None => self.amounts.remove(&field),
        };
        Ok(())
    }

    pub fn value(&self, field: ProfileField) -> Option<FieldValue> {
        match field {
            ProfileField::CityType => self.city_type.map(FieldValue::City),
            ProfileField::AgeBracket => self.age_bracket.map(FieldValue::Age),
            ProfileField::ParentSeniorCitizen => Some(FieldValue::Flag(self.parent_senior_citizen)),
            amount => self.amount(amount).map(FieldValue::Amount),
        }
    }

    /// Human-readable value for review screens; blanks render as a dash.
    pub fn display_value(&self, field: ProfileField) -> String {
        match self.value(field) {
            Some(FieldValue::Amount(amount)) => format_inr(amount),
            Some(FieldValue::City(city)) => describe_city(city).to_string(),
            Some(FieldValue::Age(age)) => describe_age(age).to_string(),
            Some(FieldValue::Flag(true)) => "Yes".to_string(),
            Some(FieldValue::Flag(false)) => "No".to_string(),
            None => "-".to_string(),
        }
    }

    /// Builds the wire profile. Optional blanks are sent as zero; missing
    /// required values are reported instead of guessed.
    pub fn to_profile(
        &self,
        input_method: InputMethod,
        profile_id: Option<ProfileId>,
    ) -> Result<FinancialProfile, ValidationErrors> {
        let (Some(basic_salary), Some(city_type), Some(age_bracket)) = (
            self.amount(ProfileField::BasicSalary),
            self.city_type,
            self.age_bracket,
        ) else {
            let mut errors = ValidationErrors::default();
            if self.amount(ProfileField::BasicSalary).is_none() {
                errors.insert(ProfileField::BasicSalary, "Basic salary is required");
            }
            if self.city_type.is_none() {
                errors.insert(ProfileField::CityType, "Select City type");
            }
            if self.age_bracket.is_none() {
                errors.insert(ProfileField::AgeBracket, "Select Age bracket");
            }
            return Err(errors);
        };

        let amount = |field| self.amount(field).unwrap_or(0.0);
        Ok(FinancialProfile {
            profile_id,
            basic_salary,
            hra_received: amount(ProfileField::HraReceived),
            special_allowance: amount(ProfileField::SpecialAllowance),
            lta: amount(ProfileField::Lta),
            other_allowances: amount(ProfileField::OtherAllowances),
            professional_tax: amount(ProfileField::ProfessionalTax),
            monthly_rent_paid: amount(ProfileField::MonthlyRentPaid),
            city_type,
            other_income: amount(ProfileField::OtherIncome),
            investments_80c: amount(ProfileField::Investments80c),
            ppf_contribution: amount(ProfileField::PpfContribution),
            home_loan_principal: amount(ProfileField::HomeLoanPrincipal),
            health_insurance_self: amount(ProfileField::HealthInsuranceSelf),
            health_insurance_parents: amount(ProfileField::HealthInsuranceParents),
            employee_nps_80ccd1b: amount(ProfileField::EmployeeNps80ccd1b),
            employer_nps_80ccd2: amount(ProfileField::EmployerNps80ccd2),
            home_loan_interest: amount(ProfileField::HomeLoanInterest),
            savings_interest_80tta: amount(ProfileField::SavingsInterest80tta),
            age_bracket,
            parent_senior_citizen: self.parent_senior_citizen,
            input_method,
        })
    }
}
