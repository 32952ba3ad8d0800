use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(ProfileId);
id_newtype!(OcrSessionId);

impl ProfileId {
    /// Client-assigned id; the backend treats a repeated id as an upsert.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityType {
    Metro,
    NonMetro,
}

impl CityType {
    pub const ALL: [CityType; 2] = [CityType::Metro, CityType::NonMetro];

    pub fn as_str(self) -> &'static str {
        match self {
            CityType::Metro => "metro",
            CityType::NonMetro => "non_metro",
        }
    }
}

impl FromStr for CityType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|city| city.as_str() == s.trim())
            .ok_or_else(|| ParseValueError {
                kind: "city type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "under60")]
    Under60,
    #[serde(rename = "60_79")]
    Senior,
    #[serde(rename = "80plus")]
    SuperSenior,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 3] = [
        AgeBracket::Under60,
        AgeBracket::Senior,
        AgeBracket::SuperSenior,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgeBracket::Under60 => "under60",
            AgeBracket::Senior => "60_79",
            AgeBracket::SuperSenior => "80plus",
        }
    }

    pub fn is_senior(self) -> bool {
        !matches!(self, AgeBracket::Under60)
    }
}

impl FromStr for AgeBracket {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bracket| bracket.as_str() == s.trim())
            .ok_or_else(|| ParseValueError {
                kind: "age bracket",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMethod {
    Ocr,
    Manual,
}

/// Confidence tier attached to every document-extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Green,
    Yellow,
    Red,
}

impl Confidence {
    /// Green values are trusted as extracted and never offered for editing.
    pub fn is_locked(self) -> bool {
        matches!(self, Confidence::Green)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Green => "green",
            Confidence::Yellow => "yellow",
            Confidence::Red => "red",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProfileField {
    #[serde(rename = "basic_salary")]
    BasicSalary,
    #[serde(rename = "hra_received")]
    HraReceived,
    #[serde(rename = "special_allowance")]
    SpecialAllowance,
    #[serde(rename = "lta")]
    Lta,
    #[serde(rename = "other_allowances")]
    OtherAllowances,
    #[serde(rename = "professional_tax")]
    ProfessionalTax,
    #[serde(rename = "age_bracket")]
    AgeBracket,
    #[serde(rename = "investments_80c")]
    Investments80c,
    #[serde(rename = "ppf_contribution")]
    PpfContribution,
    #[serde(rename = "home_loan_principal")]
    HomeLoanPrincipal,
    #[serde(rename = "health_insurance_self")]
    HealthInsuranceSelf,
    #[serde(rename = "parent_senior_citizen")]
    ParentSeniorCitizen,
    #[serde(rename = "health_insurance_parents")]
    HealthInsuranceParents,
    #[serde(rename = "employee_nps_80ccd1b")]
    EmployeeNps80ccd1b,
    #[serde(rename = "employer_nps_80ccd2")]
    EmployerNps80ccd2,
    #[serde(rename = "home_loan_interest")]
    HomeLoanInterest,
    #[serde(rename = "savings_interest_80tta")]
    SavingsInterest80tta,
    #[serde(rename = "monthly_rent_paid")]
    MonthlyRentPaid,
    #[serde(rename = "city_type")]
    CityType,
    #[serde(rename = "other_income")]
    OtherIncome,
}

impl ProfileField {
    pub const ALL: [ProfileField; 20] = [
        ProfileField::BasicSalary,
        ProfileField::HraReceived,
        ProfileField::SpecialAllowance,
        ProfileField::Lta,
        ProfileField::OtherAllowances,
        ProfileField::ProfessionalTax,
        ProfileField::AgeBracket,
        ProfileField::Investments80c,
        ProfileField::PpfContribution,
        ProfileField::HomeLoanPrincipal,
        ProfileField::HealthInsuranceSelf,
        ProfileField::ParentSeniorCitizen,
        ProfileField::HealthInsuranceParents,
        ProfileField::EmployeeNps80ccd1b,
        ProfileField::EmployerNps80ccd2,
        ProfileField::HomeLoanInterest,
        ProfileField::SavingsInterest80tta,
        ProfileField::MonthlyRentPaid,
        ProfileField::CityType,
        ProfileField::OtherIncome,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::BasicSalary => "basic_salary",
            ProfileField::HraReceived => "hra_received",
            ProfileField::SpecialAllowance => "special_allowance",
            ProfileField::Lta => "lta",
            ProfileField::OtherAllowances => "other_allowances",
            ProfileField::ProfessionalTax => "professional_tax",
            ProfileField::AgeBracket => "age_bracket",
            ProfileField::Investments80c => "investments_80c",
            ProfileField::PpfContribution => "ppf_contribution",
            ProfileField::HomeLoanPrincipal => "home_loan_principal",
            ProfileField::HealthInsuranceSelf => "health_insurance_self",
            ProfileField::ParentSeniorCitizen => "parent_senior_citizen",
            ProfileField::HealthInsuranceParents => "health_insurance_parents",
            ProfileField::EmployeeNps80ccd1b => "employee_nps_80ccd1b",
            ProfileField::EmployerNps80ccd2 => "employer_nps_80ccd2",
            ProfileField::HomeLoanInterest => "home_loan_interest",
            ProfileField::SavingsInterest80tta => "savings_interest_80tta",
            ProfileField::MonthlyRentPaid => "monthly_rent_paid",
            ProfileField::CityType => "city_type",
            ProfileField::OtherIncome => "other_income",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProfileField::BasicSalary => "Basic salary",
            ProfileField::HraReceived => "HRA received",
            ProfileField::SpecialAllowance => "Special allowance",
            ProfileField::Lta => "Leave travel allowance",
            ProfileField::OtherAllowances => "Other allowances",
            ProfileField::ProfessionalTax => "Professional tax",
            ProfileField::AgeBracket => "Age bracket",
            ProfileField::Investments80c => "Section 80C investments",
            ProfileField::PpfContribution => "PPF contribution",
            ProfileField::HomeLoanPrincipal => "Home loan principal",
            ProfileField::HealthInsuranceSelf => "Health insurance (self & family)",
            ProfileField::ParentSeniorCitizen => "Parents are senior citizens",
            ProfileField::HealthInsuranceParents => "Health insurance (parents)",
            ProfileField::EmployeeNps80ccd1b => "Employee NPS 80CCD(1B)",
            ProfileField::EmployerNps80ccd2 => "Employer NPS 80CCD(2)",
            ProfileField::HomeLoanInterest => "Home loan interest",
            ProfileField::SavingsInterest80tta => "Savings interest 80TTA",
            ProfileField::MonthlyRentPaid => "Monthly rent paid",
            ProfileField::CityType => "City type",
            ProfileField::OtherIncome => "Other income",
        }
    }

    /// Currency-valued attributes; everything else is an enum or a flag.
    pub fn is_amount(self) -> bool {
        !matches!(
            self,
            ProfileField::AgeBracket | ProfileField::CityType | ProfileField::ParentSeniorCitizen
        )
    }

    /// Matches server-side locations such as `body.basic_salary`.
    pub fn from_location(location: &str) -> Option<Self> {
        location
            .rsplit('.')
            .next()
            .and_then(|segment| segment.parse().ok())
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s.trim())
            .ok_or_else(|| ParseValueError {
                kind: "profile field",
                value: s.to_string(),
            })
    }
}
