//! Declarative per-field rules grouped by wizard step.
//!
//! Caps that depend on other attributes are functions of the whole draft so
//! the active limit (and its help text) can be recomputed whenever a sibling
//! value changes.

use std::{collections::BTreeMap, fmt};

use shared::domain::{AgeBracket, CityType, ProfileField};

use crate::draft::FinancialProfileDraft;

const CAP_PROFESSIONAL_TAX: f64 = 2_400.0;
const CAP_80C: f64 = 150_000.0;
const CAP_80D_STANDARD: f64 = 25_000.0;
const CAP_80D_SENIOR: f64 = 50_000.0;
const CAP_80CCD1B: f64 = 50_000.0;
const CAP_80CCD2_SHARE: f64 = 0.10;
const CAP_24B: f64 = 200_000.0;
const CAP_OTHER_INCOME_ITR1: f64 = 5_000_000.0;

const CITY_CHOICES: &[&str] = &["metro", "non_metro"];
const AGE_CHOICES: &[&str] = &["under60", "60_79", "80plus"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntakeStep {
    Income,
    Deductions,
    Housing,
    Other,
    Review,
}

impl IntakeStep {
    pub const ALL: [IntakeStep; 5] = [
        IntakeStep::Income,
        IntakeStep::Deductions,
        IntakeStep::Housing,
        IntakeStep::Other,
        IntakeStep::Review,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn title(self) -> &'static str {
        match self {
            IntakeStep::Income => "Income",
            IntakeStep::Deductions => "Deductions",
            IntakeStep::Housing => "Housing",
            IntakeStep::Other => "Other income",
            IntakeStep::Review => "Review",
        }
    }
}

impl fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Per-field messages keyed by attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<ProfileField, String>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.fields.len())?;
        for (i, (field, message)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn insert(&mut self, field: ProfileField, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    pub fn remove(&mut self, field: ProfileField) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.fields.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.fields.extend(other.fields);
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl FromIterator<(ProfileField, String)> for ValidationErrors {
    fn from_iter<T: IntoIterator<Item = (ProfileField, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The cap in force for the current draft, with a note explaining which
/// sibling value selected it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCap {
    pub amount: f64,
    pub note: Option<String>,
}

pub type CapFn = fn(&FinancialProfileDraft) -> ActiveCap;

#[derive(Debug, Clone, Copy)]
pub enum Cap {
    Unbounded,
    Fixed(f64),
    Derived {
        depends_on: &'static [ProfileField],
        compute: CapFn,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    Amount { required: bool, cap: Cap },
    Choice { allowed: &'static [&'static str] },
    Flag,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldConstraint {
    pub field: ProfileField,
    pub step: IntakeStep,
    pub rule: FieldRule,
}

impl FieldConstraint {
    pub fn is_required(&self) -> bool {
        match self.rule {
            FieldRule::Amount { required, .. } => required,
            FieldRule::Choice { .. } => true,
            FieldRule::Flag => false,
        }
    }

    pub fn depends_on(&self) -> &'static [ProfileField] {
        match self.rule {
            FieldRule::Amount {
                cap: Cap::Derived { depends_on, .. },
                ..
            } => depends_on,
            _ => &[],
        }
    }

    pub fn active_cap(&self, draft: &FinancialProfileDraft) -> Option<ActiveCap> {
        match self.rule {
            FieldRule::Amount { cap, .. } => match cap {
                Cap::Unbounded => None,
                Cap::Fixed(amount) => Some(ActiveCap { amount, note: None }),
                Cap::Derived { compute, .. } => Some(compute(draft)),
            },
            FieldRule::Choice { .. } | FieldRule::Flag => None,
        }
    }

    pub fn help_text(&self, draft: &FinancialProfileDraft) -> Option<String> {
        match self.rule {
            FieldRule::Amount { required, .. } => Some(match self.active_cap(draft) {
                Some(cap) => match cap.note {
                    Some(note) => format!("Up to {} {note}", format_inr(cap.amount)),
                    None => format!("Up to {}", format_inr(cap.amount)),
                },
                None if required => "Required".to_string(),
                None => "Optional; leave blank for zero".to_string(),
            }),
            FieldRule::Choice { allowed } => Some(format!("Choose one of: {}", allowed.join(", "))),
            FieldRule::Flag => None,
        }
    }

    /// Returns the message to show next to the control, if the current draft
    /// violates this rule.
    pub fn check(&self, draft: &FinancialProfileDraft) -> Option<String> {
        let label = self.field.label();
        match self.rule {
            FieldRule::Amount { required, .. } => {
                let Some(value) = draft.amount(self.field) else {
                    return required.then(|| format!("{label} is required"));
                };
                if !value.is_finite() {
                    return Some(format!("{label} must be a valid amount"));
                }
                if value < 0.0 {
                    return Some(format!("{label} cannot be negative"));
                }
                let cap = self.active_cap(draft)?;
                (value > cap.amount).then(|| match cap.note {
                    Some(note) => format!(
                        "{label} cannot exceed {} {note}",
                        format_inr(cap.amount)
                    ),
                    None => format!("{label} cannot exceed {}", format_inr(cap.amount)),
                })
            }
            FieldRule::Choice { allowed } => {
                let selected = match self.field {
                    ProfileField::CityType => draft.city_type.is_some(),
                    ProfileField::AgeBracket => draft.age_bracket.is_some(),
                    _ => true,
                };
                (!selected).then(|| format!("Select {label} ({})", allowed.join(" / ")))
            }
            FieldRule::Flag => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldConstraintSet {
    constraints: Vec<FieldConstraint>,
}

impl Default for FieldConstraintSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl FieldConstraintSet {
    pub fn new(constraints: Vec<FieldConstraint>) -> Self {
        Self { constraints }
    }

    /// Rules for a salaried ITR-1 filer.
    pub fn standard() -> Self {
        use IntakeStep::*;
        use ProfileField as F;

        Self::new(vec![
            amount(F::BasicSalary, Income, true, Cap::Unbounded),
            derived(F::HraReceived, Income, &[F::BasicSalary], hra_cap),
            optional(F::SpecialAllowance, Income),
            optional(F::Lta, Income),
            optional(F::OtherAllowances, Income),
            capped(F::ProfessionalTax, Income, CAP_PROFESSIONAL_TAX),
            FieldConstraint {
                field: F::AgeBracket,
                step: Income,
                rule: FieldRule::Choice {
                    allowed: AGE_CHOICES,
                },
            },
            capped(F::Investments80c, Deductions, CAP_80C),
            optional(F::PpfContribution, Deductions),
            optional(F::HomeLoanPrincipal, Deductions),
            derived(
                F::HealthInsuranceSelf,
                Deductions,
                &[F::AgeBracket],
                health_self_cap,
            ),
            FieldConstraint {
                field: F::ParentSeniorCitizen,
                step: Deductions,
                rule: FieldRule::Flag,
            },
            derived(
                F::HealthInsuranceParents,
                Deductions,
                &[F::ParentSeniorCitizen],
                health_parents_cap,
            ),
            capped(F::EmployeeNps80ccd1b, Deductions, CAP_80CCD1B),
            derived(
                F::EmployerNps80ccd2,
                Deductions,
                &[F::BasicSalary],
                employer_nps_cap,
            ),
            capped(F::HomeLoanInterest, Deductions, CAP_24B),
            optional(F::SavingsInterest80tta, Deductions),
            optional(F::MonthlyRentPaid, Housing),
            FieldConstraint {
                field: F::CityType,
                step: Housing,
                rule: FieldRule::Choice {
                    allowed: CITY_CHOICES,
                },
            },
            capped(F::OtherIncome, Other, CAP_OTHER_INCOME_ITR1),
        ])
    }

    pub fn get(&self, field: ProfileField) -> Option<&FieldConstraint> {
        self.constraints.iter().find(|c| c.field == field)
    }

    pub fn for_step(&self, step: IntakeStep) -> impl Iterator<Item = &FieldConstraint> {
        self.constraints.iter().filter(move |c| c.step == step)
    }

    pub fn step_of(&self, field: ProfileField) -> Option<IntakeStep> {
        self.get(field).map(|c| c.step)
    }

    /// Constraints whose active cap is computed from `field`.
    pub fn dependents_of(&self, field: ProfileField) -> impl Iterator<Item = &FieldConstraint> {
        self.constraints
            .iter()
            .filter(move |c| c.depends_on().contains(&field))
    }

    pub fn validate_fields(
        &self,
        fields: impl IntoIterator<Item = ProfileField>,
        draft: &FinancialProfileDraft,
    ) -> Result<(), ValidationErrors> {
        fields
            .into_iter()
            .filter_map(|field| self.get(field))
            .filter_map(|c| c.check(draft).map(|message| (c.field, message)))
            .collect::<ValidationErrors>()
            .into_result()
    }

    pub fn validate_step(
        &self,
        step: IntakeStep,
        draft: &FinancialProfileDraft,
    ) -> Result<(), ValidationErrors> {
        self.validate_fields(self.for_step(step).map(|c| c.field), draft)
    }

    pub fn validate_all(&self, draft: &FinancialProfileDraft) -> Result<(), ValidationErrors> {
        self.validate_fields(self.constraints.iter().map(|c| c.field), draft)
    }
}

fn amount(field: ProfileField, step: IntakeStep, required: bool, cap: Cap) -> FieldConstraint {
    FieldConstraint {
        field,
        step,
        rule: FieldRule::Amount { required, cap },
    }
}

fn optional(field: ProfileField, step: IntakeStep) -> FieldConstraint {
    amount(field, step, false, Cap::Unbounded)
}

fn capped(field: ProfileField, step: IntakeStep, limit: f64) -> FieldConstraint {
    amount(field, step, false, Cap::Fixed(limit))
}

fn derived(
    field: ProfileField,
    step: IntakeStep,
    depends_on: &'static [ProfileField],
    compute: CapFn,
) -> FieldConstraint {
    amount(field, step, false, Cap::Derived { depends_on, compute })
}

fn hra_cap(draft: &FinancialProfileDraft) -> ActiveCap {
    ActiveCap {
        amount: draft.amount(ProfileField::BasicSalary).unwrap_or(0.0),
        note: Some("(your basic salary)".to_string()),
    }
}

fn health_self_cap(draft: &FinancialProfileDraft) -> ActiveCap {
    if draft.age_bracket.is_some_and(AgeBracket::is_senior) {
        ActiveCap {
            amount: CAP_80D_SENIOR,
            note: Some("(senior citizen limit)".to_string()),
        }
    } else {
        ActiveCap {
            amount: CAP_80D_STANDARD,
            note: Some(format!(
                "({} if you are 60 or older)",
                format_inr(CAP_80D_SENIOR)
            )),
        }
    }
}

fn health_parents_cap(draft: &FinancialProfileDraft) -> ActiveCap {
    if draft.parent_senior_citizen {
        ActiveCap {
            amount: CAP_80D_SENIOR,
            note: Some("(parents are senior citizens)".to_string()),
        }
    } else {
        ActiveCap {
            amount: CAP_80D_STANDARD,
            note: Some(format!(
                "({} if parents are senior citizens)",
                format_inr(CAP_80D_SENIOR)
            )),
        }
    }
}

fn employer_nps_cap(draft: &FinancialProfileDraft) -> ActiveCap {
    let basic = draft.amount(ProfileField::BasicSalary).unwrap_or(0.0);
    ActiveCap {
        amount: basic * CAP_80CCD2_SHARE,
        note: Some("(10% of basic salary)".to_string()),
    }
}

/// Formats rupees with Indian digit grouping, e.g. `₹12,00,000`.
pub fn format_inr(amount: f64) -> String {
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    if digits.len() <= 3 {
        return format!("{sign}₹{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();
    format!("{sign}₹{},{tail}", groups.join(","))
}

/// Display form of a city choice for review screens.
pub fn describe_city(city: CityType) -> &'static str {
    match city {
        CityType::Metro => "Metro",
        CityType::NonMetro => "Non-metro",
    }
}

pub fn describe_age(age: AgeBracket) -> &'static str {
    match age {
        AgeBracket::Under60 => "Below 60",
        AgeBracket::Senior => "60 to 79",
        AgeBracket::SuperSenior => "80 or above",
    }
}

#[cfg(test)]
#[path = "tests/constraints_tests.rs"]
mod tests;
