use super::*;

fn extracted(entries: &[(&str, Option<f64>, Confidence)]) -> BTreeMap<String, ExtractedField> {
    entries
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
        .collect()
}

fn sample() -> ConfidenceFieldReconciler {
    ConfidenceFieldReconciler::new(&extracted(&[
        ("basic_salary", Some(1_200_000.0), Confidence::Green),
        ("hra_received", Some(50_000.0), Confidence::Yellow),
        ("investments_80c", None, Confidence::Red),
    ]))
    .expect("reconciler")
}

#[test]
fn green_fields_are_locked() {
    let mut reconciler = sample();
    assert!(!reconciler.is_editable(ProfileField::BasicSalary));
    assert_eq!(
        reconciler.set_override(ProfileField::BasicSalary, Some(1.0)),
        Err(ReconcileError::Locked(ProfileField::BasicSalary))
    );
    assert_eq!(
        reconciler.effective_value(ProfileField::BasicSalary),
        Some(1_200_000.0)
    );
}

#[test]
fn overrides_replace_extracted_values() {
    let mut reconciler = sample();
    reconciler
        .set_override(ProfileField::HraReceived, Some(60_000.0))
        .expect("override");
    assert_eq!(reconciler.effective_value(ProfileField::HraReceived), Some(60_000.0));

    reconciler
        .set_override(ProfileField::HraReceived, None)
        .expect("blank override");
    assert_eq!(reconciler.effective_value(ProfileField::HraReceived), None);

    reconciler.clear_override(ProfileField::HraReceived);
    assert_eq!(reconciler.effective_value(ProfileField::HraReceived), Some(50_000.0));
}

#[test]
fn fields_outside_the_extraction_are_not_reviewable() {
    let mut reconciler = sample();
    assert_eq!(
        reconciler.set_override(ProfileField::Lta, Some(10.0)),
        Err(ReconcileError::NotReviewable(ProfileField::Lta))
    );
}

#[test]
fn nothing_extracted_when_no_recognised_value_is_present() {
    let err = ConfidenceFieldReconciler::new(&extracted(&[
        ("basic_salary", None, Confidence::Red),
        ("gross_total_income", Some(1_500_000.0), Confidence::Green),
    ]))
    .expect_err("nothing usable");
    assert_eq!(err, ReconcileError::NothingExtracted);

    let empty = ConfidenceFieldReconciler::new(&BTreeMap::new()).expect_err("empty");
    assert_eq!(empty, ReconcileError::NothingExtracted);
}

#[test]
fn unknown_attributes_are_ignored() {
    let reconciler = ConfidenceFieldReconciler::new(&extracted(&[
        ("basic_salary", Some(900_000.0), Confidence::Green),
        ("employer_tan", Some(1.0), Confidence::Yellow),
    ]))
    .expect("reconciler");
    assert_eq!(reconciler.review_grid().len(), 1);
}

#[test]
fn review_grid_marks_editability_and_overrides() {
    let mut reconciler = sample();
    reconciler
        .set_override(ProfileField::Investments80c, Some(120_000.0))
        .expect("override");

    let grid = reconciler.review_grid();
    let by_field = |field| grid.iter().find(|row| row.field == field).expect("row");
    assert!(!by_field(ProfileField::BasicSalary).editable);
    assert!(by_field(ProfileField::HraReceived).editable);
    assert!(!by_field(ProfileField::HraReceived).overridden);
    let investments = by_field(ProfileField::Investments80c);
    assert_eq!(investments.extracted, None);
    assert_eq!(investments.effective, Some(120_000.0));
    assert!(investments.overridden);
}

#[test]
fn validation_covers_reviewable_and_supplementary_fields() {
    let constraints = FieldConstraintSet::standard();
    let mut reconciler = sample();
    reconciler
        .set_override(ProfileField::Investments80c, Some(200_000.0))
        .expect("override");

    let errors = reconciler.validate(&constraints).expect_err("invalid");
    assert!(errors.contains(ProfileField::Investments80c));
    assert!(errors.contains(ProfileField::CityType));
    assert!(errors.contains(ProfileField::AgeBracket));
    assert!(!errors.contains(ProfileField::BasicSalary));

    reconciler
        .set_override(ProfileField::Investments80c, Some(150_000.0))
        .expect("override");
    let supplementary = reconciler.supplementary_mut();
    supplementary.city_type = Some(CityType::Metro);
    supplementary.age_bracket = Some(AgeBracket::Under60);
    reconciler.validate(&constraints).expect("valid");
}

#[test]
fn hra_override_is_capped_by_locked_basic_salary() {
    let constraints = FieldConstraintSet::standard();
    let mut reconciler = sample();
    reconciler
        .set_override(ProfileField::HraReceived, Some(1_300_000.0))
        .expect("override");
    let errors = reconciler.validate(&constraints).expect_err("over cap");
    assert_eq!(
        errors.get(ProfileField::HraReceived),
        Some("HRA received cannot exceed ₹12,00,000 (your basic salary)")
    );
}

#[test]
fn edited_fields_include_reviewed_and_supplementary_values() {
    let mut reconciler = sample();
    reconciler
        .set_override(ProfileField::HraReceived, Some(60_000.0))
        .expect("override");
    let supplementary = reconciler.supplementary_mut();
    supplementary.monthly_rent_paid = Some(25_000.0);
    supplementary.city_type = Some(CityType::Metro);
    supplementary.age_bracket = Some(AgeBracket::Senior);
    supplementary.parent_senior_citizen = true;

    let edited = reconciler.edited_fields();
    assert!(!edited.contains_key(&ProfileField::BasicSalary));
    assert_eq!(edited[&ProfileField::HraReceived], FieldValue::Amount(60_000.0));
    assert_eq!(edited[&ProfileField::Investments80c], FieldValue::Amount(0.0));
    assert_eq!(edited[&ProfileField::MonthlyRentPaid], FieldValue::Amount(25_000.0));
    assert_eq!(edited[&ProfileField::CityType], FieldValue::City(CityType::Metro));
    assert_eq!(edited[&ProfileField::AgeBracket], FieldValue::Age(AgeBracket::Senior));
    assert_eq!(edited[&ProfileField::ParentSeniorCitizen], FieldValue::Flag(true));
}

#[test]
fn upload_metadata_is_kept_for_review() {
    let response = UploadResponse {
        session_id: shared::domain::OcrSessionId::from("ocr-1"),
        extracted_fields: extracted(&[("basic_salary", Some(1.0), Confidence::Green)]),
        reference_fields: [("gross_total_income".to_string(), Some(2.0))].into_iter().collect(),
        missing_profile_fields: vec!["monthly_rent_paid".into()],
        summary: ExtractionSummary {
            field_count: 1,
            green_count: 1,
            yellow_count: 0,
            red_count: 0,
        },
        warnings: vec![ExtractionWarning {
            code: "AY_MISMATCH".into(),
            message: "Assessment year differs".into(),
        }],
    };

    let reconciler = ConfidenceFieldReconciler::from_upload(&response).expect("reconciler");
    assert_eq!(reconciler.summary().green_count, 1);
    assert_eq!(reconciler.warnings()[0].code, "AY_MISMATCH");
    assert_eq!(reconciler.reference_fields()["gross_total_income"], Some(2.0));
}

#[test]
fn amounts_missing_from_the_extraction_get_manual_inputs() {
    let response = UploadResponse {
        session_id: shared::domain::OcrSessionId::from("ocr-2"),
        extracted_fields: extracted(&[
            ("basic_salary", Some(1_000_000.0), Confidence::Green),
            ("investments_80c", Some(80_000.0), Confidence::Yellow),
        ]),
        reference_fields: BTreeMap::new(),
        missing_profile_fields: vec![
            "hra_received".into(),
            "lta".into(),
            "investments_80c".into(),
            "monthly_rent_paid".into(),
            "employer_tan".into(),
        ],
        summary: ExtractionSummary::default(),
        warnings: Vec::new(),
    };
    let mut reconciler = ConfidenceFieldReconciler::from_upload(&response).expect("reconciler");

    assert_eq!(
        reconciler.missing_fields().collect::<Vec<_>>(),
        vec![(ProfileField::HraReceived, None), (ProfileField::Lta, None)]
    );
    assert!(reconciler.is_editable(ProfileField::HraReceived));
    reconciler
        .set_override(ProfileField::HraReceived, Some(60_000.0))
        .expect("manual hra");
    assert_eq!(reconciler.effective_value(ProfileField::HraReceived), Some(60_000.0));
    assert_eq!(
        reconciler.merged_draft().amount(ProfileField::HraReceived),
        Some(60_000.0)
    );

    let edited = reconciler.edited_fields();
    assert_eq!(edited[&ProfileField::HraReceived], FieldValue::Amount(60_000.0));
    assert_eq!(edited[&ProfileField::Lta], FieldValue::Amount(0.0));

    reconciler
        .set_override(ProfileField::HraReceived, Some(1_100_000.0))
        .expect("manual hra");
    let errors = reconciler
        .validate(&FieldConstraintSet::standard())
        .expect_err("hra above basic");
    assert!(errors.contains(ProfileField::HraReceived));
}
