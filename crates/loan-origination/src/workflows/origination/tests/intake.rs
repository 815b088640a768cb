use super::common::*;

use crate::workflows::origination::domain::{DocumentCategory, DocumentDescriptor, Shareholder};
use crate::workflows::origination::intake::{
    IntakeGuard, IntakePolicy, IntakeViolation, WizardStep,
};

#[test]
fn complete_submission_produces_profile_and_typed_documents() {
    let guard = IntakeGuard::default();
    let (profile, documents) = guard
        .profile_from_submission(submission())
        .expect("valid submission");

    assert_eq!(profile.basic_info.customer_name, "Amina Odhiambo");
    assert_eq!(profile.shareholders.len(), 2);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].content_type.as_deref(), Some("application/pdf"));
}

#[test]
fn basic_info_step_rejects_malformed_email() {
    let mut input = submission();
    input.basic_info.email = "amina.at.example".to_string();

    match IntakeGuard::default().validate_step(WizardStep::BasicInfo, &input) {
        Err(IntakeViolation::InvalidEmail(email)) => assert_eq!(email, "amina.at.example"),
        other => panic!("expected invalid email, got {other:?}"),
    }
}

#[test]
fn steps_only_check_their_own_section() {
    let mut input = submission();
    input.loan_details.amount = 0;
    let guard = IntakeGuard::default();

    guard
        .validate_step(WizardStep::BasicInfo, &input)
        .expect("basic info untouched");
    match guard.validate_step(WizardStep::LoanDetails, &input) {
        Err(IntakeViolation::AmountOutOfRange { amount: 0, .. }) => {}
        other => panic!("expected amount violation, got {other:?}"),
    }
}

#[test]
fn loan_limits_follow_policy() {
    let guard = IntakeGuard::with_policy(IntakePolicy {
        min_amount: 10_000,
        max_amount: 1_000_000,
        max_term_months: 12,
    });
    let input = submission();

    match guard.validate_step(WizardStep::LoanDetails, &input) {
        Err(IntakeViolation::AmountOutOfRange { max: 1_000_000, .. }) => {}
        other => panic!("expected amount above policy maximum, got {other:?}"),
    }

    let mut shorter = submission();
    shorter.loan_details.amount = 500_000;
    match guard.validate_step(WizardStep::LoanDetails, &shorter) {
        Err(IntakeViolation::TermOutOfRange { term: 24, max: 12 }) => {}
        other => panic!("expected term violation, got {other:?}"),
    }
}

#[test]
fn shareholders_must_not_exceed_full_ownership() {
    let mut input = submission();
    input.shareholders.push(Shareholder {
        name: "Silent Partner".to_string(),
        ownership_percent: 5.0,
    });

    match IntakeGuard::default().validate_step(WizardStep::Shareholders, &input) {
        Err(IntakeViolation::OwnershipExceedsTotal { total }) => assert!(total > 100.0),
        other => panic!("expected ownership violation, got {other:?}"),
    }
}

#[test]
fn shareholders_step_requires_at_least_one_owner() {
    let mut input = submission();
    input.shareholders.clear();

    assert_eq!(
        IntakeGuard::default().validate_step(WizardStep::Shareholders, &input),
        Err(IntakeViolation::NoShareholders)
    );
}

#[test]
fn documents_require_identification() {
    let mut input = submission();
    input.documents[0].category = DocumentCategory::BankStatement;

    assert_eq!(
        IntakeGuard::default().validate_step(WizardStep::Documents, &input),
        Err(IntakeViolation::MissingIdentification)
    );
}

#[test]
fn unsupported_document_types_are_rejected() {
    let guard = IntakeGuard::default();
    let document = DocumentDescriptor {
        name: "statement.exe".to_string(),
        category: DocumentCategory::BankStatement,
        storage_key: "uploads/odhiambo/statement.exe".to_string(),
        content_type: None,
    };

    match guard.normalize_document(document) {
        Err(IntakeViolation::UnsupportedDocument { name, .. }) => assert_eq!(name, "statement.exe"),
        other => panic!("expected unsupported document, got {other:?}"),
    }
}

#[test]
fn images_are_accepted_with_detected_type() {
    let document = DocumentDescriptor {
        name: "collateral-photo.JPG".to_string(),
        category: DocumentCategory::Collateral,
        storage_key: "uploads/odhiambo/collateral-photo.jpg".to_string(),
        content_type: None,
    };

    let normalized = IntakeGuard::default()
        .normalize_document(document)
        .expect("jpeg accepted");
    assert_eq!(normalized.content_type.as_deref(), Some("image/jpeg"));
}

#[test]
fn review_step_reports_first_failing_section() {
    let mut input = submission();
    input.business_info.business_name = "  ".to_string();
    input.shareholders.clear();

    assert_eq!(
        IntakeGuard::default().validate_step(WizardStep::Review, &input),
        Err(IntakeViolation::MissingField {
            field: "business name"
        })
    );
}
