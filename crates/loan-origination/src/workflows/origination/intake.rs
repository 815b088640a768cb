use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationSubmission, BasicInfo, BusinessInfo, DocumentCategory, DocumentDescriptor,
    LoanDetails, LoanProfile, Shareholder,
};

/// Validation errors raised while checking wizard input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("email address '{0}' is not valid")]
    InvalidEmail(String),
    #[error("loan amount {amount} outside permitted range {min}..={max}")]
    AmountOutOfRange { amount: u64, min: u64, max: u64 },
    #[error("loan term of {term} months outside permitted range 1..={max}")]
    TermOutOfRange { term: u16, max: u16 },
    #[error("at least one shareholder is required")]
    NoShareholders,
    #[error("shareholder '{name}' has invalid ownership {percent}%")]
    InvalidOwnership { name: String, percent: f32 },
    #[error("shareholder ownership totals {total}% which exceeds 100%")]
    OwnershipExceedsTotal { total: f32 },
    #[error("an identification document is required")]
    MissingIdentification,
    #[error("document '{name}' has unsupported content type {content_type}")]
    UnsupportedDocument { name: String, content_type: String },
}

/// Steps of the relationship manager's intake wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BasicInfo,
    BusinessInfo,
    LoanDetails,
    Shareholders,
    Documents,
    Review,
}

const DEFAULT_MIN_AMOUNT: u64 = 1_000;
const DEFAULT_MAX_AMOUNT: u64 = 50_000_000;
const DEFAULT_MAX_TERM_MONTHS: u16 = 360;
const OWNERSHIP_TOLERANCE: f32 = 0.01;

/// Product limits applied to the loan details step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    pub min_amount: u64,
    pub max_amount: u64,
    pub max_term_months: u16,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: DEFAULT_MAX_AMOUNT,
            max_term_months: DEFAULT_MAX_TERM_MONTHS,
        }
    }
}

/// Guard responsible for turning wizard input into a `LoanProfile`.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard {
    policy: IntakePolicy,
}

impl IntakeGuard {
    pub fn with_policy(policy: IntakePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntakePolicy {
        &self.policy
    }

    /// Validate a single wizard step. `Review` validates every step.
    pub fn validate_step(
        &self,
        step: WizardStep,
        submission: &ApplicationSubmission,
    ) -> Result<(), IntakeViolation> {
        match step {
            WizardStep::BasicInfo => check_basic_info(&submission.basic_info),
            WizardStep::BusinessInfo => check_business_info(&submission.business_info),
            WizardStep::LoanDetails => self.check_loan_details(&submission.loan_details),
            WizardStep::Shareholders => check_shareholders(&submission.shareholders),
            WizardStep::Documents => check_documents(&submission.documents).map(|_| ()),
            WizardStep::Review => {
                check_basic_info(&submission.basic_info)?;
                check_business_info(&submission.business_info)?;
                self.check_loan_details(&submission.loan_details)?;
                check_shareholders(&submission.shareholders)?;
                check_documents(&submission.documents).map(|_| ())
            }
        }
    }

    /// Convert a submission into a profile and normalized document list.
    pub fn profile_from_submission(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<(LoanProfile, Vec<DocumentDescriptor>), IntakeViolation> {
        self.validate_step(WizardStep::Review, &submission)?;
        let documents = check_documents(&submission.documents)?;

        let profile = LoanProfile {
            basic_info: trim_basic_info(submission.basic_info),
            business_info: submission.business_info,
            loan_details: submission.loan_details,
            shareholders: submission.shareholders,
        };

        Ok((profile, documents))
    }

    /// Validate a document attached after submission.
    pub fn normalize_document(
        &self,
        document: DocumentDescriptor,
    ) -> Result<DocumentDescriptor, IntakeViolation> {
        normalize_document(document)
    }

    fn check_loan_details(&self, details: &LoanDetails) -> Result<(), IntakeViolation> {
        if details.amount < self.policy.min_amount || details.amount > self.policy.max_amount {
            return Err(IntakeViolation::AmountOutOfRange {
                amount: details.amount,
                min: self.policy.min_amount,
                max: self.policy.max_amount,
            });
        }

        if details.term_months == 0 || details.term_months > self.policy.max_term_months {
            return Err(IntakeViolation::TermOutOfRange {
                term: details.term_months,
                max: self.policy.max_term_months,
            });
        }

        require(&details.purpose, "loan purpose")
    }
}

fn require(value: &str, field: &'static str) -> Result<(), IntakeViolation> {
    if value.trim().is_empty() {
        Err(IntakeViolation::MissingField { field })
    } else {
        Ok(())
    }
}

fn check_basic_info(info: &BasicInfo) -> Result<(), IntakeViolation> {
    require(&info.customer_name, "customer name")?;
    require(&info.national_id, "national id")?;
    require(&info.phone, "phone")?;
    require(&info.email, "email")?;

    let email = info.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(IntakeViolation::InvalidEmail(email.to_string())),
    }
}

fn check_business_info(info: &BusinessInfo) -> Result<(), IntakeViolation> {
    require(&info.business_name, "business name")?;
    require(&info.registration_number, "registration number")?;
    require(&info.sector, "sector")
}

fn check_shareholders(shareholders: &[Shareholder]) -> Result<(), IntakeViolation> {
    if shareholders.is_empty() {
        return Err(IntakeViolation::NoShareholders);
    }

    let mut total = 0.0_f32;
    for holder in shareholders {
        require(&holder.name, "shareholder name")?;
        let percent = holder.ownership_percent;
        if !percent.is_finite() || percent <= 0.0 || percent > 100.0 {
            return Err(IntakeViolation::InvalidOwnership {
                name: holder.name.clone(),
                percent,
            });
        }
        total += percent;
    }

    if total > 100.0 + OWNERSHIP_TOLERANCE {
        return Err(IntakeViolation::OwnershipExceedsTotal { total });
    }

    Ok(())
}

fn check_documents(
    documents: &[DocumentDescriptor],
) -> Result<Vec<DocumentDescriptor>, IntakeViolation> {
    if !documents
        .iter()
        .any(|document| document.category == DocumentCategory::Identification)
    {
        return Err(IntakeViolation::MissingIdentification);
    }

    documents.iter().cloned().map(normalize_document).collect()
}

fn normalize_document(
    mut document: DocumentDescriptor,
) -> Result<DocumentDescriptor, IntakeViolation> {
    require(&document.name, "document name")?;
    require(&document.storage_key, "document storage key")?;

    let guessed = mime_guess::from_path(document.name.trim()).first();
    match guessed {
        Some(content_type) if is_accepted(&content_type) => {
            document.content_type = Some(content_type.essence_str().to_string());
            Ok(document)
        }
        other => Err(IntakeViolation::UnsupportedDocument {
            name: document.name.clone(),
            content_type: other
                .map(|content_type| content_type.essence_str().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }),
    }
}

fn is_accepted(content_type: &mime::Mime) -> bool {
    *content_type == mime::APPLICATION_PDF
        || *content_type == mime::IMAGE_PNG
        || *content_type == mime::IMAGE_JPEG
}

fn trim_basic_info(info: BasicInfo) -> BasicInfo {
    BasicInfo {
        customer_name: info.customer_name.trim().to_string(),
        national_id: info.national_id.trim().to_string(),
        phone: info.phone.trim().to_string(),
        email: info.email.trim().to_ascii_lowercase(),
    }
}
