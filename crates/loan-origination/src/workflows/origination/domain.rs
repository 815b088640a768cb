use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a stored loan application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-facing business key, e.g. `LN-2026-000042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceNumber(pub String);

impl ReferenceNumber {
    pub fn from_sequence(year: i32, sequence: u64) -> Self {
        Self(format!("LN-{year}-{sequence:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle stage of a loan application.
///
/// Labels keep the spellings already persisted by existing records
/// (`RM_RECCOMENDATION`, `COMMITTE_REVIEW`, `COMMITTE_REVERSED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "UNDER_REVIEW")]
    UnderReview,
    #[serde(rename = "RM_RECCOMENDATION")]
    RmRecommendation,
    #[serde(rename = "ANALYSIS_COMPLETED")]
    AnalysisCompleted,
    #[serde(rename = "CONDITIONAL")]
    Conditional,
    #[serde(rename = "SUPERVISOR_REVIEWING")]
    SupervisorReviewing,
    #[serde(rename = "SUPERVISED")]
    Supervised,
    #[serde(rename = "COMMITTE_REVIEW")]
    CommitteeReview,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "COMMITTE_REVERSED")]
    CommitteeReversed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 11] = [
        ApplicationStatus::Pending,
        ApplicationStatus::UnderReview,
        ApplicationStatus::RmRecommendation,
        ApplicationStatus::AnalysisCompleted,
        ApplicationStatus::Conditional,
        ApplicationStatus::SupervisorReviewing,
        ApplicationStatus::Supervised,
        ApplicationStatus::CommitteeReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::CommitteeReversed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::RmRecommendation => "RM_RECCOMENDATION",
            ApplicationStatus::AnalysisCompleted => "ANALYSIS_COMPLETED",
            ApplicationStatus::Conditional => "CONDITIONAL",
            ApplicationStatus::SupervisorReviewing => "SUPERVISOR_REVIEWING",
            ApplicationStatus::Supervised => "SUPERVISED",
            ApplicationStatus::CommitteeReview => "COMMITTE_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::CommitteeReversed => "COMMITTE_REVERSED",
        }
    }

    /// No further transitions leave a terminal status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownStatus(raw.to_string()))
    }
}

/// Roles recognised by the workflow. Identity itself is asserted upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    RelationshipManager,
    CreditAnalyst,
    Supervisor,
    CommitteeMember,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::RelationshipManager => "relationship_manager",
            Role::CreditAnalyst => "credit_analyst",
            Role::Supervisor => "supervisor",
            Role::CommitteeMember => "committee_member",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "relationship_manager" | "rm" => Ok(Role::RelationshipManager),
            "credit_analyst" | "analyst" => Ok(Role::CreditAnalyst),
            "supervisor" => Ok(Role::Supervisor),
            "committee_member" | "committee" => Ok(Role::CommitteeMember),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(raw.to_string())),
        }
    }
}

/// Authenticated caller as forwarded by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Wizard step: customer identity and contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub customer_name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
}

/// Wizard step: the borrowing business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessInfo {
    pub business_name: String,
    pub registration_number: String,
    pub sector: String,
    pub years_in_operation: u16,
    pub annual_revenue: u64,
}

/// Wizard step: requested facility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanDetails {
    pub amount: u64,
    pub term_months: u16,
    pub purpose: String,
    pub collateral: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shareholder {
    pub name: String,
    pub ownership_percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identification,
    BusinessRegistration,
    FinancialStatement,
    BankStatement,
    Collateral,
    Other,
}

impl DocumentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentCategory::Identification => "identification",
            DocumentCategory::BusinessRegistration => "business_registration",
            DocumentCategory::FinancialStatement => "financial_statement",
            DocumentCategory::BankStatement => "bank_statement",
            DocumentCategory::Collateral => "collateral",
            DocumentCategory::Other => "other",
        }
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "identification" => Ok(DocumentCategory::Identification),
            "business_registration" => Ok(DocumentCategory::BusinessRegistration),
            "financial_statement" => Ok(DocumentCategory::FinancialStatement),
            "bank_statement" => Ok(DocumentCategory::BankStatement),
            "collateral" => Ok(DocumentCategory::Collateral),
            "other" => Ok(DocumentCategory::Other),
            other => Err(format!("unknown document category '{other}'")),
        }
    }
}

/// Metadata for a file the browser already uploaded to object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub name: String,
    pub category: DocumentCategory,
    pub storage_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Everything the relationship manager collected across the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSubmission {
    pub basic_info: BasicInfo,
    pub business_info: BusinessInfo,
    pub loan_details: LoanDetails,
    pub shareholders: Vec<Shareholder>,
    pub documents: Vec<DocumentDescriptor>,
}

/// Validated applicant data persisted alongside the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProfile {
    pub basic_info: BasicInfo,
    pub business_info: BusinessInfo,
    pub loan_details: LoanDetails,
    pub shareholders: Vec<Shareholder>,
}

/// Reviewer note attached while moving an application into `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub author_id: String,
    pub role: Role,
    pub status: ApplicationStatus,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Audit row written for every committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub actor_id: String,
    pub role: Role,
    pub changed_at: DateTime<Utc>,
}
