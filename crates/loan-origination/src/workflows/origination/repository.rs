use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decisions::{DecisionRecord, MemberVote};
use super::domain::{
    Actor, ApplicationId, ApplicationStatus, DocumentDescriptor, LoanProfile, ReferenceNumber,
    ReviewComment, StatusChange,
};
use super::transitions::ReviewerSlot;

/// Repository record containing the profile, reviewers, and status metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub reference: ReferenceNumber,
    pub relationship_manager_id: String,
    pub status: ApplicationStatus,
    pub analyst_id: Option<String>,
    pub supervisor_id: Option<String>,
    pub profile: LoanProfile,
    pub documents: Vec<DocumentDescriptor>,
    pub comments: Vec<ReviewComment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn assigned(&self, slot: ReviewerSlot) -> Option<&str> {
        match slot {
            ReviewerSlot::Analyst => self.analyst_id.as_deref(),
            ReviewerSlot::Supervisor => self.supervisor_id.as_deref(),
        }
    }

    pub fn summary_view(&self) -> ApplicationSummaryView {
        ApplicationSummaryView {
            id: self.id.clone(),
            reference: self.reference.clone(),
            status: self.status.label(),
            customer_name: self.profile.basic_info.customer_name.clone(),
            business_name: self.profile.business_info.business_name.clone(),
            amount: self.profile.loan_details.amount,
            relationship_manager_id: self.relationship_manager_id.clone(),
            analyst_id: self.analyst_id.clone(),
            supervisor_id: self.supervisor_id.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Dashboard row exposed by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationSummaryView {
    pub id: ApplicationId,
    pub reference: ReferenceNumber,
    pub status: &'static str,
    pub customer_name: String,
    pub business_name: String,
    pub amount: u64,
    pub relationship_manager_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyst_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a record. The store assigns the reference number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub id: ApplicationId,
    pub relationship_manager_id: String,
    pub profile: LoanProfile,
    pub documents: Vec<DocumentDescriptor>,
    pub submitted_at: DateTime<Utc>,
}

/// Reviewer claim written together with a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Analyst(String),
    Supervisor(String),
}

/// Fields written alongside the new status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionFields {
    pub assignment: Option<Assignment>,
    pub comment: Option<String>,
    pub decision: Option<DecisionRecord>,
}

/// Reviewer the caller was authorised against. The write is refused if the slot
/// no longer holds this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerCheck {
    pub slot: ReviewerSlot,
    pub assigned: Option<String>,
}

/// A conditional status write: applies only while the stored status equals `expected`
/// and, when `reviewer` is set, the stage reviewer is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub expected: ApplicationStatus,
    pub next: ApplicationStatus,
    pub actor: Actor,
    pub reviewer: Option<ReviewerCheck>,
    pub fields: TransitionFields,
    pub at: DateTime<Utc>,
}

/// Selection used by dashboards and exports. Empty `statuses` means all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub statuses: Vec<ApplicationStatus>,
    pub relationship_manager_id: Option<String>,
    pub limit: Option<usize>,
}

impl ApplicationFilter {
    pub fn with_statuses(statuses: impl IntoIterator<Item = ApplicationStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&record.status);
        let owner_ok = self
            .relationship_manager_id
            .as_deref()
            .map_or(true, |owner| owner == record.relationship_manager_id);
        status_ok && owner_ok
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(&self, application: NewApplication) -> Result<ApplicationRecord, RepositoryError>;
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    async fn fetch_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    /// Guarded write. Zero matching rows yields `Conflict`, `ReviewerChanged` or `NotFound`.
    /// Entering COMMITTE_REVIEW discards votes left over from an earlier committee round.
    async fn transition(
        &self,
        id: &ApplicationId,
        transition: StatusTransition,
    ) -> Result<ApplicationRecord, RepositoryError>;
    /// Refused with `Closed` once the application reaches a terminal status.
    async fn attach_document(
        &self,
        id: &ApplicationId,
        document: DocumentDescriptor,
    ) -> Result<(), RepositoryError>;
    async fn history(&self, id: &ApplicationId) -> Result<Vec<StatusChange>, RepositoryError>;
    async fn status_counts(&self) -> Result<BTreeMap<ApplicationStatus, u64>, RepositoryError>;
    /// Upsert while the application is in `expected`, otherwise `Conflict`.
    async fn upsert_decision(
        &self,
        decision: DecisionRecord,
        expected: ApplicationStatus,
    ) -> Result<DecisionRecord, RepositoryError>;
    async fn decision(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<DecisionRecord>, RepositoryError>;
    /// Upsert while the application is in `expected`, otherwise `Conflict`.
    async fn record_vote(
        &self,
        vote: MemberVote,
        expected: ApplicationStatus,
    ) -> Result<MemberVote, RepositoryError>;
    async fn votes(&self, reference: &ReferenceNumber) -> Result<Vec<MemberVote>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application status changed concurrently (expected {expected}, found {actual})")]
    Conflict {
        expected: ApplicationStatus,
        actual: ApplicationStatus,
    },
    #[error("stage reviewer changed concurrently (now {})", .assigned.as_deref().unwrap_or("unassigned"))]
    ReviewerChanged { assigned: Option<String> },
    #[error("application is closed ({status})")]
    Closed { status: ApplicationStatus },
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Duplicate,
    #[error("stored record is unreadable: {0}")]
    Corrupt(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook used to tell relationship managers about stage changes.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: String,
    pub reference: ReferenceNumber,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
