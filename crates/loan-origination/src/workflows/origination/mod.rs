//! Loan origination: wizard intake, status-guarded review workflow, and committee decisions.
//!
//! Every status change goes through [`ApplicationRepository::transition`], which only writes
//! when the stored status still matches the status the caller last observed. Two reviewers
//! acting on the same application therefore cannot both succeed.

pub mod decisions;
pub mod domain;
pub mod intake;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use decisions::{DecisionOutcome, DecisionRecord, MemberVote, VoteTally};
pub use domain::{
    Actor, ApplicationId, ApplicationStatus, ApplicationSubmission, BasicInfo, BusinessInfo,
    DocumentCategory, DocumentDescriptor, LoanDetails, LoanProfile, ReferenceNumber,
    ReviewComment, Role, Shareholder, StatusChange,
};
pub use intake::{IntakeGuard, IntakePolicy, IntakeViolation, WizardStep};
pub use report::{write_csv, ExportError, PipelineSummary};
pub use repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, Notification,
    NotificationError, NotificationPublisher, RepositoryError,
};
pub use router::application_router;
pub use service::{
    DecisionSubmission, LoanApplicationService, LoanServiceError, TransitionCommand,
    VoteSubmission, VoteSummary,
};
pub use sqlite::SqliteApplicationStore;
pub use transitions::{next_statuses, rule_for, TransitionError};
