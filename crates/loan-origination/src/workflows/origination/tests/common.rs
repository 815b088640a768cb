use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{Datelike, Utc};
use serde_json::Value;

use crate::workflows::origination::decisions::{DecisionRecord, MemberVote};
use crate::workflows::origination::domain::{
    Actor, ApplicationId, ApplicationStatus, ApplicationSubmission, BasicInfo, BusinessInfo,
    DocumentCategory, DocumentDescriptor, LoanDetails, ReferenceNumber, ReviewComment, Role,
    Shareholder, StatusChange,
};
use crate::workflows::origination::intake::IntakePolicy;
use crate::workflows::origination::repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, Assignment, NewApplication,
    Notification, NotificationError, NotificationPublisher, RepositoryError, StatusTransition,
};
use crate::workflows::origination::service::{LoanApplicationService, TransitionCommand};
use crate::workflows::origination::application_router;

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        basic_info: BasicInfo {
            customer_name: "Amina Odhiambo".to_string(),
            national_id: "29384756".to_string(),
            phone: "+254700111222".to_string(),
            email: "amina@odhiambo-traders.co.ke".to_string(),
        },
        business_info: BusinessInfo {
            business_name: "Odhiambo Traders".to_string(),
            registration_number: "PVT-7781XZ".to_string(),
            sector: "Wholesale".to_string(),
            years_in_operation: 6,
            annual_revenue: 18_500_000,
        },
        loan_details: LoanDetails {
            amount: 2_500_000,
            term_months: 24,
            purpose: "Inventory expansion".to_string(),
            collateral: Some("Warehouse stock".to_string()),
        },
        shareholders: vec![
            Shareholder {
                name: "Amina Odhiambo".to_string(),
                ownership_percent: 60.0,
            },
            Shareholder {
                name: "Peter Odhiambo".to_string(),
                ownership_percent: 40.0,
            },
        ],
        documents: vec![DocumentDescriptor {
            name: "national-id.pdf".to_string(),
            category: DocumentCategory::Identification,
            storage_key: "uploads/odhiambo/national-id.pdf".to_string(),
            content_type: None,
        }],
    }
}

pub(super) fn manager() -> Actor {
    Actor::new("rm-01", Role::RelationshipManager)
}

pub(super) fn analyst() -> Actor {
    Actor::new("analyst-01", Role::CreditAnalyst)
}

pub(super) fn supervisor() -> Actor {
    Actor::new("supervisor-01", Role::Supervisor)
}

pub(super) fn committee() -> Actor {
    Actor::new("committee-01", Role::CommitteeMember)
}

pub(super) fn command(
    expected: ApplicationStatus,
    next: ApplicationStatus,
    comment: Option<&str>,
) -> TransitionCommand {
    TransitionCommand {
        expected_status: expected,
        next_status: next,
        comment: comment.map(str::to_string),
    }
}

pub(super) type TestService = LoanApplicationService<MemoryRepository, MemoryNotifications>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryNotifications>) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = LoanApplicationService::new(
        repository.clone(),
        notifications.clone(),
        IntakePolicy::default(),
    );
    (service, repository, notifications)
}

/// Walk a fresh application up to committee review.
pub(super) async fn application_in_committee(service: &TestService) -> ApplicationRecord {
    use crate::workflows::origination::domain::ApplicationStatus::*;

    let record = service
        .submit(&manager(), submission())
        .await
        .expect("submission accepted");
    let steps = [
        (analyst(), Pending, UnderReview, None),
        (analyst(), UnderReview, AnalysisCompleted, Some("cash flow covers repayments")),
        (supervisor(), AnalysisCompleted, SupervisorReviewing, None),
        (supervisor(), SupervisorReviewing, Supervised, Some("agree with analyst")),
        (supervisor(), Supervised, CommitteeReview, None),
    ];

    let mut current = record;
    for (actor, from, to, comment) in steps {
        current = service
            .transition(&actor, &current.id, command(from, to, comment))
            .await
            .expect("workflow step succeeds");
    }
    current
}

#[derive(Default)]
struct MemoryState {
    records: Vec<ApplicationRecord>,
    history: Vec<(ApplicationId, StatusChange)>,
    decisions: BTreeMap<ReferenceNumber, DecisionRecord>,
    votes: Vec<MemberVote>,
    stale: Option<ApplicationRecord>,
}

impl MemoryState {
    fn status_of(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<ApplicationStatus, RepositoryError> {
        self.records
            .iter()
            .find(|record| &record.reference == reference)
            .map(|record| record.status)
            .ok_or(RepositoryError::NotFound)
    }
}

/// In-process double honouring the same compare-and-set contract as the SQLite store.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub(super) fn force_status(&self, id: &ApplicationId, status: ApplicationStatus) {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if let Some(record) = state.records.iter_mut().find(|record| &record.id == id) {
            record.status = status;
        }
    }

    /// The next `fetch` returns `snapshot` instead of the stored record, as if the read
    /// happened before a concurrent writer committed.
    pub(super) fn serve_stale_once(&self, snapshot: ApplicationRecord) {
        self.state.lock().expect("repository mutex poisoned").stale = Some(snapshot);
    }

    pub(super) fn decision_count(&self) -> usize {
        self.state
            .lock()
            .expect("repository mutex poisoned")
            .decisions
            .len()
    }
}

#[async_trait]
impl ApplicationRepository for MemoryRepository {
    async fn insert(&self, application: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.records.iter().any(|record| record.id == application.id) {
            return Err(RepositoryError::Duplicate);
        }

        let sequence = state.records.len() as u64 + 1;
        let record = ApplicationRecord {
            reference: ReferenceNumber::from_sequence(application.submitted_at.year(), sequence),
            id: application.id,
            relationship_manager_id: application.relationship_manager_id,
            status: ApplicationStatus::Pending,
            analyst_id: None,
            supervisor_id: None,
            profile: application.profile,
            documents: application.documents,
            comments: Vec::new(),
            created_at: application.submitted_at,
            updated_at: application.submitted_at,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        if state.stale.as_ref().is_some_and(|snapshot| &snapshot.id == id) {
            return Ok(state.stale.take());
        }
        Ok(state.records.iter().find(|record| &record.id == id).cloned())
    }

    async fn fetch_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .records
            .iter()
            .find(|record| &record.reference == reference)
            .cloned())
    }

    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let matching = state.records.iter().filter(|record| filter.matches(record)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn transition(
        &self,
        id: &ApplicationId,
        transition: StatusTransition,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let record = state
            .records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if record.status != transition.expected {
            return Err(RepositoryError::Conflict {
                expected: transition.expected,
                actual: record.status,
            });
        }
        if let Some(check) = &transition.reviewer {
            let current = record.assigned(check.slot);
            if current != check.assigned.as_deref() {
                return Err(RepositoryError::ReviewerChanged {
                    assigned: current.map(str::to_string),
                });
            }
        }

        record.status = transition.next;
        record.updated_at = transition.at;
        match transition.fields.assignment {
            Some(Assignment::Analyst(analyst)) => record.analyst_id = Some(analyst),
            Some(Assignment::Supervisor(supervisor)) => record.supervisor_id = Some(supervisor),
            None => {}
        }
        if let Some(body) = transition.fields.comment {
            record.comments.push(ReviewComment {
                author_id: transition.actor.id.clone(),
                role: transition.actor.role,
                status: transition.next,
                body,
                created_at: transition.at,
            });
        }
        let updated = record.clone();

        if transition.next == ApplicationStatus::CommitteeReview {
            state.votes.retain(|vote| vote.reference != updated.reference);
        }
        state.history.push((
            id.clone(),
            StatusChange {
                from: transition.expected,
                to: transition.next,
                actor_id: transition.actor.id,
                role: transition.actor.role,
                changed_at: transition.at,
            },
        ));
        if let Some(decision) = transition.fields.decision {
            state.decisions.insert(decision.reference.clone(), decision);
        }

        Ok(updated)
    }

    async fn attach_document(
        &self,
        id: &ApplicationId,
        document: DocumentDescriptor,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let record = state
            .records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if record.status.is_terminal() {
            return Err(RepositoryError::Closed {
                status: record.status,
            });
        }
        record.documents.push(document);
        Ok(())
    }

    async fn history(&self, id: &ApplicationId) -> Result<Vec<StatusChange>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .history
            .iter()
            .filter(|(owner, _)| owner == id)
            .map(|(_, change)| change.clone())
            .collect())
    }

    async fn status_counts(&self) -> Result<BTreeMap<ApplicationStatus, u64>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        let mut counts = BTreeMap::new();
        for record in &state.records {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn upsert_decision(
        &self,
        decision: DecisionRecord,
        expected: ApplicationStatus,
    ) -> Result<DecisionRecord, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let actual = state.status_of(&decision.reference)?;
        if actual != expected {
            return Err(RepositoryError::Conflict { expected, actual });
        }
        state
            .decisions
            .insert(decision.reference.clone(), decision.clone());
        Ok(decision)
    }

    async fn decision(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<DecisionRecord>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state.decisions.get(reference).cloned())
    }

    async fn record_vote(
        &self,
        vote: MemberVote,
        expected: ApplicationStatus,
    ) -> Result<MemberVote, RepositoryError> {
        let mut state = self.state.lock().expect("repository mutex poisoned");
        let actual = state.status_of(&vote.reference)?;
        if actual != expected {
            return Err(RepositoryError::Conflict { expected, actual });
        }
        state
            .votes
            .retain(|existing| !(existing.reference == vote.reference && existing.member_id == vote.member_id));
        state.votes.push(vote.clone());
        Ok(vote)
    }

    async fn votes(&self, reference: &ReferenceNumber) -> Result<Vec<MemberVote>, RepositoryError> {
        let state = self.state.lock().expect("repository mutex poisoned");
        Ok(state
            .votes
            .iter()
            .filter(|vote| &vote.reference == reference)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifications;

impl NotificationPublisher for FailingNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl ApplicationRepository for UnavailableRepository {
    async fn insert(&self, _application: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        Err(offline())
    }

    async fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(offline())
    }

    async fn fetch_by_reference(
        &self,
        _reference: &ReferenceNumber,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(offline())
    }

    async fn list(&self, _filter: &ApplicationFilter) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(offline())
    }

    async fn transition(
        &self,
        _id: &ApplicationId,
        _transition: StatusTransition,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(offline())
    }

    async fn attach_document(
        &self,
        _id: &ApplicationId,
        _document: DocumentDescriptor,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }

    async fn history(&self, _id: &ApplicationId) -> Result<Vec<StatusChange>, RepositoryError> {
        Err(offline())
    }

    async fn status_counts(&self) -> Result<BTreeMap<ApplicationStatus, u64>, RepositoryError> {
        Err(offline())
    }

    async fn upsert_decision(
        &self,
        _decision: DecisionRecord,
        _expected: ApplicationStatus,
    ) -> Result<DecisionRecord, RepositoryError> {
        Err(offline())
    }

    async fn decision(
        &self,
        _reference: &ReferenceNumber,
    ) -> Result<Option<DecisionRecord>, RepositoryError> {
        Err(offline())
    }

    async fn record_vote(
        &self,
        _vote: MemberVote,
        _expected: ApplicationStatus,
    ) -> Result<MemberVote, RepositoryError> {
        Err(offline())
    }

    async fn votes(&self, _reference: &ReferenceNumber) -> Result<Vec<MemberVote>, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    application_router(Arc::new(service))
}

pub(super) fn now_year() -> i32 {
    Utc::now().year()
}
