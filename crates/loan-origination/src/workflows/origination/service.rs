use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::decisions::{DecisionOutcome, DecisionRecord, MemberVote, VoteTally};
use super::domain::{
    Actor, ApplicationId, ApplicationStatus, ApplicationSubmission, DocumentDescriptor,
    ReferenceNumber, Role, StatusChange,
};
use super::intake::{IntakeGuard, IntakePolicy, IntakeViolation, WizardStep};
use super::report::PipelineSummary;
use super::repository::{
    ApplicationFilter, ApplicationRecord, ApplicationRepository, Assignment, NewApplication,
    Notification, NotificationPublisher, RepositoryError, ReviewerCheck, StatusTransition,
    TransitionFields,
};
use super::transitions::{rule_for, ReviewerSlot, TransitionEffect, TransitionError};

/// Requested status change, as posted by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCommand {
    pub expected_status: ApplicationStatus,
    pub next_status: ApplicationStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSubmission {
    pub outcome: DecisionOutcome,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSubmission {
    pub vote: DecisionOutcome,
    #[serde(default)]
    pub rationale: String,
}

/// Votes cast so far plus their tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteSummary {
    pub reference: ReferenceNumber,
    pub votes: Vec<MemberVote>,
    pub tally: VoteTally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading: Option<DecisionOutcome>,
}

/// Service composing the intake guard, workflow rules, repository, and notifications.
pub struct LoanApplicationService<R, N> {
    guard: Arc<IntakeGuard>,
    repository: Arc<R>,
    notifications: Arc<N>,
}

impl<R, N> LoanApplicationService<R, N>
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, policy: IntakePolicy) -> Self {
        Self {
            guard: Arc::new(IntakeGuard::with_policy(policy)),
            repository,
            notifications,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Validate one wizard step without persisting anything.
    pub fn validate_step(
        &self,
        step: WizardStep,
        submission: &ApplicationSubmission,
    ) -> Result<(), IntakeViolation> {
        self.guard.validate_step(step, submission)
    }

    /// Submit a completed wizard, creating a PENDING application.
    pub async fn submit(
        &self,
        actor: &Actor,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, LoanServiceError> {
        require_role(actor, &[Role::RelationshipManager], "submit applications")?;
        let (profile, documents) = self.guard.profile_from_submission(submission)?;

        let record = self
            .repository
            .insert(NewApplication {
                id: ApplicationId::generate(),
                relationship_manager_id: actor.id.clone(),
                profile,
                documents,
                submitted_at: Utc::now(),
            })
            .await?;

        info!(
            id = %record.id,
            reference = %record.reference,
            manager = %actor.id,
            "loan application submitted"
        );
        Ok(record)
    }

    /// Fetch an application and current status for API responses.
    pub async fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, LoanServiceError> {
        let record = self
            .repository
            .fetch(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub async fn get_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<ApplicationRecord, LoanServiceError> {
        let record = self
            .repository
            .fetch_by_reference(reference)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Move an application along an allowed edge. The write only lands if the stored
    /// status still equals `expected_status`; otherwise the caller gets a conflict.
    pub async fn transition(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        command: TransitionCommand,
    ) -> Result<ApplicationRecord, LoanServiceError> {
        let TransitionCommand {
            expected_status,
            next_status,
            comment,
        } = command;

        let rule = rule_for(expected_status, next_status).ok_or(
            TransitionError::InvalidTransition {
                from: expected_status,
                to: next_status,
            },
        )?;
        if rule.effect == TransitionEffect::Decision {
            return Err(TransitionError::DecisionRequired.into());
        }

        let current = self.get(id).await?;
        let assigned = rule.slot().and_then(|slot| current.assigned(slot));
        rule.authorize(actor, assigned, comment.as_deref())?;

        let (assignment, reviewer) = match rule.effect {
            TransitionEffect::Assign(ReviewerSlot::Analyst) => {
                (Some(Assignment::Analyst(actor.id.clone())), None)
            }
            TransitionEffect::Assign(ReviewerSlot::Supervisor) => {
                (Some(Assignment::Supervisor(actor.id.clone())), None)
            }
            // The reviewer checked above must still hold the slot when the write lands.
            TransitionEffect::Review { reviewer, .. } => (
                None,
                Some(ReviewerCheck {
                    slot: reviewer,
                    assigned: assigned.map(str::to_string),
                }),
            ),
            TransitionEffect::Decision => (None, None),
        };

        let updated = self
            .guarded_write(
                id,
                StatusTransition {
                    expected: expected_status,
                    next: next_status,
                    actor: actor.clone(),
                    reviewer,
                    fields: TransitionFields {
                        assignment,
                        comment,
                        decision: None,
                    },
                    at: Utc::now(),
                },
            )
            .await?;

        let mut details = BTreeMap::new();
        details.insert("from".to_string(), expected_status.label().to_string());
        details.insert("to".to_string(), next_status.label().to_string());
        details.insert("actor".to_string(), actor.id.clone());
        self.notify(&updated, "status_changed", details);

        Ok(updated)
    }

    /// Record the committee outcome. The first submission moves the application out of
    /// COMMITTE_REVIEW and stores the decision in the same guarded write; re-posting the
    /// same outcome afterwards only updates the stored decision, and only while the
    /// application still sits in that outcome's status.
    pub async fn decide(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        submission: DecisionSubmission,
    ) -> Result<DecisionRecord, LoanServiceError> {
        require_role(actor, &[Role::CommitteeMember], "record committee decisions")?;
        if submission.rationale.trim().is_empty() {
            return Err(LoanServiceError::RationaleRequired);
        }

        let record = self.get(id).await?;
        let outcome = submission.outcome;
        let decision = DecisionRecord {
            reference: record.reference.clone(),
            outcome,
            rationale: submission.rationale.trim().to_string(),
            decided_by: actor.id.clone(),
            decided_at: Utc::now(),
        };

        if record.status == outcome.status()
            && self.repository.decision(&record.reference).await?.is_some()
        {
            let stored = self
                .repository
                .upsert_decision(decision, outcome.status())
                .await?;
            info!(reference = %record.reference, %outcome, "committee decision resubmitted");
            return Ok(stored);
        }

        let updated = self
            .guarded_write(
                id,
                StatusTransition {
                    expected: ApplicationStatus::CommitteeReview,
                    next: outcome.status(),
                    actor: actor.clone(),
                    reviewer: None,
                    fields: TransitionFields {
                        assignment: None,
                        comment: Some(decision.rationale.clone()),
                        decision: Some(decision.clone()),
                    },
                    at: decision.decided_at,
                },
            )
            .await?;

        info!(reference = %updated.reference, %outcome, member = %actor.id, "committee decision recorded");

        let mut details = BTreeMap::new();
        details.insert("outcome".to_string(), outcome.label().to_string());
        details.insert("rationale".to_string(), decision.rationale.clone());
        self.notify(&updated, "decision_recorded", details);

        Ok(decision)
    }

    pub async fn decision(&self, id: &ApplicationId) -> Result<DecisionRecord, LoanServiceError> {
        let record = self.get(id).await?;
        let decision = self
            .repository
            .decision(&record.reference)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(decision)
    }

    /// Cast or replace a committee member's vote while the application is in committee.
    pub async fn vote(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        submission: VoteSubmission,
    ) -> Result<MemberVote, LoanServiceError> {
        if actor.role != Role::CommitteeMember {
            return Err(LoanServiceError::Forbidden {
                role: actor.role,
                action: "vote on applications",
            });
        }

        let record = self.get(id).await?;
        if record.status != ApplicationStatus::CommitteeReview {
            return Err(LoanServiceError::VotingClosed {
                status: record.status,
            });
        }

        let ballot = MemberVote {
            reference: record.reference,
            member_id: actor.id.clone(),
            vote: submission.vote,
            rationale: submission.rationale.trim().to_string(),
            voted_at: Utc::now(),
        };
        let vote = match self
            .repository
            .record_vote(ballot, ApplicationStatus::CommitteeReview)
            .await
        {
            Ok(vote) => vote,
            Err(RepositoryError::Conflict { actual, .. }) => {
                return Err(LoanServiceError::VotingClosed { status: actual });
            }
            Err(other) => return Err(other.into()),
        };

        info!(reference = %vote.reference, member = %vote.member_id, vote = %vote.vote, "committee vote recorded");
        Ok(vote)
    }

    pub async fn votes(&self, id: &ApplicationId) -> Result<VoteSummary, LoanServiceError> {
        let record = self.get(id).await?;
        let votes = self.repository.votes(&record.reference).await?;
        let tally = VoteTally::from_votes(&votes);

        Ok(VoteSummary {
            reference: record.reference,
            leading: tally.leading(),
            tally,
            votes,
        })
    }

    /// Register a document uploaded to object storage after submission.
    pub async fn attach_document(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        document: DocumentDescriptor,
    ) -> Result<ApplicationRecord, LoanServiceError> {
        require_role(actor, &[Role::RelationshipManager], "attach documents")?;

        let record = self.get(id).await?;
        if actor.role == Role::RelationshipManager && record.relationship_manager_id != actor.id {
            return Err(LoanServiceError::Forbidden {
                role: actor.role,
                action: "attach documents to another manager's application",
            });
        }

        let document = self.guard.normalize_document(document)?;
        match self.repository.attach_document(id, document).await {
            Ok(()) => self.get(id).await,
            Err(RepositoryError::Closed { status }) => Err(LoanServiceError::Closed { status }),
            Err(other) => Err(other.into()),
        }
    }

    /// Applications the actor's dashboard should show.
    pub async fn queue(&self, actor: &Actor) -> Result<Vec<ApplicationRecord>, LoanServiceError> {
        use super::domain::ApplicationStatus as S;

        let filter = match actor.role {
            Role::RelationshipManager => ApplicationFilter {
                relationship_manager_id: Some(actor.id.clone()),
                ..ApplicationFilter::default()
            },
            Role::CreditAnalyst => {
                ApplicationFilter::with_statuses([S::Pending, S::CommitteeReversed, S::UnderReview])
            }
            Role::Supervisor => ApplicationFilter::with_statuses([
                S::AnalysisCompleted,
                S::Conditional,
                S::RmRecommendation,
                S::SupervisorReviewing,
                S::Supervised,
            ]),
            Role::CommitteeMember => ApplicationFilter::with_statuses([S::CommitteeReview]),
            Role::Admin => ApplicationFilter::default(),
        };

        let records = self.repository.list(&filter).await?;
        Ok(records
            .into_iter()
            .filter(|record| match (actor.role, record.status) {
                (Role::CreditAnalyst, S::UnderReview) => {
                    record.analyst_id.as_deref() == Some(actor.id.as_str())
                }
                (Role::Supervisor, S::SupervisorReviewing | S::Supervised) => {
                    record.supervisor_id.as_deref() == Some(actor.id.as_str())
                }
                _ => true,
            })
            .collect())
    }

    pub async fn list(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<ApplicationRecord>, LoanServiceError> {
        Ok(self.repository.list(filter).await?)
    }

    pub async fn history(&self, id: &ApplicationId) -> Result<Vec<StatusChange>, LoanServiceError> {
        self.get(id).await?;
        Ok(self.repository.history(id).await?)
    }

    pub async fn pipeline(&self) -> Result<PipelineSummary, LoanServiceError> {
        let counts = self.repository.status_counts().await?;
        Ok(PipelineSummary::from_counts(&counts))
    }

    async fn guarded_write(
        &self,
        id: &ApplicationId,
        transition: StatusTransition,
    ) -> Result<ApplicationRecord, LoanServiceError> {
        let (expected, next) = (transition.expected, transition.next);
        let actor = transition.actor.id.clone();
        match self.repository.transition(id, transition).await {
            Ok(record) => {
                info!(%id, from = %expected, to = %next, "application status changed");
                Ok(record)
            }
            Err(RepositoryError::Conflict { expected, actual }) => {
                warn!(%id, %expected, %actual, attempted = %next, "status transition lost the race");
                Err(RepositoryError::Conflict { expected, actual }.into())
            }
            Err(RepositoryError::ReviewerChanged { assigned }) => {
                warn!(%id, %actor, ?assigned, attempted = %next, "stage reviewer changed before write");
                Err(TransitionError::NotAssigned {
                    actor,
                    assigned: assigned.unwrap_or_else(|| "nobody".to_string()),
                }
                .into())
            }
            Err(other) => Err(other.into()),
        }
    }

    fn notify(&self, record: &ApplicationRecord, template: &str, details: BTreeMap<String, String>) {
        let notification = Notification {
            template: template.to_string(),
            recipient: record.relationship_manager_id.clone(),
            reference: record.reference.clone(),
            details,
        };

        if let Err(err) = self.notifications.publish(notification) {
            warn!(reference = %record.reference, error = %err, "notification not delivered");
        }
    }
}

fn require_role(actor: &Actor, allowed: &[Role], action: &'static str) -> Result<(), LoanServiceError> {
    if actor.role == Role::Admin || allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(LoanServiceError::Forbidden {
            role: actor.role,
            action,
        })
    }
}

/// Error raised by the loan application service.
#[derive(Debug, thiserror::Error)]
pub enum LoanServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeViolation),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("role {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },
    #[error("application is closed ({status})")]
    Closed { status: ApplicationStatus },
    #[error("votes are only accepted during committee review (current status {status})")]
    VotingClosed { status: ApplicationStatus },
    #[error("a decision rationale is required")]
    RationaleRequired,
}
