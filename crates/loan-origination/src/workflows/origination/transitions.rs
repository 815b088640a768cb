//! Allowed status edges and who may take them.
//!
//! The table is consulted before any write; the datastore guard then decides which of
//! several concurrent callers actually wins an allowed edge.

use super::domain::ApplicationStatus as S;
use super::domain::{Actor, ApplicationStatus, Role};

/// Reviewer column a rule reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewerSlot {
    Analyst,
    Supervisor,
}

/// Side effect attached to an allowed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Claim the application: the actor becomes the stage reviewer.
    Assign(ReviewerSlot),
    /// Stage work by the already assigned reviewer.
    Review {
        reviewer: ReviewerSlot,
        requires_comment: bool,
    },
    /// Committee outcome; only reachable through the decision operation.
    Decision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub role: Role,
    pub effect: TransitionEffect,
}

#[rustfmt::skip]
const RULES: &[TransitionRule] = &[
    rule(S::Pending, S::UnderReview, Role::CreditAnalyst, assign(ReviewerSlot::Analyst)),
    rule(S::CommitteeReversed, S::UnderReview, Role::CreditAnalyst, assign(ReviewerSlot::Analyst)),
    rule(S::UnderReview, S::AnalysisCompleted, Role::CreditAnalyst, review(ReviewerSlot::Analyst, true)),
    rule(S::UnderReview, S::Conditional, Role::CreditAnalyst, review(ReviewerSlot::Analyst, true)),
    rule(S::UnderReview, S::RmRecommendation, Role::CreditAnalyst, review(ReviewerSlot::Analyst, true)),
    rule(S::AnalysisCompleted, S::SupervisorReviewing, Role::Supervisor, assign(ReviewerSlot::Supervisor)),
    rule(S::Conditional, S::SupervisorReviewing, Role::Supervisor, assign(ReviewerSlot::Supervisor)),
    rule(S::RmRecommendation, S::SupervisorReviewing, Role::Supervisor, assign(ReviewerSlot::Supervisor)),
    rule(S::SupervisorReviewing, S::Supervised, Role::Supervisor, review(ReviewerSlot::Supervisor, true)),
    rule(S::SupervisorReviewing, S::UnderReview, Role::Supervisor, review(ReviewerSlot::Supervisor, true)),
    rule(S::Supervised, S::CommitteeReview, Role::Supervisor, review(ReviewerSlot::Supervisor, false)),
    rule(S::CommitteeReview, S::Approved, Role::CommitteeMember, TransitionEffect::Decision),
    rule(S::CommitteeReview, S::Rejected, Role::CommitteeMember, TransitionEffect::Decision),
    rule(S::CommitteeReview, S::CommitteeReversed, Role::CommitteeMember, TransitionEffect::Decision),
];

const fn rule(
    from: ApplicationStatus,
    to: ApplicationStatus,
    role: Role,
    effect: TransitionEffect,
) -> TransitionRule {
    TransitionRule {
        from,
        to,
        role,
        effect,
    }
}

const fn assign(slot: ReviewerSlot) -> TransitionEffect {
    TransitionEffect::Assign(slot)
}

const fn review(reviewer: ReviewerSlot, requires_comment: bool) -> TransitionEffect {
    TransitionEffect::Review {
        reviewer,
        requires_comment,
    }
}

/// Reasons a requested transition is refused before reaching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("transition {from} -> {to} is not part of the workflow")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("role {role} may not move an application from {from} to {to}")]
    Forbidden {
        role: Role,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application is assigned to {assigned}, not {actor}")]
    NotAssigned { actor: String, assigned: String },
    #[error("a review comment is required when moving to {to}")]
    CommentRequired { to: ApplicationStatus },
    #[error("committee outcomes must be recorded as a decision")]
    DecisionRequired,
}

/// Look up the rule for an edge.
pub fn rule_for(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Option<&'static TransitionRule> {
    RULES.iter().find(|rule| rule.from == from && rule.to == to)
}

/// Statuses reachable from `from` in one step.
pub fn next_statuses(from: ApplicationStatus) -> Vec<ApplicationStatus> {
    RULES
        .iter()
        .filter(|rule| rule.from == from)
        .map(|rule| rule.to)
        .collect()
}

impl TransitionRule {
    /// Check that `actor` may take this edge. `assigned` is the reviewer currently
    /// recorded in the slot the rule works on.
    pub fn authorize(
        &self,
        actor: &Actor,
        assigned: Option<&str>,
        comment: Option<&str>,
    ) -> Result<(), TransitionError> {
        if actor.role != self.role && actor.role != Role::Admin {
            return Err(TransitionError::Forbidden {
                role: actor.role,
                from: self.from,
                to: self.to,
            });
        }

        if let TransitionEffect::Review {
            requires_comment, ..
        } = self.effect
        {
            if actor.role != Role::Admin {
                if let Some(assigned) = assigned {
                    if assigned != actor.id {
                        return Err(TransitionError::NotAssigned {
                            actor: actor.id.clone(),
                            assigned: assigned.to_string(),
                        });
                    }
                }
            }

            let has_comment = comment.is_some_and(|body| !body.trim().is_empty());
            if requires_comment && !has_comment {
                return Err(TransitionError::CommentRequired { to: self.to });
            }
        }

        Ok(())
    }

    /// Reviewer slot the rule either claims or requires.
    pub fn slot(&self) -> Option<ReviewerSlot> {
        match self.effect {
            TransitionEffect::Assign(slot) => Some(slot),
            TransitionEffect::Review { reviewer, .. } => Some(reviewer),
            TransitionEffect::Decision => None,
        }
    }
}
