use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, ReferenceNumber};

/// Outcome a committee can reach for an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Rejected,
    Reversed,
}

impl DecisionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionOutcome::Approved => "approved",
            DecisionOutcome::Rejected => "rejected",
            DecisionOutcome::Reversed => "reversed",
        }
    }

    /// Status the application moves into when this outcome is recorded.
    pub const fn status(self) -> ApplicationStatus {
        match self {
            DecisionOutcome::Approved => ApplicationStatus::Approved,
            DecisionOutcome::Rejected => ApplicationStatus::Rejected,
            DecisionOutcome::Reversed => ApplicationStatus::CommitteeReversed,
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DecisionOutcome {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "approved" => Ok(DecisionOutcome::Approved),
            "rejected" => Ok(DecisionOutcome::Rejected),
            "reversed" => Ok(DecisionOutcome::Reversed),
            other => Err(format!("unknown decision outcome '{other}'")),
        }
    }
}

/// Committee decision. At most one exists per reference number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub reference: ReferenceNumber,
    pub outcome: DecisionOutcome,
    pub rationale: String,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}

/// A single committee member's vote. At most one exists per member per application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberVote {
    pub reference: ReferenceNumber,
    pub member_id: String,
    pub vote: DecisionOutcome,
    pub rationale: String,
    pub voted_at: DateTime<Utc>,
}

/// Vote counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub approved: usize,
    pub rejected: usize,
    pub reversed: usize,
}

impl VoteTally {
    pub fn from_votes(votes: &[MemberVote]) -> Self {
        votes.iter().fold(Self::default(), |mut tally, vote| {
            match vote.vote {
                DecisionOutcome::Approved => tally.approved += 1,
                DecisionOutcome::Rejected => tally.rejected += 1,
                DecisionOutcome::Reversed => tally.reversed += 1,
            }
            tally
        })
    }

    pub fn total(&self) -> usize {
        self.approved + self.rejected + self.reversed
    }

    /// Outcome holding a strict plurality, if any.
    pub fn leading(&self) -> Option<DecisionOutcome> {
        let counts = [
            (DecisionOutcome::Approved, self.approved),
            (DecisionOutcome::Rejected, self.rejected),
            (DecisionOutcome::Reversed, self.reversed),
        ];
        let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        if max == 0 {
            return None;
        }

        let mut leaders = counts.iter().filter(|(_, count)| *count == max);
        match (leaders.next(), leaders.next()) {
            (Some((outcome, _)), None) => Some(*outcome),
            _ => None,
        }
    }
}
