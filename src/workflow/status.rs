//! Submission states and the transition table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of submission states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Owner-editable
    #[default]
    Draft,
    /// Awaiting admin triage
    Submitted,
    /// Visible to faculty
    AdminApproved,
    AdminRejected,
    /// Faculty-approved, in incubation
    Approved,
    Rejected,
    NeedsImprovement,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 7] = [
        SubmissionStatus::Draft,
        SubmissionStatus::Submitted,
        SubmissionStatus::AdminApproved,
        SubmissionStatus::AdminRejected,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
        SubmissionStatus::NeedsImprovement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::AdminApproved => "admin_approved",
            SubmissionStatus::AdminRejected => "admin_rejected",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::NeedsImprovement => "needs_improvement",
        }
    }

    /// A state is terminal when the table has no edge leaving it.
    pub fn is_terminal(&self) -> bool {
        !TRANSITIONS.iter().any(|t| t.from == *self)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// Who drives a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The student who created the submission
    Owner,
    Admin,
    Faculty,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Owner => write!(f, "owner"),
            Actor::Admin => write!(f, "admin"),
            Actor::Faculty => write!(f, "faculty"),
        }
    }
}

/// One legal edge of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
    pub actor: Actor,
}

const fn edge(from: SubmissionStatus, to: SubmissionStatus, actor: Actor) -> Transition {
    Transition { from, to, actor }
}

/// Every status change the system performs. Nothing else is legal.
pub const TRANSITIONS: &[Transition] = &[
    edge(SubmissionStatus::Draft, SubmissionStatus::Draft, Actor::Owner),
    edge(SubmissionStatus::Draft, SubmissionStatus::Submitted, Actor::Owner),
    edge(SubmissionStatus::Submitted, SubmissionStatus::AdminApproved, Actor::Admin),
    edge(SubmissionStatus::Submitted, SubmissionStatus::AdminRejected, Actor::Admin),
    edge(SubmissionStatus::AdminApproved, SubmissionStatus::Approved, Actor::Faculty),
    edge(SubmissionStatus::AdminApproved, SubmissionStatus::Rejected, Actor::Faculty),
    edge(SubmissionStatus::AdminApproved, SubmissionStatus::NeedsImprovement, Actor::Faculty),
];

/// Look up the edge `from -> to` for `actor`.
pub fn find_transition(
    from: SubmissionStatus,
    to: SubmissionStatus,
    actor: Actor,
) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.to == to && t.actor == actor)
}

/// The state an actor must find a submission in to move it to `to`.
pub fn required_source(to: SubmissionStatus, actor: Actor) -> Option<SubmissionStatus> {
    TRANSITIONS
        .iter()
        .find(|t| t.to == to && t.actor == actor && t.from != t.to)
        .map(|t| t.from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SubmissionStatus::Draft.is_terminal());
        assert!(!SubmissionStatus::Submitted.is_terminal());
        assert!(!SubmissionStatus::AdminApproved.is_terminal());
        assert!(SubmissionStatus::AdminRejected.is_terminal());
        assert!(SubmissionStatus::Approved.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
        assert!(SubmissionStatus::NeedsImprovement.is_terminal());
    }

    #[test]
    fn test_no_edge_enters_draft_from_elsewhere() {
        assert!(TRANSITIONS
            .iter()
            .filter(|t| t.to == SubmissionStatus::Draft)
            .all(|t| t.from == SubmissionStatus::Draft));
    }

    #[test]
    fn test_actor_is_part_of_the_edge() {
        use SubmissionStatus::*;
        assert!(find_transition(Submitted, AdminApproved, Actor::Admin).is_some());
        assert!(find_transition(Submitted, AdminApproved, Actor::Faculty).is_none());
        assert!(find_transition(AdminApproved, Approved, Actor::Admin).is_none());
        assert!(find_transition(Draft, Submitted, Actor::Admin).is_none());
        assert!(find_transition(Submitted, Approved, Actor::Faculty).is_none());
    }

    #[test]
    fn test_required_source() {
        use SubmissionStatus::*;
        assert_eq!(required_source(Submitted, Actor::Owner), Some(Draft));
        assert_eq!(required_source(AdminRejected, Actor::Admin), Some(Submitted));
        assert_eq!(required_source(NeedsImprovement, Actor::Faculty), Some(AdminApproved));
        assert_eq!(required_source(Approved, Actor::Admin), None);
    }

    #[test]
    fn test_status_strings() {
        for status in SubmissionStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
        }
        assert!("under_review".parse::<SubmissionStatus>().is_err());
    }
}
