//! Faculty review of admin-approved ideas
//!
//! Approval seeds the incubation work record in the same write as the status
//! change. The record is keyed on the submission, so a repeated approval can
//! never duplicate it.

use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::auth::{require_role, Principal, Role};
use crate::services::{NotificationDispatcher, Recipient};
use crate::types::{MicError, Result};
use crate::workflow::{
    apply_approval, apply_transition, Actor, IncubationStore, StatusChange, Submission, SubmissionQuery,
    SubmissionStatus, SubmissionStore, WorkRecord,
};

/// States faculty can see
pub const REVIEWABLE: [SubmissionStatus; 3] = [
    SubmissionStatus::AdminApproved,
    SubmissionStatus::Approved,
    SubmissionStatus::Rejected,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacultyDecision {
    Approved,
    Rejected,
    NeedsImprovement,
}

impl FacultyDecision {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "approved" => Ok(FacultyDecision::Approved),
            "rejected" => Ok(FacultyDecision::Rejected),
            "needs_improvement" => Ok(FacultyDecision::NeedsImprovement),
            other => Err(MicError::InvalidDecision(other.to_string())),
        }
    }

    pub fn target(&self) -> SubmissionStatus {
        match self {
            FacultyDecision::Approved => SubmissionStatus::Approved,
            FacultyDecision::Rejected => SubmissionStatus::Rejected,
            FacultyDecision::NeedsImprovement => SubmissionStatus::NeedsImprovement,
        }
    }

    /// Wording used in the owner's notification
    pub fn label(&self) -> &'static str {
        match self {
            FacultyDecision::Approved => "approved (Under Incubation)",
            FacultyDecision::Rejected => "rejected",
            FacultyDecision::NeedsImprovement => "needs improvement - please revise your submission",
        }
    }
}

/// A submission as faculty see it, with incubation progress when present
#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub submission: Submission,
    pub progress_percent: Option<i32>,
}

#[derive(Clone)]
pub struct FacultyReview {
    submissions: Arc<dyn SubmissionStore>,
    work: Arc<dyn IncubationStore>,
    notifier: NotificationDispatcher,
}

impl FacultyReview {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        work: Arc<dyn IncubationStore>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            submissions,
            work,
            notifier,
        }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Submission>> {
        require_role(principal, &[Role::Faculty])?;
        self.submissions
            .list(&SubmissionQuery::in_statuses(&REVIEWABLE))
            .await
    }

    pub async fn get(&self, principal: &Principal, submission_id: &str) -> Result<ReviewDetail> {
        require_role(principal, &[Role::Faculty])?;

        let submission = self
            .submissions
            .get(submission_id)
            .await?
            .filter(|s| REVIEWABLE.contains(&s.status))
            .ok_or_else(|| MicError::NotFound(format!("submission {}", submission_id)))?;

        let work = self.work.get_work(submission_id).await?;
        Ok(ReviewDetail {
            progress_percent: work.as_ref().map(|w| w.progress_percent),
            submission: submission.with_work(work.as_ref()),
        })
    }

    /// Decide an admin-approved submission.
    pub async fn decide(
        &self,
        principal: &Principal,
        submission_id: &str,
        decision: &str,
    ) -> Result<SubmissionStatus> {
        require_role(principal, &[Role::Faculty])?;
        let decision = FacultyDecision::parse(decision)?;

        let submission = self
            .submissions
            .get(submission_id)
            .await?
            .ok_or(MicError::TransitionConflict)?;

        let change = StatusChange {
            submission_id,
            from: SubmissionStatus::AdminApproved,
            to: decision.target(),
            owner_id: None,
            reason: None,
        };
        match decision {
            FacultyDecision::Approved => {
                let work = WorkRecord::seed(&submission);
                apply_approval(self.submissions.as_ref(), change, Actor::Faculty, &work).await?;
            }
            _ => apply_transition(self.submissions.as_ref(), change, Actor::Faculty).await?,
        }

        let recipient = Recipient {
            identity: &submission.owner_id,
            email: &submission.owner_email,
        };
        if let Err(e) = self
            .notifier
            .notify_decision(recipient, submission_id, &submission.title, decision.label())
            .await
        {
            error!(submission = submission_id, error = %e, "Failed to record decision notification");
        }

        Ok(decision.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decision() {
        assert_eq!(FacultyDecision::parse("approved").unwrap(), FacultyDecision::Approved);
        assert_eq!(
            FacultyDecision::parse("needs_improvement").unwrap(),
            FacultyDecision::NeedsImprovement
        );
        assert!(matches!(FacultyDecision::parse("bogus"), Err(MicError::InvalidDecision(_))));
        assert!(matches!(FacultyDecision::parse(""), Err(MicError::InvalidDecision(_))));
    }

    #[test]
    fn test_approval_label_mentions_incubation() {
        assert!(FacultyDecision::Approved.label().contains("Under Incubation"));
        assert!(FacultyDecision::NeedsImprovement
            .label()
            .starts_with("needs improvement - please revise"));
    }

    #[test]
    fn test_targets_are_reviewable_or_terminal() {
        for decision in [
            FacultyDecision::Approved,
            FacultyDecision::Rejected,
            FacultyDecision::NeedsImprovement,
        ] {
            assert!(decision.target().is_terminal());
        }
    }
}
