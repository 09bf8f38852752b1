//! Admin triage of submitted ideas

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::auth::{require_role, Principal, Role};
use crate::types::{MicError, Result};
use crate::workflow::{
    apply_transition, Actor, AssignmentStore, FacultyAssignment, StatusChange, Submission,
    SubmissionQuery, SubmissionStatus, SubmissionStore,
};

/// An admin's triage outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    Approved,
    Rejected,
}

impl AdminDecision {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "approved" => Ok(AdminDecision::Approved),
            "rejected" => Ok(AdminDecision::Rejected),
            other => Err(MicError::InvalidDecision(format!(
                "'{}': must be 'approved' or 'rejected'",
                other
            ))),
        }
    }

    pub fn target(&self) -> SubmissionStatus {
        match self {
            AdminDecision::Approved => SubmissionStatus::AdminApproved,
            AdminDecision::Rejected => SubmissionStatus::AdminRejected,
        }
    }
}

#[derive(Clone)]
pub struct AdminTriage {
    submissions: Arc<dyn SubmissionStore>,
    assignments: Arc<dyn AssignmentStore>,
}

impl AdminTriage {
    pub fn new(submissions: Arc<dyn SubmissionStore>, assignments: Arc<dyn AssignmentStore>) -> Self {
        Self {
            submissions,
            assignments,
        }
    }

    /// Submissions awaiting triage
    pub async fn list_pending(&self, principal: &Principal) -> Result<Vec<Submission>> {
        require_role(principal, &[Role::Admin])?;
        self.submissions
            .list(&SubmissionQuery::in_statuses(&[SubmissionStatus::Submitted]))
            .await
    }

    /// Every submission past draft
    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<Submission>> {
        require_role(principal, &[Role::Admin])?;
        let statuses: Vec<SubmissionStatus> = SubmissionStatus::ALL
            .into_iter()
            .filter(|s| *s != SubmissionStatus::Draft)
            .collect();
        self.submissions
            .list(&SubmissionQuery::in_statuses(&statuses))
            .await
    }

    /// Approve or reject a submitted idea. The reason is kept for rejections only.
    pub async fn decide(
        &self,
        principal: &Principal,
        submission_id: &str,
        decision: &str,
        reason: Option<&str>,
    ) -> Result<SubmissionStatus> {
        require_role(principal, &[Role::Admin])?;
        let decision = AdminDecision::parse(decision)?;

        let reason = match decision {
            AdminDecision::Rejected => reason.map(str::trim).filter(|r| !r.is_empty()),
            AdminDecision::Approved => None,
        };

        apply_transition(
            self.submissions.as_ref(),
            StatusChange {
                submission_id,
                from: SubmissionStatus::Submitted,
                to: decision.target(),
                owner_id: None,
                reason,
            },
            Actor::Admin,
        )
        .await?;

        Ok(decision.target())
    }

    /// Link a faculty reviewer. Returns `false` when the link already existed.
    pub async fn assign_faculty(
        &self,
        principal: &Principal,
        submission_id: &str,
        faculty_id: &str,
    ) -> Result<bool> {
        require_role(principal, &[Role::Admin])?;
        let faculty_id = faculty_id.trim();
        if faculty_id.is_empty() {
            return Err(MicError::Validation("faculty_id is required".into()));
        }
        self.require_submission(submission_id).await?;

        let created = self
            .assignments
            .assign(&FacultyAssignment {
                submission_id: submission_id.to_string(),
                faculty_id: faculty_id.to_string(),
                assigned_by: principal.identity.clone(),
                assigned_at: Utc::now(),
            })
            .await?;

        info!(submission = submission_id, faculty = faculty_id, created, "Faculty assigned");
        Ok(created)
    }

    pub async fn unassign_faculty(
        &self,
        principal: &Principal,
        submission_id: &str,
        faculty_id: &str,
    ) -> Result<()> {
        require_role(principal, &[Role::Admin])?;

        let matched = self.assignments.unassign(submission_id, faculty_id).await?;
        if matched == 0 {
            return Err(MicError::NotFound(format!(
                "assignment of {} to {}",
                faculty_id, submission_id
            )));
        }

        info!(submission = submission_id, faculty = faculty_id, "Faculty unassigned");
        Ok(())
    }

    pub async fn list_assigned(
        &self,
        principal: &Principal,
        submission_id: &str,
    ) -> Result<Vec<FacultyAssignment>> {
        require_role(principal, &[Role::Admin])?;
        self.assignments.list_assigned(submission_id).await
    }

    /// Replace tags and domain. No status precondition.
    pub async fn update_tags(
        &self,
        principal: &Principal,
        submission_id: &str,
        tags: Vec<String>,
        domain: Option<String>,
    ) -> Result<()> {
        require_role(principal, &[Role::Admin])?;

        let mut tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let mut seen = HashSet::new();
        tags.retain(|t| seen.insert(t.clone()));
        let domain = crate::workflow::model::non_blank(domain);

        let matched = self
            .submissions
            .update_tags(submission_id, &tags, domain.as_deref())
            .await?;
        if matched == 0 {
            return Err(MicError::NotFound(format!("submission {}", submission_id)));
        }
        Ok(())
    }

    async fn require_submission(&self, submission_id: &str) -> Result<Submission> {
        self.submissions
            .get(submission_id)
            .await?
            .ok_or_else(|| MicError::NotFound(format!("submission {}", submission_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decision() {
        assert_eq!(AdminDecision::parse("approved").unwrap(), AdminDecision::Approved);
        assert_eq!(AdminDecision::parse("rejected").unwrap(), AdminDecision::Rejected);
        assert!(matches!(
            AdminDecision::parse("needs_improvement"),
            Err(MicError::InvalidDecision(_))
        ));
        assert!(matches!(AdminDecision::parse("Approved"), Err(MicError::InvalidDecision(_))));
    }

    #[test]
    fn test_decision_targets() {
        assert_eq!(AdminDecision::Approved.target(), SubmissionStatus::AdminApproved);
        assert_eq!(AdminDecision::Rejected.target(), SubmissionStatus::AdminRejected);
    }
}
