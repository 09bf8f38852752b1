//! Student-facing submission workflow
//!
//! Every status change goes through [`apply_transition`]: the edge must exist
//! in [`TRANSITIONS`](crate::workflow::TRANSITIONS) and the store must match
//! the row on its expected current status. Zero matched rows is a
//! `TransitionConflict`, never a retry.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::{require_role, Principal, Role};
use crate::services::{NotificationDispatcher, Recipient};
use crate::types::{MicError, Result};
use crate::workflow::status::find_transition;
use crate::workflow::{
    Actor, DraftEdit, NewSubmission, StatusChange, Submission, SubmissionQuery, SubmissionStatus,
    SubmissionStore, WorkRecord,
};

/// Run one guarded status change.
pub async fn apply_transition(
    store: &dyn SubmissionStore,
    change: StatusChange<'_>,
    actor: Actor,
) -> Result<()> {
    commit_transition(store, change, actor, None).await
}

/// Run a guarded status change that also creates `work`. Either both land or
/// neither does.
pub async fn apply_approval(
    store: &dyn SubmissionStore,
    change: StatusChange<'_>,
    actor: Actor,
    work: &WorkRecord,
) -> Result<()> {
    commit_transition(store, change, actor, Some(work)).await
}

async fn commit_transition(
    store: &dyn SubmissionStore,
    change: StatusChange<'_>,
    actor: Actor,
    work: Option<&WorkRecord>,
) -> Result<()> {
    if find_transition(change.from, change.to, actor).is_none() {
        warn!(
            submission = change.submission_id,
            from = %change.from,
            to = %change.to,
            %actor,
            "Transition not in table"
        );
        return Err(MicError::TransitionConflict);
    }

    if actor == Actor::Owner && change.owner_id.is_none() {
        return Err(MicError::Internal("owner transition without owner guard".into()));
    }

    let matched = match work {
        Some(work) => store.approve_with_work(&change, work).await?,
        None => store.transition(&change).await?,
    };
    if matched == 0 {
        warn!(
            submission = change.submission_id,
            from = %change.from,
            to = %change.to,
            %actor,
            "Transition rejected, precondition no longer holds"
        );
        return Err(MicError::TransitionConflict);
    }

    info!(
        submission = change.submission_id,
        from = %change.from,
        to = %change.to,
        %actor,
        "Submission transitioned"
    );
    Ok(())
}

/// Operations a student performs on their own submissions
#[derive(Clone)]
pub struct SubmissionWorkflow {
    submissions: Arc<dyn SubmissionStore>,
    notifier: NotificationDispatcher,
}

impl SubmissionWorkflow {
    pub fn new(submissions: Arc<dyn SubmissionStore>, notifier: NotificationDispatcher) -> Self {
        Self {
            submissions,
            notifier,
        }
    }

    /// Create a submission. It always starts in `draft`.
    pub async fn create(&self, principal: &Principal, input: NewSubmission) -> Result<Submission> {
        require_role(principal, &[Role::Student])?;
        input.validate()?;

        let submission = Submission::draft(&principal.identity, &principal.email, input);
        self.submissions.insert(&submission).await?;

        info!(submission = %submission.id, owner = %submission.owner_id, "Submission created");
        Ok(submission)
    }

    /// Edit title, description and file reference while still a draft.
    pub async fn edit_draft(&self, principal: &Principal, submission_id: &str, edit: DraftEdit) -> Result<()> {
        require_role(principal, &[Role::Student])?;
        edit.validate()?;
        self.check_owner(principal, submission_id).await?;

        let matched = self
            .submissions
            .update_draft(submission_id, &principal.identity, &edit.normalized())
            .await?;
        if matched == 0 {
            return Err(MicError::TransitionConflict);
        }

        info!(submission = submission_id, "Draft updated");
        Ok(())
    }

    /// Move a draft to `submitted` and notify its owner.
    pub async fn submit(&self, principal: &Principal, submission_id: &str) -> Result<()> {
        require_role(principal, &[Role::Student])?;
        self.check_owner(principal, submission_id).await?;

        apply_transition(
            self.submissions.as_ref(),
            StatusChange {
                submission_id,
                from: SubmissionStatus::Draft,
                to: SubmissionStatus::Submitted,
                owner_id: Some(&principal.identity),
                reason: None,
            },
            Actor::Owner,
        )
        .await?;

        let recipient = Recipient {
            identity: &principal.identity,
            email: &principal.email,
        };
        if let Err(e) = self
            .notifier
            .notify(recipient, submission_id, SubmissionStatus::Draft, SubmissionStatus::Submitted)
            .await
        {
            error!(submission = submission_id, error = %e, "Failed to record submit notification");
        }

        Ok(())
    }

    /// Delete one of the principal's submissions, whatever its status.
    pub async fn delete(&self, principal: &Principal, submission_id: &str) -> Result<()> {
        require_role(principal, &[Role::Student])?;
        self.check_owner(principal, submission_id).await?;

        let matched = self.submissions.delete(submission_id, &principal.identity).await?;
        if matched == 0 {
            return Err(MicError::NotFound(format!("submission {}", submission_id)));
        }

        info!(submission = submission_id, "Submission deleted");
        Ok(())
    }

    /// Record where the submission's file was stored. Drafts only.
    pub async fn attach_file(
        &self,
        principal: &Principal,
        submission_id: &str,
        file_reference: &str,
    ) -> Result<()> {
        require_role(principal, &[Role::Student])?;
        let file_reference = file_reference.trim();
        if file_reference.is_empty() {
            return Err(MicError::Validation("file_reference is required".into()));
        }
        self.check_owner(principal, submission_id).await?;

        let matched = self
            .submissions
            .attach_file(submission_id, &principal.identity, file_reference)
            .await?;
        if matched == 0 {
            return Err(MicError::TransitionConflict);
        }

        info!(submission = submission_id, "File attached");
        Ok(())
    }

    /// The principal's submissions, newest first.
    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<Submission>> {
        require_role(principal, &[Role::Student])?;
        self.submissions
            .list(&SubmissionQuery::owned_by(&principal.identity))
            .await
    }

    /// Read one submission. Students only see their own.
    pub async fn get(&self, principal: &Principal, submission_id: &str) -> Result<Submission> {
        require_role(principal, &[Role::Student, Role::Admin, Role::Faculty])?;

        let submission = self
            .submissions
            .get(submission_id)
            .await?
            .ok_or_else(|| MicError::NotFound(format!("submission {}", submission_id)))?;

        if principal.role == Role::Student && !submission.is_owned_by(&principal.identity) {
            return Err(MicError::Forbidden("not the owner of this submission".into()));
        }

        Ok(submission)
    }

    /// Ownership is checked here only to tell 403 from 409. The store guard
    /// still carries the owner.
    async fn check_owner(&self, principal: &Principal, submission_id: &str) -> Result<()> {
        if let Some(existing) = self.submissions.get(submission_id).await? {
            if !existing.is_owned_by(&principal.identity) {
                return Err(MicError::Forbidden("not the owner of this submission".into()));
            }
        }
        Ok(())
    }
}
