//! Persistence seams for the workflow
//!
//! Every mutation reports how many rows it matched. Callers treat zero as
//! "precondition no longer holds" and never retry on their own.

use async_trait::async_trait;

use crate::types::Result;
use crate::workflow::{DraftEdit, FacultyAssignment, Submission, SubmissionQuery, SubmissionStatus, WorkRecord};

/// A single status-conditional update
#[derive(Debug, Clone, Copy)]
pub struct StatusChange<'a> {
    pub submission_id: &'a str,
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
    /// When set, the row must also belong to this owner
    pub owner_id: Option<&'a str>,
    /// Stored alongside the change when present
    pub reason: Option<&'a str>,
}

/// Submission rows
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: &Submission) -> Result<()>;

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>>;

    /// Newest first
    async fn list(&self, query: &SubmissionQuery) -> Result<Vec<Submission>>;

    /// Set `to` where id, `from` and (optionally) owner all match.
    async fn transition(&self, change: &StatusChange<'_>) -> Result<u64>;

    /// `transition` plus the work record insert (kept if one already exists),
    /// committed together. Zero matched writes nothing.
    async fn approve_with_work(&self, change: &StatusChange<'_>, work: &WorkRecord) -> Result<u64>;

    /// Edit fields where id and owner match and status is still draft.
    async fn update_draft(&self, submission_id: &str, owner_id: &str, edit: &DraftEdit) -> Result<u64>;

    /// Set the file reference where id and owner match and status is draft.
    async fn attach_file(&self, submission_id: &str, owner_id: &str, file_reference: &str) -> Result<u64>;

    /// Remove where id and owner match, in any status, together with the
    /// submission's work record, faculty links and insight marker.
    /// Notifications stay with their recipient.
    async fn delete(&self, submission_id: &str, owner_id: &str) -> Result<u64>;

    async fn update_tags(&self, submission_id: &str, tags: &[String], domain: Option<&str>) -> Result<u64>;
}

/// Incubation work records
#[async_trait]
pub trait IncubationStore: Send + Sync {
    async fn get_work(&self, submission_id: &str) -> Result<Option<WorkRecord>>;

    /// Most recently updated first
    async fn list_work(&self) -> Result<Vec<WorkRecord>>;

    async fn update_progress(&self, submission_id: &str, stage: &str, progress_percent: i32) -> Result<u64>;

    async fn link_company(&self, submission_id: &str, company_id: Option<&str>) -> Result<u64>;
}

/// Faculty assignment links
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// `false` when the (submission, faculty) pair already exists.
    async fn assign(&self, assignment: &FacultyAssignment) -> Result<bool>;

    async fn unassign(&self, submission_id: &str, faculty_id: &str) -> Result<u64>;

    /// Newest first
    async fn list_assigned(&self, submission_id: &str) -> Result<Vec<FacultyAssignment>>;
}
