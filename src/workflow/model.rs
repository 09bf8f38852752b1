//! Domain records shared by the workflow, its services and the stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MicError, Result};
use crate::workflow::SubmissionStatus;

/// Stage a work record starts in when faculty approve a submission
pub const DEFAULT_WORK_STAGE: &str = "under_incubation";

/// The central entity. `owner_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub owner_id: String,
    /// Contact address captured from the owner's credential at creation
    pub owner_email: String,
    pub title: String,
    pub description: String,
    pub file_reference: Option<String>,
    pub status: SubmissionStatus,
    /// Incubation stage, filled from the work record on faculty reads
    pub stage: Option<String>,
    pub company_reference: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Build a fresh draft owned by `owner_id`. Drafts are the only state a
    /// submission can be constructed in.
    pub fn draft(owner_id: &str, owner_email: &str, input: NewSubmission) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            owner_email: owner_email.to_string(),
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            file_reference: non_blank(input.file_reference),
            status: SubmissionStatus::Draft,
            stage: None,
            company_reference: None,
            tags: Vec::new(),
            domain: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner_id == identity
    }

    /// Overlay incubation fields from the submission's work record.
    pub fn with_work(mut self, work: Option<&WorkRecord>) -> Self {
        if let Some(work) = work {
            self.stage = Some(work.stage.clone());
            self.company_reference = work.company_reference.clone();
        }
        self
    }
}

/// Create payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSubmission {
    pub title: String,
    pub description: String,
    #[serde(default, alias = "file_path")]
    pub file_reference: Option<String>,
}

impl NewSubmission {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)
    }
}

/// Draft edit payload. An absent `file_reference` keeps the stored one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftEdit {
    pub title: String,
    pub description: String,
    #[serde(default, alias = "file_path")]
    pub file_reference: Option<String>,
}

impl DraftEdit {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)
    }

    pub fn normalized(&self) -> DraftEdit {
        DraftEdit {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            file_reference: non_blank(self.file_reference.clone()),
        }
    }
}

/// Listing filter. Empty `statuses` means any status.
#[derive(Debug, Clone, Default)]
pub struct SubmissionQuery {
    pub owner_id: Option<String>,
    pub statuses: Vec<SubmissionStatus>,
}

impl SubmissionQuery {
    pub fn owned_by(owner_id: &str) -> Self {
        Self {
            owner_id: Some(owner_id.to_string()),
            statuses: Vec::new(),
        }
    }

    pub fn in_statuses(statuses: &[SubmissionStatus]) -> Self {
        Self {
            owner_id: None,
            statuses: statuses.to_vec(),
        }
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        let owner_ok = self
            .owner_id
            .as_deref()
            .map_or(true, |owner| submission.owner_id == owner);
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&submission.status);
        owner_ok && status_ok
    }
}

/// Post-approval tracking row, 1:1 with an approved submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub submission_id: String,
    pub title: String,
    pub description: String,
    pub stage: String,
    pub progress_percent: i32,
    pub company_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkRecord {
    /// Initial record for a freshly approved submission
    pub fn seed(submission: &Submission) -> Self {
        let now = Utc::now();
        Self {
            submission_id: submission.id.clone(),
            title: submission.title.clone(),
            description: submission.description.clone(),
            stage: DEFAULT_WORK_STAGE.to_string(),
            progress_percent: 0,
            company_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Link between a submission and a faculty reviewer, unique per pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyAssignment {
    pub submission_id: String,
    pub faculty_id: String,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MicError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Treat blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
