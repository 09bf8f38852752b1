//! Incubation progress tracking for approved submissions
//!
//! Updates here are unconditional on the work record. Two faculty writing at
//! once is last-writer-wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::auth::{require_role, Principal, Role};
use crate::types::{MicError, Result};
use crate::workflow::model::non_blank;
use crate::workflow::{IncubationStore, SubmissionQuery, SubmissionStatus, SubmissionStore, WorkRecord};

/// Body of a faculty incubation update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressUpdate {
    pub stage: Option<String>,
    pub progress_percent: Option<i32>,
    pub company_id: Option<String>,
}

/// A work record with the owning submission's identity and status
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioEntry {
    #[serde(flatten)]
    pub work: WorkRecord,
    pub owner_id: String,
    pub status: SubmissionStatus,
}

/// Public pipeline row: the work record and its submission's status
#[derive(Debug, Clone, Serialize)]
pub struct PipelineEntry {
    #[serde(flatten)]
    pub work: WorkRecord,
    pub status: SubmissionStatus,
}

#[derive(Clone)]
pub struct IncubationTracker {
    submissions: Arc<dyn SubmissionStore>,
    work: Arc<dyn IncubationStore>,
}

impl IncubationTracker {
    pub fn new(submissions: Arc<dyn SubmissionStore>, work: Arc<dyn IncubationStore>) -> Self {
        Self { submissions, work }
    }

    pub async fn update_progress(
        &self,
        principal: &Principal,
        submission_id: &str,
        stage: &str,
        progress_percent: i32,
    ) -> Result<()> {
        require_role(principal, &[Role::Faculty])?;

        let stage = stage.trim();
        if stage.is_empty() {
            return Err(MicError::Validation("stage is required".into()));
        }
        if !(0..=100).contains(&progress_percent) {
            return Err(MicError::Validation(format!(
                "progress_percent must be between 0 and 100, got {}",
                progress_percent
            )));
        }

        let matched = self
            .work
            .update_progress(submission_id, stage, progress_percent)
            .await?;
        if matched == 0 {
            return Err(MicError::NotFound(format!("work record for {}", submission_id)));
        }

        info!(submission = submission_id, stage, progress_percent, "Incubation progress updated");
        Ok(())
    }

    /// Link or, with `None`/blank, unlink a company.
    pub async fn link_company(
        &self,
        principal: &Principal,
        submission_id: &str,
        company_id: Option<String>,
    ) -> Result<()> {
        require_role(principal, &[Role::Faculty])?;

        let company_id = non_blank(company_id);
        let matched = self
            .work
            .link_company(submission_id, company_id.as_deref())
            .await?;
        if matched == 0 {
            return Err(MicError::NotFound(format!("work record for {}", submission_id)));
        }

        info!(submission = submission_id, company = ?company_id, "Company link updated");
        Ok(())
    }

    /// Stage/progress when a stage is given, then the company link.
    pub async fn apply(
        &self,
        principal: &Principal,
        submission_id: &str,
        update: ProgressUpdate,
    ) -> Result<WorkRecord> {
        require_role(principal, &[Role::Faculty])?;

        if let Some(stage) = update.stage.as_deref().filter(|s| !s.trim().is_empty()) {
            let progress = match update.progress_percent {
                Some(p) => p,
                None => self.progress(principal, submission_id).await?.progress_percent,
            };
            self.update_progress(principal, submission_id, stage, progress).await?;
        } else if update.progress_percent.is_some() {
            return Err(MicError::Validation("stage is required with progress_percent".into()));
        }

        self.link_company(principal, submission_id, update.company_id).await?;
        self.progress(principal, submission_id).await
    }

    pub async fn progress(&self, principal: &Principal, submission_id: &str) -> Result<WorkRecord> {
        require_role(principal, &[Role::Faculty])?;
        self.work
            .get_work(submission_id)
            .await?
            .ok_or_else(|| MicError::NotFound(format!("work record for {}", submission_id)))
    }

    /// Work records of approved submissions, most recently updated first
    pub async fn portfolio(&self, principal: &Principal) -> Result<Vec<PortfolioEntry>> {
        require_role(principal, &[Role::Faculty])?;

        Ok(self
            .approved_work()
            .await?
            .into_iter()
            .map(|(work, owner_id)| PortfolioEntry {
                work,
                owner_id,
                status: SubmissionStatus::Approved,
            })
            .collect())
    }

    /// Public view of the incubation pipeline. Owners are not exposed.
    pub async fn pipeline(&self) -> Result<Vec<PipelineEntry>> {
        Ok(self
            .approved_work()
            .await?
            .into_iter()
            .map(|(work, _)| PipelineEntry {
                work,
                status: SubmissionStatus::Approved,
            })
            .collect())
    }

    /// Work records joined to approved submissions, with each owner
    async fn approved_work(&self) -> Result<Vec<(WorkRecord, String)>> {
        let approved: HashMap<String, String> = self
            .submissions
            .list(&SubmissionQuery::in_statuses(&[SubmissionStatus::Approved]))
            .await?
            .into_iter()
            .map(|s| (s.id, s.owner_id))
            .collect();

        Ok(self
            .work
            .list_work()
            .await?
            .into_iter()
            .filter_map(|work| {
                let owner_id = approved.get(&work.submission_id)?.clone();
                Some((work, owner_id))
            })
            .collect())
    }
}
