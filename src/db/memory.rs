//! In-memory stores
//!
//! Used in dev mode when MongoDB is unreachable, and by the test-suite.
//! Conditional updates run under the entry's shard lock (`get_mut`), so the
//! status check and the write are one atomic step.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::services::{InsightRecord, InsightStatus, InsightStore, Notification, NotificationStore};
use crate::types::Result;
use crate::workflow::{
    AssignmentStore, DraftEdit, FacultyAssignment, IncubationStore, StatusChange, Submission,
    SubmissionQuery, SubmissionStatus, SubmissionStore, WorkRecord,
};

/// Assignment key: (submission_id, faculty_id)
type AssignmentKey = (String, String);

#[derive(Default)]
pub struct MemoryStore {
    submissions: DashMap<String, Submission>,
    work: DashMap<String, WorkRecord>,
    assignments: DashMap<AssignmentKey, FacultyAssignment>,
    notifications: DashMap<String, Notification>,
    insights: DashMap<String, InsightRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of work records held
    pub fn work_count(&self) -> usize {
        self.work.len()
    }

    /// Number of notifications held for `recipient_id`
    pub fn notification_count(&self, recipient_id: &str) -> usize {
        self.notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .count()
    }

    /// Run `update` on the submission when `guard` accepts it. Returns the
    /// matched count.
    fn update_submission_if(
        &self,
        submission_id: &str,
        guard: impl FnOnce(&Submission) -> bool,
        update: impl FnOnce(&mut Submission),
    ) -> u64 {
        let Some(mut entry) = self.submissions.get_mut(submission_id) else {
            return 0;
        };
        if !guard(&*entry) {
            return 0;
        }
        update(&mut *entry);
        entry.updated_at = Utc::now();
        1
    }

    fn update_work(&self, submission_id: &str, update: impl FnOnce(&mut WorkRecord)) -> u64 {
        match self.work.get_mut(submission_id) {
            Some(mut entry) => {
                update(&mut *entry);
                entry.updated_at = Utc::now();
                1
            }
            None => 0,
        }
    }
}

fn change_applies(change: &StatusChange<'_>, submission: &Submission) -> bool {
    submission.status == change.from && change.owner_id.map_or(true, |o| submission.owner_id == o)
}

fn apply_change(change: &StatusChange<'_>, submission: &mut Submission) {
    submission.status = change.to;
    if let Some(reason) = change.reason {
        submission.rejection_reason = Some(reason.to_string());
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        self.submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>> {
        Ok(self.submissions.get(submission_id).map(|s| s.clone()))
    }

    async fn list(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        let mut found: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|s| query.matches(s))
            .map(|s| s.clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn transition(&self, change: &StatusChange<'_>) -> Result<u64> {
        Ok(self.update_submission_if(
            change.submission_id,
            |s| change_applies(change, s),
            |s| apply_change(change, s),
        ))
    }

    async fn approve_with_work(&self, change: &StatusChange<'_>, work: &WorkRecord) -> Result<u64> {
        // The submission's shard lock is held across both writes.
        Ok(self.update_submission_if(
            change.submission_id,
            |s| change_applies(change, s),
            |s| {
                self.work
                    .entry(work.submission_id.clone())
                    .or_insert_with(|| work.clone());
                apply_change(change, s);
            },
        ))
    }

    async fn update_draft(&self, submission_id: &str, owner_id: &str, edit: &DraftEdit) -> Result<u64> {
        Ok(self.update_submission_if(
            submission_id,
            |s| s.status == SubmissionStatus::Draft && s.owner_id == owner_id,
            |s| {
                s.title = edit.title.clone();
                s.description = edit.description.clone();
                if let Some(ref file) = edit.file_reference {
                    s.file_reference = Some(file.clone());
                }
            },
        ))
    }

    async fn attach_file(&self, submission_id: &str, owner_id: &str, file_reference: &str) -> Result<u64> {
        Ok(self.update_submission_if(
            submission_id,
            |s| s.status == SubmissionStatus::Draft && s.owner_id == owner_id,
            |s| s.file_reference = Some(file_reference.to_string()),
        ))
    }

    async fn delete(&self, submission_id: &str, owner_id: &str) -> Result<u64> {
        if self
            .submissions
            .remove_if(submission_id, |_, s| s.owner_id == owner_id)
            .is_none()
        {
            return Ok(0);
        }

        self.work.remove(submission_id);
        self.assignments.retain(|(id, _), _| id != submission_id);
        self.insights.remove(submission_id);
        Ok(1)
    }

    async fn update_tags(&self, submission_id: &str, tags: &[String], domain: Option<&str>) -> Result<u64> {
        Ok(self.update_submission_if(
            submission_id,
            |_| true,
            |s| {
                s.tags = tags.to_vec();
                s.domain = domain.map(str::to_string);
            },
        ))
    }
}

#[async_trait]
impl IncubationStore for MemoryStore {
    async fn get_work(&self, submission_id: &str) -> Result<Option<WorkRecord>> {
        Ok(self.work.get(submission_id).map(|w| w.clone()))
    }

    async fn list_work(&self) -> Result<Vec<WorkRecord>> {
        let mut records: Vec<WorkRecord> = self.work.iter().map(|w| w.clone()).collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }

    async fn update_progress(&self, submission_id: &str, stage: &str, progress_percent: i32) -> Result<u64> {
        Ok(self.update_work(submission_id, |w| {
            w.stage = stage.to_string();
            w.progress_percent = progress_percent;
        }))
    }

    async fn link_company(&self, submission_id: &str, company_id: Option<&str>) -> Result<u64> {
        Ok(self.update_work(submission_id, |w| {
            w.company_reference = company_id.map(str::to_string);
        }))
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn assign(&self, assignment: &FacultyAssignment) -> Result<bool> {
        let key = (assignment.submission_id.clone(), assignment.faculty_id.clone());
        match self.assignments.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(assignment.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn unassign(&self, submission_id: &str, faculty_id: &str) -> Result<u64> {
        let key = (submission_id.to_string(), faculty_id.to_string());
        Ok(self.assignments.remove(&key).map_or(0, |_| 1))
    }

    async fn list_assigned(&self, submission_id: &str) -> Result<Vec<FacultyAssignment>> {
        let mut found: Vec<FacultyAssignment> = self
            .assignments
            .iter()
            .filter(|a| a.submission_id == submission_id)
            .map(|a| a.clone())
            .collect();
        found.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(found)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    async fn list_notifications(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        let mut found: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .map(|n| n.clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn unread_count(&self, recipient_id: &str) -> Result<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, notification_id: &str, recipient_id: &str) -> Result<u64> {
        match self.notifications.get_mut(notification_id) {
            Some(mut n) if n.recipient_id == recipient_id => {
                n.is_read = true;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl InsightStore for MemoryStore {
    async fn create_insight_if_absent(&self, record: &InsightRecord) -> Result<bool> {
        match self.insights.entry(record.submission_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn save_insights(&self, submission_id: &str, insights: &Value) -> Result<u64> {
        match self.insights.get_mut(submission_id) {
            Some(mut r) => {
                r.status = InsightStatus::Completed;
                r.insights = Some(insights.clone());
                r.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_insight(&self, submission_id: &str) -> Result<Option<InsightRecord>> {
        Ok(self.insights.get(submission_id).map(|r| r.clone()))
    }
}
