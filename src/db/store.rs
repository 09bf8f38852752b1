//! MongoDB-backed stores
//!
//! Status changes are single `update_one` calls filtered on the expected
//! status; the matched count is what the workflow checks. Approval and delete
//! touch several collections and run in one transaction.

use async_trait::async_trait;
use bson::{doc, Bson, DateTime, Document};
use serde_json::Value;
use std::sync::Arc;

use crate::db::schemas::{
    AssignmentDoc, InsightDoc, NotificationDoc, SubmissionDoc, WorkDoc, ASSIGNMENT_COLLECTION,
    INSIGHT_COLLECTION, NOTIFICATION_COLLECTION, SUBMISSION_COLLECTION, WORK_COLLECTION,
};
use crate::db::mongo::finish_transaction;
use crate::db::{MongoClient, MongoCollection};
use crate::services::{InsightRecord, InsightStatus, InsightStore, Notification, NotificationStore};
use crate::types::{MicError, Result};
use crate::workflow::{
    AssignmentStore, DraftEdit, FacultyAssignment, IncubationStore, StatusChange, Submission,
    SubmissionQuery, SubmissionStatus, SubmissionStore, WorkRecord,
};

/// Every store the services need, behind trait objects
#[derive(Clone)]
pub struct Stores {
    pub submissions: Arc<dyn SubmissionStore>,
    pub work: Arc<dyn IncubationStore>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub insights: Arc<dyn InsightStore>,
    /// Backend name for health output
    pub kind: &'static str,
}

impl Stores {
    /// Use one backend for every store
    pub fn from_backend<B>(backend: Arc<B>, kind: &'static str) -> Self
    where
        B: SubmissionStore + IncubationStore + AssignmentStore + NotificationStore + InsightStore + 'static,
    {
        Self {
            submissions: backend.clone(),
            work: backend.clone(),
            assignments: backend.clone(),
            notifications: backend.clone(),
            insights: backend,
            kind,
        }
    }
}

pub struct MongoStore {
    client: MongoClient,
    submissions: MongoCollection<SubmissionDoc>,
    work: MongoCollection<WorkDoc>,
    assignments: MongoCollection<AssignmentDoc>,
    notifications: MongoCollection<NotificationDoc>,
    insights: MongoCollection<InsightDoc>,
}

impl MongoStore {
    /// Open every collection and apply its indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            client: client.clone(),
            submissions: client.collection(SUBMISSION_COLLECTION).await?,
            work: client.collection(WORK_COLLECTION).await?,
            assignments: client.collection(ASSIGNMENT_COLLECTION).await?,
            notifications: client.collection(NOTIFICATION_COLLECTION).await?,
            insights: client.collection(INSIGHT_COLLECTION).await?,
        })
    }
}

fn newest_first() -> Option<Document> {
    Some(doc! { "metadata.created_at": -1 })
}

fn transition_filter(change: &StatusChange<'_>) -> Document {
    let mut filter = doc! {
        "submission_id": change.submission_id,
        "status": change.from.as_str(),
    };
    if let Some(owner) = change.owner_id {
        filter.insert("owner_id", owner);
    }
    filter
}

fn transition_update(change: &StatusChange<'_>) -> Document {
    let mut set = doc! {
        "status": change.to.as_str(),
        "metadata.updated_at": DateTime::now(),
    };
    if let Some(reason) = change.reason {
        set.insert("rejection_reason", reason);
    }
    doc! { "$set": set }
}

fn optional(value: Option<&str>) -> Bson {
    value.map_or(Bson::Null, |v| Bson::String(v.to_string()))
}

#[async_trait]
impl SubmissionStore for MongoStore {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        self.submissions.insert_one(SubmissionDoc::from(submission)).await
    }

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>> {
        Ok(self
            .submissions
            .find_one(doc! { "submission_id": submission_id })
            .await?
            .map(Submission::from))
    }

    async fn list(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        let mut filter = Document::new();
        if let Some(ref owner) = query.owner_id {
            filter.insert("owner_id", owner.as_str());
        }
        if !query.statuses.is_empty() {
            let statuses: Vec<&str> = query.statuses.iter().map(SubmissionStatus::as_str).collect();
            filter.insert("status", doc! { "$in": statuses });
        }

        Ok(self
            .submissions
            .find_many(filter, newest_first())
            .await?
            .into_iter()
            .map(Submission::from)
            .collect())
    }

    async fn transition(&self, change: &StatusChange<'_>) -> Result<u64> {
        self.submissions
            .update_one(transition_filter(change), transition_update(change))
            .await
    }

    async fn approve_with_work(&self, change: &StatusChange<'_>, work: &WorkRecord) -> Result<u64> {
        let mut session = self.client.start_transaction().await?;

        let result = async {
            let matched = self
                .submissions
                .update_one_in(&mut session, transition_filter(change), transition_update(change))
                .await?;
            if matched > 0 {
                self.work
                    .insert_if_absent_in(
                        &mut session,
                        doc! { "submission_id": work.submission_id.as_str() },
                        WorkDoc::from(work),
                    )
                    .await?;
            }
            Ok::<u64, MicError>(matched)
        }
        .await;

        finish_transaction(&mut session, result).await
    }

    async fn update_draft(&self, submission_id: &str, owner_id: &str, edit: &DraftEdit) -> Result<u64> {
        let mut set = doc! {
            "title": edit.title.as_str(),
            "description": edit.description.as_str(),
            "metadata.updated_at": DateTime::now(),
        };
        if let Some(ref file) = edit.file_reference {
            set.insert("file_reference", file.as_str());
        }

        self.submissions
            .update_one(
                doc! {
                    "submission_id": submission_id,
                    "owner_id": owner_id,
                    "status": SubmissionStatus::Draft.as_str(),
                },
                doc! { "$set": set },
            )
            .await
    }

    async fn attach_file(&self, submission_id: &str, owner_id: &str, file_reference: &str) -> Result<u64> {
        self.submissions
            .update_one(
                doc! {
                    "submission_id": submission_id,
                    "owner_id": owner_id,
                    "status": SubmissionStatus::Draft.as_str(),
                },
                doc! { "$set": {
                    "file_reference": file_reference,
                    "metadata.updated_at": DateTime::now(),
                }},
            )
            .await
    }

    async fn delete(&self, submission_id: &str, owner_id: &str) -> Result<u64> {
        let mut session = self.client.start_transaction().await?;

        let result = async {
            let matched = self
                .submissions
                .soft_delete_in(&mut session, doc! { "submission_id": submission_id, "owner_id": owner_id })
                .await?;
            if matched > 0 {
                let dependents = doc! { "submission_id": submission_id };
                self.work.soft_delete_in(&mut session, dependents.clone()).await?;
                self.assignments.delete_many_in(&mut session, dependents.clone()).await?;
                self.insights.delete_many_in(&mut session, dependents).await?;
            }
            Ok::<u64, MicError>(matched)
        }
        .await;

        finish_transaction(&mut session, result).await
    }

    async fn update_tags(&self, submission_id: &str, tags: &[String], domain: Option<&str>) -> Result<u64> {
        self.submissions
            .update_one(
                doc! { "submission_id": submission_id },
                doc! { "$set": {
                    "tags": tags.to_vec(),
                    "domain": optional(domain),
                    "metadata.updated_at": DateTime::now(),
                }},
            )
            .await
    }
}

#[async_trait]
impl IncubationStore for MongoStore {
    async fn get_work(&self, submission_id: &str) -> Result<Option<WorkRecord>> {
        Ok(self
            .work
            .find_one(doc! { "submission_id": submission_id })
            .await?
            .map(WorkRecord::from))
    }

    async fn list_work(&self) -> Result<Vec<WorkRecord>> {
        Ok(self
            .work
            .find_many(doc! {}, Some(doc! { "metadata.updated_at": -1 }))
            .await?
            .into_iter()
            .map(WorkRecord::from)
            .collect())
    }

    async fn update_progress(&self, submission_id: &str, stage: &str, progress_percent: i32) -> Result<u64> {
        self.work
            .update_one(
                doc! { "submission_id": submission_id },
                doc! { "$set": {
                    "stage": stage,
                    "progress_percent": progress_percent,
                    "metadata.updated_at": DateTime::now(),
                }},
            )
            .await
    }

    async fn link_company(&self, submission_id: &str, company_id: Option<&str>) -> Result<u64> {
        self.work
            .update_one(
                doc! { "submission_id": submission_id },
                doc! { "$set": {
                    "company_reference": optional(company_id),
                    "metadata.updated_at": DateTime::now(),
                }},
            )
            .await
    }
}

#[async_trait]
impl AssignmentStore for MongoStore {
    async fn assign(&self, assignment: &FacultyAssignment) -> Result<bool> {
        self.assignments
            .insert_if_absent(
                doc! {
                    "submission_id": assignment.submission_id.as_str(),
                    "faculty_id": assignment.faculty_id.as_str(),
                },
                AssignmentDoc::from(assignment),
            )
            .await
    }

    async fn unassign(&self, submission_id: &str, faculty_id: &str) -> Result<u64> {
        self.assignments
            .delete_one(doc! { "submission_id": submission_id, "faculty_id": faculty_id })
            .await
    }

    async fn list_assigned(&self, submission_id: &str) -> Result<Vec<FacultyAssignment>> {
        Ok(self
            .assignments
            .find_many(doc! { "submission_id": submission_id }, newest_first())
            .await?
            .into_iter()
            .map(FacultyAssignment::from)
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MongoStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .insert_one(NotificationDoc::from(notification))
            .await
    }

    async fn list_notifications(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        Ok(self
            .notifications
            .find_many(doc! { "recipient_id": recipient_id }, newest_first())
            .await?
            .into_iter()
            .map(Notification::from)
            .collect())
    }

    async fn unread_count(&self, recipient_id: &str) -> Result<u64> {
        self.notifications
            .count(doc! { "recipient_id": recipient_id, "is_read": false })
            .await
    }

    async fn mark_read(&self, notification_id: &str, recipient_id: &str) -> Result<u64> {
        self.notifications
            .update_one(
                doc! { "notification_id": notification_id, "recipient_id": recipient_id },
                doc! { "$set": { "is_read": true } },
            )
            .await
    }
}

#[async_trait]
impl InsightStore for MongoStore {
    async fn create_insight_if_absent(&self, record: &InsightRecord) -> Result<bool> {
        self.insights
            .insert_if_absent(doc! { "submission_id": record.submission_id.as_str() }, InsightDoc::from(record))
            .await
    }

    async fn save_insights(&self, submission_id: &str, insights: &Value) -> Result<u64> {
        let status = bson::to_bson(&InsightStatus::Completed)?;
        let insights = bson::to_bson(insights)?;
        self.insights
            .update_one(
                doc! { "submission_id": submission_id },
                doc! { "$set": {
                    "status": status,
                    "insights": insights,
                    "metadata.updated_at": DateTime::now(),
                }},
            )
            .await
    }

    async fn get_insight(&self, submission_id: &str) -> Result<Option<InsightRecord>> {
        Ok(self
            .insights
            .find_one(doc! { "submission_id": submission_id })
            .await?
            .map(InsightRecord::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_filter_guards_status_and_owner() {
        let change = StatusChange {
            submission_id: "s-1",
            from: SubmissionStatus::Draft,
            to: SubmissionStatus::Submitted,
            owner_id: Some("u-1"),
            reason: None,
        };
        let filter = transition_filter(&change);
        assert_eq!(filter.get_str("submission_id").unwrap(), "s-1");
        assert_eq!(filter.get_str("status").unwrap(), "draft");
        assert_eq!(filter.get_str("owner_id").unwrap(), "u-1");

        let update = transition_update(&change);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "submitted");
        assert!(!set.contains_key("rejection_reason"));
    }

    #[test]
    fn test_transition_update_carries_reason() {
        let change = StatusChange {
            submission_id: "s-1",
            from: SubmissionStatus::Submitted,
            to: SubmissionStatus::AdminRejected,
            owner_id: None,
            reason: Some("duplicate"),
        };
        assert!(!transition_filter(&change).contains_key("owner_id"));

        let update = transition_update(&change);
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("rejection_reason").unwrap(), "duplicate");
    }
}
