//! Submission document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::metadata::{to_chrono, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::workflow::{Submission, SubmissionStatus};

pub const SUBMISSION_COLLECTION: &str = "submissions";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SubmissionDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub submission_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub owner_email: String,
    pub title: String,
    pub description: String,
    pub file_reference: Option<String>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub domain: Option<String>,
    pub rejection_reason: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&Submission> for SubmissionDoc {
    fn from(s: &Submission) -> Self {
        Self {
            _id: None,
            submission_id: s.id.clone(),
            owner_id: s.owner_id.clone(),
            owner_email: s.owner_email.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            file_reference: s.file_reference.clone(),
            status: s.status,
            tags: s.tags.clone(),
            domain: s.domain.clone(),
            rejection_reason: s.rejection_reason.clone(),
            metadata: Metadata::stamped(s.created_at, s.updated_at),
        }
    }
}

impl From<SubmissionDoc> for Submission {
    fn from(d: SubmissionDoc) -> Self {
        Self {
            id: d.submission_id,
            owner_id: d.owner_id,
            owner_email: d.owner_email,
            title: d.title,
            description: d.description,
            file_reference: d.file_reference,
            status: d.status,
            stage: None,
            company_reference: None,
            tags: d.tags,
            domain: d.domain,
            rejection_reason: d.rejection_reason,
            created_at: to_chrono(d.metadata.created_at),
            updated_at: to_chrono(d.metadata.updated_at),
        }
    }
}

impl IntoIndexes for SubmissionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "submission_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("submission_id_unique".to_string())
                        .build(),
                ),
            ),
            // Owner listings
            (
                doc! { "owner_id": 1, "metadata.created_at": -1 },
                Some(IndexOptions::builder().name("owner_created_index".to_string()).build()),
            ),
            // Triage and review queues
            (
                doc! { "status": 1 },
                Some(IndexOptions::builder().name("status_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for SubmissionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
