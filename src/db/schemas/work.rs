//! Incubation work record schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::metadata::{to_chrono, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::workflow::WorkRecord;

pub const WORK_COLLECTION: &str = "work";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct WorkDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub submission_id: String,
    pub title: String,
    pub description: String,
    pub stage: String,
    pub progress_percent: i32,
    pub company_reference: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&WorkRecord> for WorkDoc {
    fn from(w: &WorkRecord) -> Self {
        Self {
            _id: None,
            submission_id: w.submission_id.clone(),
            title: w.title.clone(),
            description: w.description.clone(),
            stage: w.stage.clone(),
            progress_percent: w.progress_percent,
            company_reference: w.company_reference.clone(),
            metadata: Metadata::stamped(w.created_at, w.updated_at),
        }
    }
}

impl From<WorkDoc> for WorkRecord {
    fn from(d: WorkDoc) -> Self {
        Self {
            submission_id: d.submission_id,
            title: d.title,
            description: d.description,
            stage: d.stage,
            progress_percent: d.progress_percent,
            company_reference: d.company_reference,
            created_at: to_chrono(d.metadata.created_at),
            updated_at: to_chrono(d.metadata.updated_at),
        }
    }
}

impl IntoIndexes for WorkDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One work record per submission; "insert if absent" relies on it
            (
                doc! { "submission_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("work_submission_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for WorkDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
