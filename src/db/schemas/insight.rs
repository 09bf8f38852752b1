//! AI insight document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::metadata::{to_chrono, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::services::{InsightRecord, InsightStatus};

pub const INSIGHT_COLLECTION: &str = "submission_ai_insights";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct InsightDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub submission_id: String,
    pub status: InsightStatus,
    pub insights: Option<serde_json::Value>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&InsightRecord> for InsightDoc {
    fn from(r: &InsightRecord) -> Self {
        Self {
            _id: None,
            submission_id: r.submission_id.clone(),
            status: r.status,
            insights: r.insights.clone(),
            metadata: Metadata::stamped(r.created_at, r.updated_at),
        }
    }
}

impl From<InsightDoc> for InsightRecord {
    fn from(d: InsightDoc) -> Self {
        Self {
            submission_id: d.submission_id,
            status: d.status,
            insights: d.insights,
            created_at: to_chrono(d.metadata.created_at),
            updated_at: to_chrono(d.metadata.updated_at),
        }
    }
}

impl IntoIndexes for InsightDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "submission_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("insight_submission_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for InsightDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
