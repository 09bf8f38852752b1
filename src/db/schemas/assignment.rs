//! Faculty assignment schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::metadata::{to_chrono, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::workflow::FacultyAssignment;

pub const ASSIGNMENT_COLLECTION: &str = "submission_faculty";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AssignmentDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub submission_id: String,
    pub faculty_id: String,
    pub assigned_by: String,

    /// `created_at` doubles as the assignment time
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&FacultyAssignment> for AssignmentDoc {
    fn from(a: &FacultyAssignment) -> Self {
        Self {
            _id: None,
            submission_id: a.submission_id.clone(),
            faculty_id: a.faculty_id.clone(),
            assigned_by: a.assigned_by.clone(),
            metadata: Metadata::stamped(a.assigned_at, a.assigned_at),
        }
    }
}

impl From<AssignmentDoc> for FacultyAssignment {
    fn from(d: AssignmentDoc) -> Self {
        Self {
            submission_id: d.submission_id,
            faculty_id: d.faculty_id,
            assigned_by: d.assigned_by,
            assigned_at: to_chrono(d.metadata.created_at),
        }
    }
}

impl IntoIndexes for AssignmentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "submission_id": 1, "faculty_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("submission_faculty_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for AssignmentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
