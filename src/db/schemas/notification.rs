//! Notification document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use super::metadata::{to_chrono, Metadata};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::services::Notification;

pub const NOTIFICATION_COLLECTION: &str = "notifications";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NotificationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub notification_id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub submission_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,

    #[serde(default)]
    pub metadata: Metadata,
}

impl From<&Notification> for NotificationDoc {
    fn from(n: &Notification) -> Self {
        Self {
            _id: None,
            notification_id: n.id.clone(),
            recipient_id: n.recipient_id.clone(),
            kind: n.kind.clone(),
            title: n.title.clone(),
            body: n.body.clone(),
            submission_id: n.submission_id.clone(),
            is_read: n.is_read,
            metadata: Metadata::stamped(n.created_at, n.created_at),
        }
    }
}

impl From<NotificationDoc> for Notification {
    fn from(d: NotificationDoc) -> Self {
        Self {
            id: d.notification_id,
            recipient_id: d.recipient_id,
            kind: d.kind,
            title: d.title,
            body: d.body,
            submission_id: d.submission_id,
            is_read: d.is_read,
            created_at: to_chrono(d.metadata.created_at),
        }
    }
}

impl IntoIndexes for NotificationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "notification_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("notification_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "recipient_id": 1, "is_read": 1 },
                Some(IndexOptions::builder().name("recipient_read_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for NotificationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
