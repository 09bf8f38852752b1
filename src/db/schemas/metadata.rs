//! Document bookkeeping shared by every collection

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Timestamps plus the soft-delete flag. Live queries filter on `is_deleted`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

impl Metadata {
    /// Metadata carrying the domain record's own timestamps
    pub fn stamped(created_at: chrono::DateTime<chrono::Utc>, updated_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            created_at: Some(from_chrono(created_at)),
            updated_at: Some(from_chrono(updated_at)),
            ..Self::default()
        }
    }
}

pub fn from_chrono(dt: chrono::DateTime<chrono::Utc>) -> DateTime {
    DateTime::from_chrono(dt)
}

/// Missing timestamps read back as the epoch.
pub fn to_chrono(dt: Option<DateTime>) -> chrono::DateTime<chrono::Utc> {
    dt.map(|d| d.to_chrono()).unwrap_or_default()
}
