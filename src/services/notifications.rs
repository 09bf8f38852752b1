//! Notification dispatch and the in-app inbox
//!
//! A transition's notification record is written before the call returns.
//! The matching email is handed to the [`EmailQueue`] and never awaited.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::Principal;
use crate::services::{EmailMessage, EmailQueue};
use crate::types::{MicError, Result};
use crate::workflow::SubmissionStatus;

/// Notification type written for every workflow notification
pub const STATUS_CHANGE: &str = "status_change";

/// In-app notification. Only `is_read` ever changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub submission_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn status_change(recipient_id: &str, submission_id: &str, title: String, body: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id: recipient_id.to_string(),
            kind: STATUS_CHANGE.to_string(),
            title,
            body,
            submission_id: Some(submission_id.to_string()),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Notification rows
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Newest first
    async fn list_notifications(&self, recipient_id: &str) -> Result<Vec<Notification>>;

    async fn unread_count(&self, recipient_id: &str) -> Result<u64>;

    /// Flip `is_read` where id and recipient match.
    async fn mark_read(&self, notification_id: &str, recipient_id: &str) -> Result<u64>;
}

/// Who a notification is for
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
    pub identity: &'a str,
    pub email: &'a str,
}

struct CannedMessage {
    title: &'static str,
    message: &'static str,
    signature: &'static str,
    email_line: &'static str,
}

/// Messages for the generic status-pair path. Anything else is ignored.
fn canned_message(old: SubmissionStatus, new: SubmissionStatus) -> Option<CannedMessage> {
    match (old, new) {
        (SubmissionStatus::Draft, SubmissionStatus::Submitted) => Some(CannedMessage {
            title: "Submission Submitted",
            message: "Your submission has been successfully submitted.",
            signature: "Team",
            email_line: "has been successfully submitted.",
        }),
        (SubmissionStatus::Submitted, SubmissionStatus::Approved) => Some(CannedMessage {
            title: "Submission Approved",
            message: "Your submission is now approved.",
            signature: "Team MIC",
            email_line: "is now approved.",
        }),
        _ => None,
    }
}

/// Writes notification records and queues their emails
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    email: EmailQueue,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, email: EmailQueue) -> Self {
        Self { store, email }
    }

    /// Notify on a `(old, new)` status pair. Unmapped pairs return `Ok(None)`.
    pub async fn notify(
        &self,
        recipient: Recipient<'_>,
        submission_id: &str,
        old: SubmissionStatus,
        new: SubmissionStatus,
    ) -> Result<Option<Notification>> {
        let Some(canned) = canned_message(old, new) else {
            debug!(submission = submission_id, %old, %new, "No notification mapped");
            return Ok(None);
        };

        let notification = Notification::status_change(
            recipient.identity,
            submission_id,
            canned.title.to_string(),
            canned.message.to_string(),
        );
        self.store.insert_notification(&notification).await?;

        self.send_email(
            recipient,
            canned.title.to_string(),
            format!(
                "Dear User,\n\nYour submission with ID {} {}\n\nBest regards,\n{}",
                submission_id, canned.email_line, canned.signature
            ),
        );

        Ok(Some(notification))
    }

    /// Notify on a faculty decision, keyed by a free-text status label.
    pub async fn notify_decision(
        &self,
        recipient: Recipient<'_>,
        submission_id: &str,
        submission_title: &str,
        label: &str,
    ) -> Result<Notification> {
        let title = format!("Submission Update: {}", submission_title);
        let message = format!(
            "Your idea '{}' has been {} by the faculty review committee.",
            submission_title, label
        );

        let notification =
            Notification::status_change(recipient.identity, submission_id, title.clone(), message.clone());
        self.store.insert_notification(&notification).await?;

        self.send_email(
            recipient,
            title,
            format!("Dear User,\n\n{}\n\nBest regards,\nMAHE Innovation Centre", message),
        );

        Ok(notification)
    }

    fn send_email(&self, recipient: Recipient<'_>, subject: String, body: String) {
        if recipient.email.trim().is_empty() {
            debug!(recipient = recipient.identity, "No email address, skipping email");
            return;
        }

        self.email.enqueue(EmailMessage {
            to: recipient.email.to_string(),
            subject,
            body,
        });
    }
}

/// A principal's own notifications
#[derive(Clone)]
pub struct NotificationInbox {
    store: Arc<dyn NotificationStore>,
}

impl NotificationInbox {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Notification>> {
        self.store.list_notifications(&principal.identity).await
    }

    pub async fn unread_count(&self, principal: &Principal) -> Result<u64> {
        self.store.unread_count(&principal.identity).await
    }

    pub async fn mark_read(&self, principal: &Principal, notification_id: &str) -> Result<()> {
        let matched = self.store.mark_read(notification_id, &principal.identity).await?;
        if matched == 0 {
            return Err(MicError::NotFound(format!("notification {}", notification_id)));
        }
        info!(notification = notification_id, "Notification marked read");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_pairs() {
        assert!(canned_message(SubmissionStatus::Draft, SubmissionStatus::Submitted).is_some());
        assert!(canned_message(SubmissionStatus::Submitted, SubmissionStatus::Approved).is_some());
    }

    #[test]
    fn test_unmapped_pairs_ignored() {
        for old in SubmissionStatus::ALL {
            for new in SubmissionStatus::ALL {
                let mapped = matches!(
                    (old, new),
                    (SubmissionStatus::Draft, SubmissionStatus::Submitted)
                        | (SubmissionStatus::Submitted, SubmissionStatus::Approved)
                );
                assert_eq!(canned_message(old, new).is_some(), mapped, "{} -> {}", old, new);
            }
        }
    }

    #[test]
    fn test_notification_type() {
        let n = Notification::status_change("s-1", "sub-1", "t".into(), "b".into());
        assert_eq!(n.kind, STATUS_CHANGE);
        assert!(!n.is_read);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "status_change");
    }
}
