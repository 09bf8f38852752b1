//! Database schemas for the submission backend
//!
//! Defines MongoDB document structures for submissions, work records,
//! faculty assignments, notifications and AI insights.

mod assignment;
mod insight;
mod metadata;
mod notification;
mod submission;
mod work;

pub use assignment::{AssignmentDoc, ASSIGNMENT_COLLECTION};
pub use insight::{InsightDoc, INSIGHT_COLLECTION};
pub use metadata::{from_chrono, to_chrono, Metadata};
pub use notification::{NotificationDoc, NOTIFICATION_COLLECTION};
pub use submission::{SubmissionDoc, SUBMISSION_COLLECTION};
pub use work::{WorkDoc, WORK_COLLECTION};
