//! Services layered over the workflow core
//!
//! - Notification dispatch and the in-app inbox
//! - Email transport and its bounded delivery queue
//! - Admin triage, faculty review, incubation tracking
//! - AI insights collaborator

pub mod email;
pub mod incubation;
pub mod insights;
pub mod notifications;
pub mod review;
pub mod triage;

pub use email::{EmailMessage, EmailQueue, EmailSender, EmailStats, HttpMailer, LogMailer, QueueConfig};
pub use incubation::{IncubationTracker, PipelineEntry, PortfolioEntry, ProgressUpdate};
pub use insights::{
    AnalysisRequest, AnalysisTicket, Analyzer, HttpAnalyzer, InsightRecord, InsightService,
    InsightStatus, InsightStore, InsightsPoll,
};
pub use notifications::{
    Notification, NotificationDispatcher, NotificationInbox, NotificationStore, Recipient,
};
pub use review::{FacultyDecision, FacultyReview, ReviewDetail};
pub use triage::{AdminDecision, AdminTriage};
