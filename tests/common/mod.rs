//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use clap::Parser;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mic_backend::auth::{JwtValidator, Principal, Role};
use mic_backend::db::{MemoryStore, Stores};
use mic_backend::services::{
    AnalysisRequest, Analyzer, EmailMessage, EmailQueue, EmailSender, EmailStats, QueueConfig,
};
use mic_backend::workflow::{
    DraftEdit, NewSubmission, StatusChange, Submission, SubmissionQuery, SubmissionStatus,
    SubmissionStore, WorkRecord,
};
use mic_backend::{AppState, Args, MicError, Result};

/// Mailer that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Mailer whose relay is always down
pub struct FailingMailer;

#[async_trait]
impl EmailSender for FailingMailer {
    async fn send(&self, _message: &EmailMessage) -> Result<()> {
        Err(MicError::Email("relay unreachable".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Analyzer returning a fixed result
pub struct StubAnalyzer;

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Value> {
        Ok(json!({ "submission_id": request.submission_id, "novelty": 0.8 }))
    }
}

/// Analyzer whose service is unreachable
pub struct DownAnalyzer;

#[async_trait]
impl Analyzer for DownAnalyzer {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<Value> {
        Err(MicError::Collaborator("connection refused".into()))
    }
}

/// Submission store whose combined approval write fails while `failing` is set
pub struct FlakyApprovals {
    pub inner: Arc<MemoryStore>,
    pub failing: AtomicBool,
}

impl FlakyApprovals {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(true),
        }
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubmissionStore for FlakyApprovals {
    async fn insert(&self, submission: &Submission) -> Result<()> {
        self.inner.insert(submission).await
    }

    async fn get(&self, submission_id: &str) -> Result<Option<Submission>> {
        self.inner.get(submission_id).await
    }

    async fn list(&self, query: &SubmissionQuery) -> Result<Vec<Submission>> {
        self.inner.list(query).await
    }

    async fn transition(&self, change: &StatusChange<'_>) -> Result<u64> {
        self.inner.transition(change).await
    }

    async fn approve_with_work(&self, change: &StatusChange<'_>, work: &WorkRecord) -> Result<u64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MicError::Database("write interrupted".into()));
        }
        self.inner.approve_with_work(change, work).await
    }

    async fn update_draft(&self, submission_id: &str, owner_id: &str, edit: &DraftEdit) -> Result<u64> {
        self.inner.update_draft(submission_id, owner_id, edit).await
    }

    async fn attach_file(&self, submission_id: &str, owner_id: &str, file_reference: &str) -> Result<u64> {
        self.inner.attach_file(submission_id, owner_id, file_reference).await
    }

    async fn delete(&self, submission_id: &str, owner_id: &str) -> Result<u64> {
        self.inner.delete(submission_id, owner_id).await
    }

    async fn update_tags(&self, submission_id: &str, tags: &[String], domain: Option<&str>) -> Result<u64> {
        self.inner.update_tags(submission_id, tags, domain).await
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

impl Harness {
    pub fn new(mailer: Arc<dyn EmailSender>, analyzer: Arc<dyn Analyzer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let args = Args::parse_from(["mic-backend", "--dev-mode"]);
        let email = EmailQueue::start(mailer, QueueConfig::default());
        let state = AppState::new(
            args,
            JwtValidator::new_dev(),
            Stores::from_backend(Arc::clone(&store), "memory"),
            email,
            analyzer,
        );
        Self {
            store,
            state: Arc::new(state),
        }
    }

    pub fn with_mailer(mailer: Arc<dyn EmailSender>) -> Self {
        Self::new(mailer, Arc::new(StubAnalyzer))
    }

    pub fn default_harness() -> Self {
        Self::with_mailer(Arc::new(RecordingMailer::default()))
    }

    pub async fn status_of(&self, submission_id: &str) -> SubmissionStatus {
        self.store
            .get(submission_id)
            .await
            .unwrap()
            .expect("submission exists")
            .status
    }

    /// Insert a submission owned by `student` directly in `status`
    pub async fn seed(&self, student: &Principal, status: SubmissionStatus) -> Submission {
        let mut submission = Submission::draft(
            &student.identity,
            &student.email,
            NewSubmission {
                title: "Seeded idea".into(),
                description: "Seeded description".into(),
                file_reference: None,
            },
        );
        submission.status = status;
        self.store.insert(&submission).await.unwrap();
        submission
    }

    pub fn token(&self, principal: &Principal) -> String {
        self.state
            .jwt
            .generate_token(&principal.identity, principal.role, &principal.email)
            .unwrap()
    }

    pub async fn wait_for_email(&self, done: impl Fn(EmailStats) -> bool) -> EmailStats {
        for _ in 0..200 {
            let stats = self.state.email.stats();
            if done(stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.state.email.stats()
    }
}

pub fn principal(identity: &str, role: Role) -> Principal {
    Principal {
        identity: identity.to_string(),
        role,
        email: format!("{}@example.edu", identity),
        expiry: Utc::now() + chrono::Duration::hours(1),
    }
}

pub fn student(identity: &str) -> Principal {
    principal(identity, Role::Student)
}

pub fn admin() -> Principal {
    principal("admin-1", Role::Admin)
}

pub fn faculty() -> Principal {
    principal("faculty-1", Role::Faculty)
}
