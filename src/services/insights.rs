//! AI analysis collaborator
//!
//! Requesting analysis writes a `processing` marker and fires the analyze call
//! on a background task. The only synchronous contract is the poll, which
//! stays `NotReady` until the service's result has been written back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::{require_role, Principal, Role};
use crate::types::{MicError, Result};
use crate::workflow::SubmissionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    #[default]
    Processing,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub submission_id: String,
    pub status: InsightStatus,
    pub insights: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsightRecord {
    pub fn processing(submission_id: &str) -> Self {
        let now = Utc::now();
        Self {
            submission_id: submission_id.to_string(),
            status: InsightStatus::Processing,
            insights: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Insight rows, one per submission
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// `false` when a marker for the submission already exists.
    async fn create_insight_if_absent(&self, record: &InsightRecord) -> Result<bool>;

    /// Store the result and mark the row completed.
    async fn save_insights(&self, submission_id: &str, insights: &Value) -> Result<u64>;

    async fn get_insight(&self, submission_id: &str) -> Result<Option<InsightRecord>>;
}

/// What the analysis service is asked to look at
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub submission_id: String,
    pub file_path: String,
}

/// External analysis service
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Value>;
}

/// Analyzer backed by the HTTP analysis service (`POST {base}/analyze`)
pub struct HttpAnalyzer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MicError::Config(format!("Failed to build analyzer client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<Value> {
        let url = format!("{}/analyze", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::ACCEPTED {
            return Err(MicError::Collaborator(format!("analysis service returned {}", status)));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|e| MicError::Collaborator(format!("unreadable analysis result: {}", e)))
    }
}

/// Result of asking for analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisTicket {
    pub submission_id: String,
    pub status: InsightStatus,
    /// `false` when an earlier request already owns the marker
    pub queued: bool,
}

/// Result of polling for insights
#[derive(Debug, Clone, PartialEq)]
pub enum InsightsPoll {
    Ready(Value),
    NotReady,
}

#[derive(Clone)]
pub struct InsightService {
    submissions: Arc<dyn SubmissionStore>,
    store: Arc<dyn InsightStore>,
    analyzer: Arc<dyn Analyzer>,
}

impl InsightService {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        store: Arc<dyn InsightStore>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            submissions,
            store,
            analyzer,
        }
    }

    /// Ask for analysis of the submission's attached file.
    pub async fn request_analysis(&self, principal: &Principal, submission_id: &str) -> Result<AnalysisTicket> {
        require_role(principal, &[Role::Student])?;

        let submission = self
            .submissions
            .get(submission_id)
            .await?
            .ok_or_else(|| MicError::NotFound(format!("submission {}", submission_id)))?;
        if !submission.is_owned_by(&principal.identity) {
            return Err(MicError::Forbidden("not the owner of this submission".into()));
        }
        let file_path = submission
            .file_reference
            .ok_or_else(|| MicError::Validation("submission has no file attached".into()))?;

        let queued = self
            .store
            .create_insight_if_absent(&InsightRecord::processing(submission_id))
            .await?;

        if queued {
            let store = Arc::clone(&self.store);
            let analyzer = Arc::clone(&self.analyzer);
            let request = AnalysisRequest {
                submission_id: submission_id.to_string(),
                file_path,
            };
            tokio::spawn(async move {
                run_analysis(store, analyzer, request).await;
            });
            info!(submission = submission_id, "Analysis requested");
        }

        Ok(AnalysisTicket {
            submission_id: submission_id.to_string(),
            status: InsightStatus::Processing,
            queued,
        })
    }

    pub async fn get_insights(&self, principal: &Principal, submission_id: &str) -> Result<InsightsPoll> {
        require_role(principal, &[Role::Student])?;

        if let Some(submission) = self.submissions.get(submission_id).await? {
            if !submission.is_owned_by(&principal.identity) {
                return Err(MicError::Forbidden("not the owner of this submission".into()));
            }
        }

        let record = self
            .store
            .get_insight(submission_id)
            .await?
            .ok_or_else(|| MicError::NotFound(format!("insights for {}", submission_id)))?;

        Ok(match (record.status, record.insights) {
            (InsightStatus::Completed, Some(insights)) => InsightsPoll::Ready(insights),
            (InsightStatus::Completed, None) => InsightsPoll::Ready(Value::Null),
            (InsightStatus::Processing, _) => InsightsPoll::NotReady,
        })
    }
}

/// A failure leaves the marker in `processing`.
async fn run_analysis(store: Arc<dyn InsightStore>, analyzer: Arc<dyn Analyzer>, request: AnalysisRequest) {
    match analyzer.analyze(&request).await {
        Ok(insights) => match store.save_insights(&request.submission_id, &insights).await {
            Ok(_) => info!(submission = %request.submission_id, "Analysis completed"),
            Err(e) => warn!(submission = %request.submission_id, error = %e, "Failed to save insights"),
        },
        Err(e) => warn!(submission = %request.submission_id, error = %e, "Analysis service unavailable"),
    }
}
