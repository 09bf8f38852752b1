//! Email transport and delivery queue
//!
//! Notification emails go through a bounded channel drained by a fixed pool of
//! worker tasks. Enqueueing never waits; a full queue drops the message.
//! Delivery failures are counted and logged, never retried.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::types::{MicError, Result};

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;

    /// Short name for logs and health output
    fn name(&self) -> &'static str;
}

/// Transport that only logs. Used when no relay is configured.
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "Email (log only)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Transport that posts messages to an HTTP mail relay
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    from: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(relay_url: String, from: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MicError::Config(format!("Failed to build mail client: {}", e)))?;

        Ok(Self {
            client,
            relay_url,
            from,
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let mut request = self.client.post(&self.relay_url).json(&payload);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MicError::Email(format!("relay unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(MicError::Email(format!("relay returned {}", response.status())));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Configuration for the delivery queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of worker tasks
    pub worker_count: usize,
    /// Maximum queued messages
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            max_queue_size: 256,
        }
    }
}

#[derive(Default)]
struct EmailMetrics {
    queued: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmailStats {
    pub queued: u64,
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Handle to the delivery queue
#[derive(Clone)]
pub struct EmailQueue {
    tx: mpsc::Sender<EmailMessage>,
    metrics: Arc<EmailMetrics>,
    transport: &'static str,
}

impl EmailQueue {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    pub fn start(sender: Arc<dyn EmailSender>, config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::channel::<EmailMessage>(config.max_queue_size.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let metrics = Arc::new(EmailMetrics::default());
        let transport = sender.name();

        for i in 0..config.worker_count.max(1) {
            let sender = Arc::clone(&sender);
            let rx = Arc::clone(&rx);
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                worker_task(i, sender, rx, metrics).await;
            });
        }

        info!(
            "Email queue started with {} workers over {} transport",
            config.worker_count.max(1),
            transport
        );

        Self {
            tx,
            metrics,
            transport,
        }
    }

    /// Hand a message to the workers without waiting. Returns `false` when it
    /// was dropped.
    pub fn enqueue(&self, message: EmailMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => {
                self.metrics.queued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(message)) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(to = %message.to, "Email queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(to = %message.to, "Email queue closed, dropping message");
                false
            }
        }
    }

    pub fn stats(&self) -> EmailStats {
        EmailStats {
            queued: self.metrics.queued.load(Ordering::Relaxed),
            sent: self.metrics.sent.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
            dropped: self.metrics.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn transport(&self) -> &'static str {
        self.transport
    }
}

/// Worker task that delivers queued messages
async fn worker_task(
    worker_id: usize,
    sender: Arc<dyn EmailSender>,
    rx: Arc<Mutex<mpsc::Receiver<EmailMessage>>>,
    metrics: Arc<EmailMetrics>,
) {
    loop {
        let message = {
            let mut rx = rx.lock().await;
            match rx.recv().await {
                Some(m) => m,
                None => {
                    debug!("Email worker {} shutting down (channel closed)", worker_id);
                    return;
                }
            }
        };

        match sender.send(&message).await {
            Ok(()) => {
                metrics.sent.fetch_add(1, Ordering::Relaxed);
                debug!(worker = worker_id, to = %message.to, "Email sent");
            }
            Err(e) => {
                metrics.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker = worker_id, to = %message.to, error = %e, "Email delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl EmailSender for Failing {
        async fn send(&self, _message: &EmailMessage) -> Result<()> {
            Err(MicError::Email("smtp down".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "s1@example.edu".into(),
            subject: "Submission Submitted".into(),
            body: "Dear User".into(),
        }
    }

    async fn wait_for(queue: &EmailQueue, done: impl Fn(EmailStats) -> bool) -> EmailStats {
        for _ in 0..100 {
            let stats = queue.stats();
            if done(stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        queue.stats()
    }

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.max_queue_size, 256);
    }

    #[test]
    fn test_log_mailer_always_succeeds() {
        let result = tokio_test::block_on(LogMailer.send(&message()));
        assert!(result.is_ok());
        assert_eq!(LogMailer.name(), "log");
    }

    #[tokio::test]
    async fn test_log_mailer_counts_sent() {
        let queue = EmailQueue::start(Arc::new(LogMailer), QueueConfig::default());
        assert!(queue.enqueue(message()));

        let stats = wait_for(&queue, |s| s.sent == 1).await;
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(queue.transport(), "log");
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let queue = EmailQueue::start(Arc::new(Failing), QueueConfig::default());
        queue.enqueue(message());
        queue.enqueue(message());

        let stats = wait_for(&queue, |s| s.failed == 2).await;
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.sent, 0);
    }

    type Captured = (Option<String>, serde_json::Value);

    /// One-shot HTTP relay answering `status` and handing back what it received
    async fn spawn_relay(status: hyper::StatusCode) -> (String, tokio::sync::oneshot::Receiver<Captured>) {
        use http_body_util::{BodyExt, Full};
        use hyper::body::Incoming;
        use hyper::header::AUTHORIZATION;
        use hyper::{Request, Response};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());
        let (tx, rx) = tokio::sync::oneshot::channel::<Captured>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                let tx = Arc::clone(&tx);
                async move {
                    let auth = req
                        .headers()
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let body = req.into_body().collect().await.unwrap().to_bytes();
                    let json = serde_json::from_slice(&body).unwrap();
                    let sender = tx.lock().unwrap().take();
                    if let Some(sender) = sender {
                        let _ = sender.send((auth, json));
                    }

                    let mut response = Response::new(Full::new(bytes::Bytes::from_static(b"{}")));
                    *response.status_mut() = status;
                    Ok::<_, std::convert::Infallible>(response)
                }
            });
            let _ = hyper::server::conn::http1::Builder::new()
                .serve_connection(hyper_util::rt::TokioIo::new(stream), service)
                .await;
        });

        (url, rx)
    }

    #[tokio::test]
    async fn test_http_mailer_posts_relay_payload() {
        let (url, received) = spawn_relay(hyper::StatusCode::OK).await;
        let mailer = HttpMailer::new(
            url,
            "mic@example.edu".into(),
            Some("relay-key".into()),
            Duration::from_secs(5),
        )
        .unwrap();

        mailer.send(&message()).await.unwrap();

        let (auth, payload) = received.await.unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer relay-key"));
        assert_eq!(
            payload,
            serde_json::json!({
                "from": "mic@example.edu",
                "to": "s1@example.edu",
                "subject": "Submission Submitted",
                "text": "Dear User",
            })
        );
    }

    #[tokio::test]
    async fn test_http_mailer_reports_relay_rejection() {
        let (url, _received) = spawn_relay(hyper::StatusCode::BAD_GATEWAY).await;
        let mailer = HttpMailer::new(url, "mic@example.edu".into(), None, Duration::from_secs(5)).unwrap();

        let err = mailer.send(&message()).await.unwrap_err();
        assert!(matches!(err, MicError::Email(_)));
        assert_eq!(mailer.name(), "http");
    }
}
