//! HTTP server and request dispatch
//!
//! One task per connection. Each request has its bearer credential decoded
//! once, its body collected under the configured limit, and is then routed by
//! `(method, path segments)`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{Authentication, JwtValidator};
use crate::config::Args;
use crate::db::Stores;
use crate::routes::{self, error_response, mic_error_response, not_found_response, FullBody};
use crate::services::{
    AdminTriage, Analyzer, EmailQueue, FacultyReview, IncubationTracker, InsightService,
    NotificationDispatcher, NotificationInbox,
};
use crate::types::{MicError, Result};
use crate::workflow::SubmissionWorkflow;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    pub workflow: SubmissionWorkflow,
    pub triage: AdminTriage,
    pub review: FacultyReview,
    pub incubation: IncubationTracker,
    pub insights: InsightService,
    pub inbox: NotificationInbox,
    pub email: EmailQueue,
    /// Persistence backend name
    pub store_kind: &'static str,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wire every service over the given stores
    pub fn new(
        args: Args,
        jwt: JwtValidator,
        stores: Stores,
        email: EmailQueue,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let notifier = NotificationDispatcher::new(Arc::clone(&stores.notifications), email.clone());

        Self {
            workflow: SubmissionWorkflow::new(Arc::clone(&stores.submissions), notifier.clone()),
            triage: AdminTriage::new(Arc::clone(&stores.submissions), Arc::clone(&stores.assignments)),
            review: FacultyReview::new(
                Arc::clone(&stores.submissions),
                Arc::clone(&stores.work),
                notifier,
            ),
            incubation: IncubationTracker::new(Arc::clone(&stores.submissions), Arc::clone(&stores.work)),
            insights: InsightService::new(
                Arc::clone(&stores.submissions),
                Arc::clone(&stores.insights),
                analyzer,
            ),
            inbox: NotificationInbox::new(Arc::clone(&stores.notifications)),
            email,
            store_kind: stores.kind,
            started_at: Utc::now(),
            args,
            jwt,
        }
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Listening on {} ({} store)", state.args.listen, state.store_kind);

    if state.args.dev_mode {
        warn!("Development mode enabled - using development signing key if none configured");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, Infallible> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    if req.method() == Method::OPTIONS {
        return Ok(preflight_response());
    }

    let (parts, body) = req.into_parts();
    let bytes = match collect_body(body, state.args.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(rejection) => return Ok(with_cors(rejection)),
    };

    let response = route(&state, Request::from_parts(parts, bytes)).await;
    Ok(with_cors(response))
}

/// Collect at most `limit` bytes of `body`. Anything larger is a 413.
pub async fn collect_body<B>(body: B, limit: usize) -> std::result::Result<Bytes, Response<FullBody>>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large",
            Some("BODY_TOO_LARGE"),
        )),
        Err(e) => Err(mic_error_response(&MicError::BadRequest(format!(
            "Failed to read body: {}",
            e
        )))),
    }
}

/// Authenticate and dispatch a request with a collected body
pub async fn route(state: &AppState, mut req: Request<Bytes>) -> Response<FullBody> {
    Authentication::attach(&state.jwt, &mut req);

    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match segments.as_slice() {
        ["api", "health"] => Ok(routes::health::health_check(state)),
        ["api", "version"] => Ok(routes::health::version_info()),
        ["api", "submissions", rest @ ..] => routes::submissions::handle(state, req, rest).await,
        ["api", "admin", "submissions", rest @ ..] => {
            routes::admin_submissions::handle(state, req, rest).await
        }
        ["api", "faculty", "reviews", rest @ ..] => routes::faculty_reviews::handle(state, req, rest).await,
        ["api", "faculty", "incubation", rest @ ..] => {
            routes::incubation::handle_incubation(state, req, rest).await
        }
        ["api", "faculty", "progress", rest @ ..] => {
            routes::incubation::handle_progress(state, req, rest).await
        }
        ["api", "ai", rest @ ..] => routes::insights::handle(state, req, rest).await,
        ["api", "notifications", rest @ ..] => routes::notifications::handle(state, req, rest).await,
        _ => Ok(not_found_response(&path)),
    };

    result.unwrap_or_else(|e| mic_error_response(&e))
}

fn with_cors(mut response: Response<FullBody>) -> Response<FullBody> {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// CORS preflight response
fn preflight_response() -> Response<FullBody> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Authorization, Content-Type"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_body_within_limit_is_collected() {
        let bytes = collect_body(Full::new(Bytes::from_static(b"{\"title\":\"X\"}")), 64)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"{\"title\":\"X\"}");
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let rejection = collect_body(Full::new(Bytes::from(vec![b'a'; 65])), 64)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body = rejection.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "BODY_TOO_LARGE");
    }

    #[test]
    fn test_preflight_allows_bearer_header() {
        let response = preflight_response();
        assert_eq!(
            response.headers()["Access-Control-Allow-Headers"],
            "Authorization, Content-Type"
        );
    }
}
