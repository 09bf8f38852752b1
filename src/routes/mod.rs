//! HTTP route handlers
//!
//! Handlers take a request whose body has already been collected, so they can
//! be driven directly from tests.

pub mod admin_submissions;
pub mod faculty_reviews;
pub mod health;
pub mod incubation;
pub mod insights;
pub mod notifications;
pub mod submissions;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::types::{MicError, Result};
use crate::workflow::SubmissionStatus;

pub type FullBody = Full<Bytes>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Body returned after a status change
#[derive(Debug, Serialize)]
pub struct StatusResponse<'a> {
    pub success: bool,
    pub submission_id: &'a str,
    pub status: SubmissionStatus,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub fn error_response(status: StatusCode, error: &str, code: Option<&str>) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: error.to_string(),
            code: code.map(|c| c.to_string()),
        },
    )
}

/// Map a backend error to its HTTP response. Server-side failures are logged.
pub fn mic_error_response(err: &MicError) -> Response<FullBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    error_response(status, &err.public_message(), Some(err.code()))
}

pub fn status_response(submission_id: &str, status: SubmissionStatus) -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &StatusResponse {
            success: true,
            submission_id,
            status,
        },
    )
}

/// Parse the collected body as JSON
pub fn parse_json<T: DeserializeOwned>(req: &Request<Bytes>) -> Result<T> {
    if req.body().is_empty() {
        return Err(MicError::BadRequest("request body required".into()));
    }
    Ok(serde_json::from_slice(req.body())?)
}

pub fn not_found_response(path: &str) -> Response<FullBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path,
        }),
    )
}

pub fn method_not_allowed() -> Response<FullBody> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
}
