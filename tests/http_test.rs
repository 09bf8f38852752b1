//! HTTP routing integration tests
//!
//! Requests go through `server::route` with collected bodies, covering
//! authentication, status codes and error bodies.

mod common;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};

use common::{admin, faculty, student, Harness};
use mic_backend::routes::FullBody;
use mic_backend::server::route;
use mic_backend::workflow::SubmissionStatus;

fn request(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Bytes> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = body
        .map(|b| Bytes::from(b.to_string()))
        .unwrap_or_default();
    builder.body(body).unwrap()
}

async fn body_json(response: hyper::Response<FullBody>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let h = Harness::default_harness();
    let response = route(&h.state, request(Method::GET, "/api/submissions/mine", None, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let h = Harness::default_harness();
    let response = route(
        &h.state,
        request(Method::GET, "/api/submissions/mine", Some("not-a-jwt"), None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_student_on_admin_route_is_forbidden() {
    let h = Harness::default_harness();
    let token = h.token(&student("student-s"));

    let response = route(
        &h.state,
        request(Method::GET, "/api/admin/submissions", Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let h = Harness::default_harness();

    let response = route(&h.state, request(Method::GET, "/api/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["healthy"], true);
    assert_eq!(body["store"], "memory");

    let response = route(&h.state, request(Method::GET, "/api/submissions/incubation", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

// =============================================================================
// Lifecycle over HTTP
// =============================================================================

#[tokio::test]
async fn test_create_submit_and_bogus_decision() {
    let h = Harness::default_harness();
    let student_token = h.token(&student("student-s"));
    let admin_token = h.token(&admin());
    let faculty_token = h.token(&faculty());

    let response = route(
        &h.state,
        request(
            Method::POST,
            "/api/submissions/create",
            Some(&student_token),
            Some(json!({ "title": "X", "description": "Y" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "draft");
    let id = created["id"].as_str().unwrap().to_string();

    let response = route(
        &h.state,
        request(Method::POST, &format!("/api/submissions/submit/{}", id), Some(&student_token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "submitted");

    let response = route(
        &h.state,
        request(
            Method::POST,
            &format!("/api/admin/submissions/{}/decision", id),
            Some(&admin_token),
            Some(json!({ "decision": "approved" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "admin_approved");

    let response = route(
        &h.state,
        request(
            Method::POST,
            &format!("/api/faculty/reviews/{}/decision", id),
            Some(&faculty_token),
            Some(json!({ "decision": "bogus" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid decision");
    assert_eq!(body["code"], "INVALID_DECISION");
    assert_eq!(h.status_of(&id).await, SubmissionStatus::AdminApproved);
}

#[tokio::test]
async fn test_repeated_admin_approval_conflicts() {
    let h = Harness::default_harness();
    let seeded = h.seed(&student("student-s"), SubmissionStatus::Submitted).await;
    let admin_token = h.token(&admin());
    let path = format!("/api/admin/submissions/{}/decision", seeded.id);

    let first = route(
        &h.state,
        request(Method::POST, &path, Some(&admin_token), Some(json!({ "decision": "approved" }))),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = route(
        &h.state,
        request(Method::POST, &path, Some(&admin_token), Some(json!({ "decision": "approved" }))),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = body_json(second).await;
    assert_eq!(body["error"], "not found or already processed");
    assert_eq!(body["code"], "TRANSITION_CONFLICT");
}

#[tokio::test]
async fn test_decision_without_body_is_bad_request() {
    let h = Harness::default_harness();
    let seeded = h.seed(&student("student-s"), SubmissionStatus::Submitted).await;
    let admin_token = h.token(&admin());

    let response = route(
        &h.state,
        request(
            Method::POST,
            &format!("/api/admin/submissions/{}/decision", seeded.id),
            Some(&admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.status_of(&seeded.id).await, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn test_assign_faculty_status_codes() {
    let h = Harness::default_harness();
    let seeded = h.seed(&student("student-s"), SubmissionStatus::Submitted).await;
    let admin_token = h.token(&admin());
    let path = format!("/api/admin/submissions/{}/assign-faculty", seeded.id);

    let first = route(
        &h.state,
        request(Method::POST, &path, Some(&admin_token), Some(json!({ "faculty_id": "faculty-1" }))),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let again = route(
        &h.state,
        request(Method::POST, &path, Some(&admin_token), Some(json!({ "faculty_id": "faculty-1" }))),
    )
    .await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(body_json(again).await["created"], false);
}

#[tokio::test]
async fn test_insights_poll_before_completion() {
    let h = Harness::new(
        std::sync::Arc::new(common::RecordingMailer::default()),
        std::sync::Arc::new(common::DownAnalyzer),
    );
    let s = student("student-s");
    let token = h.token(&s);
    let created = h
        .state
        .workflow
        .create(
            &s,
            mic_backend::workflow::NewSubmission {
                title: "X".into(),
                description: "Y".into(),
                file_reference: Some("uploads/pitch.pdf".into()),
            },
        )
        .await
        .unwrap();

    let response = route(
        &h.state,
        request(
            Method::POST,
            "/api/ai/analyze",
            Some(&token),
            Some(json!({ "submission_id": created.id })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = route(
        &h.state,
        request(Method::GET, &format!("/api/ai/insights/{}", created.id), Some(&token), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["status"], "processing");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let h = Harness::default_harness();
    let response = route(&h.state, request(Method::GET, "/api/nope", None, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_pipeline_shows_status_without_owner() {
    let h = Harness::default_harness();
    let seeded = h.seed(&student("student-s"), SubmissionStatus::AdminApproved).await;
    h.state
        .review
        .decide(&faculty(), &seeded.id, "approved")
        .await
        .unwrap();

    let response = route(&h.state, request(Method::GET, "/api/submissions/incubation", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["submission_id"], seeded.id.as_str());
    assert_eq!(rows[0]["status"], "approved");
    assert_eq!(rows[0]["stage"], "under_incubation");
    assert!(rows[0].get("owner_id").is_none());
}
