//! Admin triage routes under `/api/admin/submissions`

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{json_response, method_not_allowed, parse_json, status_response, FullBody, SuccessResponse};
use crate::auth::require_principal;
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    decision: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    faculty_id: String,
}

#[derive(Debug, Serialize)]
struct AssignResponse<'a> {
    success: bool,
    submission_id: &'a str,
    faculty_id: &'a str,
    created: bool,
}

#[derive(Debug, Deserialize)]
struct TagsRequest {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    domain: Option<String>,
}

pub async fn handle(state: &AppState, req: Request<Bytes>, rest: &[&str]) -> Result<Response<FullBody>> {
    let principal = require_principal(&req)?;
    let method = req.method().clone();

    match (method, rest) {
        (Method::GET, []) => {
            let pending = state.triage.list_pending(principal).await?;
            Ok(json_response(StatusCode::OK, &pending))
        }

        (Method::GET, ["all"]) => {
            let all = state.triage.list_all(principal).await?;
            Ok(json_response(StatusCode::OK, &all))
        }

        (Method::POST, [id, "decision"]) => {
            let body: DecisionRequest = parse_json(&req)?;
            let status = state
                .triage
                .decide(principal, id, &body.decision, body.reason.as_deref())
                .await?;
            Ok(status_response(id, status))
        }

        (Method::POST, [id, "assign-faculty"]) => {
            let body: AssignRequest = parse_json(&req)?;
            let created = state.triage.assign_faculty(principal, id, &body.faculty_id).await?;
            let status = if created { StatusCode::CREATED } else { StatusCode::OK };
            Ok(json_response(
                status,
                &AssignResponse {
                    success: true,
                    submission_id: id,
                    faculty_id: body.faculty_id.trim(),
                    created,
                },
            ))
        }

        (Method::DELETE, [id, "assign-faculty", faculty_id]) => {
            state.triage.unassign_faculty(principal, id, faculty_id).await?;
            Ok(json_response(StatusCode::OK, &SuccessResponse::new("Faculty unassigned")))
        }

        (Method::GET, [id, "faculty"]) => {
            let assigned = state.triage.list_assigned(principal, id).await?;
            Ok(json_response(StatusCode::OK, &assigned))
        }

        (Method::PUT, [id, "tags"]) => {
            let body: TagsRequest = parse_json(&req)?;
            state.triage.update_tags(principal, id, body.tags, body.domain).await?;
            Ok(json_response(StatusCode::OK, &SuccessResponse::new("Tags updated")))
        }

        _ => Ok(method_not_allowed()),
    }
}
