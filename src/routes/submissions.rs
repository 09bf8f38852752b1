//! Student submission routes under `/api/submissions`
//!
//! - `POST /create`, `POST /submit/{id}`, `GET /mine`
//! - `GET|PUT|DELETE /{id}`, `POST /{id}/attach-file`
//! - `GET /incubation` (public pipeline)

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use super::{json_response, method_not_allowed, parse_json, status_response, FullBody, SuccessResponse};
use crate::auth::require_principal;
use crate::server::AppState;
use crate::types::Result;
use crate::workflow::{DraftEdit, NewSubmission, SubmissionStatus};

#[derive(Debug, Deserialize)]
struct AttachFileRequest {
    #[serde(alias = "file_path")]
    file_reference: String,
}

pub async fn handle(state: &AppState, req: Request<Bytes>, rest: &[&str]) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (method, rest) {
        (Method::GET, ["incubation"]) => {
            let pipeline = state.incubation.pipeline().await?;
            Ok(json_response(StatusCode::OK, &pipeline))
        }

        (Method::POST, ["create"]) => {
            let principal = require_principal(&req)?;
            let input: NewSubmission = parse_json(&req)?;
            let submission = state.workflow.create(principal, input).await?;
            Ok(json_response(StatusCode::CREATED, &submission))
        }

        (Method::POST, ["submit", id]) => {
            let principal = require_principal(&req)?;
            state.workflow.submit(principal, id).await?;
            Ok(status_response(id, SubmissionStatus::Submitted))
        }

        (Method::GET, ["mine"]) => {
            let principal = require_principal(&req)?;
            let submissions = state.workflow.list_mine(principal).await?;
            Ok(json_response(StatusCode::OK, &submissions))
        }

        (Method::GET, [id]) => {
            let principal = require_principal(&req)?;
            let submission = state.workflow.get(principal, id).await?;
            Ok(json_response(StatusCode::OK, &submission))
        }

        (Method::PUT, [id]) => {
            let principal = require_principal(&req)?;
            let edit: DraftEdit = parse_json(&req)?;
            state.workflow.edit_draft(principal, id, edit).await?;
            Ok(json_response(StatusCode::OK, &SuccessResponse::new("Draft updated")))
        }

        (Method::DELETE, [id]) => {
            let principal = require_principal(&req)?;
            state.workflow.delete(principal, id).await?;
            Ok(json_response(StatusCode::OK, &SuccessResponse::new("Submission deleted")))
        }

        (Method::POST, [id, "attach-file"]) => {
            let principal = require_principal(&req)?;
            let body: AttachFileRequest = parse_json(&req)?;
            state
                .workflow
                .attach_file(principal, id, &body.file_reference)
                .await?;
            Ok(json_response(StatusCode::OK, &SuccessResponse::new("File attached")))
        }

        _ => Ok(method_not_allowed()),
    }
}
