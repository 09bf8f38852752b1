//! Faculty review routes under `/api/faculty/reviews`

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use super::{json_response, method_not_allowed, parse_json, status_response, FullBody};
use crate::auth::require_principal;
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct DecisionRequest {
    decision: String,
}

pub async fn handle(state: &AppState, req: Request<Bytes>, rest: &[&str]) -> Result<Response<FullBody>> {
    let principal = require_principal(&req)?;
    let method = req.method().clone();

    match (method, rest) {
        (Method::GET, []) => {
            let reviewable = state.review.list(principal).await?;
            Ok(json_response(StatusCode::OK, &reviewable))
        }

        (Method::GET, [id]) => {
            let detail = state.review.get(principal, id).await?;
            Ok(json_response(StatusCode::OK, &detail))
        }

        (Method::POST, [id, "decision"]) => {
            let body: DecisionRequest = parse_json(&req)?;
            let status = state.review.decide(principal, id, &body.decision).await?;
            Ok(status_response(id, status))
        }

        _ => Ok(method_not_allowed()),
    }
}
