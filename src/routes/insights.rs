//! AI insight routes under `/api/ai`

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use super::{json_response, method_not_allowed, parse_json, FullBody};
use crate::auth::require_principal;
use crate::server::AppState;
use crate::services::InsightsPoll;
use crate::types::Result;

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    submission_id: String,
}

pub async fn handle(state: &AppState, req: Request<Bytes>, rest: &[&str]) -> Result<Response<FullBody>> {
    let principal = require_principal(&req)?;
    let method = req.method().clone();

    match (method, rest) {
        (Method::POST, ["analyze"]) => {
            let body: AnalyzeRequest = parse_json(&req)?;
            let ticket = state
                .insights
                .request_analysis(principal, &body.submission_id)
                .await?;
            Ok(json_response(StatusCode::ACCEPTED, &ticket))
        }

        (Method::GET, ["insights", id]) => match state.insights.get_insights(principal, id).await? {
            InsightsPoll::Ready(insights) => Ok(json_response(
                StatusCode::OK,
                &serde_json::json!({
                    "submission_id": id,
                    "status": "completed",
                    "insights": insights,
                }),
            )),
            InsightsPoll::NotReady => Ok(json_response(
                StatusCode::ACCEPTED,
                &serde_json::json!({
                    "submission_id": id,
                    "status": "processing",
                    "message": "analysis not ready",
                }),
            )),
        },

        _ => Ok(method_not_allowed()),
    }
}
