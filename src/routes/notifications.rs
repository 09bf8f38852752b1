//! Inbox routes under `/api/notifications`

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};

use super::{json_response, method_not_allowed, FullBody, SuccessResponse};
use crate::auth::require_principal;
use crate::server::AppState;
use crate::types::Result;

pub async fn handle(state: &AppState, req: Request<Bytes>, rest: &[&str]) -> Result<Response<FullBody>> {
    let principal = require_principal(&req)?;

    match (req.method(), rest) {
        (&Method::GET, []) => {
            let notifications = state.inbox.list(principal).await?;
            Ok(json_response(StatusCode::OK, &notifications))
        }

        (&Method::GET, ["unread-count"]) => {
            let count = state.inbox.unread_count(principal).await?;
            Ok(json_response(StatusCode::OK, &serde_json::json!({ "unread": count })))
        }

        (&Method::POST, [id, "read"]) => {
            state.inbox.mark_read(principal, id).await?;
            Ok(json_response(StatusCode::OK, &SuccessResponse::new("Notification marked read")))
        }

        _ => Ok(method_not_allowed()),
    }
}
