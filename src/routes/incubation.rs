//! Faculty incubation routes
//!
//! - `GET /api/faculty/incubation`: portfolio
//! - `POST /api/faculty/incubation/{id}`: stage/progress and company link
//! - `GET /api/faculty/progress/{id}`

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};

use super::{json_response, method_not_allowed, parse_json, FullBody};
use crate::auth::require_principal;
use crate::server::AppState;
use crate::services::ProgressUpdate;
use crate::types::Result;

pub async fn handle_incubation(
    state: &AppState,
    req: Request<Bytes>,
    rest: &[&str],
) -> Result<Response<FullBody>> {
    let principal = require_principal(&req)?;
    let method = req.method().clone();

    match (method, rest) {
        (Method::GET, []) => {
            let portfolio = state.incubation.portfolio(principal).await?;
            Ok(json_response(StatusCode::OK, &portfolio))
        }

        (Method::POST, [id]) => {
            let update: ProgressUpdate = parse_json(&req)?;
            let work = state.incubation.apply(principal, id, update).await?;
            Ok(json_response(StatusCode::OK, &work))
        }

        _ => Ok(method_not_allowed()),
    }
}

pub async fn handle_progress(
    state: &AppState,
    req: Request<Bytes>,
    rest: &[&str],
) -> Result<Response<FullBody>> {
    let principal = require_principal(&req)?;

    match (req.method(), rest) {
        (&Method::GET, [id]) => {
            let work = state.incubation.progress(principal, id).await?;
            Ok(json_response(StatusCode::OK, &work))
        }
        _ => Ok(method_not_allowed()),
    }
}
