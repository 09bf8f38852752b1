//! Health and version endpoints
//!
//! - /api/health: liveness plus persistence backend and email delivery counters
//! - /api/version: build metadata embedded by build.rs

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, FullBody};
use crate::server::AppState;
use crate::services::EmailStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online', or 'degraded' when notification email is being dropped
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since startup
    pub uptime: i64,
    pub timestamp: String,
    pub mode: &'static str,
    /// Persistence backend ('mongodb' or 'memory')
    pub store: &'static str,
    pub email: EmailHealth,
}

#[derive(Serialize)]
pub struct EmailHealth {
    pub transport: &'static str,
    #[serde(flatten)]
    pub stats: EmailStats,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub git_commit_full: &'static str,
    pub build_timestamp: &'static str,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let stats = state.email.stats();
    let now = chrono::Utc::now();

    HealthResponse {
        healthy: true,
        status: if stats.dropped > 0 { "degraded" } else { "online" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
        mode: if state.args.dev_mode { "development" } else { "production" },
        store: state.store_kind,
        email: EmailHealth {
            transport: state.email.transport(),
            stats,
        },
    }
}

pub fn health_check(state: &AppState) -> Response<FullBody> {
    json_response(StatusCode::OK, &build_health_response(state))
}

pub fn version_info() -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &VersionResponse {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: env!("GIT_COMMIT_SHORT"),
            git_commit_full: env!("GIT_COMMIT_FULL"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
        },
    )
}
