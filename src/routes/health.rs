//! Health check endpoint
//!
//! `GET /health` reports liveness plus enough build and mode detail to tell
//! deployments apart. It never touches the store.

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, BoxBody};
use crate::config::StoreBackend;
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_timestamp: &'static str,
    /// Seconds since the server state was built
    pub uptime: u64,
    pub timestamp: String,
    /// "development" or "production"
    pub mode: &'static str,
    pub node_id: String,
    /// "memory" or "mongo"
    pub backend: &'static str,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let args = &state.args;

    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        git_commit: env!("GIT_COMMIT_SHORT"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development"
        } else {
            "production"
        },
        node_id: args.node_id.to_string(),
        backend: match args.store_backend() {
            StoreBackend::Memory => "memory",
            StoreBackend::Mongo => "mongo",
        },
    }
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    json_response(StatusCode::OK, &build_health_response(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_in_dev_mode() {
        let state = AppState::for_tests();
        let health = build_health_response(&state);
        assert!(health.healthy);
        assert_eq!(health.mode, "development");
        assert_eq!(health.backend, "memory");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }
}
