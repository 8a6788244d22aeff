//! HTTP routes the plugin serves under its host-assigned prefix.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::FailureStatus;
use crate::models::PlaybookRun;
use crate::plugin::ConfigurationStore;
use crate::upstream::UpstreamClient;

pub const HELLO_BODY: &str = "Hello World!";

#[derive(Clone)]
pub struct RouterState {
    pub upstream: Arc<UpstreamClient>,
    pub settings: Arc<ConfigurationStore>,
}

pub fn build_router(state: RouterState) -> Router {
    Router::new()
        .route("/hello", any(handle_hello))
        .route("/runs", any(handle_runs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_hello() -> &'static str {
    HELLO_BODY
}

async fn handle_runs(State(state): State<RouterState>) -> Response {
    let (status, runs): (StatusCode, Option<Vec<PlaybookRun>>) =
        match state.upstream.list_runs().await {
            Ok(list) => (StatusCode::OK, Some(list.items)),
            Err(e) => {
                error!(
                    error_code = e.error_code(),
                    "Failed to get playbook runs: {}", e
                );
                let status = match state.settings.get().failure_status {
                    FailureStatus::Ok => StatusCode::OK,
                    FailureStatus::BadGateway => StatusCode::BAD_GATEWAY,
                };
                (status, None)
            }
        };

    let body = serde_json::to_vec(&runs).unwrap_or_else(|e| {
        error!("Failed to encode playbook runs: {}", e);
        b"null".to_vec()
    });

    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
