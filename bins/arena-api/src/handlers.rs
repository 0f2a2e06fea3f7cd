// HTTP route handlers for the Arena API

use arena_core::{supported_languages, ArenaError, ExecutionBackend, SlotInput};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    pub first: SlotInput,
    pub second: SlotInput,
}

#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
}

/// POST /runs - Start a comparison run
///
/// Validation happens before responding; the executions themselves continue
/// in the background and are observed through GET /runs/current.
pub async fn start_run<B: ExecutionBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(payload): Json<StartRunRequest>,
) -> Response {
    let pending = match state.orchestrator.begin(payload.first, payload.second) {
        Ok(pending) => pending,
        Err(e) => {
            let (status, outcome) = match e {
                ArenaError::IncompleteInput => (StatusCode::BAD_REQUEST, "incomplete"),
                ArenaError::RunInProgress => (StatusCode::CONFLICT, "busy"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "error"),
            };
            metrics::record_run_outcome(outcome);
            return (
                status,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let run_id = pending.run_id();
    metrics::record_run_outcome("accepted");
    info!(run_id = %run_id, "Run accepted");

    tokio::spawn(async move {
        match pending.execute().await {
            Ok(report) => metrics::record_report(&report),
            Err(e) => error!(run_id = %run_id, error = %e, "Run failed"),
        }
    });

    (StatusCode::ACCEPTED, Json(StartRunResponse { run_id })).into_response()
}

/// GET /runs/current - Observe the latest run
///
/// 202 while any slot is still executing, 200 once settled (or before any run).
pub async fn current_run<B: ExecutionBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> impl IntoResponse {
    let snapshot = state.orchestrator.snapshot();
    let status = if snapshot.executing {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(snapshot))
}

/// GET /languages - Languages a slot may use
pub async fn list_languages() -> impl IntoResponse {
    Json(supported_languages())
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_endpoint() -> Response {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
