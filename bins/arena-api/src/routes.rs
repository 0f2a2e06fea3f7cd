use arena_core::ExecutionBackend;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes<B: ExecutionBackend>() -> Router<Arc<AppState<B>>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/languages", get(handlers::list_languages))
        .route("/runs", post(handlers::start_run::<B>))
        .route("/runs/current", get(handlers::current_run::<B>))
        .route("/metrics", get(handlers::metrics_endpoint))
}
