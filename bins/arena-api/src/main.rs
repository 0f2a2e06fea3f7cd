mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use arena_core::{ArenaConfig, ExecutionBackend, Orchestrator, RemoteExecutionClient};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState<B> {
    pub orchestrator: Orchestrator<B>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("ARENA_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn app<B: ExecutionBackend>(orchestrator: Orchestrator<B>) -> Router {
    let state = Arc::new(AppState { orchestrator });
    Router::new().merge(routes::routes()).with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Arena API booting...");

    let config = ArenaConfig::from_env();
    let client = RemoteExecutionClient::new(&config)
        .context("Failed to build execution service client")?;

    info!(
        execute_url = %client.execute_url(),
        timeout = ?config.request_timeout,
        "Execution service configured"
    );

    let app = app(Orchestrator::new(client));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);
    info!("Ready to accept runs");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
