//! Application builder: wires engine, router, and state into a served app.

use std::future::IntoFuture;
use std::time::Duration;

use axum::Router;
use tokio::sync::oneshot;
use tracing::{info, warn};

use pairhub_core::config::AppConfig;
use pairhub_core::error::AppError;
use pairhub_realtime::server::RealtimeEngine;

use crate::channels::default_channels;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the engine with the built-in channels and the state around it.
pub fn build_state(config: AppConfig) -> Result<AppState, AppError> {
    let channels = default_channels()?;
    let engine = RealtimeEngine::new(config.realtime.clone(), channels);
    Ok(AppState::new(config, engine))
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the PairHub server until Ctrl+C, then closes every connection.
///
/// In-flight HTTP requests get `shutdown_grace_seconds` to finish.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    info!("Starting PairHub server...");

    let addr = config.server.bind_addr();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let state = build_state(config)?;
    let engine = state.realtime.clone();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!("PairHub server listening on {}", addr);

    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let shutdown_engine = engine.clone();
    let server = axum::serve(listener, build_app(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signal_tx.send(());
            // Upgraded sockets only finish once their connections are closed.
            if let Err(e) = shutdown_engine.shutdown().await {
                warn!(error = %e, "Real-time engine shutdown failed");
            }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        Ok(()) = signal_rx => {
            info!(grace_seconds = grace.as_secs(), "Shutdown signal received, draining");
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => {
                    result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
                }
                Err(_) => warn!(
                    remaining = engine.connections.connection_count(),
                    "Shutdown grace period elapsed"
                ),
            }
        }
    }

    info!("PairHub server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
