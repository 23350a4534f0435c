//! Route definitions for the PairHub HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket endpoint lives at `/ws`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(health_routes()).merge(pair_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::build_cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Health endpoint
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Pair publish and stats endpoints
fn pair_routes() -> Router<AppState> {
    Router::new()
        .route("/pairs/{pair}", get(handlers::pairs::pair_stats))
        .route("/pairs/{pair}/broadcast", post(handlers::pairs::broadcast))
}
