//! # pairhub-api
//!
//! HTTP API layer for PairHub built on Axum.
//!
//! Provides the WebSocket upgrade, the built-in channel handlers, the pair
//! publish and stats endpoints, CORS, and error mapping.

pub mod app;
pub mod channels;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use state::AppState;
