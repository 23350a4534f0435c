//! CORS layer configuration.

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Builds the CORS layer: any origin and header, the methods the API serves.
pub fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
