//! Response DTOs.

use serde::{Deserialize, Serialize};

use pairhub_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Result of publishing to a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastResponse {
    /// Normalized pair key.
    pub pair: String,
    /// Number of subscribers the message was queued for.
    pub delivered: usize,
}

/// Subscriber count for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairStatsResponse {
    /// Normalized pair key.
    pub pair: String,
    /// Current subscribers.
    pub subscribers: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
    /// Live WebSocket connections.
    pub ws_connections: usize,
    /// Pairs with at least one subscriber.
    pub active_pairs: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
