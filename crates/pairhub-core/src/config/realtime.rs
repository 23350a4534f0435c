//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound queue, in frames.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Maximum channel handlers running concurrently for one connection.
    #[serde(default = "default_max_inflight")]
    pub max_inflight_per_connection: usize,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            max_inflight_per_connection: default_max_inflight(),
            max_message_size: default_max_message_size(),
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_inflight() -> usize {
    32
}

fn default_max_message_size() -> usize {
    65_536
}
