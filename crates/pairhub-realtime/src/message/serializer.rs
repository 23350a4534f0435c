//! JSON serialization for WebSocket messages.

use super::types::InboundEnvelope;

/// Deserialize an inbound envelope from JSON
pub fn deserialize_inbound(text: &str) -> Result<InboundEnvelope, serde_json::Error> {
    serde_json::from_str(text)
}
