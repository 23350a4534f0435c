//! Inbound envelope and protocol reply definitions.

use serde::{Deserialize, Serialize};

/// Channel name sent back when an envelope names an unregistered channel.
pub const INVALID_CHANNEL: &str = "INVALID_CHANNEL";

/// Every client-to-server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Channel the message is addressed to.
    pub channel: String,
    /// Handler-defined payload; `null` when omitted.
    #[serde(default)]
    pub message: serde_json::Value,
}

/// Replies the dispatcher sends on protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolReply {
    /// The envelope named an unregistered channel.
    InvalidChannel {
        /// Always [`INVALID_CHANNEL`].
        channel: String,
    },
    /// The frame could not be decoded into an envelope.
    DecodeError {
        /// Decoder error text.
        #[serde(rename = "channelMessage")]
        channel_message: String,
    },
}

impl ProtocolReply {
    /// Reply for an unknown channel.
    pub fn invalid_channel() -> Self {
        Self::InvalidChannel {
            channel: INVALID_CHANNEL.to_string(),
        }
    }

    /// Reply for a malformed frame.
    pub fn decode_error(message: impl Into<String>) -> Self {
        Self::DecodeError {
            channel_message: message.into(),
        }
    }
}
