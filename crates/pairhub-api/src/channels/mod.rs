//! Built-in channels served on every WebSocket connection.
//!
//! - `ping`: replies `{"pong": true}`
//! - `subscribe`: joins a pair feed until unsubscribe or disconnect
//! - `unsubscribe`: leaves a pair feed

pub mod ping;
pub mod subscription;

use serde::Deserialize;
use serde_json::Value;

use pairhub_core::error::AppError;
use pairhub_core::result::AppResult;
use pairhub_realtime::ChannelDispatcherBuilder;
use pairhub_realtime::message::validator::validate_pair;

pub use ping::PingChannel;
pub use subscription::{SubscribeChannel, UnsubscribeChannel};

/// Builds the channel table with every built-in channel registered.
pub fn default_channels() -> AppResult<ChannelDispatcherBuilder> {
    let mut channels = ChannelDispatcherBuilder::new();
    channels.register_channel("ping", PingChannel)?;
    channels.register_channel("subscribe", SubscribeChannel)?;
    channels.register_channel("unsubscribe", UnsubscribeChannel)?;
    Ok(channels)
}

/// Payload accepted by `subscribe` and `unsubscribe`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PairPayload {
    Bare(String),
    Object { pair: String },
}

/// Extracts and validates the pair named by a subscription payload.
pub(crate) fn pair_from_payload(payload: Value) -> AppResult<String> {
    let pair = match serde_json::from_value::<PairPayload>(payload) {
        Ok(PairPayload::Bare(pair)) | Ok(PairPayload::Object { pair }) => pair,
        Err(_) => {
            return Err(AppError::validation(
                "expected a pair name or {\"pair\": \"...\"}",
            ));
        }
    };
    validate_pair(&pair)?;
    Ok(pair)
}
