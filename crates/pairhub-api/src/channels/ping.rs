//! Liveness check channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use pairhub_core::result::AppResult;
use pairhub_realtime::{ChannelContext, ChannelHandler, ConnectionHandle};

/// Answers every message with `{"pong": true}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingChannel;

#[async_trait]
impl ChannelHandler for PingChannel {
    async fn handle(
        &self,
        _ctx: &ChannelContext,
        _payload: Value,
        conn: Arc<ConnectionHandle>,
    ) -> AppResult<()> {
        conn.send_json(&json!({ "pong": true }))
    }
}
