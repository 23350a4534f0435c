//! Pair subscribe/unsubscribe channels.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use pairhub_core::error::AppError;
use pairhub_core::result::AppResult;
use pairhub_realtime::{ChannelContext, ChannelHandler, ConnectionHandle, PairKey};

use super::pair_from_payload;

/// Subscribes the sender to a pair; the subscription ends on disconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeChannel;

/// Removes the sender from a pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsubscribeChannel;

fn reply_error(conn: &ConnectionHandle, err: AppError) -> AppResult<()> {
    debug!(conn_id = %conn.id, error = %err.message, "Rejected subscription payload");
    conn.send_json(&json!({ "error": err.message }))
}

#[async_trait]
impl ChannelHandler for SubscribeChannel {
    async fn handle(
        &self,
        ctx: &ChannelContext,
        payload: Value,
        conn: Arc<ConnectionHandle>,
    ) -> AppResult<()> {
        let pair = match pair_from_payload(payload) {
            Ok(pair) => pair,
            Err(e) => return reply_error(&conn, e),
        };

        ctx.subscribe_pair(&pair, &conn)?;
        conn.send_json(&json!({ "subscribed": PairKey::new(&pair) }))
    }
}

#[async_trait]
impl ChannelHandler for UnsubscribeChannel {
    async fn handle(
        &self,
        ctx: &ChannelContext,
        payload: Value,
        conn: Arc<ConnectionHandle>,
    ) -> AppResult<()> {
        let pair = match pair_from_payload(payload) {
            Ok(pair) => pair,
            Err(e) => return reply_error(&conn, e),
        };

        ctx.unsubscribe_pair(&pair, &conn);
        conn.send_json(&json!({ "unsubscribed": PairKey::new(&pair) }))
    }
}
