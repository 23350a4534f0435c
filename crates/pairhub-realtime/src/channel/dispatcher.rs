//! Channel dispatcher: routes inbound envelopes to registered handlers.
//!
//! The table is filled through [`ChannelDispatcherBuilder`] during startup
//! and frozen by [`ChannelDispatcherBuilder::build`]. The resulting
//! [`ChannelDispatcher`] is read-only, so lookups on the hot path take no
//! locks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use pairhub_core::config::RealtimeConfig;
use pairhub_core::error::AppError;
use pairhub_core::result::AppResult;

use crate::connection::handle::ConnectionHandle;
use crate::message::serializer::deserialize_inbound;
use crate::message::types::ProtocolReply;
use crate::message::validator::{validate_channel_name, validate_inbound};
use crate::metrics::EngineMetrics;

use super::handler::{ChannelContext, ChannelHandler};

/// Collects channel handlers before the server starts serving traffic.
#[derive(Default)]
pub struct ChannelDispatcherBuilder {
    handlers: HashMap<String, Arc<dyn ChannelHandler>>,
}

impl fmt::Debug for ChannelDispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDispatcherBuilder")
            .field("channels", &self.channel_names())
            .finish()
    }
}

impl ChannelDispatcherBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `handler`.
    ///
    /// Fails if `name` is empty or already bound; an existing binding is
    /// never replaced.
    pub fn register_channel<H>(&mut self, name: impl Into<String>, handler: H) -> AppResult<()>
    where
        H: ChannelHandler + 'static,
    {
        let name = name.into();
        validate_channel_name(&name)?;

        if self.handlers.contains_key(&name) {
            return Err(AppError::conflict(format!(
                "channel {name} already registered"
            )));
        }

        debug!(channel = %name, "Channel registered");
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Returns the registered channel names, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Freezes the table.
    pub fn build(
        self,
        context: ChannelContext,
        metrics: Arc<EngineMetrics>,
        config: &RealtimeConfig,
    ) -> ChannelDispatcher {
        ChannelDispatcher {
            handlers: self.handlers,
            context,
            metrics,
            max_message_size: config.max_message_size,
        }
    }
}

/// What happened to one inbound frame.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A handler was started; the handle resolves when it finishes.
    Dispatched(JoinHandle<()>),
    /// The envelope named an unregistered channel.
    InvalidChannel,
    /// The frame could not be decoded.
    Malformed,
    /// The connection closed before a handler slot became free.
    Closed,
}

/// Immutable name → handler table.
pub struct ChannelDispatcher {
    handlers: HashMap<String, Arc<dyn ChannelHandler>>,
    context: ChannelContext,
    metrics: Arc<EngineMetrics>,
    max_message_size: usize,
}

impl fmt::Debug for ChannelDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDispatcher")
            .field("channels", &self.handlers.len())
            .finish()
    }
}

impl ChannelDispatcher {
    /// Decodes `raw` and routes it to its channel handler.
    ///
    /// Protocol errors are answered on `conn` and never close it. A bound
    /// handler runs as its own task once one of the connection's handler
    /// slots is free; this waits for the slot, not for the handler.
    pub async fn dispatch(&self, raw: &str, conn: &Arc<ConnectionHandle>) -> DispatchOutcome {
        if let Err(e) = validate_inbound(raw, self.max_message_size) {
            return self.reject_malformed(conn, &e.message);
        }

        let envelope = match deserialize_inbound(raw) {
            Ok(envelope) => envelope,
            Err(e) => return self.reject_malformed(conn, &e.to_string()),
        };

        let Some(handler) = self.handlers.get(&envelope.channel) else {
            self.metrics.invalid_channel();
            debug!(conn_id = %conn.id, channel = %envelope.channel, "Unknown channel");
            if let Err(e) = conn.send_json(&ProtocolReply::invalid_channel()) {
                warn!(conn_id = %conn.id, error = %e, "Failed to send invalid channel reply");
            }
            return DispatchOutcome::InvalidChannel;
        };

        if conn.available_dispatch_slots() == 0 {
            debug!(conn_id = %conn.id, channel = %envelope.channel, "Waiting for a free handler slot");
        }
        let Some(permit) = conn.acquire_dispatch_slot().await else {
            return DispatchOutcome::Closed;
        };

        self.metrics.message_dispatched();

        let handler = Arc::clone(handler);
        let context = self.context.clone();
        let metrics = Arc::clone(&self.metrics);
        let conn = Arc::clone(conn);
        let channel = envelope.channel;
        let payload = envelope.message;

        let task = tokio::spawn(async move {
            let _permit = permit;
            let conn_id = conn.id;
            if let Err(e) = handler.handle(&context, payload, conn).await {
                metrics.handler_failed();
                warn!(conn_id = %conn_id, channel = %channel, error = %e, "Channel handler failed");
            }
        });

        DispatchOutcome::Dispatched(task)
    }

    /// Returns the context handed to handlers.
    pub fn context(&self) -> &ChannelContext {
        &self.context
    }

    fn reject_malformed(&self, conn: &ConnectionHandle, reason: &str) -> DispatchOutcome {
        self.metrics.decode_error();
        debug!(conn_id = %conn.id, error = %reason, "Malformed envelope");
        if let Err(e) = conn.send_json(&ProtocolReply::decode_error(reason)) {
            warn!(conn_id = %conn.id, error = %e, "Failed to send decode error reply");
        }
        DispatchOutcome::Malformed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::sync::{Notify, mpsc};

    use super::*;
    use crate::channel::handler::handler_fn;
    use crate::connection::registry::ConnectionRegistry;
    use crate::pair::hub::PairHub;

    fn build(builder: ChannelDispatcherBuilder) -> ChannelDispatcher {
        build_with(builder, &RealtimeConfig::default())
    }

    fn build_with(builder: ChannelDispatcherBuilder, config: &RealtimeConfig) -> ChannelDispatcher {
        let metrics = Arc::new(EngineMetrics::new());
        let context = ChannelContext::new(
            Arc::new(PairHub::new(Arc::clone(&metrics))),
            Arc::new(ConnectionRegistry::new()),
        );
        builder.build(context, metrics, config)
    }

    fn conn() -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        ConnectionHandle::channel(16, 4)
    }

    fn echo_pong() -> impl ChannelHandler {
        handler_fn(|_ctx, _payload, conn: Arc<ConnectionHandle>| async move {
            conn.send_json(&json!({"pong": true}))
        })
    }

    async fn next_json(rx: &mut mpsc::Receiver<String>) -> Value {
        let text = rx.recv().await.expect("frame");
        serde_json::from_str(&text).expect("json")
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut builder = ChannelDispatcherBuilder::new();
        let err = builder.register_channel("", echo_pong()).unwrap_err();
        assert_eq!(err.kind, pairhub_core::error::ErrorKind::Validation);
        assert!(builder.channel_names().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_original() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut builder = ChannelDispatcherBuilder::new();
        builder.register_channel("ping", echo_pong()).expect("first");

        let counter = Arc::clone(&hits);
        let err = builder
            .register_channel(
                "ping",
                handler_fn(move |_ctx, _payload, _conn| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .unwrap_err();
        assert_eq!(err.kind, pairhub_core::error::ErrorKind::Conflict);

        let dispatcher = build(builder);
        let (conn, mut rx) = conn();
        match dispatcher
            .dispatch(r#"{"channel":"ping","message":null}"#, &conn)
            .await
        {
            DispatchOutcome::Dispatched(task) => task.await.expect("handler"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(next_json(&mut rx).await, json!({"pong": true}));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_channel_replies_invalid() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut builder = ChannelDispatcherBuilder::new();
        builder
            .register_channel(
                "ping",
                handler_fn(move |_ctx, _payload, _conn| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .expect("register");
        let dispatcher = build(builder);
        let (conn, mut rx) = conn();

        let outcome = dispatcher
            .dispatch(r#"{"channel":"nope","message":{}}"#, &conn)
            .await;

        assert!(matches!(outcome, DispatchOutcome::InvalidChannel));
        assert_eq!(next_json(&mut rx).await, json!({"channel": "INVALID_CHANNEL"}));
        assert!(rx.try_recv().is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_malformed_envelope_reports_decode_error() {
        let dispatcher = build(ChannelDispatcherBuilder::new());
        let (conn, mut rx) = conn();

        let outcome = dispatcher.dispatch("{\"channel\": 42}", &conn).await;

        assert!(matches!(outcome, DispatchOutcome::Malformed));
        let reply = next_json(&mut rx).await;
        assert!(reply["channelMessage"].is_string());
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_handler_receives_payload() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let mut builder = ChannelDispatcherBuilder::new();
        builder
            .register_channel(
                "echo",
                handler_fn(move |_ctx, payload, _conn| {
                    let seen_tx = seen_tx.clone();
                    async move {
                        let _ = seen_tx.send(payload);
                        Ok(())
                    }
                }),
            )
            .expect("register");
        let dispatcher = build(builder);
        let (conn, _rx) = conn();

        dispatcher
            .dispatch(r#"{"channel":"echo","message":{"a":1}}"#, &conn)
            .await;

        assert_eq!(seen_rx.recv().await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_closed_connection_is_not_dispatched() {
        let mut builder = ChannelDispatcherBuilder::new();
        builder.register_channel("ping", echo_pong()).expect("register");
        let dispatcher = build(builder);
        let (conn, _rx) = conn();
        conn.mark_closed();

        let outcome = dispatcher.dispatch(r#"{"channel":"ping"}"#, &conn).await;
        assert!(matches!(outcome, DispatchOutcome::Closed));
    }

    #[tokio::test]
    async fn test_dispatch_waits_for_free_handler_slot() {
        let release = Arc::new(Notify::new());
        let gate = Arc::clone(&release);
        let mut builder = ChannelDispatcherBuilder::new();
        builder
            .register_channel(
                "slow",
                handler_fn(move |_ctx, payload: Value, conn: Arc<ConnectionHandle>| {
                    let gate = Arc::clone(&gate);
                    async move {
                        if payload == json!("hold") {
                            gate.notified().await;
                        }
                        conn.send_json(&json!({"done": payload}))
                    }
                }),
            )
            .expect("register");
        let config = RealtimeConfig {
            max_inflight_per_connection: 1,
            ..RealtimeConfig::default()
        };
        let dispatcher = Arc::new(build_with(builder, &config));
        let (conn, mut rx) = ConnectionHandle::channel(16, config.max_inflight_per_connection);

        let first = match dispatcher
            .dispatch(r#"{"channel":"slow","message":"hold"}"#, &conn)
            .await
        {
            DispatchOutcome::Dispatched(task) => task,
            other => panic!("unexpected outcome: {other:?}"),
        };

        let second = {
            let dispatcher = Arc::clone(&dispatcher);
            let conn = Arc::clone(&conn);
            tokio::spawn(async move {
                dispatcher
                    .dispatch(r#"{"channel":"slow","message":"next"}"#, &conn)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!second.is_finished());
        assert!(rx.try_recv().is_err());

        release.notify_one();
        first.await.expect("first handler");
        assert_eq!(next_json(&mut rx).await, json!({"done": "hold"}));

        match second.await.expect("join") {
            DispatchOutcome::Dispatched(task) => task.await.expect("second handler"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(next_json(&mut rx).await, json!({"done": "next"}));
        assert_eq!(conn.available_dispatch_slots(), 1);
    }
}
