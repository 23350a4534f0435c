//! Connection manager: handles connection lifecycle (open, inbound routing, close).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use pairhub_core::config::RealtimeConfig;

use crate::channel::dispatcher::{ChannelDispatcher, DispatchOutcome};
use crate::metrics::EngineMetrics;

use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;
use super::registry::ConnectionRegistry;

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: ConnectionPool,
    /// Cleanup registry.
    registry: Arc<ConnectionRegistry>,
    /// Channel dispatcher.
    dispatcher: ChannelDispatcher,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        registry: Arc<ConnectionRegistry>,
        dispatcher: ChannelDispatcher,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            registry,
            dispatcher,
            metrics,
            config,
        }
    }

    /// Registers a newly accepted connection, before any message is read.
    ///
    /// Returns the connection handle and the receiver its writer drains.
    pub fn open(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::channel(
            self.config.outbound_buffer_size,
            self.config.max_inflight_per_connection,
        );

        self.pool.add(Arc::clone(&handle));
        self.registry.register(&handle);
        self.metrics.connection_opened();

        info!(conn_id = %handle.id, "WebSocket connection registered");

        (handle, rx)
    }

    /// Processes one inbound text frame from a client.
    pub async fn handle_inbound(
        &self,
        handle: &Arc<ConnectionHandle>,
        raw_message: &str,
    ) -> DispatchOutcome {
        self.metrics.message_received();
        self.dispatcher.dispatch(raw_message, handle).await
    }

    /// Closes a connection and runs its cleanup actions.
    ///
    /// Returns the number of cleanup actions run; repeated calls return 0.
    pub async fn close(&self, handle: &ConnectionHandle) -> usize {
        let removed = self.pool.remove(&handle.id).is_some();
        let cleaned = self.registry.close_and_cleanup(handle).await;

        if removed {
            self.metrics.connection_closed(cleaned);
            info!(
                conn_id = %handle.id,
                cleanups = cleaned,
                "WebSocket connection unregistered"
            );
        }
        cleaned
    }

    /// Closes all connections.
    pub async fn close_all(&self) -> usize {
        let all = self.pool.all_connections();
        futures::future::join_all(all.iter().map(|conn| self.close(conn))).await;
        info!(count = all.len(), "All connections closed");
        all.len()
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the channel dispatcher.
    pub fn dispatcher(&self) -> &ChannelDispatcher {
        &self.dispatcher
    }
}
