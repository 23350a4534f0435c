//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use pairhub_core::config::RealtimeConfig;
use pairhub_core::error::AppError;

use crate::channel::dispatcher::{ChannelDispatcherBuilder, DispatchOutcome};
use crate::channel::handler::ChannelContext;
use crate::connection::handle::ConnectionHandle;
use crate::connection::manager::ConnectionManager;
use crate::connection::registry::ConnectionRegistry;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::pair::hub::PairHub;

/// Central real-time engine that coordinates all WebSocket subsystems.
///
/// Constructed once at startup and shared by `Arc`; it owns every map the
/// hub uses, so nothing lives in process-wide globals.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Pair subscription hub.
    pub pairs: Arc<PairHub>,
    /// Per-connection cleanup registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine serving the channels in `channels`.
    pub fn new(config: RealtimeConfig, channels: ChannelDispatcherBuilder) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let pairs = Arc::new(PairHub::new(metrics.clone()));
        let registry = Arc::new(ConnectionRegistry::new());

        let channel_names = channels.channel_names();
        let context = ChannelContext::new(pairs.clone(), registry.clone());
        let dispatcher = channels.build(context, metrics.clone(), &config);
        let connections = Arc::new(ConnectionManager::new(
            config,
            registry.clone(),
            dispatcher,
            metrics.clone(),
        ));

        info!(channels = ?channel_names, "Real-time engine initialized");

        Self {
            connections,
            pairs,
            registry,
            metrics,
        }
    }

    /// Registers a newly accepted connection.
    ///
    /// Returns the handle and the receiver its writer drains.
    pub fn open_connection(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        self.connections.open()
    }

    /// Routes one inbound text frame from `handle`.
    pub async fn handle_inbound(
        &self,
        handle: &Arc<ConnectionHandle>,
        raw_message: &str,
    ) -> DispatchOutcome {
        self.connections.handle_inbound(handle, raw_message).await
    }

    /// Closes a connection and runs its cleanup once.
    pub async fn close_connection(&self, handle: &ConnectionHandle) -> usize {
        self.connections.close(handle).await
    }

    /// Returns the context channel handlers run with.
    pub fn channel_context(&self) -> &ChannelContext {
        self.connections.dispatcher().context()
    }

    /// Returns a snapshot of the engine counters.
    pub fn stats(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Closes every connection and runs its cleanup.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!("Shutting down real-time engine");

        let closed = self.connections.close_all().await;

        info!(connections = closed, "Real-time engine shut down");
        Ok(())
    }
}
