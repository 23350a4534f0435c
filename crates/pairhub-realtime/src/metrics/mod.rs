//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Connections currently open
    pub connections_active: AtomicU64,
    /// Inbound text frames received
    pub messages_received: AtomicU64,
    /// Envelopes routed to a handler
    pub messages_dispatched: AtomicU64,
    /// Envelopes naming an unregistered channel
    pub invalid_channels: AtomicU64,
    /// Envelopes that failed to decode
    pub decode_errors: AtomicU64,
    /// Handlers that returned an error
    pub handler_failures: AtomicU64,
    /// New pair subscriptions
    pub subscriptions_total: AtomicU64,
    /// Broadcast calls
    pub broadcasts_total: AtomicU64,
    /// Broadcast frames queued to subscribers
    pub broadcast_deliveries: AtomicU64,
    /// Broadcast frames that could not be queued
    pub delivery_failures: AtomicU64,
    /// Cleanup actions run on disconnect
    pub cleanups_run: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection
    pub fn connection_closed(&self, cleanups: usize) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
        self.cleanups_run
            .fetch_add(cleanups as u64, Ordering::Relaxed);
    }

    /// Record an inbound frame
    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an envelope handed to a handler
    pub fn message_dispatched(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unknown channel
    pub fn invalid_channel(&self) {
        self.invalid_channels.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed envelope
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler error
    pub fn handler_failed(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a subscribe operation
    pub fn subscribed(&self) {
        self.subscriptions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the result of one broadcast
    pub fn broadcast(&self, delivered: usize, failed: usize) {
        self.broadcasts_total.fetch_add(1, Ordering::Relaxed);
        self.broadcast_deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            invalid_channels: self.invalid_channels.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            subscriptions_total: self.subscriptions_total.load(Ordering::Relaxed),
            broadcasts_total: self.broadcasts_total.load(Ordering::Relaxed),
            broadcast_deliveries: self.broadcast_deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            cleanups_run: self.cleanups_run.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever established
    pub connections_total: u64,
    /// Currently open connections
    pub connections_active: u64,
    /// Inbound text frames received
    pub messages_received: u64,
    /// Envelopes routed to a handler
    pub messages_dispatched: u64,
    /// Envelopes naming an unregistered channel
    pub invalid_channels: u64,
    /// Envelopes that failed to decode
    pub decode_errors: u64,
    /// Handlers that returned an error
    pub handler_failures: u64,
    /// New pair subscriptions
    pub subscriptions_total: u64,
    /// Broadcast calls
    pub broadcasts_total: u64,
    /// Broadcast frames queued to subscribers
    pub broadcast_deliveries: u64,
    /// Broadcast frames that could not be queued
    pub delivery_failures: u64,
    /// Cleanup actions run on disconnect
    pub cleanups_run: u64,
}
