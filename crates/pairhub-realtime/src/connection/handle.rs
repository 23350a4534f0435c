//! Individual WebSocket connection handle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use pairhub_core::error::AppError;
use pairhub_core::result::AppResult;

/// Unique connection identifier
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender side of the connection's outbound queue. The receiving
/// side is drained by exactly one writer task, so every write to the socket
/// is serialized no matter how many handlers or broadcasts target it.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Sender for outbound text frames
    sender: mpsc::Sender<String>,
    /// Limits concurrently running channel handlers for this connection
    inflight: Arc<Semaphore>,
    /// Cancelled once the connection is closed
    closed: CancellationToken,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(sender: mpsc::Sender<String>, max_inflight: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
            closed: CancellationToken::new(),
            connected_at: Utc::now(),
        }
    }

    /// Create a handle together with the receiving end of its outbound queue.
    pub fn channel(buffer: usize, max_inflight: usize) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Arc::new(Self::new(tx, max_inflight)), rx)
    }

    /// Queue a text frame for this connection.
    ///
    /// Never blocks: a full queue drops the frame and reports a delivery
    /// error.
    pub fn send_text(&self, text: String) -> AppResult<()> {
        if !self.is_alive() {
            return Err(AppError::delivery(format!("Connection {} is closed", self.id)));
        }
        match self.sender.try_send(text) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping message");
                Err(AppError::delivery(format!(
                    "Outbound queue full for connection {}",
                    self.id
                )))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(AppError::delivery(format!(
                    "Outbound queue closed for connection {}",
                    self.id
                )))
            }
        }
    }

    /// Serialize a value and queue it as a text frame.
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> AppResult<()> {
        let text = serde_json::to_string(value)?;
        self.send_text(text)
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Mark connection as closed.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn mark_closed(&self) -> bool {
        let was_alive = self.is_alive();
        self.closed.cancel();
        self.inflight.close();
        was_alive
    }

    /// Resolves once the connection has been closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Wait for a free handler slot.
    ///
    /// Returns `None` if the connection closed while waiting.
    pub async fn acquire_dispatch_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.inflight).acquire_owned().await.ok()
    }

    /// Number of handler slots currently free.
    pub fn available_dispatch_slots(&self) -> usize {
        self.inflight.available_permits()
    }

    /// Time elapsed since the connection was accepted.
    pub fn connected_for(&self) -> Duration {
        Utc::now().signed_duration_since(self.connected_at)
    }
}
