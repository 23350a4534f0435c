//! Single writer task per connection.

use std::fmt;
use std::sync::Arc;

use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::handle::ConnectionHandle;

/// How a writer task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// The connection closed and every queued frame was written.
    Drained,
    /// Writing to the sink failed.
    WriteFailed,
}

/// Spawns the only task allowed to write to `sink`.
///
/// Drains the connection's outbound queue in order until the connection
/// closes or a write fails; a failed write closes the connection. Frames
/// queued before the close are still written.
pub fn spawn_writer<Si>(
    handle: Arc<ConnectionHandle>,
    mut outbound_rx: mpsc::Receiver<String>,
    mut sink: Si,
) -> JoinHandle<WriterExit>
where
    Si: Sink<String> + Unpin + Send + 'static,
    Si::Error: fmt::Display,
{
    tokio::spawn(async move {
        let mut exit = WriterExit::Drained;

        loop {
            let text = tokio::select! {
                biased;
                msg = outbound_rx.recv() => match msg {
                    Some(text) => text,
                    None => break,
                },
                _ = handle.closed() => {
                    outbound_rx.close();
                    break;
                }
            };

            if let Err(e) = sink.send(text).await {
                debug!(conn_id = %handle.id, error = %e, "Write failed, closing connection");
                handle.mark_closed();
                exit = WriterExit::WriteFailed;
                break;
            }
        }

        if exit == WriterExit::Drained {
            while let Ok(text) = outbound_rx.try_recv() {
                if let Err(e) = sink.send(text).await {
                    debug!(conn_id = %handle.id, error = %e, "Write failed while draining");
                    exit = WriterExit::WriteFailed;
                    break;
                }
            }
        }

        let _ = sink.close().await;
        debug!(conn_id = %handle.id, exit = ?exit, "Writer loop ended");
        exit
    })
}
