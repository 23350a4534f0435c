//! Per-connection read loop, independent of the WebSocket library in use.
//!
//! The transport maps its frames into [`InboundFrame`] and its socket sink
//! into a `Sink<String>`; [`serve_connection`] then owns the whole lifecycle:
//! registration, the single writer, the read loop, and cleanup.

use std::fmt;
use std::sync::Arc;

use futures::{Sink, Stream, StreamExt};
use tracing::{info, warn};

use crate::message::types::ProtocolReply;

use super::handle::ConnectionHandle;
use super::manager::ConnectionManager;
use super::writer::{WriterExit, spawn_writer};

/// A frame read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Transport-level ping.
    Ping,
    /// Transport-level pong.
    Pong,
    /// Close frame from the peer.
    Close,
}

/// Why a read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer sent a close frame.
    ClientClosed,
    /// Reading from the transport failed.
    ReadError,
    /// The inbound stream ended.
    EndOfStream,
    /// The connection was closed from the server side.
    ServerClosed,
    /// Writing to the peer failed.
    WriteError,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientClosed => write!(f, "client_closed"),
            Self::ReadError => write!(f, "read_error"),
            Self::EndOfStream => write!(f, "end_of_stream"),
            Self::ServerClosed => write!(f, "server_closed"),
            Self::WriteError => write!(f, "write_error"),
        }
    }
}

/// Reads frames until the connection ends, dispatching each text frame.
///
/// Any read error ends the loop. Binary frames are answered with a decode
/// error; ping and pong frames are left to the transport.
pub async fn run_read_loop<St, E>(
    manager: &ConnectionManager,
    handle: &Arc<ConnectionHandle>,
    mut inbound: St,
) -> CloseReason
where
    St: Stream<Item = Result<InboundFrame, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        let frame = tokio::select! {
            frame = inbound.next() => frame,
            _ = handle.closed() => return CloseReason::ServerClosed,
        };

        match frame {
            Some(Ok(InboundFrame::Text(text))) => {
                manager.handle_inbound(handle, &text).await;
            }
            Some(Ok(InboundFrame::Binary(_))) => {
                let reply = ProtocolReply::decode_error("binary frames are not supported");
                if let Err(e) = handle.send_json(&reply) {
                    warn!(conn_id = %handle.id, error = %e, "Failed to send decode error reply");
                }
            }
            Some(Ok(InboundFrame::Ping | InboundFrame::Pong)) => {}
            Some(Ok(InboundFrame::Close)) => return CloseReason::ClientClosed,
            Some(Err(e)) => {
                warn!(conn_id = %handle.id, error = %e, "WebSocket read error");
                return CloseReason::ReadError;
            }
            None => return CloseReason::EndOfStream,
        }
    }
}

/// Serves one accepted connection from registration to cleanup.
pub async fn serve_connection<St, Si, E>(
    manager: Arc<ConnectionManager>,
    inbound: St,
    outbound: Si,
) -> CloseReason
where
    St: Stream<Item = Result<InboundFrame, E>> + Unpin,
    E: fmt::Display,
    Si: Sink<String> + Unpin + Send + 'static,
    Si::Error: fmt::Display,
{
    let (handle, outbound_rx) = manager.open();
    let writer = spawn_writer(Arc::clone(&handle), outbound_rx, outbound);

    let mut reason = run_read_loop(&manager, &handle, inbound).await;
    let cleanups = manager.close(&handle).await;

    match writer.await {
        Ok(WriterExit::WriteFailed) if reason == CloseReason::ServerClosed => {
            reason = CloseReason::WriteError;
        }
        Ok(_) => {}
        Err(e) => warn!(conn_id = %handle.id, error = %e, "Writer task failed"),
    }

    info!(
        conn_id = %handle.id,
        reason = %reason,
        cleanups,
        duration_ms = handle.connected_for().num_milliseconds(),
        "WebSocket connection closed"
    );
    reason
}
