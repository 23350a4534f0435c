//! WebSocket connection management: handles, pool, cleanup registry, writer, and read loop.

pub mod handle;
pub mod manager;
pub mod pool;
pub mod registry;
pub mod session;
pub mod writer;

pub use handle::{ConnectionHandle, ConnectionId};
pub use manager::ConnectionManager;
pub use registry::{CleanupAction, ConnectionRegistry};
pub use session::{CloseReason, InboundFrame, serve_connection};
