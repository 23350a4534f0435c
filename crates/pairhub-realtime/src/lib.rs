//! # pairhub-realtime
//!
//! Real-time WebSocket engine for PairHub. Provides:
//!
//! - Connection lifecycle with a single writer per connection
//! - Per-connection cleanup registry run exactly once on disconnect
//! - A static channel table routing `{channel, message}` envelopes to handlers
//! - Case-insensitive pair subscriptions with broadcast fan-out

pub mod channel;
pub mod connection;
pub mod message;
pub mod metrics;
pub mod pair;
pub mod server;

pub use channel::{ChannelContext, ChannelDispatcherBuilder, ChannelHandler, handler_fn};
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionRegistry};
pub use pair::{PairHub, PairKey};
pub use server::RealtimeEngine;
