//! Channel dispatch: the handler trait and the name → handler table.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{ChannelDispatcher, ChannelDispatcherBuilder, DispatchOutcome};
pub use handler::{ChannelContext, ChannelHandler, FnHandler, handler_fn};
