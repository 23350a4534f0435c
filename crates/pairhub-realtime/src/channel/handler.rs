//! Channel handler trait and the context handlers run with.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use pairhub_core::result::AppResult;

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::pair::hub::PairHub;
use crate::pair::key::PairKey;
use crate::pair::subscription::PairSubscription;

/// Shared components available to every channel handler.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    /// Pair subscription hub.
    pub pairs: Arc<PairHub>,
    /// Per-connection cleanup registry.
    pub registry: Arc<ConnectionRegistry>,
}

impl ChannelContext {
    /// Creates a context over the given hub and registry.
    pub fn new(pairs: Arc<PairHub>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { pairs, registry }
    }

    /// Subscribes `conn` to `pair` and arranges for it to be unsubscribed on close.
    ///
    /// Returns `true` if the subscription is new.
    pub fn subscribe_pair(&self, pair: &str, conn: &Arc<ConnectionHandle>) -> AppResult<bool> {
        let added = self.pairs.subscribe(pair, conn)?;
        if added {
            self.registry
                .add_unsubscribe_callback(conn, self.pairs.unsubscribe_handler(pair));
        }
        Ok(added)
    }

    /// Removes `conn` from `pair` and drops the matching cleanup action.
    ///
    /// Returns `true` if it was subscribed.
    pub fn unsubscribe_pair(&self, pair: &str, conn: &ConnectionHandle) -> bool {
        // Registry before hub: a concurrent subscribe can then only leave a
        // harmless extra action, never a membership without one.
        let key = PairSubscription::dedupe_key_for(&PairKey::new(pair));
        self.registry.remove_unsubscribe_callback(conn, &key);
        self.pairs.unsubscribe(pair, conn.id)
    }
}

/// Handles every inbound message addressed to one channel.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Process one message payload from `conn`.
    async fn handle(
        &self,
        ctx: &ChannelContext,
        payload: Value,
        conn: Arc<ConnectionHandle>,
    ) -> AppResult<()>;
}

/// Adapts an async closure into a [`ChannelHandler`].
pub struct FnHandler<F>(F);

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish()
    }
}

/// Wraps a closure `(ctx, payload, conn) -> Future<Output = AppResult<()>>`.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ChannelContext, Value, Arc<ConnectionHandle>) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> ChannelHandler for FnHandler<F>
where
    F: Fn(ChannelContext, Value, Arc<ConnectionHandle>) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: &ChannelContext,
        payload: Value,
        conn: Arc<ConnectionHandle>,
    ) -> AppResult<()> {
        (self.0)(ctx.clone(), payload, conn).await
    }
}
