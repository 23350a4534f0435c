//! Pair subscription hub: per-pair subscriber sets and broadcast delivery.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error, warn};

use pairhub_core::error::AppError;
use pairhub_core::result::AppResult;

use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::metrics::EngineMetrics;

use super::feed::PairFeed;
use super::key::PairKey;
use super::subscription::PairSubscription;

/// Registry of pair feeds and their subscribers.
///
/// Each pair lives in its own map entry, so subscribing to or broadcasting on
/// one pair never waits on unrelated pairs beyond a shard lock. Subscriber
/// lists are copied out before sending; no lock is held while queuing frames.
#[derive(Debug)]
pub struct PairHub {
    /// Pair key → feed.
    feeds: DashMap<PairKey, PairFeed>,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
}

impl PairHub {
    /// Creates an empty hub.
    pub fn new(metrics: Arc<EngineMetrics>) -> Self {
        Self {
            feeds: DashMap::new(),
            metrics,
        }
    }

    /// Subscribes a connection to a pair.
    ///
    /// Returns `true` if the membership is new. Fails if the connection has
    /// already been closed.
    pub fn subscribe(&self, pair: &str, handle: &Arc<ConnectionHandle>) -> AppResult<bool> {
        if !handle.is_alive() {
            return Err(AppError::validation(format!(
                "Connection {} is closed and cannot subscribe",
                handle.id
            )));
        }

        let key = PairKey::new(pair);
        let added = self
            .feeds
            .entry(key.clone())
            .or_insert_with(|| PairFeed::new(key.clone()))
            .subscribe(Arc::clone(handle));

        if added {
            self.metrics.subscribed();
            debug!(conn_id = %handle.id, pair = %key, "Subscribed to pair");
        }
        Ok(added)
    }

    /// Unsubscribes a connection from a pair.
    ///
    /// Returns `true` if the connection was a member; otherwise does nothing.
    pub fn unsubscribe(&self, pair: &str, conn_id: ConnectionId) -> bool {
        let key = PairKey::new(pair);
        let removed = self.remove_subscriber(&key, conn_id);
        if removed {
            debug!(conn_id = %conn_id, pair = %key, "Unsubscribed from pair");
        }
        removed
    }

    /// Builds the cleanup action that unsubscribes a closing connection from `pair`.
    pub fn unsubscribe_handler(self: &Arc<Self>, pair: &str) -> PairSubscription {
        PairSubscription::new(Arc::clone(self), PairKey::new(pair))
    }

    /// Sends `message` to every current subscriber of `pair`.
    ///
    /// Returns the number of subscribers the message was queued for. Failures
    /// for individual subscribers are logged, and closed subscribers are
    /// dropped from the feed.
    pub fn broadcast<T: Serialize + ?Sized>(&self, pair: &str, message: &T) -> usize {
        let key = PairKey::new(pair);

        let subscribers = match self.feeds.get(&key) {
            Some(feed) => feed.subscribers(),
            None => Vec::new(),
        };
        if subscribers.is_empty() {
            self.metrics.broadcast(0, 0);
            return 0;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error!(pair = %key, error = %e, "Failed to serialize broadcast message");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut stale = Vec::new();
        for handle in &subscribers {
            match handle.send_text(text.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(conn_id = %handle.id, pair = %key, error = %e, "Failed to broadcast");
                    if !handle.is_alive() {
                        stale.push(handle.id);
                    }
                }
            }
        }

        for conn_id in stale {
            self.remove_subscriber(&key, conn_id);
        }

        self.metrics
            .broadcast(delivered, subscribers.len() - delivered);
        delivered
    }

    /// Returns whether the connection is subscribed to `pair`.
    pub fn is_subscribed(&self, pair: &str, conn_id: &ConnectionId) -> bool {
        self.feeds
            .get(&PairKey::new(pair))
            .map(|feed| feed.contains(conn_id))
            .unwrap_or(false)
    }

    /// Returns the subscriber count for `pair`.
    pub fn subscriber_count(&self, pair: &str) -> usize {
        self.feeds
            .get(&PairKey::new(pair))
            .map(|feed| feed.subscriber_count())
            .unwrap_or(0)
    }

    /// Returns the number of pairs with at least one subscriber.
    pub fn pair_count(&self) -> usize {
        self.feeds.len()
    }

    fn remove_subscriber(&self, key: &PairKey, conn_id: ConnectionId) -> bool {
        let removed = match self.feeds.get_mut(key) {
            Some(mut feed) => feed.unsubscribe(conn_id),
            None => false,
        };
        if removed {
            self.feeds.remove_if(key, |_, feed| feed.is_empty());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn hub() -> Arc<PairHub> {
        Arc::new(PairHub::new(Arc::new(EngineMetrics::new())))
    }

    fn conn() -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        ConnectionHandle::channel(16, 4)
    }

    #[tokio::test]
    async fn test_subscribe_is_case_insensitive() {
        let hub = hub();
        let (a, mut rx) = conn();

        hub.subscribe("BTCUSD", &a).expect("subscribe");

        assert_eq!(hub.broadcast("btcusd", &serde_json::json!({"price": 100})), 1);
        assert_eq!(rx.recv().await.as_deref(), Some(r#"{"price":100}"#));
        assert!(hub.is_subscribed("BtcUsd", &a.id));
    }

    #[tokio::test]
    async fn test_double_subscribe_delivers_once() {
        let hub = hub();
        let (a, mut rx) = conn();

        assert!(hub.subscribe("ethusd", &a).expect("first"));
        assert!(!hub.subscribe("ETHUSD", &a).expect("second"));
        assert_eq!(hub.subscriber_count("ethusd"), 1);

        assert_eq!(hub.broadcast("ethusd", "tick"), 1);
        assert_eq!(rx.recv().await.as_deref(), Some(r#""tick""#));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_non_member_is_noop() {
        let hub = hub();
        let (a, _rx) = conn();
        let (b, _rx_b) = conn();

        assert!(!hub.unsubscribe("btcusd", a.id));

        hub.subscribe("btcusd", &b).expect("subscribe");
        assert!(!hub.unsubscribe("BTCUSD", a.id));
        assert_eq!(hub.subscriber_count("btcusd"), 1);
    }

    #[tokio::test]
    async fn test_last_unsubscribe_drops_feed() {
        let hub = hub();
        let (a, _rx) = conn();

        hub.subscribe("solusd", &a).expect("subscribe");
        assert_eq!(hub.pair_count(), 1);
        assert!(hub.unsubscribe("SOLUSD", a.id));
        assert_eq!(hub.pair_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_unknown_pair_reaches_nobody() {
        let hub = hub();
        assert_eq!(hub.broadcast("nothing", &serde_json::json!({"price": 1})), 0);
    }

    #[tokio::test]
    async fn test_closed_connection_cannot_subscribe() {
        let hub = hub();
        let (a, _rx) = conn();
        a.mark_closed();

        let err = hub.subscribe("btcusd", &a).unwrap_err();
        assert_eq!(err.kind, pairhub_core::error::ErrorKind::Validation);
        assert_eq!(hub.pair_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_block_others() {
        let hub = hub();
        let (a, rx_a) = conn();
        let (b, mut rx_b) = conn();

        hub.subscribe("btcusd", &a).expect("a");
        hub.subscribe("btcusd", &b).expect("b");
        drop(rx_a);

        assert_eq!(hub.broadcast("btcusd", &serde_json::json!({"price": 7})), 1);
        assert_eq!(rx_b.recv().await.as_deref(), Some(r#"{"price":7}"#));

        // The dead subscriber was pruned.
        assert!(!hub.is_subscribed("btcusd", &a.id));
        assert_eq!(hub.subscriber_count("btcusd"), 1);
    }
}
