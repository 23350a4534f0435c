//! Connection registry: per-connection cleanup actions run on disconnect.
//!
//! The registry knows nothing about channels or pairs. Other components hand
//! it [`CleanupAction`] values; when the transport reports a connection
//! closed, [`ConnectionRegistry::close_and_cleanup`] runs every action that
//! was registered for it, exactly once.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::handle::{ConnectionHandle, ConnectionId};

/// Work to perform when a connection closes.
pub trait CleanupAction: Send + Sync + fmt::Debug {
    /// Run the action for the closing connection.
    fn run(&self, conn_id: ConnectionId);

    /// Actions sharing a key are registered at most once per connection.
    fn dedupe_key(&self) -> Option<String> {
        None
    }
}

/// Thread-safe map of live connections to their cleanup actions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Connection ID → actions in registration order.
    cleanups: DashMap<ConnectionId, Vec<Arc<dyn CleanupAction>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            cleanups: DashMap::new(),
        }
    }

    /// Ensures the connection has a (possibly empty) cleanup list.
    ///
    /// Safe to call any number of times for the same connection.
    pub fn register(&self, handle: &ConnectionHandle) {
        if !handle.is_alive() {
            return;
        }
        self.cleanups.entry(handle.id).or_default();
    }

    /// Appends a cleanup action for the connection, registering it on first use.
    ///
    /// If the connection is already closed the action runs immediately.
    /// Returns `true` if the action was stored.
    pub fn add_unsubscribe_callback<A>(&self, handle: &ConnectionHandle, action: A) -> bool
    where
        A: CleanupAction + 'static,
    {
        let action: Arc<dyn CleanupAction> = Arc::new(action);
        let key = action.dedupe_key();

        {
            // Closing marks the handle before taking this entry's lock, so the
            // liveness check under the lock cannot race with the final drain.
            let mut entry = self.cleanups.entry(handle.id).or_default();
            if handle.is_alive() {
                if let Some(key) = key.as_deref() {
                    if entry
                        .iter()
                        .any(|existing| existing.dedupe_key().as_deref() == Some(key))
                    {
                        return false;
                    }
                }
                entry.push(action);
                return true;
            }
        }

        self.cleanups
            .remove_if(&handle.id, |_, actions| actions.is_empty());
        debug!(conn_id = %handle.id, "Connection already closed, running cleanup now");
        run_isolated(handle.id, action.as_ref());
        false
    }

    /// Drops the stored actions whose dedupe key is `dedupe_key` without
    /// running them.
    ///
    /// Returns the number of actions removed.
    pub fn remove_unsubscribe_callback(&self, handle: &ConnectionHandle, dedupe_key: &str) -> usize {
        let Some(mut actions) = self.cleanups.get_mut(&handle.id) else {
            return 0;
        };
        let before = actions.len();
        actions.retain(|action| action.dedupe_key().as_deref() != Some(dedupe_key));
        before - actions.len()
    }

    /// Runs and discards every cleanup action registered for the connection.
    ///
    /// Each action runs as its own task; a failing action is logged and does
    /// not affect the others. Returns once all actions have finished. Only the
    /// first call for a given connection does any work.
    pub async fn close_and_cleanup(&self, handle: &ConnectionHandle) -> usize {
        handle.mark_closed();

        let Some((conn_id, actions)) = self.cleanups.remove(&handle.id) else {
            return 0;
        };

        let count = actions.len();
        let tasks: Vec<_> = actions
            .into_iter()
            .map(|action| tokio::spawn(async move { action.run(conn_id) }))
            .collect();

        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!(conn_id = %conn_id, error = %e, "Cleanup action failed");
            }
        }

        debug!(conn_id = %conn_id, actions = count, "Connection cleanup complete");
        count
    }

    /// Returns whether the connection currently has an entry.
    pub fn is_registered(&self, conn_id: &ConnectionId) -> bool {
        self.cleanups.contains_key(conn_id)
    }

    /// Returns the number of pending cleanup actions for a connection.
    pub fn callback_count(&self, conn_id: &ConnectionId) -> usize {
        self.cleanups
            .get(conn_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Returns the number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.cleanups.len()
    }
}

fn run_isolated(conn_id: ConnectionId, action: &dyn CleanupAction) {
    if catch_unwind(AssertUnwindSafe(|| action.run(conn_id))).is_err() {
        warn!(conn_id = %conn_id, action = ?action, "Cleanup action panicked");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Record {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CleanupAction for Record {
        fn run(&self, _conn_id: ConnectionId) {
            self.log.lock().unwrap().push(self.label);
        }

        fn dedupe_key(&self) -> Option<String> {
            Some(self.label.to_string())
        }
    }

    #[derive(Debug)]
    struct Count(Arc<AtomicUsize>);

    impl CleanupAction for Count {
        fn run(&self, _conn_id: ConnectionId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct Explode;

    impl CleanupAction for Explode {
        fn run(&self, _conn_id: ConnectionId) {
            panic!("cleanup exploded");
        }
    }

    #[tokio::test]
    async fn test_remove_drops_action_without_running_it() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["btcusd", "ethusd"] {
            registry.add_unsubscribe_callback(
                &handle,
                Record {
                    label,
                    log: Arc::clone(&log),
                },
            );
        }

        assert_eq!(registry.remove_unsubscribe_callback(&handle, "btcusd"), 1);
        assert_eq!(registry.remove_unsubscribe_callback(&handle, "btcusd"), 0);
        assert_eq!(registry.callback_count(&handle.id), 1);

        assert_eq!(registry.close_and_cleanup(&handle).await, 1);
        assert_eq!(*log.lock().unwrap(), vec!["ethusd"]);
        assert_eq!(registry.remove_unsubscribe_callback(&handle, "ethusd"), 0);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);

        registry.register(&handle);
        registry.register(&handle);

        assert!(registry.is_registered(&handle.id));
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.callback_count(&handle.id), 0);
    }

    #[tokio::test]
    async fn test_add_registers_automatically() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        let hits = Arc::new(AtomicUsize::new(0));

        assert!(registry.add_unsubscribe_callback(&handle, Count(hits.clone())));
        assert_eq!(registry.callback_count(&handle.id), 1);
    }

    #[tokio::test]
    async fn test_close_runs_each_action_once() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        let hits = Arc::new(AtomicUsize::new(0));

        registry.register(&handle);
        registry.add_unsubscribe_callback(&handle, Count(hits.clone()));
        registry.add_unsubscribe_callback(&handle, Count(hits.clone()));

        assert_eq!(registry.close_and_cleanup(&handle).await, 2);
        assert_eq!(registry.close_and_cleanup(&handle).await, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(!registry.is_registered(&handle.id));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_duplicate_keys_stored_once() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        let log = Arc::new(Mutex::new(Vec::new()));

        assert!(registry.add_unsubscribe_callback(&handle, Record { label: "btcusd", log: log.clone() }));
        assert!(!registry.add_unsubscribe_callback(&handle, Record { label: "btcusd", log: log.clone() }));
        assert!(registry.add_unsubscribe_callback(&handle, Record { label: "ethusd", log: log.clone() }));

        registry.close_and_cleanup(&handle).await;

        let mut ran = log.lock().unwrap().clone();
        ran.sort();
        assert_eq!(ran, vec!["btcusd", "ethusd"]);
    }

    #[tokio::test]
    async fn test_failing_action_does_not_stop_others() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        let hits = Arc::new(AtomicUsize::new(0));

        registry.add_unsubscribe_callback(&handle, Count(hits.clone()));
        registry.add_unsubscribe_callback(&handle, Explode);
        registry.add_unsubscribe_callback(&handle, Count(hits.clone()));

        assert_eq!(registry.close_and_cleanup(&handle).await, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_add_after_close_runs_immediately() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        let hits = Arc::new(AtomicUsize::new(0));

        registry.close_and_cleanup(&handle).await;
        assert!(!registry.add_unsubscribe_callback(&handle, Count(hits.clone())));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!registry.is_registered(&handle.id));
    }

    #[tokio::test]
    async fn test_close_unknown_connection_is_noop() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel(4, 1);
        assert_eq!(registry.close_and_cleanup(&handle).await, 0);
    }
}
