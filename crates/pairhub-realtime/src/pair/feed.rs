//! Single pair feed with subscriber tracking.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::connection::handle::{ConnectionHandle, ConnectionId};

use super::key::PairKey;

/// The set of connections subscribed to one pair.
#[derive(Debug)]
pub struct PairFeed {
    /// Normalized pair name.
    pub key: PairKey,
    /// Subscribed connections, keyed by connection ID.
    subscribers: HashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl PairFeed {
    /// Creates a new empty feed.
    pub fn new(key: PairKey) -> Self {
        Self {
            key,
            subscribers: HashMap::new(),
        }
    }

    /// Adds a subscriber. Returns `false` if it was already present.
    pub fn subscribe(&mut self, handle: Arc<ConnectionHandle>) -> bool {
        match self.subscribers.entry(handle.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    /// Removes a subscriber. Returns `false` if it was not present.
    pub fn unsubscribe(&mut self, conn_id: ConnectionId) -> bool {
        self.subscribers.remove(&conn_id).is_some()
    }

    /// Returns whether the connection is subscribed.
    pub fn contains(&self, conn_id: &ConnectionId) -> bool {
        self.subscribers.contains_key(conn_id)
    }

    /// Returns subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns whether the feed has any subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Returns all subscriber handles.
    pub fn subscribers(&self) -> Vec<Arc<ConnectionHandle>> {
        self.subscribers.values().cloned().collect()
    }
}
