//! Subscription handles stored in a connection's cleanup list.

use std::fmt;
use std::sync::Arc;

use crate::connection::handle::ConnectionId;
use crate::connection::registry::CleanupAction;

use super::hub::PairHub;
use super::key::PairKey;

/// Removes a closing connection from one pair's subscriber set.
///
/// A plain value: the hub and the pair key it was built for. The connection
/// is supplied by the registry when it runs the action.
#[derive(Clone)]
pub struct PairSubscription {
    hub: Arc<PairHub>,
    key: PairKey,
}

impl PairSubscription {
    /// Creates a subscription handle.
    pub fn new(hub: Arc<PairHub>, key: PairKey) -> Self {
        Self { hub, key }
    }

    /// Dedupe key shared by every handle for `key`.
    pub fn dedupe_key_for(key: &PairKey) -> String {
        format!("pair:{key}")
    }

    /// The normalized pair this handle unsubscribes from.
    pub fn key(&self) -> &PairKey {
        &self.key
    }
}

impl fmt::Debug for PairSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairSubscription")
            .field("pair", &self.key)
            .finish()
    }
}

impl CleanupAction for PairSubscription {
    fn run(&self, conn_id: ConnectionId) {
        self.hub.unsubscribe(self.key.as_str(), conn_id);
    }

    fn dedupe_key(&self) -> Option<String> {
        Some(Self::dedupe_key_for(&self.key))
    }
}
