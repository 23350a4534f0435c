//! Pair subscriptions: normalized keys, subscriber sets, and broadcast.

pub mod feed;
pub mod hub;
pub mod key;
pub mod subscription;

pub use hub::PairHub;
pub use key::PairKey;
pub use subscription::PairSubscription;
