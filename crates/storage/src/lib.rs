//! In-memory implementations of the storage collaborators.

pub mod bids;
pub mod chains;
pub mod subscriptions;

pub use bids::MemoryBidStore;
pub use chains::MemoryChainStore;
pub use subscriptions::MemorySubscriptionStore;
