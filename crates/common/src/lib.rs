//! # Arb Scanner Common Crate
//!
//! Domain types, collaborator traits, error definitions and small runtime utilities
//! shared across the `arb-scanner` workspace.

/// Module for common error types.
pub mod errors;

/// Bounded queues shared by worker pools.
pub mod queue;

/// Panic-isolating task supervisor.
pub mod supervisor;

/// List and string helpers.
pub mod text;

/// Collaborator contracts.
pub mod traits;

/// Module for common data structures and types.
pub mod types;

// Re-export key items for easier access.
pub use errors::CommonError;
pub use supervisor::{Retry, Supervisor, SupervisorExit};
pub use types::{
    Asset, Bid, BidLight, BidType, CandidateChain, ChainId, ChainQuery, ProfitableChain,
    Subscription, SubscriptionFilter, SubscriptionNotification,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_re_exports_exist() {
        let _asset = Asset("TEST".to_string());
        let _id = ChainId::from("abc");
        let _chain = CandidateChain::root();
        let _sup = Supervisor::new("test").with_retry(Retry::Unlimited);
        let _err = CommonError::NotFound("test".to_string());
    }
}
