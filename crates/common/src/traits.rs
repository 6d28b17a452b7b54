//! Collaborator contracts consumed by the detector and notifier.

use crate::types::{
    Bid, BidLight, ChainId, ChainQuery, ProfitableChain, SearchSubscriptionsRequest, Subscription,
};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Storage of currently available bids.
#[async_trait]
pub trait BidSource: Send + Sync {
    /// Every live bid, projected for search.
    async fn all_light_bids(&self) -> Result<Vec<BidLight>>;

    /// Full bids for the given ids. Unknown ids are silently absent from the result.
    async fn full_bids_by_ids(&self, ids: &[String]) -> Result<Vec<Bid>>;

    /// Stores bids; a zero `ttl` keeps them until overwritten.
    async fn put_bids(&self, bids: Vec<Bid>, ttl: Duration) -> Result<()>;
}

/// Storage of profitable chains.
#[async_trait]
pub trait ChainPersistence: Send + Sync {
    async fn save(&self, chains: &[ProfitableChain]) -> Result<()>;

    async fn exists(&self, id: &ChainId) -> Result<bool>;

    async fn get(&self, id: &ChainId) -> Result<Option<ProfitableChain>>;

    async fn query(&self, query: &ChainQuery) -> Result<Vec<ProfitableChain>>;
}

/// Storage of user subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn save(&self, subscription: &Subscription) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Subscription>>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn search(&self, request: &SearchSubscriptionsRequest) -> Result<Vec<Subscription>>;

    /// Subscriptions eligible for matching.
    async fn search_active(&self) -> Result<Vec<Subscription>> {
        self.search(&SearchSubscriptionsRequest::active()).await
    }
}

/// Outbound chat transport.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, bot_token: &str, text: &str, chat: i64) -> Result<()>;
}

/// Receives freshly persisted chains.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chains: &[ProfitableChain]) -> Result<()>;
}
