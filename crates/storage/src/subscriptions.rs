use anyhow::Result;
use async_trait::async_trait;
use common::traits::SubscriptionStore;
use common::types::{SearchSubscriptionsRequest, Subscription};
use common::CommonError;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct MemorySubscriptionStore {
    subscriptions: Arc<DashMap<String, Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn save(&self, subscription: &Subscription) -> Result<()> {
        if subscription.id.is_empty() {
            return Err(CommonError::InvalidInput("subscription id is empty".to_string()).into());
        }
        self.subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.get(id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.subscriptions.remove(id);
        Ok(())
    }

    async fn search(&self, request: &SearchSubscriptionsRequest) -> Result<Vec<Subscription>> {
        let mut found: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|entry| request.with_inactive || entry.is_active)
            .filter(|entry| {
                request
                    .user_id
                    .as_ref()
                    .map_or(true, |user| &entry.user_id == user)
            })
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}
