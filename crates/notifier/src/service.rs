use crate::dispatcher::Dispatch;
use crate::errors::SubscriptionError;
use crate::matcher::chat_targets;
use anyhow::Context;
use async_trait::async_trait;
use common::traits::{Notifier, SubscriptionStore};
use common::types::{
    ProfitableChain, SearchSubscriptionsRequest, Subscription, SubscriptionFilter,
    CHANNEL_TELEGRAM,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Subscription lifecycle plus matching of fresh chains against active subscriptions.
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    dispatcher: Arc<dyn Dispatch>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriptionStore>, dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn create(
        &self,
        mut subscription: Subscription,
    ) -> Result<Subscription, SubscriptionError> {
        validate_and_populate(&mut subscription)?;
        subscription.id = Uuid::new_v4().to_string();
        subscription.is_active = true;
        self.store.save(&subscription).await?;
        log::info!(
            "created subscription {} for user {}",
            subscription.id,
            subscription.user_id
        );
        Ok(subscription)
    }

    pub async fn update(
        &self,
        mut subscription: Subscription,
    ) -> Result<Subscription, SubscriptionError> {
        let stored = self.active(&subscription.id).await?;
        validate_and_populate(&mut subscription)?;
        subscription.user_id = stored.user_id;
        subscription.is_active = true;
        self.store.save(&subscription).await?;
        log::info!("updated subscription {}", subscription.id);
        Ok(subscription)
    }

    pub async fn get(&self, id: &str) -> Result<Subscription, SubscriptionError> {
        if id.is_empty() {
            return Err(SubscriptionError::IdEmpty);
        }
        self.store
            .get(id)
            .await?
            .ok_or_else(|| SubscriptionError::NotFound(id.to_string()))
    }

    pub async fn delete(&self, id: &str) -> Result<(), SubscriptionError> {
        self.get(id).await?;
        self.store.delete(id).await?;
        log::info!("deleted subscription {}", id);
        Ok(())
    }

    pub async fn deactivate(&self, id: &str) -> Result<Subscription, SubscriptionError> {
        let mut subscription = self.active(id).await?;
        subscription.is_active = false;
        self.store.save(&subscription).await?;
        log::info!("deactivated subscription {}", id);
        Ok(subscription)
    }

    pub async fn search(
        &self,
        request: &SearchSubscriptionsRequest,
    ) -> Result<Vec<Subscription>, SubscriptionError> {
        Ok(self.store.search(request).await?)
    }

    async fn active(&self, id: &str) -> Result<Subscription, SubscriptionError> {
        let subscription = self.get(id).await?;
        if !subscription.is_active {
            return Err(SubscriptionError::NotActive(id.to_string()));
        }
        Ok(subscription)
    }
}

#[async_trait]
impl Notifier for SubscriptionService {
    async fn notify(&self, chains: &[ProfitableChain]) -> anyhow::Result<()> {
        let subscriptions = self
            .store
            .search_active()
            .await
            .context("failed to load active subscriptions")?;
        if subscriptions.is_empty() {
            return Ok(());
        }

        for chain in chains {
            let targets = chat_targets(&subscriptions, chain);
            if targets.is_empty() {
                continue;
            }
            log::debug!("chain {} matched {} chats", chain.id, targets.len());
            if let Err(e) = self.dispatcher.dispatch(chain, &targets).await {
                log::error!("failed to dispatch chain {}: {:#}", chain.id, e);
            }
        }
        Ok(())
    }
}

fn normalized(values: &[String], normalize: impl Fn(&str) -> String) -> Vec<String> {
    values
        .iter()
        .map(|value| normalize(value.trim()))
        .filter(|value| !value.is_empty())
        .collect()
}

fn normalize_filter(filter: &mut SubscriptionFilter) -> Result<(), SubscriptionError> {
    filter.exchanges = normalized(&filter.exchanges, str::to_lowercase);
    filter.methods = normalized(&filter.methods, |m| m.to_string());
    filter.assets = normalized(&filter.assets, str::to_uppercase);

    // Percent in (0.0001, 99.9999]; zero means unset.
    let (lowest, highest) = (Decimal::new(1, 4), Decimal::new(999_999, 4));
    filter.min_profit = match filter.min_profit {
        Some(pct) if pct.is_zero() => None,
        Some(pct) if pct <= lowest || pct > highest => {
            return Err(SubscriptionError::MinProfitInvalid)
        }
        other => other,
    };

    filter.max_depth = match filter.max_depth {
        Some(0) => None,
        Some(depth) if depth < 2 => return Err(SubscriptionError::MaxDepthInvalid),
        other => other,
    };
    Ok(())
}

/// Normalizes the filter and checks every notification target. New targets get an id and
/// start active.
pub fn validate_and_populate(subscription: &mut Subscription) -> Result<(), SubscriptionError> {
    normalize_filter(&mut subscription.filter)?;

    for notification in subscription.notifications.iter_mut() {
        if notification.channel != CHANNEL_TELEGRAM {
            return Err(SubscriptionError::ChannelNotSupported(
                notification.channel.clone(),
            ));
        }
        match notification.telegram {
            Some(details) if details.channel != 0 => {}
            _ => return Err(SubscriptionError::ChatChannelInvalid),
        }
        if notification.id.is_empty() {
            notification.id = Uuid::new_v4().to_string();
            notification.is_active = true;
        }
    }
    Ok(())
}
