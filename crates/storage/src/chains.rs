use anyhow::Result;
use async_trait::async_trait;
use common::traits::ChainPersistence;
use common::types::{ChainId, ChainQuery, ProfitableChain};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct MemoryChainStore {
    chains: Arc<DashMap<ChainId, ProfitableChain>>,
}

impl MemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().any(|item| b.contains(item))
}

fn matches(query: &ChainQuery, chain: &ProfitableChain) -> bool {
    (query.assets.is_empty() || query.assets.contains(&chain.asset))
        && (query.methods.is_empty() || overlaps(&query.methods, &chain.methods))
        && (query.exchange_codes.is_empty() || overlaps(&query.exchange_codes, &chain.exchange_codes))
}

#[async_trait]
impl ChainPersistence for MemoryChainStore {
    async fn save(&self, chains: &[ProfitableChain]) -> Result<()> {
        for chain in chains {
            self.chains.insert(chain.id.clone(), chain.clone());
        }
        Ok(())
    }

    async fn exists(&self, id: &ChainId) -> Result<bool> {
        Ok(self.chains.contains_key(id))
    }

    async fn get(&self, id: &ChainId) -> Result<Option<ProfitableChain>> {
        Ok(self.chains.get(id).map(|entry| entry.value().clone()))
    }

    /// Newest first; `size == 0` returns everything that matches.
    async fn query(&self, query: &ChainQuery) -> Result<Vec<ProfitableChain>> {
        let mut found: Vec<ProfitableChain> = self
            .chains
            .iter()
            .filter(|entry| matches(query, entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if query.size > 0 {
            found.truncate(query.size);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use common::types::Asset;
    use rust_decimal_macros::dec;

    fn chain(id: &str, asset: &str, exchange: &str, method: &str, age_secs: i64) -> ProfitableChain {
        ProfitableChain {
            id: ChainId::from(id),
            asset: Asset::from(asset),
            profit_share: dec!(1.01),
            methods: vec![method.to_string()],
            bid_assets: vec![Asset::from(asset), Asset::from(asset)],
            bids: Vec::new(),
            depth: 1,
            exchange_codes: vec![exchange.to_string()],
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    async fn seeded() -> MemoryChainStore {
        let store = MemoryChainStore::new();
        store
            .save(&[
                chain("old-usd", "USD", "binance", "M1", 30),
                chain("new-usd", "USD", "bybit", "M2", 10),
                chain("rub", "RUB", "binance", "M2", 20),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_exists_and_get() {
        let store = seeded().await;
        assert_eq!(store.len(), 3);
        assert!(store.exists(&ChainId::from("rub")).await.unwrap());
        assert!(!store.exists(&ChainId::from("nope")).await.unwrap());
        let got = store.get(&ChainId::from("rub")).await.unwrap().unwrap();
        assert_eq!(got.asset, Asset::from("RUB"));
    }

    #[tokio::test]
    async fn test_query_orders_newest_first_and_limits() {
        let store = seeded().await;
        let all = store.query(&ChainQuery::default()).await.unwrap();
        let ids: Vec<String> = all.into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec!["new-usd", "rub", "old-usd"]);

        let one = store
            .query(&ChainQuery {
                size: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(one[0].id, ChainId::from("new-usd"));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = seeded().await;

        let usd = store
            .query(&ChainQuery {
                assets: vec![Asset::from("USD")],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(usd.len(), 2);

        let binance_m2 = store
            .query(&ChainQuery {
                exchange_codes: vec!["binance".to_string()],
                methods: vec!["M2".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(binance_m2.len(), 1);
        assert_eq!(binance_m2[0].id, ChainId::from("rub"));
    }
}
