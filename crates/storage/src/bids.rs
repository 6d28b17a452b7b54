use anyhow::Result;
use async_trait::async_trait;
use common::traits::BidSource;
use common::types::{Bid, BidLight};
use common::CommonError;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredBid {
    bid: Bid,
    expires_at: Option<Instant>,
}

impl StoredBid {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// Bid storage with per-entry expiry. Expired bids are evicted lazily on read.
#[derive(Debug, Default, Clone)]
pub struct MemoryBidStore {
    bids: Arc<DashMap<String, StoredBid>>,
}

impl MemoryBidStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bids that have not expired yet.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.bids.iter().filter(|entry| entry.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, id: &str) -> Option<Bid> {
        self.bids.remove(id).map(|(_, stored)| stored.bid)
    }
}

#[async_trait]
impl BidSource for MemoryBidStore {
    async fn all_light_bids(&self) -> Result<Vec<BidLight>> {
        let now = Instant::now();
        self.bids.retain(|_, stored| stored.is_live(now));
        Ok(self.bids.iter().map(|entry| entry.bid.light()).collect())
    }

    async fn full_bids_by_ids(&self, ids: &[String]) -> Result<Vec<Bid>> {
        let now = Instant::now();
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.bids
                    .get(id)
                    .filter(|stored| stored.is_live(now))
                    .map(|stored| stored.bid.clone())
            })
            .collect())
    }

    async fn put_bids(&self, bids: Vec<Bid>, ttl: Duration) -> Result<()> {
        if let Some(bid) = bids.iter().find(|bid| bid.id.is_empty()) {
            return Err(CommonError::InvalidInput(format!(
                "bid {}->{} has no id",
                bid.src_asset, bid.trg_asset
            ))
            .into());
        }

        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        for bid in bids {
            self.bids
                .insert(bid.id.clone(), StoredBid { bid, expires_at });
        }
        Ok(())
    }
}
