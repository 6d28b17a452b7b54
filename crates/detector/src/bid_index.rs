//! Periodically refreshed, read-optimised view of the live bids.
//!
//! Every refresh builds a fresh [`BidSnapshot`] and swaps it in under a write lock. Readers
//! clone the current `Arc` and work on an immutable snapshot, so a search never observes a
//! half-built map. A failed refresh keeps the previous snapshot.

use crate::errors::DetectorError;
use crate::search::BidGraph;
use anyhow::{Context, Result};
use common::supervisor::{Supervisor, DEFAULT_RETRY_DELAY};
use common::traits::BidSource;
use common::types::{Asset, Bid, BidLight, BidType};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

/// An immutable partition of bids by source asset.
#[derive(Debug, Default)]
pub struct BidSnapshot {
    by_source: HashMap<Asset, Arc<[BidLight]>>,
    assets: Vec<Asset>,
}

impl BidSnapshot {
    /// Partitions `bids` by source asset. A non-empty `restriction` narrows the tradable asset
    /// set only; bids of other assets stay reachable as intermediate hops.
    pub fn build(bids: Vec<BidLight>, restriction: &HashSet<Asset>) -> Self {
        let mut grouped: HashMap<Asset, Vec<BidLight>> = HashMap::new();
        for bid in bids {
            grouped.entry(bid.src_asset.clone()).or_default().push(bid);
        }

        let mut assets: Vec<Asset> = grouped
            .keys()
            .filter(|asset| restriction.is_empty() || restriction.contains(*asset))
            .cloned()
            .collect();
        assets.sort();

        let by_source = grouped
            .into_iter()
            .map(|(asset, bids)| (asset, Arc::from(bids)))
            .collect();

        Self { by_source, assets }
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Bids whose source is `asset`; empty if there are none.
    pub fn bids_from(&self, asset: &Asset) -> Arc<[BidLight]> {
        self.by_source
            .get(asset)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn bid_count(&self) -> usize {
        self.by_source.values().map(|bids| bids.len()).sum()
    }
}

impl BidGraph for BidSnapshot {
    fn bids_from(&self, asset: &Asset) -> Result<Arc<[BidLight]>> {
        Ok(BidSnapshot::bids_from(self, asset))
    }
}

#[derive(Debug, Clone)]
pub struct BidIndexSettings {
    /// Assets allowed to start a search. Empty means all.
    pub restriction: Vec<Asset>,
    pub refresh_period: Duration,
    pub retry_delay: Duration,
    /// TTL applied by [`BidIndex::put_bid`].
    pub manual_bid_ttl: Duration,
}

impl Default for BidIndexSettings {
    fn default() -> Self {
        Self {
            restriction: Vec::new(),
            refresh_period: Duration::from_secs(10),
            retry_delay: DEFAULT_RETRY_DELAY,
            manual_bid_ttl: Duration::from_secs(4 * 60 * 60),
        }
    }
}

/// Owner of the current [`BidSnapshot`] and of the loop that refreshes it.
pub struct BidIndex {
    source: Arc<dyn BidSource>,
    restriction: HashSet<Asset>,
    refresh_period: Duration,
    retry_delay: Duration,
    manual_bid_ttl: Duration,
    snapshot: RwLock<Arc<BidSnapshot>>,
    running: AtomicBool,
    scope: Mutex<Option<CancellationToken>>,
}

impl BidIndex {
    pub fn new(source: Arc<dyn BidSource>, settings: BidIndexSettings) -> Self {
        Self {
            source,
            restriction: settings.restriction.into_iter().collect(),
            refresh_period: settings.refresh_period.max(MIN_REFRESH_PERIOD),
            retry_delay: settings.retry_delay,
            manual_bid_ttl: settings.manual_bid_ttl,
            snapshot: RwLock::new(Arc::new(BidSnapshot::default())),
            running: AtomicBool::new(false),
            scope: Mutex::new(None),
        }
    }

    /// The snapshot currently in place.
    pub fn snapshot(&self) -> Arc<BidSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn assets_snapshot(&self) -> Vec<Asset> {
        self.snapshot().assets().to_vec()
    }

    pub fn bids_from(&self, asset: &Asset) -> Arc<[BidLight]> {
        self.snapshot().bids_from(asset)
    }

    /// Pulls every live bid and replaces the snapshot.
    pub async fn refresh(&self) -> Result<()> {
        let bids = self
            .source
            .all_light_bids()
            .await
            .context("failed to fetch light bids")?;
        let next = Arc::new(BidSnapshot::build(bids, &self.restriction));
        log::debug!(
            "Bid index refreshed: {} bids across {} tradable assets",
            next.bid_count(),
            next.assets().len()
        );
        *self.snapshot.write() = next;
        Ok(())
    }

    /// Starts the refresh loop as a child of `parent`. The first refresh happens immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>, parent: &CancellationToken) -> Result<(), DetectorError> {
        let mut scope = self.scope.lock();
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DetectorError::BidProviderAlreadyRunning);
        }

        let token = parent.child_token();
        *scope = Some(token.clone());

        let index = Arc::clone(self);
        let loop_token = token.clone();
        Supervisor::new("bid-index-refresh")
            .with_retry_delay(self.retry_delay)
            .spawn(token, move || {
                let index = Arc::clone(&index);
                let token = loop_token.clone();
                async move { index.refresh_loop(token).await }
            });

        log::info!("Bid index refresh loop started.");
        Ok(())
    }

    /// Cancels the refresh loop. No-op when not running.
    pub fn stop(&self) {
        let mut scope = self.scope.lock();
        if let Some(token) = scope.take() {
            token.cancel();
        }
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn refresh_loop(&self, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.refresh_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    log::info!("Bid index refresh loop shutting down.");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        log::error!("Bid index refresh failed, keeping previous snapshot: {:#}", e);
                    }
                }
            }
        }
    }

    pub async fn full_bids_by_ids(&self, ids: &[String]) -> Result<Vec<Bid>> {
        self.source.full_bids_by_ids(ids).await
    }

    /// Stores a manually submitted bid; it becomes searchable after the next refresh.
    pub async fn put_bid(&self, mut bid: Bid) -> Result<Bid> {
        if bid.id.is_empty() {
            bid.id = Uuid::new_v4().to_string();
        }
        bid.bid_type = BidType::Manual;
        self.source
            .put_bids(vec![bid.clone()], self.manual_bid_ttl)
            .await
            .with_context(|| format!("failed to store manual bid {}", bid.id))?;
        Ok(bid)
    }
}

impl BidGraph for BidIndex {
    fn bids_from(&self, asset: &Asset) -> Result<Arc<[BidLight]>> {
        Ok(BidIndex::bids_from(self, asset))
    }
}
