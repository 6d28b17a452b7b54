//! Turns candidate chains into persistable [`ProfitableChain`]s.

use crate::chain_id::chain_id;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::text::distinct;
use common::traits::{BidSource, ChainPersistence};
use common::types::{Bid, CandidateChain, ChainId, ProfitableChain};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct ProfitChainBuilder {
    bids: Arc<dyn BidSource>,
    chains: Arc<dyn ChainPersistence>,
}

impl ProfitChainBuilder {
    pub fn new(bids: Arc<dyn BidSource>, chains: Arc<dyn ChainPersistence>) -> Self {
        Self { bids, chains }
    }

    /// Hydrates a batch of candidates.
    ///
    /// Candidates referencing a bid that no longer exists are dropped, as are candidates whose
    /// chain is already persisted. Duplicates inside the batch collapse into one chain, and the
    /// whole batch shares one creation timestamp.
    pub async fn build(&self, candidates: &[CandidateChain]) -> Result<Vec<ProfitableChain>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids = distinct(candidates.iter().flat_map(|c| c.bid_ids.iter().cloned()));
        let bids: HashMap<String, Bid> = self
            .bids
            .full_bids_by_ids(&ids)
            .await
            .with_context(|| format!("failed to fetch {} bids", ids.len()))?
            .into_iter()
            .map(|bid| (bid.id.clone(), bid))
            .collect();

        let now = Utc::now();
        let mut seen: HashSet<ChainId> = HashSet::new();
        let mut built = Vec::new();

        for candidate in candidates {
            let Some(hops) = resolve(candidate, &bids) else {
                log::debug!(
                    "Dropping candidate {:?}: bids are gone",
                    candidate.bid_ids
                );
                continue;
            };

            let id = chain_id(&candidate.bid_ids);
            if !seen.insert(id.clone()) {
                continue;
            }
            if self
                .chains
                .exists(&id)
                .await
                .with_context(|| format!("failed to check existence of chain {}", id))?
            {
                continue;
            }

            built.push(assemble(id, candidate, hops, now));
        }

        Ok(built)
    }
}

/// Full bids for every hop of `candidate`, or `None` if any of them is missing.
fn resolve<'a>(candidate: &CandidateChain, bids: &'a HashMap<String, Bid>) -> Option<Vec<&'a Bid>> {
    if candidate.bid_ids.is_empty() {
        return None;
    }
    candidate.bid_ids.iter().map(|id| bids.get(id)).collect()
}

fn assemble(
    id: ChainId,
    candidate: &CandidateChain,
    hops: Vec<&Bid>,
    created_at: DateTime<Utc>,
) -> ProfitableChain {
    let first = hops[0];
    let last = hops[hops.len() - 1];

    let mut bid_assets = Vec::with_capacity(hops.len() + 1);
    bid_assets.push(first.src_asset.clone());
    bid_assets.extend(hops.iter().map(|bid| bid.trg_asset.clone()));

    ProfitableChain {
        id,
        asset: last.trg_asset.clone(),
        profit_share: candidate.total_rate,
        methods: distinct(hops.iter().flat_map(|bid| bid.methods.iter().cloned())),
        bid_assets,
        depth: hops.len(),
        exchange_codes: distinct(hops.iter().map(|bid| bid.exchange_code.clone())),
        bids: hops.into_iter().cloned().collect(),
        created_at,
    }
}
