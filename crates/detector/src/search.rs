//! Depth-bounded search for cyclic conversion chains.

use anyhow::Result;
use common::types::{Asset, BidLight, CandidateChain};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Read access to bids grouped by their source asset.
pub trait BidGraph: Send + Sync {
    fn bids_from(&self, asset: &Asset) -> Result<Arc<[BidLight]>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Maximum number of hops in a chain.
    pub max_depth: usize,
    /// Minimum cumulative rate for a chain to be accepted.
    pub min_profit: Decimal,
    /// Propagate reachable amounts and prune hops below their minimum limit.
    pub check_limits: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_profit: Decimal::new(10005, 4),
            check_limits: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChainSearchEngine {
    config: SearchConfig,
}

impl ChainSearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Finds every chain from `start` to `target` whose cumulative rate clears the
    /// minimum profit. A graph error aborts the whole call.
    pub fn find_chains<G>(
        &self,
        graph: &G,
        start: &Asset,
        target: &Asset,
    ) -> Result<Vec<CandidateChain>>
    where
        G: BidGraph + ?Sized,
    {
        let mut found = Vec::new();
        self.explore(graph, start, target, &CandidateChain::root(), 0, &mut found)?;
        Ok(found)
    }

    fn explore<G>(
        &self,
        graph: &G,
        current: &Asset,
        target: &Asset,
        chain: &CandidateChain,
        depth: usize,
        found: &mut Vec<CandidateChain>,
    ) -> Result<()>
    where
        G: BidGraph + ?Sized,
    {
        if depth >= self.config.max_depth {
            return Ok(());
        }

        let bids = graph.bids_from(current)?;
        for bid in bids.iter() {
            if bid.rate == Decimal::ONE {
                continue;
            }

            let amount = if self.config.check_limits {
                match reachable_amount(chain.amount, bid) {
                    Some(amount) => Some(amount),
                    None => continue,
                }
            } else {
                chain.amount
            };

            let Some(next) = chain.extend(bid, amount) else {
                log::warn!("Cumulative rate overflow on bid {}, skipping", bid.id);
                continue;
            };

            if &bid.trg_asset == target {
                if next.total_rate >= self.config.min_profit {
                    found.push(next);
                }
                continue;
            }

            self.explore(graph, &bid.trg_asset, target, &next, depth + 1, found)?;
        }
        Ok(())
    }
}

/// Amount reachable after taking `bid`, or `None` when the carried amount is below the bid's
/// minimum limit.
fn reachable_amount(carried: Option<Decimal>, bid: &BidLight) -> Option<Decimal> {
    match carried {
        None => bid.available.checked_mul(bid.rate),
        Some(amount) if amount < bid.min_limit => None,
        Some(amount) => amount
            .checked_mul(bid.rate)
            .map(|converted| converted.min(bid.available)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Graph {
        edges: HashMap<Asset, Vec<BidLight>>,
    }

    impl Graph {
        fn with(mut self, id: &str, src: &str, trg: &str, rate: Decimal) -> Self {
            self.push(BidLight {
                id: id.to_string(),
                src_asset: Asset::from(src),
                trg_asset: Asset::from(trg),
                rate,
                available: dec!(1000000),
                min_limit: Decimal::ZERO,
                max_limit: dec!(1000000),
            });
            self
        }

        fn push(&mut self, bid: BidLight) {
            self.edges.entry(bid.src_asset.clone()).or_default().push(bid);
        }
    }

    impl BidGraph for Graph {
        fn bids_from(&self, asset: &Asset) -> Result<Arc<[BidLight]>> {
            Ok(Arc::from(self.edges.get(asset).cloned().unwrap_or_default()))
        }
    }

    struct Broken;

    impl BidGraph for Broken {
        fn bids_from(&self, asset: &Asset) -> Result<Arc<[BidLight]>> {
            anyhow::bail!("lookup for {} failed", asset)
        }
    }

    fn engine(max_depth: usize, check_limits: bool) -> ChainSearchEngine {
        ChainSearchEngine::new(SearchConfig {
            max_depth,
            min_profit: dec!(1.0005),
            check_limits,
        })
    }

    fn usd() -> Asset {
        Asset::from("USD")
    }

    #[test]
    fn test_unprofitable_round_trip_is_excluded() {
        let graph = Graph::default()
            .with("a", "USD", "RUB", dec!(63))
            .with("b", "RUB", "USD", dec!(0.015));
        let chains = engine(5, true).find_chains(&graph, &usd(), &usd()).unwrap();
        assert!(chains.is_empty());
    }

    #[test]
    fn test_profitable_round_trip_is_found() {
        let graph = Graph::default()
            .with("a", "USD", "RUB", dec!(63))
            .with("b", "RUB", "USD", dec!(0.017));
        let chains = engine(5, true).find_chains(&graph, &usd(), &usd()).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].bid_ids, vec!["a", "b"]);
        assert_eq!(chains[0].total_rate, dec!(1.071));
    }

    #[test]
    fn test_unit_rate_hops_are_never_used() {
        let graph = Graph::default()
            .with("par", "USD", "EUR", dec!(1))
            .with("e", "EUR", "USD", dec!(1.5))
            .with("direct", "USD", "USD", dec!(1));
        let chains = engine(5, false).find_chains(&graph, &usd(), &usd()).unwrap();
        assert!(chains.is_empty());
    }

    #[test]
    fn test_depth_bound_limits_hop_count() {
        let graph = Graph::default()
            .with("1", "USD", "A", dec!(2))
            .with("2", "A", "B", dec!(2))
            .with("3", "B", "C", dec!(2))
            .with("4", "C", "USD", dec!(2));
        assert!(engine(3, false)
            .find_chains(&graph, &usd(), &usd())
            .unwrap()
            .is_empty());
        let chains = engine(4, false).find_chains(&graph, &usd(), &usd()).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].depth(), 4);
    }

    #[test]
    fn test_results_respect_threshold_depth_and_unit_rate_on_dense_graph() {
        let assets = ["USD", "RUB", "EUR", "BTC"];
        let rates = [dec!(0.5), dec!(1), dec!(1.01), dec!(2), dec!(0.99)];
        let mut graph = Graph::default();
        let mut n = 0;
        for (i, src) in assets.iter().enumerate() {
            for (j, trg) in assets.iter().enumerate() {
                if i == j {
                    continue;
                }
                let rate = rates[(i * 3 + j) % rates.len()];
                graph = graph.with(&format!("{}{}", src, trg), src, trg, rate);
                n += 1;
            }
        }
        assert_eq!(n, 12);

        let search = engine(4, false);
        let unit_ids: Vec<String> = graph
            .edges
            .values()
            .flatten()
            .filter(|b| b.rate == Decimal::ONE)
            .map(|b| b.id.clone())
            .collect();
        for start in assets {
            let start = Asset::from(start);
            let chains = search.find_chains(&graph, &start, &start).unwrap();
            for chain in &chains {
                assert!(chain.total_rate >= dec!(1.0005));
                assert!(chain.depth() <= 4);
                assert!(chain.bid_ids.iter().all(|id| !unit_ids.contains(id)));
            }
        }
    }

    #[test]
    fn test_completed_chain_below_threshold_is_not_extended() {
        let graph = Graph::default()
            .with("a", "USD", "EUR", dec!(2))
            .with("b", "EUR", "USD", dec!(0.4))
            .with("c", "USD", "EUR", dec!(0.1));
        let chains = engine(5, false).find_chains(&graph, &usd(), &usd()).unwrap();
        assert!(chains.is_empty());
    }

    #[test]
    fn test_intermediate_cycles_are_bounded_by_depth() {
        let graph = Graph::default()
            .with("ua", "USD", "A", dec!(2))
            .with("ab", "A", "B", dec!(2))
            .with("ba", "B", "A", dec!(2))
            .with("au", "A", "USD", dec!(2));
        let chains = engine(4, false).find_chains(&graph, &usd(), &usd()).unwrap();
        let paths: Vec<Vec<String>> = chains.into_iter().map(|c| c.bid_ids).collect();
        assert_eq!(
            paths,
            vec![vec!["ua", "ab", "ba", "au"], vec!["ua", "au"]]
        );
    }

    #[test]
    fn test_limits_propagate_and_prune() {
        let mut graph = Graph::default();
        graph.push(BidLight {
            id: "first".to_string(),
            src_asset: usd(),
            trg_asset: Asset::from("RUB"),
            rate: dec!(60),
            available: dec!(10),
            min_limit: Decimal::ZERO,
            max_limit: dec!(10),
        });
        graph.push(BidLight {
            id: "too-big".to_string(),
            src_asset: Asset::from("RUB"),
            trg_asset: usd(),
            rate: dec!(0.02),
            available: dec!(1000),
            min_limit: dec!(601),
            max_limit: dec!(1000),
        });
        graph.push(BidLight {
            id: "fits".to_string(),
            src_asset: Asset::from("RUB"),
            trg_asset: usd(),
            rate: dec!(0.02),
            available: dec!(5),
            min_limit: dec!(100),
            max_limit: dec!(1000),
        });

        let chains = engine(5, true).find_chains(&graph, &usd(), &usd()).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].bid_ids, vec!["first", "fits"]);
        // 10 * 60 = 600 RUB, then min(600 * 0.02, 5) = 5.
        assert_eq!(chains[0].amount, Some(dec!(5)));

        let unchecked = engine(5, false).find_chains(&graph, &usd(), &usd()).unwrap();
        assert_eq!(unchecked.len(), 2);
        assert!(unchecked.iter().all(|c| c.amount.is_none()));
    }

    #[test]
    fn test_graph_error_aborts_search() {
        let err = engine(5, true)
            .find_chains(&Broken, &usd(), &usd())
            .unwrap_err();
        assert!(err.to_string().contains("USD"));
    }

    #[test]
    fn test_reachable_amount() {
        let bid = BidLight {
            rate: dec!(2),
            available: dec!(50),
            min_limit: dec!(10),
            ..Default::default()
        };
        assert_eq!(reachable_amount(None, &bid), Some(dec!(100)));
        assert_eq!(reachable_amount(Some(dec!(9)), &bid), None);
        assert_eq!(reachable_amount(Some(dec!(20)), &bid), Some(dec!(40)));
        assert_eq!(reachable_amount(Some(dec!(30)), &bid), Some(dec!(50)));
    }
}
