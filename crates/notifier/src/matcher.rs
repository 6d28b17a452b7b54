//! Decides which subscribers hear about a chain.

use common::text::{is_subset, sanitize_all};
use common::types::{ProfitableChain, Subscription, SubscriptionFilter};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Profit share required by a percentage threshold, e.g. `10` -> `1.10`.
pub fn min_profit_share(min_profit_pct: Decimal) -> Decimal {
    Decimal::ONE + min_profit_pct / Decimal::ONE_HUNDRED
}

/// Evaluates `filter` against `chain`. `chain_methods` must already be sanitized.
///
/// Every dimension left empty or unset matches. A chain with no exchange codes or methods is
/// a subset of any filter and therefore matches those dimensions as well.
pub fn filter_matches(
    filter: &SubscriptionFilter,
    chain: &ProfitableChain,
    chain_methods: &[String],
) -> bool {
    let filter_methods = sanitize_all(&filter.methods);

    (filter.exchanges.is_empty() || is_subset(&chain.exchange_codes, &filter.exchanges))
        && (filter.assets.is_empty() || filter.assets.iter().any(|a| *a == chain.asset.0))
        && (filter_methods.is_empty() || is_subset(chain_methods, &filter_methods))
        && filter
            .max_depth
            .map_or(true, |max| chain.depth <= max as usize)
        && filter
            .min_profit
            .map_or(true, |pct| chain.profit_share >= min_profit_share(pct))
}

/// Distinct chat addresses of every active target of every active subscription matching `chain`.
pub fn chat_targets(subscriptions: &[Subscription], chain: &ProfitableChain) -> BTreeSet<i64> {
    let chain_methods = sanitize_all(&chain.methods);
    subscriptions
        .iter()
        .filter(|sub| sub.is_active && filter_matches(&sub.filter, chain, &chain_methods))
        .flat_map(|sub| sub.notifications.iter().filter_map(|n| n.active_chat()))
        .collect()
}
