use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a currency or asset code, always upper-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Asset(pub String);

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Asset(s.trim().to_uppercase())
    }
}

/// Content-derived identifier of a profitable chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        ChainId(s.to_string())
    }
}

/// Where a bid came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidType {
    #[default]
    P2p,
    Spot,
    Manual,
}

impl fmt::Display for BidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidType::P2p => write!(f, "p2p"),
            BidType::Spot => write!(f, "spot"),
            BidType::Manual => write!(f, "manual"),
        }
    }
}

/// A tradable offer to convert `src_asset` into `trg_asset` at `rate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: String,
    #[serde(rename = "type")]
    pub bid_type: BidType,
    pub src_asset: Asset,
    pub trg_asset: Asset,
    pub rate: Decimal,
    pub exchange_code: String,
    pub available: Decimal,
    pub min_limit: Decimal,
    pub max_limit: Decimal,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub link: String,
}

impl Bid {
    /// Projects the bid onto the fields needed by the chain search.
    pub fn light(&self) -> BidLight {
        BidLight {
            id: self.id.clone(),
            src_asset: self.src_asset.clone(),
            trg_asset: self.trg_asset.clone(),
            rate: self.rate,
            available: self.available,
            min_limit: self.min_limit,
            max_limit: self.max_limit,
        }
    }
}

/// Search-time projection of a [`Bid`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidLight {
    pub id: String,
    pub src_asset: Asset,
    pub trg_asset: Asset,
    pub rate: Decimal,
    pub available: Decimal,
    pub min_limit: Decimal,
    pub max_limit: Decimal,
}

/// An in-progress or completed path through the bid graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateChain {
    /// Ordered bid ids, one per hop.
    pub bid_ids: Vec<String>,
    /// Reachable amount; `None` until limit checking produced one.
    pub amount: Option<Decimal>,
    /// Product of the rates of every hop.
    pub total_rate: Decimal,
}

impl CandidateChain {
    /// An empty chain with a neutral cumulative rate.
    pub fn root() -> Self {
        Self {
            bid_ids: Vec::new(),
            amount: None,
            total_rate: Decimal::ONE,
        }
    }

    /// Returns a copy of this chain extended by one hop, or `None` if the
    /// cumulative rate overflows.
    pub fn extend(&self, bid: &BidLight, amount: Option<Decimal>) -> Option<Self> {
        let total_rate = self.total_rate.checked_mul(bid.rate)?;
        let mut bid_ids = Vec::with_capacity(self.bid_ids.len() + 1);
        bid_ids.extend_from_slice(&self.bid_ids);
        bid_ids.push(bid.id.clone());
        Some(Self {
            bid_ids,
            amount,
            total_rate,
        })
    }

    pub fn depth(&self) -> usize {
        self.bid_ids.len()
    }
}

impl Default for CandidateChain {
    fn default() -> Self {
        Self::root()
    }
}

/// A candidate that was hydrated with full bids and accepted for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitableChain {
    pub id: ChainId,
    pub asset: Asset,
    pub profit_share: Decimal,
    pub methods: Vec<String>,
    pub bid_assets: Vec<Asset>,
    #[serde(default)]
    pub bids: Vec<Bid>,
    pub depth: usize,
    pub exchange_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Filter for reading persisted chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainQuery {
    pub assets: Vec<Asset>,
    pub methods: Vec<String>,
    pub exchange_codes: Vec<String>,
    pub with_bids: bool,
    pub size: usize,
}

/// The only notification channel kind currently supported.
pub const CHANNEL_TELEGRAM: &str = "telegram";

/// A standing interest in profitable chains registered by a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub filter: SubscriptionFilter,
    #[serde(default)]
    pub notifications: Vec<SubscriptionNotification>,
}

/// Optional constraints on chains; empty or unset fields never exclude a chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionFilter {
    pub assets: Vec<String>,
    pub methods: Vec<String>,
    pub exchanges: Vec<String>,
    pub max_depth: Option<u32>,
    /// Minimum profit in percent, e.g. `10` requires a profit share of `1.10`.
    pub min_profit: Option<Decimal>,
}

/// A single delivery target attached to a subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionNotification {
    #[serde(default)]
    pub id: String,
    pub channel: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub telegram: Option<TelegramDetails>,
}

impl SubscriptionNotification {
    /// The chat address to deliver to, if this target is an active telegram one.
    pub fn active_chat(&self) -> Option<i64> {
        if !self.is_active || self.channel != CHANNEL_TELEGRAM {
            return None;
        }
        self.telegram.as_ref().map(|t| t.channel)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramDetails {
    pub channel: i64,
}

/// Filter for listing subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSubscriptionsRequest {
    pub user_id: Option<String>,
    pub with_inactive: bool,
}

impl SearchSubscriptionsRequest {
    /// Every active subscription regardless of owner.
    pub fn active() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_asset_from_str_normalises() {
        assert_eq!(Asset::from(" usd "), Asset("USD".to_string()));
        assert_eq!(format!("{}", Asset::from("rub")), "RUB");
    }

    #[test]
    fn test_bid_type_display() {
        assert_eq!(format!("{}", BidType::Manual), "manual");
        assert_eq!(format!("{}", BidType::P2p), "p2p");
        assert_eq!(BidType::default(), BidType::P2p);
    }

    #[test]
    fn test_bid_light_projection() {
        let bid = Bid {
            id: "b1".to_string(),
            src_asset: Asset::from("USD"),
            trg_asset: Asset::from("RUB"),
            rate: dec!(63),
            available: dec!(100),
            min_limit: dec!(1),
            max_limit: dec!(50),
            methods: vec!["M1".to_string()],
            ..Default::default()
        };
        let light = bid.light();
        assert_eq!(light.id, "b1");
        assert_eq!(light.rate, dec!(63));
        assert_eq!(light.max_limit, dec!(50));
    }

    #[test]
    fn test_candidate_extend_multiplies_rate_and_keeps_parent() {
        let root = CandidateChain::root();
        let hop = BidLight {
            id: "a".to_string(),
            rate: dec!(63),
            ..Default::default()
        };
        let next = root.extend(&hop, Some(dec!(630))).unwrap();
        let hop2 = BidLight {
            id: "b".to_string(),
            rate: dec!(0.017),
            ..Default::default()
        };
        let last = next.extend(&hop2, None).unwrap();

        assert!(root.bid_ids.is_empty());
        assert_eq!(next.bid_ids, vec!["a"]);
        assert_eq!(last.bid_ids, vec!["a", "b"]);
        assert_eq!(last.total_rate, dec!(1.071));
        assert_eq!(last.depth(), 2);
    }

    #[test]
    fn test_candidate_extend_overflow_is_none() {
        let huge = BidLight {
            id: "x".to_string(),
            rate: Decimal::MAX,
            ..Default::default()
        };
        let once = CandidateChain::root().extend(&huge, None).unwrap();
        assert!(once.extend(&huge, None).is_none());
    }

    #[test]
    fn test_active_chat_requires_active_telegram() {
        let mut n = SubscriptionNotification {
            id: "n".to_string(),
            channel: CHANNEL_TELEGRAM.to_string(),
            is_active: true,
            telegram: Some(TelegramDetails { channel: 42 }),
        };
        assert_eq!(n.active_chat(), Some(42));
        n.is_active = false;
        assert_eq!(n.active_chat(), None);
        n.is_active = true;
        n.channel = "email".to_string();
        assert_eq!(n.active_chat(), None);
    }
}
