//! # Arbitrage Detector Crate
//!
//! Finds cyclic conversion chains in the live bid set and drives them through the
//! detection pipeline: bid index refresh, chain search, chain building, persistence and
//! notification hand-off.

pub mod bid_index;
pub mod builder;
pub mod chain_id;
pub mod errors;
pub mod search;
pub mod service;

pub use bid_index::{BidIndex, BidIndexSettings, BidSnapshot};
pub use builder::ProfitChainBuilder;
pub use chain_id::chain_id;
pub use errors::DetectorError;
pub use search::{BidGraph, ChainSearchEngine, SearchConfig};
pub use service::{ArbitrageService, PipelineSettings};
