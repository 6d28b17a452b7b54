//! YAML configuration for the scanner service.

use common::Asset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_TELEGRAM_BOT: &str = "ARB_TELEGRAM_BOT";
pub const ENV_ASSETS: &str = "ARB_ASSETS";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub arbitrage: ArbitrageConfig,
    pub pipeline: PipelineConfig,
    pub notification: NotificationConfig,
}

/// Search and refresh parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    /// Optional comma separated allow-list of assets to search.
    pub assets: Option<String>,
    /// Maximum number of hops in a chain.
    pub depth: usize,
    /// Minimum cumulative rate, e.g. `1.0005` for 0.05%.
    pub min_profit: Decimal,
    pub check_limit: bool,
    pub process_assets_period_sec: u64,
    pub bid_provider_period_sec: u64,
    /// TTL applied to manually submitted bids.
    pub bid_ttl_sec: u64,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            assets: None,
            depth: 5,
            min_profit: Decimal::new(10005, 4),
            check_limit: true,
            process_assets_period_sec: 10,
            bid_provider_period_sec: 10,
            bid_ttl_sec: 4 * 60 * 60,
        }
    }
}

impl ArbitrageConfig {
    /// Parses the allow-list. Empty when nothing is configured.
    pub fn asset_restriction(&self) -> Vec<Asset> {
        self.assets
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Asset::from)
            .collect()
    }

    pub fn process_assets_period(&self) -> Duration {
        Duration::from_secs(self.process_assets_period_sec)
    }

    pub fn bid_provider_period(&self) -> Duration {
        Duration::from_secs(self.bid_provider_period_sec)
    }

    pub fn bid_ttl(&self) -> Duration {
        Duration::from_secs(self.bid_ttl_sec)
    }
}

/// Worker pool sizes and queue bounds for the detection pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub search_workers: usize,
    pub build_workers: usize,
    pub persist_workers: usize,
    pub notify_workers: usize,
    pub retry_delay_sec: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            search_workers: 3,
            build_workers: 3,
            persist_workers: 3,
            notify_workers: 3,
            retry_delay_sec: 10,
        }
    }
}

impl PipelineConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_sec)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub telegram: TelegramConfig,
    pub dispatch_workers: usize,
    pub queue_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            dispatch_workers: 10,
            queue_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot: String,
    pub api_url: String,
    /// Base of the link appended to every message; the chain id is added as the last segment.
    pub details_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            details_url: "http://localhost:8080/chains".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Overrides secrets and the asset allow-list from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bot) = lookup(ENV_TELEGRAM_BOT).filter(|v| !v.is_empty()) {
            self.notification.telegram.bot = bot;
        }
        if let Some(assets) = lookup(ENV_ASSETS) {
            self.arbitrage.assets = Some(assets);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let arb = &self.arbitrage;
        if arb.depth == 0 {
            return Err(ConfigError::ValidationError(
                "Search depth must be at least 1".to_string(),
            ));
        }
        if arb.min_profit <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "Minimum profit multiplier must be positive".to_string(),
            ));
        }
        if arb.process_assets_period_sec == 0 || arb.bid_provider_period_sec == 0 {
            return Err(ConfigError::ValidationError(
                "Refresh periods must be greater than 0".to_string(),
            ));
        }

        let p = &self.pipeline;
        let pools = [
            ("search_workers", p.search_workers),
            ("build_workers", p.build_workers),
            ("persist_workers", p.persist_workers),
            ("notify_workers", p.notify_workers),
            ("queue_capacity", p.queue_capacity),
            ("dispatch_workers", self.notification.dispatch_workers),
            ("notification queue_capacity", self.notification.queue_capacity),
        ];
        if let Some((name, _)) = pools.iter().find(|(_, size)| *size == 0) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                name
            )));
        }

        if self.notification.telegram.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "Telegram API url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
