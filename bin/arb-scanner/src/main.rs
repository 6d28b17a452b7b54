use anyhow::{Context, Result};
use clap::Parser;
use common::traits::{BidSource, ChainPersistence, NotificationChannel, SubscriptionStore};
use config::AppConfig;
use detector::{
    ArbitrageService, BidIndex, BidIndexSettings, ChainSearchEngine, PipelineSettings,
    ProfitChainBuilder, SearchConfig,
};
use notifier::{ChatDispatcher, DispatcherSettings, SubscriptionService, TelegramChannel};
use std::sync::Arc;
use storage::{MemoryBidStore, MemoryChainStore, MemorySubscriptionStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line arguments for arb-scanner.
#[derive(Parser, Debug)]
struct Args {
    /// Path to the scanner configuration YAML
    #[arg(long, default_value = "config/default.yml")]
    config: String,
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut cfg = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    cfg.apply_env_overrides();
    cfg.validate()?;

    let arb = &cfg.arbitrage;
    let telegram = &cfg.notification.telegram;
    if telegram.bot.is_empty() {
        warn!("Telegram bot token is not configured; notifications will fail to send");
    }

    let bids: Arc<dyn BidSource> = Arc::new(MemoryBidStore::new());
    let chains: Arc<dyn ChainPersistence> = Arc::new(MemoryChainStore::new());
    let subscriptions: Arc<dyn SubscriptionStore> = Arc::new(MemorySubscriptionStore::new());
    let channel: Arc<dyn NotificationChannel> =
        Arc::new(TelegramChannel::new(telegram.api_url.clone()));

    let root = CancellationToken::new();

    let dispatcher = ChatDispatcher::new(
        channel,
        DispatcherSettings {
            bot_token: telegram.bot.clone(),
            details_url: telegram.details_url.clone(),
            workers: cfg.notification.dispatch_workers,
            queue_capacity: cfg.notification.queue_capacity,
            retry_delay: cfg.pipeline.retry_delay(),
        },
    );
    dispatcher.start(&root);
    let notifier = Arc::new(SubscriptionService::new(
        subscriptions,
        Arc::new(dispatcher),
    ));

    let index = Arc::new(BidIndex::new(
        Arc::clone(&bids),
        BidIndexSettings {
            restriction: arb.asset_restriction(),
            refresh_period: arb.bid_provider_period(),
            retry_delay: cfg.pipeline.retry_delay(),
            manual_bid_ttl: arb.bid_ttl(),
        },
    ));
    let engine = ChainSearchEngine::new(SearchConfig {
        max_depth: arb.depth,
        min_profit: arb.min_profit,
        check_limits: arb.check_limit,
    });
    let builder = ProfitChainBuilder::new(bids, Arc::clone(&chains));

    let pipeline = cfg.pipeline.clone();
    let service = ArbitrageService::new(
        index,
        engine,
        builder,
        chains,
        notifier,
        PipelineSettings {
            queue_capacity: pipeline.queue_capacity,
            search_workers: pipeline.search_workers,
            build_workers: pipeline.build_workers,
            persist_workers: pipeline.persist_workers,
            notify_workers: pipeline.notify_workers,
            process_assets_period: arb.process_assets_period(),
            retry_delay: pipeline.retry_delay(),
        },
    );
    service.start(&root)?;
    info!(depth = arb.depth, min_profit = %arb.min_profit, "arb-scanner is running");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    service.stop();
    root.cancel();

    Ok(())
}
