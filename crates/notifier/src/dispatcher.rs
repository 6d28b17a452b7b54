//! Fan-out of rendered chains to chat addresses through a supervised worker pool.

use crate::render::render_chain;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use common::queue::{pull, shared, SharedReceiver};
use common::supervisor::{Supervisor, DEFAULT_RETRY_DELAY};
use common::traits::NotificationChannel;
use common::types::{ChainId, ProfitableChain};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Hands a matched chain over for delivery.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, chain: &ProfitableChain, targets: &BTreeSet<i64>) -> Result<()>;
}

/// One message for one chat.
#[derive(Debug, Clone)]
pub struct SendJob {
    pub chat: i64,
    pub chain_id: ChainId,
    pub text: Arc<str>,
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub bot_token: String,
    pub details_url: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry_delay: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            details_url: String::new(),
            workers: 10,
            queue_capacity: 10,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

pub struct ChatDispatcher {
    channel: Arc<dyn NotificationChannel>,
    settings: DispatcherSettings,
    jobs: mpsc::Sender<SendJob>,
    queue: SharedReceiver<SendJob>,
}

impl ChatDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>, settings: DispatcherSettings) -> Self {
        let (jobs, queue) = mpsc::channel(settings.queue_capacity.max(1));
        Self {
            channel,
            settings,
            jobs,
            queue: shared(queue),
        }
    }

    /// Launches the send workers under `token`.
    pub fn start(&self, token: &CancellationToken) {
        let bot: Arc<str> = Arc::from(self.settings.bot_token.as_str());
        for n in 0..self.settings.workers {
            let name = format!("dispatch-worker-{}", n);
            let (channel, queue, bot) = (
                Arc::clone(&self.channel),
                Arc::clone(&self.queue),
                Arc::clone(&bot),
            );
            let (label, body_token) = (name.clone(), token.clone());
            Supervisor::new(name)
                .with_retry_delay(self.settings.retry_delay)
                .spawn(token.clone(), move || {
                    send_worker(
                        label.clone(),
                        Arc::clone(&channel),
                        Arc::clone(&queue),
                        Arc::clone(&bot),
                        body_token.clone(),
                    )
                });
        }
        log::info!("started {} dispatch workers", self.settings.workers);
    }
}

#[async_trait]
impl Dispatch for ChatDispatcher {
    async fn dispatch(&self, chain: &ProfitableChain, targets: &BTreeSet<i64>) -> Result<()> {
        let text: Arc<str> = Arc::from(render_chain(chain, &self.settings.details_url));
        for &chat in targets {
            let job = SendJob {
                chat,
                chain_id: chain.id.clone(),
                text: Arc::clone(&text),
            };
            self.jobs
                .send(job)
                .await
                .map_err(|_| anyhow!("dispatch queue is closed"))?;
        }
        Ok(())
    }
}

async fn send_worker(
    name: String,
    channel: Arc<dyn NotificationChannel>,
    queue: SharedReceiver<SendJob>,
    bot: Arc<str>,
    token: CancellationToken,
) {
    while let Some(job) = pull(&queue, &token).await {
        match channel.send(&bot, &job.text, job.chat).await {
            Ok(()) => log::debug!("{}: chain {} sent to chat {}", name, job.chain_id, job.chat),
            Err(e) => log::error!(
                "{}: failed to send chain {} to chat {}: {:#}",
                name,
                job.chain_id,
                job.chat,
                e
            ),
        }
    }
}
