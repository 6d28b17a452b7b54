//! The arbitrage pipeline: asset discovery, search, build, persist and notify stages connected
//! by bounded queues, each stage run by a pool of supervised workers.

use crate::bid_index::BidIndex;
use crate::builder::ProfitChainBuilder;
use crate::errors::DetectorError;
use crate::search::ChainSearchEngine;
use anyhow::Result;
use common::queue::{pull, push, shared, SharedReceiver};
use common::supervisor::Supervisor;
use common::traits::{ChainPersistence, Notifier};
use common::types::{Asset, CandidateChain, ChainId, ChainQuery, ProfitableChain};
use common::CommonError;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Page size used when a chain query does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub queue_capacity: usize,
    pub search_workers: usize,
    pub build_workers: usize,
    pub persist_workers: usize,
    pub notify_workers: usize,
    pub process_assets_period: Duration,
    pub retry_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            search_workers: 3,
            build_workers: 3,
            persist_workers: 3,
            notify_workers: 3,
            process_assets_period: Duration::from_secs(10),
            retry_delay: Duration::from_secs(10),
        }
    }
}

/// Owns the pipeline lifecycle and the read side of persisted chains.
pub struct ArbitrageService {
    index: Arc<BidIndex>,
    engine: Arc<ChainSearchEngine>,
    builder: Arc<ProfitChainBuilder>,
    chains: Arc<dyn ChainPersistence>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
    running: AtomicBool,
    scope: Mutex<Option<CancellationToken>>,
}

impl ArbitrageService {
    pub fn new(
        index: Arc<BidIndex>,
        engine: ChainSearchEngine,
        builder: ProfitChainBuilder,
        chains: Arc<dyn ChainPersistence>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            index,
            engine: Arc::new(engine),
            builder: Arc::new(builder),
            chains,
            notifier,
            settings,
            running: AtomicBool::new(false),
            scope: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the bid index refresh loop and every worker pool under a child of `parent`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, parent: &CancellationToken) -> Result<(), DetectorError> {
        let mut scope = self.scope.lock();
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DetectorError::PipelineAlreadyRunning);
        }

        let token = parent.child_token();
        if let Err(e) = self.index.start(&token) {
            self.running.store(false, Ordering::Release);
            return Err(e);
        }

        self.launch(&token);
        *scope = Some(token);
        log::info!(
            "Arbitrage pipeline started: {} search, {} build, {} persist, {} notify workers",
            self.settings.search_workers,
            self.settings.build_workers,
            self.settings.persist_workers,
            self.settings.notify_workers
        );
        Ok(())
    }

    /// Cancels every worker and the refresh loop. No-op when not running.
    pub fn stop(&self) {
        let mut scope = self.scope.lock();
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        if let Some(token) = scope.take() {
            token.cancel();
        }
        self.running.store(false, Ordering::Release);
        self.index.stop();
        log::info!("Arbitrage pipeline stopped.");
    }

    pub async fn profitable_chains(&self, mut query: ChainQuery) -> Result<Vec<ProfitableChain>> {
        if query.size == 0 {
            query.size = DEFAULT_PAGE_SIZE;
        }
        let mut chains = self.chains.query(&query).await?;
        if !query.with_bids {
            for chain in &mut chains {
                chain.bids.clear();
            }
        }
        Ok(chains)
    }

    pub async fn profitable_chain(&self, id: &ChainId) -> Result<ProfitableChain> {
        self.chains
            .get(id)
            .await?
            .ok_or_else(|| CommonError::NotFound(format!("chain {}", id)).into())
    }

    fn launch(&self, token: &CancellationToken) {
        let capacity = self.settings.queue_capacity.max(1);
        let (search_tx, search_rx) = mpsc::channel::<Asset>(capacity);
        let (build_tx, build_rx) = mpsc::channel::<Vec<CandidateChain>>(capacity);
        let (persist_tx, persist_rx) = mpsc::channel::<Vec<ProfitableChain>>(capacity);
        let (notify_tx, notify_rx) = mpsc::channel::<Vec<ProfitableChain>>(capacity);
        let search_rx = shared(search_rx);
        let build_rx = shared(build_rx);
        let persist_rx = shared(persist_rx);
        let notify_rx = shared(notify_rx);

        {
            let index = Arc::clone(&self.index);
            let period = self.settings.process_assets_period;
            self.supervise("assets-worker".to_string(), token, move |token| {
                discover_assets(Arc::clone(&index), search_tx.clone(), period, token)
            });
        }

        for n in 0..self.settings.search_workers {
            let name = format!("search-worker-{}", n);
            let (index, engine) = (Arc::clone(&self.index), Arc::clone(&self.engine));
            let (input, output) = (Arc::clone(&search_rx), build_tx.clone());
            let label = name.clone();
            self.supervise(name, token, move |token| {
                search_worker(
                    label.clone(),
                    Arc::clone(&index),
                    Arc::clone(&engine),
                    Arc::clone(&input),
                    output.clone(),
                    token,
                )
            });
        }

        for n in 0..self.settings.build_workers {
            let name = format!("build-worker-{}", n);
            let builder = Arc::clone(&self.builder);
            let (input, output) = (Arc::clone(&build_rx), persist_tx.clone());
            let label = name.clone();
            self.supervise(name, token, move |token| {
                build_worker(
                    label.clone(),
                    Arc::clone(&builder),
                    Arc::clone(&input),
                    output.clone(),
                    token,
                )
            });
        }

        for n in 0..self.settings.persist_workers {
            let name = format!("persist-worker-{}", n);
            let chains = Arc::clone(&self.chains);
            let (input, output) = (Arc::clone(&persist_rx), notify_tx.clone());
            let label = name.clone();
            self.supervise(name, token, move |token| {
                persist_worker(
                    label.clone(),
                    Arc::clone(&chains),
                    Arc::clone(&input),
                    output.clone(),
                    token,
                )
            });
        }

        for n in 0..self.settings.notify_workers {
            let name = format!("notify-worker-{}", n);
            let notifier = Arc::clone(&self.notifier);
            let input = Arc::clone(&notify_rx);
            let label = name.clone();
            self.supervise(name, token, move |token| {
                notify_worker(
                    label.clone(),
                    Arc::clone(&notifier),
                    Arc::clone(&input),
                    token,
                )
            });
        }
    }

    fn supervise<F, Fut>(&self, name: String, token: &CancellationToken, mut body: F)
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let body_token = token.clone();
        Supervisor::new(name)
            .with_retry_delay(self.settings.retry_delay)
            .spawn(token.clone(), move || body(body_token.clone()));
    }
}

async fn discover_assets(
    index: Arc<BidIndex>,
    output: mpsc::Sender<Asset>,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let assets = index.assets_snapshot();
        log::debug!("assets-worker: queueing {} assets", assets.len());
        for asset in assets {
            if !push(&output, asset, &token).await {
                return;
            }
        }
    }
}

async fn search_worker(
    name: String,
    index: Arc<BidIndex>,
    engine: Arc<ChainSearchEngine>,
    input: SharedReceiver<Asset>,
    output: mpsc::Sender<Vec<CandidateChain>>,
    token: CancellationToken,
) {
    while let Some(asset) = pull(&input, &token).await {
        let snapshot = index.snapshot();
        let (search, start) = (Arc::clone(&engine), asset.clone());
        let found = tokio::task::spawn_blocking(move || {
            search.find_chains(snapshot.as_ref(), &start, &start)
        })
        .await;
        let found = match found {
            Ok(found) => found,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                log::warn!("{}: chain search for {} was aborted: {}", name, asset, e);
                continue;
            }
        };
        match found {
            Ok(candidates) if candidates.is_empty() => {}
            Ok(candidates) => {
                log::debug!("{}: {} candidates for {}", name, candidates.len(), asset);
                if !push(&output, candidates, &token).await {
                    return;
                }
            }
            Err(e) => log::error!("{}: chain search for {} failed: {:#}", name, asset, e),
        }
    }
}

async fn build_worker(
    name: String,
    builder: Arc<ProfitChainBuilder>,
    input: SharedReceiver<Vec<CandidateChain>>,
    output: mpsc::Sender<Vec<ProfitableChain>>,
    token: CancellationToken,
) {
    while let Some(candidates) = pull(&input, &token).await {
        match builder.build(&candidates).await {
            Ok(chains) if chains.is_empty() => {}
            Ok(chains) => {
                if !push(&output, chains, &token).await {
                    return;
                }
            }
            Err(e) => log::error!(
                "{}: building {} candidates failed: {:#}",
                name,
                candidates.len(),
                e
            ),
        }
    }
}

async fn persist_worker(
    name: String,
    chains: Arc<dyn ChainPersistence>,
    input: SharedReceiver<Vec<ProfitableChain>>,
    output: mpsc::Sender<Vec<ProfitableChain>>,
    token: CancellationToken,
) {
    while let Some(batch) = pull(&input, &token).await {
        if let Err(e) = chains.save(&batch).await {
            log::error!("{}: saving {} chains failed: {:#}", name, batch.len(), e);
            continue;
        }
        log::info!("{}: saved {} new profitable chains", name, batch.len());
        if !push(&output, batch, &token).await {
            return;
        }
    }
}

async fn notify_worker(
    name: String,
    notifier: Arc<dyn Notifier>,
    input: SharedReceiver<Vec<ProfitableChain>>,
    token: CancellationToken,
) {
    while let Some(batch) = pull(&input, &token).await {
        if let Err(e) = notifier.notify(&batch).await {
            log::error!("{}: notifying about {} chains failed: {:#}", name, batch.len(), e);
        }
    }
}
