use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::timeout;

use crate::canonical::CanonicalUrl;
use crate::collector::Collector;
use crate::config::CrawlerConfig;
use crate::fetcher::PageFetcher;
use crate::intake::Intake;
use crate::pool::ResourcePool;
use crate::registry::PageRecord;
use crate::task::{run_fetch, FetchContext, FetchOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Fetch tasks that died before returning an outcome
    pub lost: usize,
    /// Urls admitted to the frontier besides the seed
    pub discovered: usize,
    pub root_redirected: bool,
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every page whose fetch completed, shallowest first
    pub pages: Vec<PageRecord>,
    pub stats: CrawlStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    PageBudget,
    Exhausted,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageBudget => write!(f, "page budget reached"),
            Self::Exhausted => write!(f, "no pending url left"),
            Self::Interrupted => write!(f, "stop requested"),
        }
    }
}

/// A crawl running in the background.
#[derive(Debug)]
pub struct CrawlHandle {
    task: JoinHandle<CrawlReport>,
    stop: Arc<watch::Sender<bool>>,
}

impl CrawlHandle {
    /// Asks the crawl to stop dispatching. In-flight fetches are still awaited and merged.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub async fn join(self) -> Result<CrawlReport> {
        self.task
            .await
            .map_err(|e| anyhow!("Crawl controller died: {e}"))
    }

    pub async fn pages(self) -> Result<Vec<PageRecord>> {
        Ok(self.join().await?.pages)
    }
}

/// Starts crawling from `seed` on `runtime`, fetching with the handles of `pool`.
///
/// Fails only when `seed` can't be canonicalized.
pub fn start<F>(
    seed: &str,
    runtime: &Handle,
    pool: Arc<ResourcePool<F>>,
    config: CrawlerConfig,
) -> Result<CrawlHandle>
where
    F: PageFetcher,
{
    let collector = Collector::new(seed)?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let sigint = config.handle_sigint.then(|| {
        let stop_tx = stop_tx.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Ctrl-C received, draining crawl");
                stop_tx.send_replace(true);
            }
        })
    });

    let intake = Intake::new();
    let context = FetchContext {
        pool,
        intake: intake.sender(),
        max_depth: config.max_depth,
        task_timeout: config.task_timeout(),
    };
    let controller = Controller {
        config,
        collector,
        intake,
        context,
        in_flight: JoinSet::new(),
        runtime: runtime.clone(),
        stop: stop_rx,
        _stop_tx: stop_tx.clone(),
        sigint,
        stats: CrawlStats::default(),
        level: 0,
    };

    Ok(CrawlHandle {
        task: runtime.spawn(controller.run()),
        stop: stop_tx,
    })
}

/// Crawls from `seed` on the current runtime and waits for the report.
pub async fn crawl_site<F>(
    seed: &str,
    pool: Arc<ResourcePool<F>>,
    config: CrawlerConfig,
) -> Result<CrawlReport>
where
    F: PageFetcher,
{
    start(seed, &Handle::current(), pool, config)?.join().await
}

struct Controller<F: PageFetcher> {
    config: CrawlerConfig,
    collector: Collector,
    intake: Intake,
    context: FetchContext<F>,
    in_flight: JoinSet<FetchOutcome>,
    runtime: Handle,
    stop: watch::Receiver<bool>,
    // Keeps `stop` from reporting a closed channel once the handle is dropped
    _stop_tx: Arc<watch::Sender<bool>>,
    sigint: Option<JoinHandle<()>>,
    stats: CrawlStats,
    level: usize,
}

impl<F: PageFetcher> Controller<F> {
    async fn run(mut self) -> CrawlReport {
        log::info!(
            "Crawling {} (max depth {}, max pages {}, {} fetchers)",
            self.collector.root(),
            self.config.max_depth,
            self.config.max_pages,
            self.context.pool.capacity()
        );

        let reason = self.crawl().await;
        log::info!(
            "Stopping crawl of {}: {reason}, draining {} in-flight fetches",
            self.collector.root(),
            self.in_flight.len()
        );
        self.drain().await;

        if let Some(sigint) = self.sigint.take() {
            sigint.abort();
        }

        let stats = self.stats;
        let pages = self.collector.into_registry().into_fetched();
        log::info!(
            "Crawl finished with {} pages: dispatched={}, succeeded={}, failed={}, lost={}, discovered={}",
            pages.len(),
            stats.dispatched,
            stats.succeeded,
            stats.failed,
            stats.lost,
            stats.discovered
        );
        CrawlReport { pages, stats }
    }

    async fn crawl(&mut self) -> StopReason {
        loop {
            self.merge_completed();
            self.merge_intake();

            if self.stop_requested() {
                return StopReason::Interrupted;
            }
            if self.stats.dispatched >= self.config.max_pages {
                return StopReason::PageBudget;
            }

            match self.collector.next_pending() {
                Some(url) => {
                    if url.depth > self.level {
                        self.barrier().await;
                        log::info!("Entering level {}", url.depth);
                        self.level = url.depth;
                        if self.stop_requested() {
                            return StopReason::Interrupted;
                        }
                    }
                    self.dispatch(url);
                }
                None if self.in_flight.is_empty() => return StopReason::Exhausted,
                None => self.await_progress().await,
            }
        }
    }

    fn dispatch(&mut self, url: CanonicalUrl) {
        log::debug!("Dispatching {} at depth {}", url.domain, url.depth);
        self.in_flight
            .spawn_on(run_fetch(self.context.clone(), url), &self.runtime);
        self.stats.dispatched += 1;
    }

    /// Joins every in-flight fetch so the next level starts from a settled registry.
    async fn barrier(&mut self) {
        log::debug!("Level {} barrier on {} fetches", self.level, self.in_flight.len());
        while let Some(joined) = self.in_flight.join_next().await {
            self.merge_joined(joined);
        }
    }

    /// Nothing is pending but fetches are running: wait for one of them, a stop
    /// request or the poll timeout.
    async fn await_progress(&mut self) {
        let poll = self.config.poll_timeout();
        let joined = tokio::select! {
            joined = timeout(poll, self.in_flight.join_next()) => joined.ok().flatten(),
            _ = self.stop.changed() => None,
        };
        match joined {
            Some(joined) => self.merge_joined(joined),
            None => log::trace!("No fetch completed within {poll:?}"),
        }
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            self.merge_joined(joined);
        }
    }

    fn merge_completed(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            self.merge_joined(joined);
        }
    }

    fn merge_joined(&mut self, joined: Result<FetchOutcome, JoinError>) {
        match joined {
            Ok(outcome) => {
                if outcome.is_success() {
                    self.stats.succeeded += 1;
                } else {
                    self.stats.failed += 1;
                }
                if self.collector.merge_outcome(outcome).redirected_root {
                    self.stats.root_redirected = true;
                }
            }
            Err(e) => {
                log::error!("Fetch task died: {e}");
                self.stats.lost += 1;
                // Only the seed is ever in flight before the root is resolved
                if !self.collector.is_root_resolved() {
                    self.collector.settle_root();
                }
            }
        }
    }

    fn merge_intake(&mut self) {
        // Links found before the seed's outcome is merged would be filtered against a
        // site that a redirect may still change
        if !self.collector.is_root_resolved() || self.intake.is_empty() {
            return;
        }

        let merge = self.collector.merge_candidates(self.intake.drain());
        self.stats.discovered += merge.admitted;
        log::debug!(
            "Merged discovered urls: admitted={}, lowered={}, off_site={}, known={}",
            merge.admitted,
            merge.lowered,
            merge.off_site,
            merge.known
        );
    }

    fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }
}
