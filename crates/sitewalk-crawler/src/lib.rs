mod canonical;
mod collector;
mod config;
mod crawler;
mod fetcher;
mod frontier;
mod intake;
mod pool;
mod registry;
mod task;

pub use canonical::{base_domain, canonicalize, is_same_site, CanonicalUrl};
pub use collector::{Collector, IntakeMerge, OutcomeMerge};
pub use config::CrawlerConfig;
pub use crawler::{crawl_site, start, CrawlHandle, CrawlReport, CrawlStats};
pub use fetcher::{FetchedPage, PageFetcher};
pub use frontier::Frontier;
pub use intake::{Intake, IntakeSender};
pub use pool::{PooledHandle, ResourcePool};
pub use registry::{PageRecord, Registry};
pub use task::{run_fetch, FetchContext, FetchOutcome};

pub use anyhow;
pub use async_trait::async_trait;
