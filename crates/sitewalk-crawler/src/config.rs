use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    /// Deepest BFS level that gets dispatched, the seed being level 0
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of dispatched fetches for one crawl
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of fetchers in the resource pool
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Fetches running longer than this count as failed
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: Option<u64>,

    /// Installs a process wide Ctrl-C handler that stops the crawl, it stays
    /// installed after the crawl ends
    #[serde(default)]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            pool_size: default_pool_size(),
            poll_timeout_ms: default_poll_timeout_ms(),
            task_timeout_ms: default_task_timeout_ms(),
            handle_sigint: false,
        }
    }
}

impl CrawlerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}

fn default_max_depth() -> usize {
    3
}

fn default_max_pages() -> usize {
    10
}

fn default_pool_size() -> usize {
    5
}

fn default_poll_timeout_ms() -> u64 {
    5_000
}

fn default_task_timeout_ms() -> Option<u64> {
    None
}
