use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Error};
use tokio::time::timeout;

use crate::canonical::{canonicalize, CanonicalUrl};
use crate::fetcher::{FetchedPage, PageFetcher};
use crate::intake::IntakeSender;
use crate::pool::ResourcePool;

/// Result of one fetch task, merged by the controller.
#[derive(Debug)]
pub struct FetchOutcome {
    pub requested: CanonicalUrl,
    /// Canonical domain the page settled on
    pub resolved: String,
    pub text: String,
    pub error: Option<Error>,
}

impl FetchOutcome {
    pub fn failed(requested: CanonicalUrl, error: Error) -> Self {
        Self {
            resolved: requested.domain.clone(),
            requested,
            text: String::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a fetch task needs besides the url it crawls.
pub struct FetchContext<F> {
    pub pool: Arc<ResourcePool<F>>,
    pub intake: IntakeSender,
    pub max_depth: usize,
    pub task_timeout: Option<Duration>,
}

impl<F> Clone for FetchContext<F> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            intake: self.intake.clone(),
            max_depth: self.max_depth,
            task_timeout: self.task_timeout,
        }
    }
}

pub async fn run_fetch<F>(ctx: FetchContext<F>, url: CanonicalUrl) -> FetchOutcome
where
    F: PageFetcher,
{
    let mut fetcher = match ctx.pool.acquire().await {
        Ok(fetcher) => fetcher,
        Err(e) => return FetchOutcome::failed(url, e),
    };

    log::trace!("Fetching {} at depth {}", url.domain, url.depth);
    let fetched = match ctx.task_timeout {
        Some(limit) => match timeout(limit, fetcher.fetch(&url.domain)).await {
            Ok(fetched) => fetched,
            Err(_) => Err(anyhow!("Fetch didn't complete within {limit:?}")),
        },
        None => fetcher.fetch(&url.domain).await,
    };

    let outcome = match fetched {
        Ok(page) => {
            stage_links(&ctx, &url, &page);
            let resolved = canonicalize(&page.resolved).unwrap_or_else(|| url.domain.clone());
            FetchOutcome {
                requested: url,
                resolved,
                text: page.text,
                error: None,
            }
        }
        Err(e) => FetchOutcome::failed(url, e),
    };

    drop(fetcher);
    outcome
}

fn stage_links<F>(ctx: &FetchContext<F>, parent: &CanonicalUrl, page: &FetchedPage) {
    let depth = parent.depth + 1;
    if depth > ctx.max_depth {
        return;
    }

    let mut seen = HashSet::new();
    page.links
        .iter()
        .filter_map(|href| canonicalize(href))
        .filter(|domain| seen.insert(domain.clone()))
        .for_each(|domain| ctx.intake.stage(CanonicalUrl::new(domain, depth)));
}
