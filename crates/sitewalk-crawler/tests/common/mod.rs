#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitewalk_crawler::{
    anyhow, async_trait, CrawlerConfig, FetchedPage, PageFetcher, ResourcePool,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    Finish(String),
}

#[derive(Debug, Clone, Default)]
pub struct StubPage {
    links: Vec<String>,
    delay: Duration,
    resolved: Option<String>,
    failing: bool,
    panicking: bool,
}

impl StubPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    pub fn resolved(mut self, resolved: &str) -> Self {
        self.resolved = Some(resolved.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panicking = true;
        self
    }
}

/// In-memory site keyed by canonical domain, recording every fetch it serves.
#[derive(Debug, Default)]
pub struct StubSite {
    pages: HashMap<String, StubPage>,
    events: Mutex<Vec<Event>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    closed: AtomicUsize,
}

impl StubSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, domain: &str, page: StubPage) -> Self {
        self.pages.insert(domain.to_string(), page);
        self
    }

    pub fn text_of(domain: &str) -> String {
        format!("text of {domain}")
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(domain) => Some(domain),
                Event::Finish(_) => None,
            })
            .collect()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct StubFetcher {
    site: Arc<StubSite>,
}

impl StubFetcher {
    pub fn new(site: Arc<StubSite>) -> Self {
        Self { site }
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&mut self, domain: &str) -> anyhow::Result<FetchedPage> {
        let site = self.site.clone();
        site.record(Event::Start(domain.to_string()));
        let active = site.active.fetch_add(1, Ordering::SeqCst) + 1;
        site.peak.fetch_max(active, Ordering::SeqCst);

        let page = site.pages.get(domain).cloned();
        if let Some(page) = &page {
            tokio::time::sleep(page.delay).await;
        }

        site.active.fetch_sub(1, Ordering::SeqCst);
        site.record(Event::Finish(domain.to_string()));

        let page = page.ok_or_else(|| anyhow::anyhow!("No page at {domain}"))?;
        if page.panicking {
            panic!("Fetcher blew up on {domain}");
        }
        if page.failing {
            anyhow::bail!("Connection refused by {domain}");
        }
        Ok(FetchedPage {
            resolved: page
                .resolved
                .unwrap_or_else(|| format!("https://{domain}/")),
            links: page.links,
            text: StubSite::text_of(domain),
        })
    }

    async fn close(self) -> anyhow::Result<()> {
        self.site.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn pool(site: &Arc<StubSite>, size: usize) -> Arc<ResourcePool<StubFetcher>> {
    let pool = ResourcePool::build(size, || Ok(StubFetcher::new(site.clone()))).unwrap();
    Arc::new(pool)
}

pub fn config(max_depth: usize, max_pages: usize) -> CrawlerConfig {
    CrawlerConfig {
        max_depth,
        max_pages,
        poll_timeout_ms: 50,
        handle_sigint: false,
        ..Default::default()
    }
}
