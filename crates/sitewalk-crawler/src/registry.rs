use std::collections::HashMap;

use crate::canonical::CanonicalUrl;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: CanonicalUrl,
    /// `None` until the page's fetch completed
    pub text: Option<String>,
}

impl PageRecord {
    pub fn new(url: CanonicalUrl) -> Self {
        Self { url, text: None }
    }

    pub fn domain(&self) -> &str {
        &self.url.domain
    }

    pub fn depth(&self) -> usize {
        self.url.depth
    }

    pub fn is_fetched(&self) -> bool {
        self.text.is_some()
    }
}

/// Every url seen during a crawl, keyed by canonical domain.
#[derive(Debug, Default)]
pub struct Registry {
    pages: HashMap<String, PageRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.pages.contains_key(domain)
    }

    pub fn get(&self, domain: &str) -> Option<&PageRecord> {
        self.pages.get(domain)
    }

    /// Records `url` unless its domain is already known.
    pub fn insert(&mut self, url: CanonicalUrl) -> bool {
        if self.pages.contains_key(&url.domain) {
            return false;
        }
        self.pages.insert(url.domain.clone(), PageRecord::new(url));
        true
    }

    pub fn remove(&mut self, domain: &str) -> Option<PageRecord> {
        self.pages.remove(domain)
    }

    pub fn set_text(&mut self, domain: &str, text: String) -> bool {
        match self.pages.get_mut(domain) {
            Some(page) => {
                page.text = Some(text);
                true
            }
            None => false,
        }
    }

    pub fn lower_depth(&mut self, url: &CanonicalUrl) -> bool {
        match self.pages.get_mut(&url.domain) {
            Some(page) if page.url.depth > url.depth => {
                page.url.depth = url.depth;
                true
            }
            _ => false,
        }
    }

    /// Fetched pages, shallowest first then by domain.
    pub fn into_fetched(self) -> Vec<PageRecord> {
        let mut pages: Vec<_> = self
            .pages
            .into_values()
            .filter(PageRecord::is_fetched)
            .collect();
        pages.sort_by(|a, b| {
            a.depth()
                .cmp(&b.depth())
                .then_with(|| a.domain().cmp(b.domain()))
        });
        pages
    }
}
