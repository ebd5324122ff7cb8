use std::collections::{BTreeMap, HashMap};

use crate::canonical::CanonicalUrl;

type Slot = (usize, u64);

/// Pending urls ordered by ascending depth, indexed by domain so that a queued entry
/// can be moved to a shallower depth.
#[derive(Debug, Default)]
pub struct Frontier {
    order: BTreeMap<Slot, String>,
    index: HashMap<String, Slot>,
    next_seq: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.index.contains_key(domain)
    }

    pub fn depth_of(&self, domain: &str) -> Option<usize> {
        self.index.get(domain).map(|&(depth, _)| depth)
    }

    /// Depth of the entry `pop` would return.
    pub fn peek_depth(&self) -> Option<usize> {
        self.order.keys().next().map(|&(depth, _)| depth)
    }

    /// Queues `url`, returns false when its domain is already queued.
    pub fn push(&mut self, url: CanonicalUrl) -> bool {
        if self.index.contains_key(&url.domain) {
            return false;
        }
        self.insert(url);
        true
    }

    /// Moves a queued domain to `url.depth` if that is shallower than where it sits.
    pub fn lower(&mut self, url: &CanonicalUrl) -> bool {
        match self.index.get(&url.domain) {
            Some(&(depth, seq)) if depth > url.depth => {
                self.order.remove(&(depth, seq));
                self.insert(url.clone());
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, domain: &str) -> Option<CanonicalUrl> {
        let (depth, seq) = self.index.remove(domain)?;
        self.order.remove(&(depth, seq));
        Some(CanonicalUrl::new(domain, depth))
    }

    pub fn pop(&mut self) -> Option<CanonicalUrl> {
        let ((depth, _), domain) = self.order.pop_first()?;
        self.index.remove(&domain);
        Some(CanonicalUrl { domain, depth })
    }

    fn insert(&mut self, url: CanonicalUrl) {
        let slot = (url.depth, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.index.insert(url.domain.clone(), slot);
        self.order.insert(slot, url.domain);
    }
}
