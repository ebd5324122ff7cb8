use anyhow::{anyhow, Result};

use crate::canonical::{base_domain, canonicalize, is_same_site, CanonicalUrl};
use crate::frontier::Frontier;
use crate::registry::{PageRecord, Registry};
use crate::task::FetchOutcome;

/// What merging one fetch outcome changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeMerge {
    pub stored: bool,
    pub redirected_root: bool,
}

/// What merging a batch of discovered urls changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeMerge {
    pub admitted: usize,
    pub lowered: usize,
    pub off_site: usize,
    pub known: usize,
}

/// Owns the registry and the frontier and applies every change made to them.
#[derive(Debug)]
pub struct Collector {
    registry: Registry,
    frontier: Frontier,
    root: String,
    site: String,
    root_resolved: bool,
}

impl Collector {
    pub fn new(seed: &str) -> Result<Self> {
        let root = canonicalize(seed).ok_or_else(|| anyhow!("Invalid seed url: {seed:?}"))?;
        let site =
            base_domain(&root).ok_or_else(|| anyhow!("Seed url {seed:?} has no host part"))?;

        let mut registry = Registry::new();
        let mut frontier = Frontier::new();
        registry.insert(CanonicalUrl::new(root.clone(), 0));
        frontier.push(CanonicalUrl::new(root.clone(), 0));

        Ok(Self {
            registry,
            frontier,
            root,
            site,
            root_resolved: false,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Canonical domain of the seed, corrected after its first fetch if it redirected.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Base domain the same-site filter compares candidates against.
    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn is_root_resolved(&self) -> bool {
        self.root_resolved
    }

    /// Gives up on a redirect correction of the seed, e.g. because its fetch task died.
    pub fn settle_root(&mut self) {
        self.root_resolved = true;
    }

    /// Takes the shallowest pending url, it won't be queued again.
    pub fn next_pending(&mut self) -> Option<CanonicalUrl> {
        self.frontier.pop()
    }

    pub fn merge_outcome(&mut self, outcome: FetchOutcome) -> OutcomeMerge {
        let FetchOutcome {
            requested,
            resolved,
            text,
            error,
        } = outcome;

        if let Some(e) = error {
            log::warn!("Fetch failed for {}: {e:#}", requested.domain);
        }

        let mut merge = OutcomeMerge::default();
        if !self.root_resolved {
            self.root_resolved = true;
            if resolved != self.root && !self.registry.contains(&resolved) {
                self.redirect_root(&resolved);
                merge.redirected_root = true;
            }
        }

        merge.stored = self.registry.set_text(&resolved, text);
        if !merge.stored {
            log::debug!(
                "Dropping text of {}, it resolved to unknown {resolved}",
                requested.domain
            );
        }
        merge
    }

    pub fn merge_candidates<I>(&mut self, candidates: I) -> IntakeMerge
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        let mut merge = IntakeMerge::default();
        for candidate in candidates {
            if !is_same_site(&self.site, &candidate.domain) {
                merge.off_site += 1;
                continue;
            }

            match self.registry.get(&candidate.domain).map(PageRecord::depth) {
                None => {
                    self.registry.insert(candidate.clone());
                    self.frontier.push(candidate);
                    merge.admitted += 1;
                }
                // A dispatched record is no longer in the frontier and keeps its depth
                Some(depth) if depth > candidate.depth => {
                    if self.frontier.lower(&candidate) {
                        self.registry.lower_depth(&candidate);
                        merge.lowered += 1;
                    } else {
                        merge.known += 1;
                    }
                }
                Some(_) => merge.known += 1,
            }
        }
        merge
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    fn redirect_root(&mut self, resolved: &str) {
        log::info!("Seed {} redirected to {resolved}", self.root);
        self.registry.remove(&self.root);
        self.frontier.remove(&self.root);
        self.registry.insert(CanonicalUrl::new(resolved, 0));
        match base_domain(resolved) {
            Some(site) => self.site = site,
            None => log::warn!("Keeping site {} since {resolved} has no host part", self.site),
        }
        self.root = resolved.to_string();
    }
}
