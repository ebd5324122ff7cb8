use sitewalk_crawler::{anyhow, canonicalize, CanonicalUrl, Collector, FetchOutcome};

fn url(domain: &str, depth: usize) -> CanonicalUrl {
    CanonicalUrl::new(domain, depth)
}

fn outcome(requested: CanonicalUrl, resolved: &str, text: &str) -> FetchOutcome {
    FetchOutcome {
        requested,
        resolved: resolved.to_string(),
        text: text.to_string(),
        error: None,
    }
}

#[test]
fn seed_is_registered_and_queued() {
    let collector = Collector::new("https://www.example.com/").unwrap();
    assert_eq!(collector.root(), "example.com");
    assert_eq!(collector.site(), "example.com");
    assert!(!collector.is_root_resolved());
    assert_eq!(collector.registry().len(), 1);
    assert_eq!(collector.frontier().depth_of("example.com"), Some(0));
}

#[test]
fn invalid_seed_is_an_error() {
    assert!(Collector::new("").is_err());
    assert!(Collector::new("/just/a/path").is_err());
}

#[test]
fn duplicate_hrefs_make_one_record() {
    let mut collector = Collector::new("https://example.com").unwrap();
    let seed = collector.next_pending().unwrap();
    collector.merge_outcome(outcome(seed, "example.com", "home"));

    let candidates = ["https://www.example.com/about/", "http://example.com/about"]
        .iter()
        .map(|href| url(&canonicalize(href).unwrap(), 1));
    let merge = collector.merge_candidates(candidates);

    assert_eq!(merge.admitted, 1);
    assert_eq!(merge.known, 1);
    assert_eq!(collector.registry().len(), 2);
    assert_eq!(collector.frontier().len(), 1);
    assert_eq!(collector.frontier().depth_of("example.com/about"), Some(1));
}

#[test]
fn off_site_candidates_are_dropped() {
    let mut collector = Collector::new("https://example.com").unwrap();
    let merge = collector.merge_candidates([url("other.org/x", 1), url("example.com/y", 1)]);
    assert_eq!(merge.off_site, 1);
    assert_eq!(merge.admitted, 1);
    assert!(!collector.registry().contains("other.org/x"));
}

#[test]
fn seed_redirect_rekeys_root() {
    let mut collector = Collector::new("http://site.com").unwrap();
    let seed = collector.next_pending().unwrap();
    let resolved = canonicalize("http://site.com/en").unwrap();

    let merge = collector.merge_outcome(outcome(seed, &resolved, "welcome"));

    assert!(merge.redirected_root);
    assert!(merge.stored);
    assert!(collector.is_root_resolved());
    assert_eq!(collector.root(), "site.com/en");
    assert_eq!(collector.site(), "site.com");
    assert!(!collector.registry().contains("site.com"));
    let record = collector.registry().get("site.com/en").unwrap();
    assert_eq!(record.depth(), 0);
    assert_eq!(record.text.as_deref(), Some("welcome"));
}

#[test]
fn seed_redirect_to_other_host_moves_site() {
    let mut collector = Collector::new("https://old-site.com").unwrap();
    let seed = collector.next_pending().unwrap();

    collector.merge_outcome(outcome(seed, "new-site.com/home", "moved"));

    assert_eq!(collector.site(), "new-site.com");
    let merge = collector.merge_candidates([url("new-site.com/a", 1), url("old-site.com/b", 1)]);
    assert_eq!(merge.admitted, 1);
    assert_eq!(merge.off_site, 1);
}

#[test]
fn redirect_is_checked_only_once() {
    let mut collector = Collector::new("https://site.com").unwrap();
    let seed = collector.next_pending().unwrap();
    collector.merge_outcome(outcome(seed, "site.com", "home"));
    collector.merge_candidates([url("site.com/a", 1)]);
    let a = collector.next_pending().unwrap();

    let merge = collector.merge_outcome(outcome(a, "site.com/elsewhere", "lost"));

    assert!(!merge.redirected_root);
    assert!(!merge.stored);
    assert_eq!(collector.root(), "site.com");
    assert!(collector.registry().get("site.com/a").unwrap().text.is_none());
}

#[test]
fn redirect_onto_known_key_keeps_seed_record() {
    let mut collector = Collector::new("https://site.com").unwrap();
    let seed = collector.next_pending().unwrap();
    collector.merge_candidates([url("site.com/en", 1)]);

    let merge = collector.merge_outcome(outcome(seed, "site.com/en", "english"));

    assert!(!merge.redirected_root);
    assert!(collector.is_root_resolved());
    assert_eq!(collector.root(), "site.com");
    assert!(collector.registry().get("site.com").unwrap().text.is_none());
    assert_eq!(
        collector.registry().get("site.com/en").unwrap().text.as_deref(),
        Some("english")
    );
}

#[test]
fn failed_outcome_stores_empty_text() {
    let mut collector = Collector::new("https://site.com").unwrap();
    let seed = collector.next_pending().unwrap();

    let merge = collector.merge_outcome(FetchOutcome::failed(seed, anyhow::anyhow!("timeout")));

    assert!(merge.stored);
    assert!(!merge.redirected_root);
    assert_eq!(
        collector.registry().get("site.com").unwrap().text.as_deref(),
        Some("")
    );
}

#[test]
fn rediscovery_lowers_queued_depth() {
    let mut collector = Collector::new("https://site.com").unwrap();
    let seed = collector.next_pending().unwrap();
    collector.merge_outcome(outcome(seed, "site.com", "home"));

    let merge = collector.merge_candidates([url("site.com/x", 3), url("site.com/x", 1)]);

    assert_eq!(merge.admitted, 1);
    assert_eq!(merge.lowered, 1);
    assert_eq!(collector.frontier().len(), 1);
    assert_eq!(collector.frontier().depth_of("site.com/x"), Some(1));
    assert_eq!(collector.registry().get("site.com/x").unwrap().depth(), 1);

    let merge = collector.merge_candidates([url("site.com/x", 2)]);
    assert_eq!(merge.known, 1);
    assert_eq!(collector.frontier().depth_of("site.com/x"), Some(1));
}

#[test]
fn dispatched_record_keeps_its_depth() {
    let mut collector = Collector::new("https://site.com").unwrap();
    let seed = collector.next_pending().unwrap();
    collector.merge_outcome(outcome(seed, "site.com", "home"));
    collector.merge_candidates([url("site.com/x", 3)]);
    let dispatched = collector.next_pending().unwrap();
    assert_eq!(dispatched.depth, 3);

    let merge = collector.merge_candidates([url("site.com/x", 1)]);

    assert_eq!(merge.lowered, 0);
    assert_eq!(merge.known, 1);
    assert!(collector.frontier().is_empty());
    assert_eq!(collector.registry().get("site.com/x").unwrap().depth(), 3);
}

#[test]
fn fetched_records_come_out_by_depth() {
    let mut collector = Collector::new("https://site.com").unwrap();
    let seed = collector.next_pending().unwrap();
    collector.merge_outcome(outcome(seed, "site.com", "home"));
    collector.merge_candidates([url("site.com/b", 1), url("site.com/a", 1), url("site.com/c", 1)]);
    for _ in 0..2 {
        let next = collector.next_pending().unwrap();
        let resolved = next.domain.clone();
        collector.merge_outcome(outcome(next, &resolved, "page"));
    }

    let pages = collector.into_registry().into_fetched();
    let domains: Vec<_> = pages.iter().map(|p| p.domain()).collect();
    assert_eq!(domains.len(), 3);
    assert_eq!(domains[0], "site.com");
    assert!(pages.iter().all(|p| p.is_fetched()));
    assert!(domains[1] < domains[2]);
}
