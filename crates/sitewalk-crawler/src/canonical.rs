const WWW: &str = "www.";

/// A canonical domain key together with its BFS distance from the seed.
///
/// Frontier order only looks at `depth`, two urls at the same depth are unordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl {
    pub domain: String,
    pub depth: usize,
}

impl CanonicalUrl {
    pub fn new(domain: impl Into<String>, depth: usize) -> Self {
        Self {
            domain: domain.into(),
            depth,
        }
    }

    /// Canonicalizes `raw`, `None` when it isn't shaped like a url.
    pub fn parse(raw: &str, depth: usize) -> Option<Self> {
        canonicalize(raw).map(|domain| Self { domain, depth })
    }
}

/// Turns a raw url into its canonical domain key.
///
/// Scheme and leading `www.` are stripped, the host is lowercased and trailing
/// slashes are removed, so that `https://www.Example.com/docs/` becomes
/// `example.com/docs`. Applying it twice yields the same key.
pub fn canonicalize(raw: &str) -> Option<String> {
    let mut rest = raw.trim();
    while let Some(stripped) = strip_scheme(rest).or_else(|| strip_www(rest)) {
        rest = stripped.trim_start();
    }

    let host_end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let (host, path) = rest.split_at(host_end);
    let host = host.to_ascii_lowercase();
    if !host.chars().next().is_some_and(is_host_char) {
        return None;
    }

    let domain = host + path;
    let domain = domain.trim_end_matches(|c: char| c == '/' || c.is_whitespace());
    (!domain.is_empty()).then(|| domain.to_string())
}

/// Leading host-like part of a canonical domain, used for same-site checks.
pub fn base_domain(domain: &str) -> Option<String> {
    let end = domain
        .find(|c: char| !is_host_char(c))
        .unwrap_or(domain.len());
    domain
        .get(..end)
        .filter(|base| !base.is_empty())
        .map(str::to_string)
}

/// Same-site predicate: the site's base domain must *contain* the candidate's one.
///
/// Containment is a plain substring test, so `example.com` also admits `ample.c`.
pub fn is_same_site(site_base: &str, candidate: &str) -> bool {
    base_domain(candidate).is_some_and(|base| site_base.contains(base.as_str()))
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, ' ' | '-' | '.')
}

fn strip_scheme(s: &str) -> Option<&str> {
    let (scheme, rest) = s.split_once("://")?;
    scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        .then_some(rest)
}

fn strip_www(s: &str) -> Option<&str> {
    let prefix = s.get(..WWW.len())?;
    if prefix.eq_ignore_ascii_case(WWW) {
        s.get(WWW.len()..)
    } else {
        None
    }
}
