//! Repository identifier normalization.
//!
//! Raw identifiers arrive as bare `owner/name` pairs, full GitHub URLs, or
//! the double-prefixed garbage left behind by earlier faulty merges
//! (`owner/https://github.com/owner/name`). Normalization is total and
//! idempotent; it strips prefixes to a fixpoint and leaves anything it
//! cannot reduce for the plausibility check to flag.
use regex::Regex;
use std::sync::OnceLock;

fn url_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://github\.com/").unwrap())
}

fn doubled_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^/]+/https?://github\.com/").unwrap())
}

/// Canonicalize a raw repository reference into `owner/name` form.
///
/// Prefix stripping repeats until nothing changes, which makes
/// `normalize(normalize(x)) == normalize(x)` hold for every input rather
/// than just the shapes observed so far.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let stripped = url_prefix().replace(&current, "");
        let stripped = doubled_prefix().replace(&stripped, "");
        if stripped == current {
            return current;
        }
        current = stripped.into_owned();
    }
}

/// Prefix a bare repository name with the default organization namespace.
///
/// Identifiers that already carry an `owner/` segment pass through.
pub fn qualify(identifier: &str, namespace: &str) -> String {
    if identifier.contains('/') {
        identifier.to_string()
    } else {
        format!("{namespace}/{identifier}")
    }
}

/// Whether a normalized identifier reduced to a usable `owner/name` key.
///
/// Normalization is best-effort; shapes it cannot reduce are reported and
/// skipped by callers instead of poisoning the registry.
pub fn is_plausible(identifier: &str) -> bool {
    let mut segments = identifier.split('/');
    let (Some(owner), Some(name), None) = (segments.next(), segments.next(), segments.next())
    else {
        return false;
    };
    !owner.is_empty() && !name.is_empty() && !identifier.contains(':')
}

/// Derive the canonical repository URL; never independently authoritative.
pub fn url_for(identifier: &str) -> String {
    format!("https://github.com/{identifier}")
}
