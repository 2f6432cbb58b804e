//! URL canonicalization for the dedup tracker.
//!
//! Every URL entering the frontier or the store is reduced to a canonical
//! form first: resolved to absolute against its referrer, fragment stripped,
//! trailing slash normalized. The canonical string is the sole identity key
//! for pages and visits.

use url::Url;

/// Canonicalize an href discovered on `referrer`.
///
/// Returns `None` for hrefs that cannot name a crawlable page: unparseable
/// values, non-http(s) schemes (`mailto:`, `javascript:`, ...), and
/// fragment-only self links.
pub fn canonicalize(referrer: &Url, href: &str) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut resolved = referrer.join(trimmed).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }

    resolved.set_fragment(None);
    Some(normalize_trailing_slash(resolved))
}

/// Canonicalize an absolute URL string (e.g. the configured seed, or a URL
/// supplied by a tool caller).
pub fn canonicalize_absolute(input: &str) -> Option<String> {
    let mut parsed = Url::parse(input.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.set_fragment(None);
    Some(normalize_trailing_slash(parsed))
}

/// Drop a trailing slash from the path, except for the bare root path.
fn normalize_trailing_slash(mut url: Url) -> String {
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    url.to_string()
}
