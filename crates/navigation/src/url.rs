//! URL rules shared by the address bar and the command dispatcher.
//!
//! Every function here is total: malformed input falls through unchanged
//! rather than producing an error.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// `label(.label)+`, the shape of a bare domain typed without a scheme.
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("domain regex is valid")
});

const EMBED_MARKER: &str = "youtube.com/embed/";

pub fn has_http_scheme(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

pub fn looks_like_domain(input: &str) -> bool {
    DOMAIN_PATTERN.is_match(input)
}

/// Turn address-bar input into a URL.
///
/// Qualified URLs pass through, bare domains get `https://`, anything else
/// becomes a query against `search_url` (its `{query}` placeholder is replaced
/// by the percent-encoded input). Returns `None` for blank input.
pub fn normalize_input(input: &str, search_url: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if has_http_scheme(trimmed) {
        return Some(trimmed.to_string());
    }

    if looks_like_domain(trimmed) {
        return Some(format!("https://{}", trimmed));
    }

    let encoded = urlencoding::encode(trimmed);
    Some(search_url.replace("{query}", &encoded))
}

/// Rewrite video watch/short links into the provider's embeddable player URL.
pub fn rewrite_for_embed(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return url.to_string(),
    };
    let host = match parsed.host_str() {
        Some(h) => h,
        None => return url.to_string(),
    };

    if !host.contains("youtube.com") && !host.contains("youtu.be") {
        return url.to_string();
    }
    if parsed.path().starts_with("/embed/") {
        return url.to_string();
    }

    let video_id = parsed
        .query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty());
    if let Some(id) = video_id {
        return embed_url(&id);
    }

    if host == "youtu.be" {
        let id = parsed.path().trim_start_matches('/');
        if !id.is_empty() {
            return embed_url(id);
        }
    }

    url.to_string()
}

fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}?autoplay=1", video_id)
}

/// Whether `url` points at a domain known to refuse being framed.
/// Player URLs produced by [`rewrite_for_embed`] are always allowed.
pub fn is_likely_blocked(url: &str, blocked_domains: &[String]) -> bool {
    if url.contains(EMBED_MARKER) {
        return false;
    }
    let lower = url.to_lowercase();
    blocked_domains
        .iter()
        .any(|domain| lower.contains(domain.to_lowercase().as_str()))
}
