//! Absolute URL resolution and per-run de-duplication.

use reqwest::Url;
use std::collections::HashSet;

/// Resolve `raw` against the page URL.
///
/// Absolute `http(s)` references pass through as written (trimmed) once they
/// parse. Protocol-relative references take the page's scheme, root-relative
/// ones its origin, anything else resolves per standard URL joining. Returns
/// `None` for data URIs, unparsable references and non-HTTP schemes.
pub fn normalize_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("data:") {
        return None;
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        let parsed = Url::parse(raw).ok()?;
        return is_web_url(&parsed).then(|| raw.to_string());
    }

    let resolved = if raw.starts_with("//") {
        Url::parse(&format!("{}:{}", base.scheme(), raw)).ok()?
    } else {
        // root-relative and relative forms
        base.join(raw).ok()?
    };
    is_web_url(&resolved).then(|| resolved.to_string())
}

fn is_web_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
}

/// Seen-set keyed by normalized URL. First occurrence wins.
#[derive(Debug)]
pub struct Deduplicator {
    base: Url,
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            seen: HashSet::new(),
        }
    }

    /// Normalized URL if it resolves and has not been admitted before.
    pub fn admit(&mut self, raw: &str) -> Option<String> {
        let url = normalize_url(&self.base, raw)?;
        if self.seen.insert(url.clone()) {
            Some(url)
        } else {
            None
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/site/").unwrap()
    }

    #[test]
    fn test_protocol_relative_takes_page_scheme() {
        assert_eq!(
            normalize_url(&base(), "//cdn.example.com/img.jpg").as_deref(),
            Some("https://cdn.example.com/img.jpg")
        );
        let http = Url::parse("http://example.com/").unwrap();
        assert_eq!(
            normalize_url(&http, "//cdn.example.com/img.jpg").as_deref(),
            Some("http://cdn.example.com/img.jpg")
        );
    }

    #[test]
    fn test_root_relative_takes_origin() {
        assert_eq!(
            normalize_url(&base(), "/assets/logo.png").as_deref(),
            Some("https://example.com/assets/logo.png")
        );
    }

    #[test]
    fn test_relative_resolves_against_page() {
        assert_eq!(
            normalize_url(&base(), "photo.jpg").as_deref(),
            Some("https://example.com/site/photo.jpg")
        );
        assert_eq!(
            normalize_url(&base(), "../up.jpg").as_deref(),
            Some("https://example.com/up.jpg")
        );
    }

    #[test]
    fn test_absolute_passes_through() {
        assert_eq!(
            normalize_url(&base(), "https://images.squarespace-cdn.com/content/v1/a.jpg?format=1500w").as_deref(),
            Some("https://images.squarespace-cdn.com/content/v1/a.jpg?format=1500w")
        );
    }

    #[test]
    fn test_absolute_is_not_reserialized() {
        assert_eq!(
            normalize_url(&base(), "  https://CDN.Example.com  ").as_deref(),
            Some("https://CDN.Example.com")
        );
        assert_eq!(
            normalize_url(&base(), "https://cdn.example.com/a b.jpg").as_deref(),
            Some("https://cdn.example.com/a b.jpg")
        );
        assert_eq!(normalize_url(&base(), "https://:80/a.jpg"), None);
    }

    #[test]
    fn test_rejects_data_and_garbage() {
        assert_eq!(normalize_url(&base(), "data:image/png;base64,AAAA"), None);
        assert_eq!(normalize_url(&base(), "DATA:image/png;base64,AAAA"), None);
        assert_eq!(normalize_url(&base(), "   "), None);
        assert_eq!(normalize_url(&base(), "http://"), None);
        assert_eq!(normalize_url(&base(), "javascript:void(0)"), None);
        assert_eq!(normalize_url(&base(), "//"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut dedup = Deduplicator::new(base());
        assert_eq!(
            dedup.admit("/assets/logo.png").as_deref(),
            Some("https://example.com/assets/logo.png")
        );
        assert_eq!(dedup.admit("https://example.com/assets/logo.png"), None);
        assert_eq!(dedup.admit("../assets/logo.png"), None);
        assert_eq!(dedup.admit("data:image/png;base64,AAAA"), None);
        assert_eq!(dedup.seen_count(), 1);
    }
}
