//! Final pass dropping tracking pixels, spinners and small UI icons.

use crate::candidate::ImageCandidate;
use crate::config::Thresholds;

pub const TRACKING_MARKERS: &[&str] = &["tracking", "pixel", "1x1"];
pub const LOADER_MARKERS: &[&str] = &["spinner", "loader"];
pub const ICON_MARKER: &str = "icon";

/// A candidate is noise if any rule matches. URL checks are case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseRule {
    UrlContains(Vec<String>),
    /// URL contains `needle` and the width is known and below `max_width`.
    /// Unknown width never matches.
    UrlContainsWithNarrowWidth { needle: String, max_width: u32 },
}

impl NoiseRule {
    fn url_contains(needles: &[&str]) -> Self {
        NoiseRule::UrlContains(needles.iter().map(|n| n.to_lowercase()).collect())
    }

    pub fn matches(&self, candidate: &ImageCandidate) -> bool {
        let url = candidate.url.to_lowercase();
        match self {
            NoiseRule::UrlContains(needles) => needles.iter().any(|n| url.contains(n.as_str())),
            NoiseRule::UrlContainsWithNarrowWidth { needle, max_width } => {
                url.contains(needle.as_str()) && candidate.width.is_some_and(|w| w < *max_width)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFilter {
    rules: Vec<NoiseRule>,
}

impl NoiseFilter {
    pub fn new(rules: Vec<NoiseRule>) -> Self {
        Self { rules }
    }

    pub fn from_thresholds(thresholds: &Thresholds) -> Self {
        Self::new(vec![
            NoiseRule::url_contains(TRACKING_MARKERS),
            NoiseRule::UrlContainsWithNarrowWidth {
                needle: ICON_MARKER.to_string(),
                max_width: thresholds.icon_max_width,
            },
            NoiseRule::url_contains(LOADER_MARKERS),
        ])
    }

    pub fn is_noise(&self, candidate: &ImageCandidate) -> bool {
        self.rules.iter().any(|rule| rule.matches(candidate))
    }

    pub fn apply(&self, candidates: Vec<ImageCandidate>) -> Vec<ImageCandidate> {
        candidates.into_iter().filter(|c| !self.is_noise(c)).collect()
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::from_thresholds(&Thresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateSource, Role};

    fn candidate(url: &str, width: Option<u32>) -> ImageCandidate {
        ImageCandidate {
            url: url.to_string(),
            alt: None,
            width,
            height: width,
            role: Role::Other,
            source: CandidateSource::HtmlImg,
            vendor_class: None,
        }
    }

    #[test]
    fn test_tracking_and_loader_urls_dropped() {
        let filter = NoiseFilter::default();
        assert!(filter.is_noise(&candidate("https://ads.example.com/tracking-pixel.gif", None)));
        assert!(filter.is_noise(&candidate("https://acme.test/img/1x1.png", Some(1))));
        assert!(filter.is_noise(&candidate("https://acme.test/assets/Spinner.svg", Some(800))));
        assert!(filter.is_noise(&candidate("https://acme.test/LOADER.gif", None)));
        assert!(!filter.is_noise(&candidate("https://acme.test/team.jpg", Some(640))));
    }

    #[test]
    fn test_icon_rule_needs_known_width() {
        let filter = NoiseFilter::default();
        assert!(filter.is_noise(&candidate("https://acme.test/icon-small.png", Some(20))));
        assert!(!filter.is_noise(&candidate("https://acme.test/icon-small.png", None)));
        assert!(!filter.is_noise(&candidate("https://acme.test/icon-small.png", Some(50))));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let filter = NoiseFilter::default();
        let input = vec![
            candidate("https://acme.test/hero.jpg", Some(1600)),
            candidate("https://acme.test/pixel.gif", Some(1)),
            candidate("https://acme.test/icon.svg", None),
            candidate("https://acme.test/icon.svg?v=2", Some(16)),
        ];
        let once = filter.apply(input);
        let twice = filter.apply(once.clone());
        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }
}
