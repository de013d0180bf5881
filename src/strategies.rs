//! The three extraction strategies.
//!
//! Each works on one snapshot record at a time and returns `None` for anything
//! it cannot use. A malformed element costs exactly one candidate.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::candidate::{CandidateSource, Role};
use crate::snapshot::{BackgroundBlock, ImgElement, PageSnapshot, PictureElement};

/// `<img>` attributes checked for a source, in priority order.
pub const LAZY_SOURCE_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-image",
    "data-image-resolution",
    "data-original",
    "data-lazy-src",
    "src",
];

/// Substrings marking a stand-in image that a lazy loader will replace.
pub const PLACEHOLDER_MARKERS: &[&str] = &["placeholder", "blank.gif", "spacer.gif", "transparent.gif"];

static CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)]*?))\s*\)"#).expect("valid url() regex"));

// Squarespace puts "1500w"-style hints in data-image-resolution.
static RESOLUTION_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?[wx]$").expect("valid resolution hint regex"));

/// A discovered reference before normalization and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub raw_url: String,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Class string of the element itself.
    pub class_name: Option<String>,
    /// Element and parent classes, space-joined, for keyword rules.
    pub context_classes: String,
    pub source: CandidateSource,
    /// Role fixed by the strategy, bypassing the classifier.
    pub preset_role: Option<Role>,
}

fn is_data_uri(value: &str) -> bool {
    value.trim_start().get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// A pixel size from the page, or `None` when it is zero or nonsense.
pub fn dimension(value: Option<f64>) -> Option<u32> {
    let v = value?;
    if !v.is_finite() || v < 1.0 || v > f64::from(u32::MAX) {
        return None;
    }
    Some(v.round() as u32)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

fn context_classes(class_name: Option<&String>, parent_class_name: Option<&String>) -> String {
    [class_name, parent_class_name]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First `url(...)` token of a CSS background value, quotes stripped.
pub fn css_url(background: &str) -> Option<String> {
    let caps = CSS_URL.captures(background)?;
    let url = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?.as_str().trim();
    if url.is_empty() || is_data_uri(url) {
        return None;
    }
    Some(url.to_string())
}

/// Whether an attribute value can stand as an image source.
pub fn is_usable_source(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || is_data_uri(value) || RESOLUTION_HINT.is_match(value) {
        return false;
    }
    let lower = value.to_lowercase();
    !PLACEHOLDER_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SrcsetEntry {
    pub url: String,
    /// Numeric part of the `x`/`w` descriptor; 1 when absent.
    pub descriptor: f64,
}

/// Split a `srcset` into `(url, descriptors)` pairs.
///
/// A URL runs to the next whitespace, so commas inside it (data URIs,
/// CDN transform paths) stay part of it. Trailing commas end the entry.
fn srcset_tokens(srcset: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut rest = srcset;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (raw_url, after) = rest.split_at(url_end);
        let url = raw_url.trim_end_matches(',');
        if url.len() < raw_url.len() {
            out.push((url, ""));
            rest = after;
            continue;
        }
        let descriptors_end = after.find(',').unwrap_or(after.len());
        out.push((url, after[..descriptors_end].trim()));
        rest = &after[descriptors_end..];
    }
    out
}

fn srcset_descriptor(descriptors: &str) -> Option<f64> {
    let mut parts = descriptors.split_whitespace();
    let descriptor = match (parts.next(), parts.next()) {
        (None, _) => return Some(1.0),
        (Some(d), None) => d.to_ascii_lowercase(),
        _ => return None,
    };
    let number = descriptor
        .strip_suffix('x')
        .or_else(|| descriptor.strip_suffix('w'))?;
    number.parse::<f64>().ok().filter(|n| n.is_finite() && *n > 0.0)
}

/// Parse a `srcset` value. Entries that cannot be read are skipped.
pub fn parse_srcset(srcset: &str) -> Vec<SrcsetEntry> {
    srcset_tokens(srcset)
        .into_iter()
        .filter(|(url, _)| !is_data_uri(url))
        .filter_map(|(url, descriptors)| {
            Some(SrcsetEntry {
                url: url.to_string(),
                descriptor: srcset_descriptor(descriptors)?,
            })
        })
        .collect()
}

/// URL with the largest descriptor. Ties keep the earliest entry.
pub fn best_srcset_url(srcset: &str) -> Option<String> {
    let mut entries = parse_srcset(srcset);
    // stable sort keeps source order among equal descriptors
    entries.sort_by(|a, b| b.descriptor.total_cmp(&a.descriptor));
    entries.into_iter().next().map(|e| e.url)
}

/// Strategy A: computed `background-image` of an image block.
pub fn background_candidate(block: &BackgroundBlock) -> Option<RawCandidate> {
    let background = block.background_image.as_deref()?;
    if background.trim().eq_ignore_ascii_case("none") {
        return None;
    }
    let raw_url = css_url(background)?;
    Some(RawCandidate {
        raw_url,
        alt: None,
        width: dimension(block.width),
        height: dimension(block.height),
        class_name: non_empty(block.class_name.as_ref()),
        context_classes: context_classes(block.class_name.as_ref(), block.parent_class_name.as_ref()),
        source: CandidateSource::CssBg,
        preset_role: None,
    })
}

/// Effective source of an `<img>`: lazy attributes, then `src`, then the
/// largest `srcset` variant.
pub fn img_source(img: &ImgElement) -> Option<String> {
    LAZY_SOURCE_ATTRIBUTES
        .iter()
        .filter_map(|name| img.attrs.get(*name))
        .map(|v| v.trim())
        .find(|v| is_usable_source(v))
        .map(str::to_string)
        .or_else(|| img.srcset.as_deref().and_then(best_srcset_url))
}

/// Strategy B: one `<img>` tag.
pub fn img_candidate(img: &ImgElement) -> Option<RawCandidate> {
    let raw_url = img_source(img)?;
    // rendered box first; natural size covers images that are not laid out
    let width = dimension(img.width).or_else(|| dimension(img.natural_width));
    let height = dimension(img.height).or_else(|| dimension(img.natural_height));
    Some(RawCandidate {
        raw_url,
        alt: non_empty(img.alt.as_ref()),
        width,
        height,
        class_name: non_empty(img.class_name.as_ref()),
        context_classes: context_classes(img.class_name.as_ref(), img.parent_class_name.as_ref()),
        source: CandidateSource::HtmlImg,
        preset_role: None,
    })
}

/// Strategy C: a `<picture>`'s own image plus one candidate per `<source>`.
pub fn picture_candidates(picture: &PictureElement) -> Vec<RawCandidate> {
    let mut out = Vec::new();

    let own = [picture.img_src.as_deref(), picture.img_data_src.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| is_usable_source(v));
    if let Some(url) = own {
        out.push(RawCandidate {
            raw_url: url.to_string(),
            alt: non_empty(picture.alt.as_ref()),
            width: dimension(picture.width),
            height: dimension(picture.height),
            class_name: non_empty(picture.class_name.as_ref()),
            context_classes: context_classes(picture.class_name.as_ref(), picture.parent_class_name.as_ref()),
            source: CandidateSource::HtmlImg,
            preset_role: None,
        });
    }

    for srcset in &picture.sources {
        let Some(&(first, _)) = srcset_tokens(srcset).first() else {
            continue;
        };
        if !is_usable_source(first) {
            continue;
        }
        out.push(RawCandidate {
            raw_url: first.to_string(),
            alt: None,
            width: None,
            height: None,
            class_name: None,
            context_classes: String::new(),
            source: CandidateSource::HtmlImg,
            preset_role: Some(Role::Photo),
        });
    }
    out
}

/// All strategies over a snapshot: backgrounds, then `<img>`, then `<picture>`.
pub fn raw_candidates(snapshot: &PageSnapshot) -> Vec<RawCandidate> {
    snapshot
        .backgrounds
        .iter()
        .filter_map(background_candidate)
        .chain(snapshot.images.iter().filter_map(img_candidate))
        .chain(snapshot.pictures.iter().flat_map(picture_candidates))
        .collect()
}
