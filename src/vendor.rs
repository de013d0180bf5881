//! Page-builder platform sniffing.
//!
//! Detection is read-only and never fails the run: anything that goes wrong
//! lands on the generic path.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::browser::{evaluate_json, PageSession};

/// Markup conventions of one site-builder platform.
#[derive(Debug)]
pub struct VendorProfile {
    pub name: &'static str,
    /// Substring of `<meta name="generator">` content (lowercase).
    pub generator_marker: &'static str,
    /// Classes only this platform puts in the document.
    pub document_classes: &'static [&'static str],
    /// Substrings of `<body class>` tokens (lowercase).
    pub body_class_markers: &'static [&'static str],
    /// Image-block selectors scanned for `background-image`.
    pub image_block_selectors: &'static [&'static str],
}

pub static SQUARESPACE: VendorProfile = VendorProfile {
    name: "squarespace",
    generator_marker: "squarespace",
    document_classes: &[
        "sqs-block",
        "sqs-layout",
        "sqs-block-image",
        "sqs-gallery",
        "sqs-announcement-bar",
    ],
    body_class_markers: &["squarespace", "sqs-"],
    image_block_selectors: &[
        ".sqs-block-image .image-block-wrapper",
        ".sqs-image-shape-container-element",
        ".sqs-gallery .slide",
        ".sqs-gallery-design-grid-slide",
        ".gallery-item",
        ".gallery-slideshow-item",
        ".summary-thumbnail",
        ".banner-thumbnail-wrapper",
        ".page-banner-image-container",
        ".section-background",
        "[data-image]",
    ],
};

pub static VENDORS: &[&VendorProfile] = &[&SQUARESPACE];

/// Generic image-block patterns scanned on every site.
pub const GENERIC_IMAGE_BLOCK_SELECTORS: &[&str] = &[
    "[class*='image-block']",
    "[class*='block']",
    "[class*='gallery']",
    "[class*='slide']",
    "[class*='hero']",
    "[class*='banner']",
    "[style*='background-image']",
];

/// Raw signals read from the document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VendorSignals {
    pub generator: Option<String>,
    /// Platform-specific classes present somewhere in the document.
    pub document_classes: Vec<String>,
    pub body_class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VendorDetection {
    pub is_vendor_site: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Which signal matched first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
}

impl VendorDetection {
    fn matched(profile: &VendorProfile, signal: &str) -> Self {
        Self {
            is_vendor_site: true,
            platform: Some(profile.name.to_string()),
            signal: Some(signal.to_string()),
        }
    }

    fn profile(&self) -> Option<&'static VendorProfile> {
        let name = self.platform.as_deref()?;
        VENDORS.iter().copied().find(|p| p.name == name)
    }

    /// Background-image selectors for this page: vendor blocks first, then the
    /// generic patterns.
    pub fn image_block_selectors(&self) -> Vec<&'static str> {
        let mut selectors: Vec<&'static str> = self
            .profile()
            .map(|p| p.image_block_selectors.to_vec())
            .unwrap_or_default();
        selectors.extend_from_slice(GENERIC_IMAGE_BLOCK_SELECTORS);
        selectors
    }
}

impl VendorSignals {
    pub fn detect(&self) -> VendorDetection {
        let generator = self.generator.as_deref().unwrap_or_default().to_lowercase();
        let body_tokens: Vec<String> = self
            .body_class
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        for profile in VENDORS.iter().copied() {
            if !generator.is_empty() && generator.contains(profile.generator_marker) {
                return VendorDetection::matched(profile, "generator");
            }
            if self
                .document_classes
                .iter()
                .any(|c| profile.document_classes.contains(&c.as_str()))
            {
                return VendorDetection::matched(profile, "document-class");
            }
            if body_tokens
                .iter()
                .any(|t| profile.body_class_markers.iter().any(|m| t.contains(m)))
            {
                return VendorDetection::matched(profile, "body-class");
            }
        }
        VendorDetection::default()
    }
}

/// In-page probe. Returns [`VendorSignals`] as a JSON string.
pub static VENDOR_PROBE_JS: Lazy<String> = Lazy::new(|| {
    let classes: Vec<&str> = VENDORS
        .iter()
        .flat_map(|p| p.document_classes.iter().copied())
        .collect();
    let classes = serde_json::to_string(&classes).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        (() => {{
            const vendorClasses = {classes};
            const meta = document.querySelector('meta[name="generator"]');
            const present = vendorClasses.filter(c => {{
                try {{ return document.getElementsByClassName(c).length > 0; }}
                catch (e) {{ return false; }}
            }});
            return JSON.stringify({{
                generator: meta ? meta.getAttribute('content') : null,
                documentClasses: present,
                bodyClass: document.body ? String(document.body.className || '') : ''
            }});
        }})()
        "#
    )
});

/// Sniff the platform of a live page. Failures read as "not a vendor site".
pub fn detect_vendor<P: PageSession + ?Sized>(page: &P) -> VendorDetection {
    match evaluate_json::<VendorSignals, _>(page, &VENDOR_PROBE_JS) {
        Ok(signals) => {
            let detection = signals.detect();
            if detection.is_vendor_site {
                info!(
                    "🏗️ Vendor site detected: {} (via {})",
                    detection.platform.as_deref().unwrap_or("?"),
                    detection.signal.as_deref().unwrap_or("?")
                );
            } else {
                debug!("no vendor signals, using generic extraction");
            }
            detection
        }
        Err(e) => {
            warn!("⚠️ Vendor detection failed, assuming generic site: {:#}", e);
            VendorDetection::default()
        }
    }
}

/// Same signals, read from static HTML.
pub fn signals_from_html(document: &Html) -> VendorSignals {
    let generator = Selector::parse("meta[name='generator']")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("content").map(str::to_string))
        });

    let document_classes = VENDORS
        .iter()
        .flat_map(|p| p.document_classes.iter().copied())
        .filter(|class| {
            Selector::parse(&format!(".{class}"))
                .map(|sel| document.select(&sel).next().is_some())
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect();

    let body_class = Selector::parse("body")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("class").map(str::to_string))
        })
        .unwrap_or_default();

    VendorSignals {
        generator,
        document_classes,
        body_class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_meta_detects_squarespace() {
        let signals = VendorSignals {
            generator: Some("Squarespace 7.1".to_string()),
            ..Default::default()
        };
        let detection = signals.detect();
        assert!(detection.is_vendor_site);
        assert_eq!(detection.platform.as_deref(), Some("squarespace"));
        assert_eq!(detection.signal.as_deref(), Some("generator"));
    }

    #[test]
    fn test_body_class_detects_squarespace() {
        let signals = VendorSignals {
            body_class: "collection-type-page sqs-seven-one".to_string(),
            ..Default::default()
        };
        assert_eq!(signals.detect().signal.as_deref(), Some("body-class"));
    }

    #[test]
    fn test_no_signals_is_generic() {
        let signals = VendorSignals {
            generator: Some("WordPress 6.4".to_string()),
            document_classes: vec![],
            body_class: "home page-template".to_string(),
        };
        let detection = signals.detect();
        assert!(!detection.is_vendor_site);
        assert_eq!(detection.image_block_selectors(), GENERIC_IMAGE_BLOCK_SELECTORS.to_vec());
    }

    #[test]
    fn test_vendor_selectors_come_first() {
        let detection = VendorDetection::matched(&SQUARESPACE, "generator");
        let selectors = detection.image_block_selectors();
        assert_eq!(selectors[0], SQUARESPACE.image_block_selectors[0]);
        assert!(selectors.ends_with(GENERIC_IMAGE_BLOCK_SELECTORS));
    }

    #[test]
    fn test_signals_from_static_html() {
        let html = Html::parse_document(
            r#"<html><head><meta name="generator" content="Squarespace"></head>
               <body class="homepage"><div class="sqs-layout"></div></body></html>"#,
        );
        let signals = signals_from_html(&html);
        assert_eq!(signals.generator.as_deref(), Some("Squarespace"));
        assert_eq!(signals.document_classes, vec!["sqs-layout".to_string()]);
        assert_eq!(signals.body_class, "homepage");
    }

    #[test]
    fn test_probe_script_embeds_vendor_classes() {
        assert!(VENDOR_PROBE_JS.contains("\"sqs-block\""));
        assert!(VENDOR_PROBE_JS.contains("JSON.stringify"));
    }
}
