//! One round trip into the page: collect raw facts about every image-bearing
//! element, decode them host-side.
//!
//! The in-page collector does no interpretation. It reports class names,
//! computed `background-image`, bounding boxes, lazy-load attributes and
//! `srcset` strings; the strategies decide what any of it means.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::browser::{evaluate_json, PageSession};
use crate::strategies::LAZY_SOURCE_ATTRIBUTES;

static BACKGROUND_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)background(?:-image)?\s*:\s*([^;]+)").expect("valid background regex")
});

/// An element matched by an image-block selector with a non-`none` background.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundBlock {
    pub class_name: Option<String>,
    pub parent_class_name: Option<String>,
    /// Computed `background-image` value, e.g. `url("https://…/a.jpg")`.
    pub background_image: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImgElement {
    /// Present lazy-load and `src` attributes, raw.
    pub attrs: HashMap<String, String>,
    pub srcset: Option<String>,
    pub alt: Option<String>,
    pub class_name: Option<String>,
    pub parent_class_name: Option<String>,
    pub natural_width: Option<f64>,
    pub natural_height: Option<f64>,
    /// Rendered bounding box.
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PictureElement {
    pub img_src: Option<String>,
    pub img_data_src: Option<String>,
    pub alt: Option<String>,
    pub class_name: Option<String>,
    pub parent_class_name: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// `srcset` of every nested `<source>`.
    pub sources: Vec<String>,
}

/// Everything the strategies need, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    pub backgrounds: Vec<BackgroundBlock>,
    pub images: Vec<ImgElement>,
    pub pictures: Vec<PictureElement>,
}

impl PageSnapshot {
    pub fn element_count(&self) -> usize {
        self.backgrounds.len() + self.images.len() + self.pictures.len()
    }
}

/// Collector payload before per-record decoding.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    pub backgrounds: Vec<serde_json::Value>,
    pub images: Vec<serde_json::Value>,
    pub pictures: Vec<serde_json::Value>,
}

impl RawSnapshot {
    /// Decode each record on its own; a malformed record is skipped.
    pub fn decode(&self) -> PageSnapshot {
        PageSnapshot {
            backgrounds: decode_each(&self.backgrounds, "background"),
            images: decode_each(&self.images, "img"),
            pictures: decode_each(&self.pictures, "picture"),
        }
    }
}

fn decode_each<T: DeserializeOwned>(records: &[serde_json::Value], kind: &str) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match T::deserialize(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!("skipping undecodable {} record: {}", kind, e);
                None
            }
        })
        .collect()
}

/// Build the in-page collector for the given background selectors.
pub fn snapshot_script(block_selectors: &[&str]) -> String {
    let selectors = serde_json::to_string(block_selectors).unwrap_or_else(|_| "[]".to_string());
    let attrs = serde_json::to_string(LAZY_SOURCE_ATTRIBUTES).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        (() => {{
            const blockSelectors = {selectors};
            const sourceAttrs = {attrs};
            const cls = el => {{
                if (!el || !el.getAttribute) return '';
                return el.getAttribute('class') || '';
            }};
            const box = el => {{
                const r = el.getBoundingClientRect();
                return {{ width: r.width, height: r.height }};
            }};
            const out = {{ backgrounds: [], images: [], pictures: [] }};

            const seen = new Set();
            for (const sel of blockSelectors) {{
                let nodes = [];
                try {{ nodes = document.querySelectorAll(sel); }} catch (e) {{ continue; }}
                for (const el of nodes) {{
                    if (seen.has(el)) continue;
                    seen.add(el);
                    try {{
                        const bg = window.getComputedStyle(el).backgroundImage;
                        if (!bg || bg === 'none') continue;
                        const r = box(el);
                        out.backgrounds.push({{
                            className: cls(el),
                            parentClassName: cls(el.parentElement),
                            backgroundImage: bg,
                            width: r.width,
                            height: r.height
                        }});
                    }} catch (e) {{}}
                }}
            }}

            for (const img of document.querySelectorAll('img')) {{
                try {{
                    const attrs = {{}};
                    for (const name of sourceAttrs) {{
                        const v = img.getAttribute(name);
                        if (v !== null) attrs[name] = v;
                    }}
                    const r = box(img);
                    out.images.push({{
                        attrs,
                        srcset: img.getAttribute('srcset'),
                        alt: img.getAttribute('alt'),
                        className: cls(img),
                        parentClassName: cls(img.parentElement),
                        naturalWidth: img.naturalWidth,
                        naturalHeight: img.naturalHeight,
                        width: r.width,
                        height: r.height
                    }});
                }} catch (e) {{}}
            }}

            for (const pic of document.querySelectorAll('picture')) {{
                try {{
                    const img = pic.querySelector('img');
                    const r = box(img || pic);
                    out.pictures.push({{
                        imgSrc: img ? img.getAttribute('src') : null,
                        imgDataSrc: img ? img.getAttribute('data-src') : null,
                        alt: img ? img.getAttribute('alt') : null,
                        className: cls(img),
                        parentClassName: cls(pic),
                        width: r.width,
                        height: r.height,
                        sources: Array.from(pic.querySelectorAll('source'))
                            .map(s => s.getAttribute('srcset'))
                            .filter(Boolean)
                    }});
                }} catch (e) {{}}
            }}

            return JSON.stringify(out);
        }})()
        "#
    )
}

/// Run the collector against a live page.
///
/// This is the one call whose failure ends the run: if it cannot reach the
/// DOM, nothing else can either.
pub fn collect<P: PageSession + ?Sized>(page: &P, block_selectors: &[&str]) -> Result<PageSnapshot> {
    let raw: RawSnapshot = evaluate_json(page, &snapshot_script(block_selectors))
        .context("DOM snapshot failed; browser session unavailable")?;
    let snapshot = raw.decode();
    debug!(
        "snapshot: {} backgrounds, {} img, {} picture",
        snapshot.backgrounds.len(),
        snapshot.images.len(),
        snapshot.pictures.len()
    );
    Ok(snapshot)
}

/// Build a snapshot from static HTML.
///
/// Without layout there are no computed styles or bounding boxes: inline
/// `style` backgrounds stand in for computed ones and `width`/`height`
/// attributes for the rendered size.
pub fn from_html(document: &Html, block_selectors: &[&str]) -> PageSnapshot {
    PageSnapshot {
        backgrounds: static_backgrounds(document, block_selectors),
        images: static_images(document),
        pictures: static_pictures(document),
    }
}

fn class_of(el: &ElementRef) -> Option<String> {
    el.value().attr("class").map(str::to_string)
}

fn parent_class_of(el: &ElementRef) -> Option<String> {
    el.parent()
        .and_then(ElementRef::wrap)
        .and_then(|p| p.value().attr("class").map(str::to_string))
}

fn attr_dimension(el: &ElementRef, name: &str) -> Option<f64> {
    el.value()
        .attr(name)
        .map(|v| v.trim().trim_end_matches("px"))
        .and_then(|v| v.parse::<f64>().ok())
}

fn static_backgrounds(document: &Html, block_selectors: &[&str]) -> Vec<BackgroundBlock> {
    let mut seen = HashSet::new();
    let mut blocks = Vec::new();
    for raw_selector in block_selectors {
        let Ok(selector) = Selector::parse(raw_selector) else {
            debug!("skipping unparsable selector {}", raw_selector);
            continue;
        };
        for el in document.select(&selector) {
            if !seen.insert(el.id()) {
                continue;
            }
            let Some(style) = el.value().attr("style") else {
                continue;
            };
            // later declarations win, as in the cascade
            let Some(declaration) = BACKGROUND_DECLARATION
                .captures_iter(style)
                .filter_map(|c| c.get(1))
                .last()
            else {
                continue;
            };
            let background = declaration.as_str().trim();
            if background.eq_ignore_ascii_case("none") {
                continue;
            }
            blocks.push(BackgroundBlock {
                class_name: class_of(&el),
                parent_class_name: parent_class_of(&el),
                background_image: Some(background.to_string()),
                width: None,
                height: None,
            });
        }
    }
    blocks
}

fn static_images(document: &Html) -> Vec<ImgElement> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| {
            let attrs = LAZY_SOURCE_ATTRIBUTES
                .iter()
                .filter_map(|name| el.value().attr(name).map(|v| (name.to_string(), v.to_string())))
                .collect();
            ImgElement {
                attrs,
                srcset: el.value().attr("srcset").map(str::to_string),
                alt: el.value().attr("alt").map(str::to_string),
                class_name: class_of(&el),
                parent_class_name: parent_class_of(&el),
                natural_width: None,
                natural_height: None,
                width: attr_dimension(&el, "width"),
                height: attr_dimension(&el, "height"),
            }
        })
        .collect()
}

fn static_pictures(document: &Html) -> Vec<PictureElement> {
    let (Ok(picture_sel), Ok(img_sel), Ok(source_sel)) = (
        Selector::parse("picture"),
        Selector::parse("img"),
        Selector::parse("source"),
    ) else {
        return Vec::new();
    };
    document
        .select(&picture_sel)
        .map(|pic| {
            let img = pic.select(&img_sel).next();
            PictureElement {
                img_src: img.and_then(|i| i.value().attr("src").map(str::to_string)),
                img_data_src: img.and_then(|i| i.value().attr("data-src").map(str::to_string)),
                alt: img.and_then(|i| i.value().attr("alt").map(str::to_string)),
                class_name: img.as_ref().and_then(class_of),
                parent_class_name: class_of(&pic),
                width: img.as_ref().and_then(|i| attr_dimension(i, "width")),
                height: img.as_ref().and_then(|i| attr_dimension(i, "height")),
                sources: pic
                    .select(&source_sel)
                    .filter_map(|s| s.value().attr("srcset").map(str::to_string))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_skips_malformed_records() {
        let raw: RawSnapshot = serde_json::from_value(json!({
            "backgrounds": [
                {"className": "gallery-item", "backgroundImage": "url(\"/a.jpg\")", "width": 640, "height": 480},
                {"className": 42, "backgroundImage": "url(/b.jpg)"},
                "not even an object"
            ],
            "images": [
                {"attrs": {"src": "/logo.png"}, "width": null, "height": 0}
            ]
        }))
        .unwrap();
        let snapshot = raw.decode();
        assert_eq!(snapshot.backgrounds.len(), 1);
        assert_eq!(snapshot.backgrounds[0].width, Some(640.0));
        assert_eq!(snapshot.images.len(), 1);
        assert_eq!(snapshot.images[0].width, None);
        assert!(snapshot.pictures.is_empty());
    }

    #[test]
    fn test_script_embeds_selectors_and_attributes() {
        let script = snapshot_script(&[".gallery-item", "[class*='hero']"]);
        assert!(script.contains(r#"[".gallery-item","[class*='hero']"]"#));
        assert!(script.contains("\"data-image-resolution\""));
        assert!(script.contains("getComputedStyle"));
    }

    #[test]
    fn test_static_backgrounds_from_inline_style() {
        let html = Html::parse_document(
            r#"<div class="banner-wrap">
                 <div class="hero-banner" style="color: red; background-image: url('/hero.jpg')"></div>
               </div>
               <div class="gallery" style="background: none"></div>
               <div class="slide"></div>"#,
        );
        let blocks = static_backgrounds(&html, &["[class*='hero']", "[class*='banner']", "[class*='gallery']"]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].background_image.as_deref(), Some("url('/hero.jpg')"));
        assert_eq!(blocks[0].class_name.as_deref(), Some("hero-banner"));
        assert_eq!(blocks[0].parent_class_name.as_deref(), Some("banner-wrap"));
    }

    #[test]
    fn test_static_backgrounds_last_declaration_wins() {
        let html = Html::parse_document(
            r#"<div class="hero" style="background: none; background-image: url(/hero.jpg)"></div>
               <div class="banner" style="background-image: url(/old.jpg); background: none"></div>"#,
        );
        let blocks = static_backgrounds(&html, &["[class*='hero']", "[class*='banner']"]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].background_image.as_deref(), Some("url(/hero.jpg)"));
    }

    #[test]
    fn test_static_images_capture_lazy_attributes() {
        let html = Html::parse_document(
            r#"<header class="site-header">
                 <img class="site-logo" src="/logo.png" data-src="/logo@2x.png" alt="Acme" width="120" height="40px">
               </header>"#,
        );
        let images = static_images(&html);
        assert_eq!(images.len(), 1);
        let img = &images[0];
        assert_eq!(img.attrs.get("data-src").map(String::as_str), Some("/logo@2x.png"));
        assert_eq!(img.attrs.get("src").map(String::as_str), Some("/logo.png"));
        assert_eq!(img.width, Some(120.0));
        assert_eq!(img.height, Some(40.0));
        assert_eq!(img.parent_class_name.as_deref(), Some("site-header"));
    }

    #[test]
    fn test_static_pictures_collect_sources() {
        let html = Html::parse_document(
            r#"<picture class="feature">
                 <source srcset="/team.avif 1x, /team@2x.avif 2x" type="image/avif">
                 <source srcset="/team.webp" type="image/webp">
                 <img src="/team.jpg" alt="Team">
               </picture>"#,
        );
        let pictures = static_pictures(&html);
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].img_src.as_deref(), Some("/team.jpg"));
        assert_eq!(pictures[0].parent_class_name.as_deref(), Some("feature"));
        assert_eq!(pictures[0].sources.len(), 2);
    }
}
