//! One extraction run, end to end.
//!
//! vendor detection → lazy-load scroll → settle → DOM snapshot →
//! strategies → normalize/dedup → classify → noise filter.
//!
//! Heuristic failures shrink the result; only a dead browser session or an
//! unusable base URL comes back as an error.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use scraper::Html;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, info_span, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::browser::PageSession;
use crate::candidate::ImageCandidate;
use crate::classify::{RoleInput, RoleRules};
use crate::config::ExtractorConfig;
use crate::lazy_load::trigger_lazy_load;
use crate::noise::NoiseFilter;
use crate::normalize::Deduplicator;
use crate::snapshot::{self, PageSnapshot};
use crate::strategies::{raw_candidates, RawCandidate};
use crate::vendor::{self, VendorDetection};

/// Result of one run, as handed to the onboarding flow.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub run_id: Uuid,
    pub page_url: String,
    pub vendor: VendorDetection,
    /// Discovery order, duplicates and noise removed.
    pub candidates: Vec<ImageCandidate>,
    pub extracted_at: DateTime<Utc>,
}

fn parse_base(base_url: &str) -> Result<Url> {
    Url::parse(base_url.trim()).with_context(|| format!("invalid page URL: {base_url}"))
}

/// Extract candidates from an already-navigated page.
pub async fn extract_images<P>(page: &P, base_url: &str, config: &ExtractorConfig) -> Result<Vec<ImageCandidate>>
where
    P: PageSession + ?Sized,
{
    Ok(run(page, base_url, config).await?.candidates)
}

/// Full run against a live page. The page stays where the caller put it
/// (apart from the scroll position) and is never closed here.
pub async fn run<P>(page: &P, base_url: &str, config: &ExtractorConfig) -> Result<ExtractionReport>
where
    P: PageSession + ?Sized,
{
    let base = parse_base(base_url)?;
    let run_id = Uuid::new_v4();
    let span = info_span!("extract", %run_id, url = %base);

    async move {
        let vendor = vendor::detect_vendor(page);
        trigger_lazy_load(page, config).await;
        sleep(config.post_scroll_settle).await;

        let snapshot = snapshot::collect(page, &vendor.image_block_selectors())?;
        let candidates = assemble(&snapshot, &base, config);
        info!(
            "🖼️ {} candidates from {} elements on {}",
            candidates.len(),
            snapshot.element_count(),
            page.current_url()
        );

        Ok::<_, anyhow::Error>(ExtractionReport {
            run_id,
            page_url: base.to_string(),
            vendor,
            candidates,
            extracted_at: Utc::now(),
        })
    }
    .instrument(span)
    .await
}

/// Run the same assembly over static HTML (no scrolling, no layout).
pub fn extract_from_html(html: &str, base_url: &str, config: &ExtractorConfig) -> Result<ExtractionReport> {
    let base = parse_base(base_url)?;
    let run_id = Uuid::new_v4();
    let _guard = info_span!("extract_static", %run_id, url = %base).entered();

    let document = Html::parse_document(html);
    let vendor = vendor::signals_from_html(&document).detect();
    let snapshot = snapshot::from_html(&document, &vendor.image_block_selectors());
    let candidates = assemble(&snapshot, &base, config);
    info!("🖼️ {} candidates from static HTML ({} elements)", candidates.len(), snapshot.element_count());

    Ok(ExtractionReport {
        run_id,
        page_url: base.to_string(),
        vendor,
        candidates,
        extracted_at: Utc::now(),
    })
}

/// Strategies → normalize/dedup → classify → noise filter. Pure.
pub fn assemble(snapshot: &PageSnapshot, base: &Url, config: &ExtractorConfig) -> Vec<ImageCandidate> {
    let rules = RoleRules::from_thresholds(&config.thresholds);
    let noise = NoiseFilter::from_thresholds(&config.thresholds);
    let mut dedup = Deduplicator::new(base.clone());

    let raw = raw_candidates(snapshot);
    let discovered = raw.len();
    let unique: Vec<ImageCandidate> = raw
        .into_iter()
        .filter_map(|candidate| {
            let url = dedup.admit(&candidate.raw_url)?;
            Some(finish(candidate, url, &rules))
        })
        .collect();
    let unique_count = unique.len();
    let kept = noise.apply(unique);

    debug!(
        "{} discovered, {} unique, {} after noise filter",
        discovered,
        unique_count,
        kept.len()
    );
    kept
}

fn finish(raw: RawCandidate, url: String, rules: &RoleRules) -> ImageCandidate {
    let role = raw.preset_role.unwrap_or_else(|| {
        rules.classify(&RoleInput {
            classes: &raw.context_classes,
            width: raw.width,
            height: raw.height,
        })
    });
    ImageCandidate {
        url,
        alt: raw.alt,
        width: raw.width,
        height: raw.height,
        role,
        source: raw.source,
        vendor_class: raw.class_name,
    }
}
