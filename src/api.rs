//! HTTP surface for the onboarding flow.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::browser::{ChromeBrowser, PageSession};
use crate::candidate::{CandidateSource, ImageCandidate, Role};
use crate::config::ExtractorConfig;
use crate::fetch::fetch_html;
use crate::pipeline::{self, ExtractionReport};
use crate::vendor::VendorDetection;

pub struct AppState {
    pub config: ExtractorConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Headless Chrome with lazy-load scrolling.
    #[default]
    Browser,
    /// Plain HTTP fetch, no JavaScript.
    Static,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractRequest {
    /// Page to harvest, e.g. the brand's home page.
    pub url: String,
    #[serde(default)]
    pub mode: ExtractMode,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(extract, health),
    components(
        schemas(
            ExtractRequest,
            ExtractMode,
            ExtractionReport,
            ImageCandidate,
            Role,
            CandidateSource,
            VendorDetection,
            HealthResponse
        )
    ),
    tags(
        (name = "extractor", description = "Brand image extraction")
    )
)]
pub struct ApiDoc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/extract", post(extract))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn upstream_failure(e: anyhow::Error) -> StatusCode {
    error!("❌ Extraction failed: {:#}", e);
    StatusCode::BAD_GATEWAY
}

/// Harvest image candidates from a page
#[utoipa::path(
    post,
    path = "/extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Candidates in discovery order (possibly empty)", body = ExtractionReport),
        (status = 400, description = "URL is not an absolute http(s) URL"),
        (status = 502, description = "Browser session or page fetch failed")
    ),
    tag = "extractor"
)]
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractionReport>, StatusCode> {
    let url = Url::parse(req.url.trim()).map_err(|_| StatusCode::BAD_REQUEST)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StatusCode::BAD_REQUEST);
    }
    info!("📥 Extraction requested for {} ({:?})", url, req.mode);

    let report = match req.mode {
        ExtractMode::Static => {
            let page = fetch_html(url.as_str(), &state.config)
                .await
                .map_err(upstream_failure)?;
            pipeline::extract_from_html(&page.html, &page.final_url, &state.config)
                .map_err(upstream_failure)?
        }
        ExtractMode::Browser => {
            let config = state.config.clone();
            let browser = tokio::task::spawn_blocking(move || ChromeBrowser::launch(&config))
                .await
                .map_err(|e| upstream_failure(e.into()))?
                .map_err(upstream_failure)?;
            let page = browser
                .open(url.as_str(), &state.config)
                .await
                .map_err(upstream_failure)?;
            let final_url = page.current_url();
            pipeline::run(&page, &final_url, &state.config)
                .await
                .map_err(upstream_failure)?
        }
    };

    Ok(Json(report))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "extractor"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
