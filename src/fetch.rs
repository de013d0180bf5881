//! Plain HTTP fetch for the static extraction path.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::config::ExtractorConfig;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; the base for normalization.
    pub final_url: String,
    pub html: String,
}

pub async fn fetch_html(url: &str, config: &ExtractorConfig) -> Result<FetchedPage> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let resp = client
        .get(url)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()
        .with_context(|| format!("{url} answered with an error status"))?;

    let final_url = resp.url().to_string();
    let html = resp.text().await.context("failed to read response body")?;
    info!("📄 Fetched {} bytes from {}", html.len(), final_url);

    Ok(FetchedPage { final_url, html })
}
