use anyhow::{bail, Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::info;

use site_asset_extractor::browser::{ChromeBrowser, PageSession};
use site_asset_extractor::config::ExtractorConfig;
use site_asset_extractor::fetch::fetch_html;
use site_asset_extractor::pipeline::{self, ExtractionReport};

/// Run one image extraction and print the report as JSON.
#[derive(Parser, Debug)]
#[command(name = "extract_images", about = "Harvest brand image candidates from a web page")]
struct Cli {
    /// Live page to extract from
    #[arg(long, conflicts_with = "html")]
    url: Option<String>,

    /// Saved HTML page to extract from (needs --base-url)
    #[arg(long, requires = "base_url")]
    html: Option<PathBuf>,

    /// Page URL the saved HTML came from
    #[arg(long)]
    base_url: Option<String>,

    /// Fetch --url over plain HTTP instead of driving Chrome
    #[arg(long = "static", requires = "url")]
    static_fetch: bool,

    /// Maximum lazy-load scroll passes (overrides EXTRACTOR_MAX_SCROLL_STEPS)
    #[arg(long)]
    max_scroll_steps: Option<u32>,

    /// Skip every fixed settle delay
    #[arg(long)]
    no_delays: bool,
}

impl Cli {
    fn config(&self) -> ExtractorConfig {
        let mut config = ExtractorConfig::from_env();
        if let Some(steps) = self.max_scroll_steps {
            config.max_scroll_steps = steps;
        }
        if self.no_delays {
            config = config.without_delays();
        }
        config
    }
}

async fn run(cli: &Cli, config: &ExtractorConfig) -> Result<ExtractionReport> {
    if let Some(path) = &cli.html {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let base_url = cli.base_url.as_deref().context("--html needs --base-url")?;
        return pipeline::extract_from_html(&html, base_url, config);
    }

    let Some(url) = cli.url.as_deref() else {
        bail!("pass --url or --html");
    };

    if cli.static_fetch {
        let page = fetch_html(url, config).await?;
        return pipeline::extract_from_html(&page.html, &page.final_url, config);
    }

    let browser = ChromeBrowser::launch(config)?;
    let page = browser.open(url, config).await?;
    let final_url = page.current_url();
    pipeline::run(&page, &final_url, config).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = cli.config();
    let report = run(&cli, &config).await?;

    info!("✅ {} candidates", report.candidates.len());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
