use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;

use site_asset_extractor::api::{self, AppState};
use site_asset_extractor::config::{self, ExtractorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ExtractorConfig::from_env();
    info!("Extractor config: {:?}", config);

    let app = api::app(Arc::new(AppState { config }));

    let listener = tokio::net::TcpListener::bind(config::bind_addr()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
