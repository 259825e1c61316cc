use anyhow::Context;
use signage_server::{AppConfig, api::serve, util::logging::init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    if config.admin_api_key.is_none() {
        info!("SIGNAGE_ADMIN_KEY not set, admin endpoints are disabled");
    }

    serve::run(config).await
}
