mod actions;
mod api;
mod app;
mod config;
mod executor;
mod messages;
mod sync;
mod wallet;

use anyhow::Context;
use clap::Parser;
use iced::{Application, Settings};
use tracing::info;

use api::ApiClient;
use app::WalletApp;
use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "token_wallet=info".into()),
        )
        .init();

    let config = Config::parse();
    let api = ApiClient::new(&config.api_url)
        .with_context(|| format!("invalid API url {}", config.api_url))?;
    info!("using wallet backend at {}", api.base_url());

    let mut settings = Settings::with_flags(api);
    settings.window.size = (config.window_width, config.window_height);
    WalletApp::run(settings).map_err(|e| anyhow::anyhow!("wallet window failed: {}", e))?;
    Ok(())
}
