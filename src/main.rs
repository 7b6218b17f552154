mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use laisuat_core::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    // Environment overrides for deploy-time tuning
    if let Ok(v) = std::env::var("LAISUAT_PARALLEL") {
        config.scraper.parallel = v != "0" && v.to_lowercase() != "false";
    }
    if let Ok(v) = std::env::var("LAISUAT_MAX_BROWSER_PAGES") {
        if let Ok(n) = v.parse::<usize>() {
            if n > 0 && n <= 16 {
                config.browser.max_pages = n;
            }
        }
    }
    if let Ok(v) = std::env::var("LAISUAT_REQUEST_TIMEOUT") {
        if let Ok(n) = v.parse::<u64>() {
            if n > 0 {
                config.scraper.request_timeout_seconds = n;
            }
        }
    }

    match cli.command {
        Commands::Scrape {
            parallel,
            bank,
            output,
        } => {
            if parallel {
                config.scraper.parallel = true;
            }
            commands::scrape::run(config, bank, output).await?;
        }
        Commands::Banks => {
            commands::banks::run(config)?;
        }
    }

    Ok(())
}
