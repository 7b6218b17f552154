use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use laisuat_core::AppConfig;
use laisuat_extractors::registry;
use laisuat_fetch::HttpFetcher;
use laisuat_orchestrator::{get_all_rates, Orchestrator};

pub async fn run(config: AppConfig, bank: Option<String>, output: Option<String>) -> Result<()> {
    let orchestrator = match &bank {
        Some(code) => {
            let fetcher = Arc::new(HttpFetcher::new(config.scraper.request_timeout())?);
            let extractors: Vec<_> = registry(fetcher)
                .into_iter()
                .filter(|e| e.bank_code() == code)
                .collect();
            anyhow::ensure!(!extractors.is_empty(), "unknown bank code: {code}");
            Orchestrator::with_extractors(config, extractors)
        }
        None => Orchestrator::new(config)?,
    };

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            warn!("interrupt received, cancelling run");
            token.cancel();
        });
    }

    let (results, run_error) = orchestrator.scrape(&token).await;

    let ok = results.iter().filter(|r| r.success).count();
    info!(
        banks = results.len(),
        ok,
        failed = results.len() - ok,
        rates = get_all_rates(&results).len(),
        healthy = orchestrator.metrics().is_healthy(),
        "run summary"
    );

    let report = serde_json::to_string_pretty(&results)?;
    match output {
        Some(path) => {
            std::fs::write(&path, report)?;
            info!(path = %path, "report written");
        }
        None => println!("{report}"),
    }

    if let Some(e) = run_error {
        return Err(e.into());
    }
    Ok(())
}
