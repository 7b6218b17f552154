use std::sync::Arc;

use anyhow::Result;

use laisuat_core::AppConfig;
use laisuat_extractors::registry;
use laisuat_fetch::HttpFetcher;

pub fn run(config: AppConfig) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(config.scraper.request_timeout())?);

    println!("{:<12} {:<12} {:<14} source", "code", "name", "channel");
    for bank in registry(fetcher) {
        println!(
            "{:<12} {:<12} {:<14} {}",
            bank.bank_code(),
            bank.bank_name(),
            bank.channel().as_str(),
            bank.primary_url()
        );
    }

    Ok(())
}
