//! Per-bank extraction strategies. Each bank is a small strategy object
//! tagged with the channel it publishes through; shared mechanics (table
//! walking, browser rendering, record building) live in free functions so
//! the per-bank files stay about their site's quirks.

use std::sync::Arc;

use async_trait::async_trait;

use laisuat_browser::Tab;
use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;

mod links;
mod render;
mod table;

mod acb;
mod agribank;
mod bidv;
mod hdbank;
mod mb;
mod sacombank;
mod tcb;
mod tpbank;
mod vcb;
mod vpbank;

pub use acb::Acb;
pub use agribank::Agribank;
pub use bidv::Bidv;
pub use hdbank::HdBank;
pub use links::find_pdf_link;
pub use mb::MbBank;
pub use render::render_page;
pub use sacombank::Sacombank;
pub use table::{dedup_records, parse_rate_tables, records_from_rows};
pub use tcb::Techcombank;
pub use tpbank::TpBank;
pub use vcb::Vietcombank;
pub use vpbank::VpBank;

/// One bank's scraping strategy.
///
/// `scrape_http` must work for every channel: for browser banks it is the
/// degraded path the orchestrator falls back to when no page pool is
/// available. `scrape_browser` only matters for `Channel::Browser` banks.
#[async_trait]
pub trait BankExtractor: Send + Sync {
    fn bank_code(&self) -> &'static str;
    fn bank_name(&self) -> &'static str;
    fn channel(&self) -> Channel;
    fn primary_url(&self) -> &str;

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError>;

    async fn scrape_browser(&self, _page: &Tab) -> Result<Vec<RateRecord>, ScrapeError> {
        Err(ScrapeError::Browser(format!(
            "{} has no browser strategy",
            self.bank_code()
        )))
    }
}

/// The supported banks, in the order results are reported. The order is a
/// contract: orchestrator output is indexed back to these positions.
pub fn registry(fetcher: Arc<HttpFetcher>) -> Vec<Arc<dyn BankExtractor>> {
    vec![
        Arc::new(Vietcombank::new(Arc::clone(&fetcher))),
        Arc::new(Techcombank::new(Arc::clone(&fetcher))),
        Arc::new(MbBank::new(Arc::clone(&fetcher))),
        Arc::new(Bidv::new(Arc::clone(&fetcher))),
        Arc::new(VpBank::new(Arc::clone(&fetcher))),
        Arc::new(TpBank::new(Arc::clone(&fetcher))),
        Arc::new(Acb::new(Arc::clone(&fetcher))),
        Arc::new(Agribank::new(Arc::clone(&fetcher))),
        Arc::new(Sacombank::new(Arc::clone(&fetcher))),
        Arc::new(HdBank::new(fetcher)),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;

    fn test_registry() -> Vec<Arc<dyn BankExtractor>> {
        let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap());
        registry(fetcher)
    }

    #[test]
    fn test_registry_has_ten_unique_banks() {
        let banks = test_registry();
        assert_eq!(banks.len(), 10);
        let codes: HashSet<&str> = banks.iter().map(|b| b.bank_code()).collect();
        assert_eq!(codes.len(), 10);
    }

    #[test]
    fn test_registry_order_and_channels() {
        let banks = test_registry();
        let expected = [
            ("vcb", Channel::HttpHtml),
            ("tcb", Channel::Browser),
            ("mb", Channel::HttpHtml),
            ("bidv", Channel::HttpJson),
            ("vpbank", Channel::Browser),
            ("tpbank", Channel::HttpHtml),
            ("acb", Channel::Browser),
            ("agribank", Channel::HttpHtml),
            ("sacombank", Channel::Pdf),
            ("hdbank", Channel::Browser),
        ];
        for (bank, (code, channel)) in banks.iter().zip(expected) {
            assert_eq!(bank.bank_code(), code);
            assert_eq!(bank.channel(), channel);
            assert!(bank.primary_url().starts_with("https://"));
        }
    }

    #[test]
    fn test_bank_codes_are_stable_lowercase() {
        for bank in test_registry() {
            let code = bank.bank_code();
            assert_eq!(code, code.to_lowercase());
            assert!(!code.contains(' '));
        }
    }
}
