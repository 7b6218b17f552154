use std::sync::Arc;

use async_trait::async_trait;

use laisuat_browser::Tab;
use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;

use crate::render::render_page;
use crate::table::{parse_rate_tables, records_from_rows};
use crate::BankExtractor;

const RATES_URL: &str = "https://www.vpbank.com.vn/ca-nhan/lai-suat";

/// VPBank hydrates its table client-side. The HTTP path still parses the raw
/// page in case the markup ships server-rendered again; usually it comes
/// back empty and the orchestrator reports no data.
pub struct VpBank {
    fetcher: Arc<HttpFetcher>,
}

impl VpBank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl BankExtractor for VpBank {
    fn bank_code(&self) -> &'static str {
        "vpbank"
    }

    fn bank_name(&self) -> &'static str {
        "VPBank"
    }

    fn channel(&self) -> Channel {
        Channel::Browser
    }

    fn primary_url(&self) -> &str {
        RATES_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        let body = self.fetcher.fetch_text(RATES_URL).await?;
        let rows = parse_rate_tables(&body);
        Ok(records_from_rows(self.bank_code(), self.bank_name(), rows))
    }

    async fn scrape_browser(&self, page: &Tab) -> Result<Vec<RateRecord>, ScrapeError> {
        let html = render_page(page, RATES_URL).await?;
        let rows = parse_rate_tables(&html);
        Ok(records_from_rows(self.bank_code(), self.bank_name(), rows))
    }
}
