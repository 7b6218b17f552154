use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;

use crate::table::{parse_rate_tables, records_from_rows};
use crate::BankExtractor;

const RATES_URL: &str = "https://www.agribank.com.vn/vn/lai-suat";

pub struct Agribank {
    fetcher: Arc<HttpFetcher>,
}

impl Agribank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl BankExtractor for Agribank {
    fn bank_code(&self) -> &'static str {
        "agribank"
    }

    fn bank_name(&self) -> &'static str {
        "Agribank"
    }

    fn channel(&self) -> Channel {
        Channel::HttpHtml
    }

    fn primary_url(&self) -> &str {
        RATES_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        let body = self.fetcher.fetch_text(RATES_URL).await?;
        let rows = parse_rate_tables(&body);
        debug!(rows = rows.len(), "agribank table rows");
        Ok(records_from_rows(self.bank_code(), self.bank_name(), rows))
    }
}
