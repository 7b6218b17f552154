use std::sync::Arc;

use async_trait::async_trait;

use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;

use crate::table::{parse_rate_tables, records_from_rows};
use crate::BankExtractor;

const RATES_URL: &str = "https://tpb.vn/cong-cu-tinh-toan/lai-suat";

/// TPBank renders the savings table server-side; the page also carries loan
/// rate tables, which the band check filters out.
pub struct TpBank {
    fetcher: Arc<HttpFetcher>,
}

impl TpBank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl BankExtractor for TpBank {
    fn bank_code(&self) -> &'static str {
        "tpbank"
    }

    fn bank_name(&self) -> &'static str {
        "TPBank"
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
        Ok(records_from_rows(self.bank_code(), self.bank_name(), rows))
    }
}
