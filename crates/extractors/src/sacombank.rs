use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;
use laisuat_pdf::{download_pdf, extract_text, parse_rate_table};

use crate::table::records_from_rows;
use crate::BankExtractor;

// Sheet lives at a stable path; Sacombank replaces the file in place.
const SHEET_URL: &str =
    "https://www.sacombank.com.vn/content/dam/sacombank/lai-suat/bieu-lai-suat-tien-gui-tiet-kiem.pdf";

pub struct Sacombank {
    fetcher: Arc<HttpFetcher>,
}

impl Sacombank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl BankExtractor for Sacombank {
    fn bank_code(&self) -> &'static str {
        "sacombank"
    }

    fn bank_name(&self) -> &'static str {
        "Sacombank"
    }

    fn channel(&self) -> Channel {
        Channel::Pdf
    }

    fn primary_url(&self) -> &str {
        SHEET_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        let sheet = download_pdf(&self.fetcher, SHEET_URL).await?;
        let text = extract_text(sheet.path())?;
        let rows = parse_rate_table(&text);
        debug!(rows = rows.len(), "sacombank sheet rows");
        // `sheet` drops here, deleting the temp file
        Ok(records_from_rows(
            self.bank_code(),
            self.bank_name(),
            rows.into_iter().map(|r| (r.term_months, r.term_label, r.rate)),
        ))
    }
}
