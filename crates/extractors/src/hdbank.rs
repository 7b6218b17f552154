use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use laisuat_browser::Tab;
use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;
use laisuat_pdf::{download_pdf, extract_text, parse_rate_table};

use crate::links::find_pdf_link;
use crate::render::render_page;
use crate::table::records_from_rows;
use crate::BankExtractor;

const RATES_URL: &str = "https://hdbank.com.vn/vi/personal/cong-cu/lai-suat";

const FALLBACK_SHEET_URL: &str =
    "https://hdbank.com.vn/uploads/lai-suat/bieu-lai-suat-tien-gui-tiet-kiem.pdf";

const SHEET_KEYWORDS: [&str; 2] = ["tien-gui-tiet-kiem", "lai-suat"];

/// Same shape as Techcombank: a hydrated page linking to the real sheet.
pub struct HdBank {
    fetcher: Arc<HttpFetcher>,
}

impl HdBank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }

    fn discover_sheet(html: &str) -> Option<String> {
        find_pdf_link(html, RATES_URL, &SHEET_KEYWORDS)
    }

    async fn scrape_sheet(&self, sheet_url: &str) -> Result<Vec<RateRecord>, ScrapeError> {
        let sheet = download_pdf(&self.fetcher, sheet_url).await?;
        let text = extract_text(sheet.path())?;
        let rows = parse_rate_table(&text);
        Ok(records_from_rows(
            self.bank_code(),
            self.bank_name(),
            rows.into_iter().map(|r| (r.term_months, r.term_label, r.rate)),
        ))
    }
}

#[async_trait]
impl BankExtractor for HdBank {
    fn bank_code(&self) -> &'static str {
        "hdbank"
    }

    fn bank_name(&self) -> &'static str {
        "HDBank"
    }

    fn channel(&self) -> Channel {
        Channel::Browser
    }

    fn primary_url(&self) -> &str {
        RATES_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        let sheet_url = match self.fetcher.fetch_text(RATES_URL).await {
            Ok(body) => {
                Self::discover_sheet(&body).unwrap_or_else(|| FALLBACK_SHEET_URL.to_string())
            }
            Err(e) => {
                warn!(error = %e, "rates page unreachable, using fallback sheet path");
                FALLBACK_SHEET_URL.to_string()
            }
        };
        self.scrape_sheet(&sheet_url).await
    }

    async fn scrape_browser(&self, page: &Tab) -> Result<Vec<RateRecord>, ScrapeError> {
        let html = render_page(page, RATES_URL).await?;
        let sheet_url =
            Self::discover_sheet(&html).unwrap_or_else(|| FALLBACK_SHEET_URL.to_string());
        self.scrape_sheet(&sheet_url).await
    }
}
