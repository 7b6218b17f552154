use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use laisuat_browser::Tab;
use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;
use laisuat_pdf::{download_pdf, extract_text, parse_rate_table};

use crate::links::find_pdf_link;
use crate::render::render_page;
use crate::table::records_from_rows;
use crate::BankExtractor;

const RATES_URL: &str = "https://techcombank.com/khach-hang-ca-nhan/lai-suat";

// The sheet link on the page moves with every repricing; this path has
// stayed valid as a fallback.
const FALLBACK_SHEET_URL: &str =
    "https://techcombank.com/content/dam/techcombank/lai-suat/bieu-lai-suat-tien-gui.pdf";

const SHEET_KEYWORDS: [&str; 3] = ["bieu-lai-suat", "lai-suat", "tien-gui"];

/// Techcombank publishes rates only as a PDF sheet linked from a
/// JavaScript-hydrated page: render (or plain-fetch) the page, find the
/// sheet link, then run the PDF pipeline.
pub struct Techcombank {
    fetcher: Arc<HttpFetcher>,
}

impl Techcombank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }

    fn discover_sheet(html: &str) -> Option<String> {
        find_pdf_link(html, RATES_URL, &SHEET_KEYWORDS)
    }

    async fn scrape_sheet(&self, sheet_url: &str) -> Result<Vec<RateRecord>, ScrapeError> {
        debug!(sheet_url, "fetching rate sheet");
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
impl BankExtractor for Techcombank {
    fn bank_code(&self) -> &'static str {
        "tcb"
    }

    fn bank_name(&self) -> &'static str {
        "Techcombank"
    }

    fn channel(&self) -> Channel {
        Channel::Browser
    }

    fn primary_url(&self) -> &str {
        RATES_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        // without a browser the raw page often lacks the link; fall through
        // to the known sheet path
        let sheet_url = match self.fetcher.fetch_text(RATES_URL).await {
            Ok(body) => Self::discover_sheet(&body).unwrap_or_else(|| {
                debug!("no sheet link in raw page, using fallback path");
                FALLBACK_SHEET_URL.to_string()
            }),
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
