use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use laisuat_core::{rate_in_band, Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;
use laisuat_normalize::{fold_ascii, parse_term};

use crate::table::dedup_records;
use crate::BankExtractor;

const SERVLET_URL: &str = "https://bidv.com.vn/ServicesBIDV/InterestDetailServlet";

/// BIDV keeps a plain JSON servlet behind its rates widget.
pub struct Bidv {
    fetcher: Arc<HttpFetcher>,
}

#[derive(Debug, Deserialize)]
struct ServletResponse {
    #[serde(rename = "data", default)]
    rows: Vec<ServletRow>,
}

#[derive(Debug, Deserialize)]
struct ServletRow {
    #[serde(rename = "tienTe", default)]
    currency: String,
    #[serde(rename = "kyHan")]
    term: String,
    // null while a tenor is being repriced
    #[serde(rename = "laiSuat")]
    rate: Option<Decimal>,
    #[serde(rename = "loaiSanPham", default)]
    product: Option<String>,
}

impl Bidv {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }

    fn records_from_response(response: ServletResponse) -> Vec<RateRecord> {
        let mut records = Vec::new();
        for row in response.rows {
            if row.currency != "VND" {
                continue;
            }
            if let Some(product) = &row.product {
                if !fold_ascii(product).contains("tiet kiem") {
                    continue;
                }
            }
            let Some(rate) = row.rate else {
                continue;
            };
            if rate <= Decimal::ZERO || !rate_in_band(rate) {
                continue;
            }
            // day-denominated tenors come back as zero months and drop here
            let Some((months, label)) = parse_term(&row.term) else {
                continue;
            };
            if months == 0 {
                continue;
            }
            records.push(RateRecord::new("bidv", "BIDV", months, label, rate));
        }
        dedup_records(records)
    }
}

#[async_trait]
impl BankExtractor for Bidv {
    fn bank_code(&self) -> &'static str {
        "bidv"
    }

    fn bank_name(&self) -> &'static str {
        "BIDV"
    }

    fn channel(&self) -> Channel {
        Channel::HttpJson
    }

    fn primary_url(&self) -> &str {
        SERVLET_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        let response: ServletResponse = self.fetcher.fetch_json(SERVLET_URL).await?;
        Ok(Self::records_from_response(response))
    }
}
