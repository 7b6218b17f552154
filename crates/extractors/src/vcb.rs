use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;

use laisuat_core::{Channel, RateRecord, ScrapeError};
use laisuat_fetch::HttpFetcher;
use laisuat_normalize::{parse_rate, parse_term};

use crate::table::dedup_records;
use crate::BankExtractor;

const RATES_URL: &str = "https://www.vietcombank.com.vn/vi-VN/KHCN/Cong-cu-tien-ich/Lai-suat";

/// Vietcombank ships the rate data as a JSON blob in a hidden input that
/// client script renders into a table. Reading the input directly skips the
/// rendering.
pub struct Vietcombank {
    fetcher: Arc<HttpFetcher>,
}

#[derive(Debug, Deserialize)]
struct RatePayload {
    #[serde(rename = "Data", default)]
    data: Vec<RateEntry>,
}

#[derive(Debug, Deserialize)]
struct RateEntry {
    #[serde(rename = "KyHan")]
    term: String,
    #[serde(rename = "LaiSuat")]
    rate: String,
    #[serde(rename = "LoaiTien", default)]
    currency: Option<String>,
}

impl Vietcombank {
    pub fn new(fetcher: Arc<HttpFetcher>) -> Self {
        Self { fetcher }
    }

    fn parse_page(html: &str) -> Result<RatePayload, ScrapeError> {
        let document = Html::parse_document(html);
        let Ok(input_sel) = Selector::parse("input#currentDataInterestRate") else {
            return Err(ScrapeError::ParsingFailed("bad rate input selector".into()));
        };

        let input = document
            .select(&input_sel)
            .next()
            .ok_or_else(|| ScrapeError::ParsingFailed("rate data input missing".into()))?;
        let raw = input
            .value()
            .attr("value")
            .ok_or_else(|| ScrapeError::ParsingFailed("rate data input has no value".into()))?;

        serde_json::from_str(raw)
            .map_err(|e| ScrapeError::ParsingFailed(format!("rate blob: {e}")))
    }

    fn records_from_payload(payload: RatePayload) -> Vec<RateRecord> {
        let mut records = Vec::new();
        for entry in payload.data {
            if let Some(currency) = &entry.currency {
                if currency != "VND" {
                    continue;
                }
            }
            let Some((months, label)) = parse_term(&entry.term) else {
                continue;
            };
            if months == 0 {
                continue;
            }
            let Some(rate) = parse_rate(&entry.rate) else {
                continue;
            };
            records.push(RateRecord::new("vcb", "Vietcombank", months, label, rate));
        }
        dedup_records(records)
    }
}

#[async_trait]
impl BankExtractor for Vietcombank {
    fn bank_code(&self) -> &'static str {
        "vcb"
    }

    fn bank_name(&self) -> &'static str {
        "Vietcombank"
    }

    fn channel(&self) -> Channel {
        Channel::HttpHtml
    }

    fn primary_url(&self) -> &str {
        RATES_URL
    }

    async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
        let body = self.fetcher.fetch_text(RATES_URL).await?;
        let payload = Self::parse_page(&body)?;
        Ok(Self::records_from_payload(payload))
    }
}
