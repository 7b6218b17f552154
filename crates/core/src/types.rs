use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ScrapeError;

/// The medium a bank publishes its deposit rates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    HttpHtml,
    HttpJson,
    Pdf,
    Browser,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::HttpHtml => "http_html",
            Channel::HttpJson => "http_json",
            Channel::Pdf => "pdf",
            Channel::Browser => "browser",
        }
    }

    /// Browser-family extractors need a rendered page; everything else goes
    /// straight over the shared HTTP client.
    pub fn is_browser(&self) -> bool {
        matches!(self, Channel::Browser)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Real-world band for annualized VND deposit rates. Anything outside is a
/// mis-parse (a fee, a year, a phone number fragment), not a rate.
pub fn rate_in_band(rate: Decimal) -> bool {
    rate >= Decimal::new(1, 1) && rate <= Decimal::from(30)
}

/// One normalized deposit rate row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub bank_code: String,
    pub bank_name: String,
    pub product_type: String,
    pub term_months: u32,
    pub term_label: String,
    pub rate: Decimal,
    pub currency: String,
    pub effective_date: NaiveDate,
    pub scraped_at: DateTime<Utc>,
}

impl RateRecord {
    pub fn new(
        bank_code: &str,
        bank_name: &str,
        term_months: u32,
        term_label: impl Into<String>,
        rate: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            bank_code: bank_code.to_string(),
            bank_name: bank_name.to_string(),
            product_type: "deposit".to_string(),
            term_months,
            term_label: term_label.into(),
            rate,
            currency: "VND".to_string(),
            effective_date: now.date_naive(),
            scraped_at: now,
        }
    }
}

/// Per-bank outcome of one run. `success` is true exactly when at least one
/// rate came back and no error was recorded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub bank_code: String,
    pub bank_name: String,
    pub rates: Vec<RateRecord>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub rates_scraped: usize,
}

impl ScrapeResult {
    pub fn ok(bank_code: &str, bank_name: &str, rates: Vec<RateRecord>, duration: Duration) -> Self {
        debug_assert!(!rates.is_empty(), "empty rate lists must be reported as errors");
        let rates_scraped = rates.len();
        Self {
            bank_code: bank_code.to_string(),
            bank_name: bank_name.to_string(),
            rates,
            success: true,
            error: None,
            duration_ms: duration.as_millis() as u64,
            rates_scraped,
        }
    }

    pub fn failed(bank_code: &str, bank_name: &str, error: &ScrapeError, duration: Duration) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            bank_name: bank_name.to_string(),
            rates: Vec::new(),
            success: false,
            error: Some(error.to_string()),
            duration_ms: duration.as_millis() as u64,
            rates_scraped: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_band() {
        assert!(rate_in_band(dec!(0.1)));
        assert!(rate_in_band(dec!(4.85)));
        assert!(rate_in_band(dec!(30)));
        assert!(!rate_in_band(dec!(0.05)));
        assert!(!rate_in_band(dec!(30.01)));
        assert!(!rate_in_band(dec!(9999)));
    }

    #[test]
    fn test_result_outcome_coherence() {
        let record = RateRecord::new("vcb", "Vietcombank", 6, "6 tháng", dec!(4.7));
        let ok = ScrapeResult::ok("vcb", "Vietcombank", vec![record], Duration::from_millis(120));
        assert!(ok.success);
        assert!(ok.error.is_none());
        assert_eq!(ok.rates_scraped, 1);

        let failed = ScrapeResult::failed(
            "acb",
            "ACB",
            &ScrapeError::NoDataFound,
            Duration::from_secs(2),
        );
        assert!(!failed.success);
        assert!(failed.rates.is_empty());
        assert!(failed.error.is_some());
    }
}
