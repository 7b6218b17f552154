//! Rate-sheet PDF pipeline: download to a scoped temp file, extract page
//! text, pair tenors with rates out of the flattened text.
//!
//! PDF text extraction mangles Vietnamese in predictable ways (letters
//! spaced out, combining accents detached from their vowels), so everything
//! here works on an ascii-folded view of the text.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use laisuat_core::ScrapeError;
use laisuat_fetch::HttpFetcher;
use laisuat_normalize::{parse_rate, standard_term_label};

mod text;

pub use text::normalize_pdf_text;

/// One `(tenor, rate)` row lifted out of a rate sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfRateRow {
    pub term_months: u32,
    pub term_label: String,
    pub rate: Decimal,
}

/// Download a rate sheet into `$TMPDIR/bank_rates_*.pdf`. The returned
/// `NamedTempFile` deletes the file when dropped; the caller decides how
/// long it lives.
pub async fn download_pdf(fetcher: &HttpFetcher, url: &str) -> Result<NamedTempFile, ScrapeError> {
    let bytes = fetcher.fetch_bytes(url).await?;
    debug!(url, size = bytes.len(), "downloaded rate sheet");
    persist_temp(&bytes)
}

fn persist_temp(bytes: &[u8]) -> Result<NamedTempFile, ScrapeError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(ScrapeError::ParsingFailed(
            "response body is not a PDF".to_string(),
        ));
    }

    let file = tempfile::Builder::new()
        .prefix("bank_rates_")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ScrapeError::ParsingFailed(format!("temp file: {e}")))?;

    std::fs::write(file.path(), bytes)
        .map_err(|e| ScrapeError::ParsingFailed(format!("temp write: {e}")))?;

    Ok(file)
}

/// Extract plaintext from every readable page, `\n`-separated. A page that
/// fails to decode is skipped; only a document that yields nothing at all is
/// an error.
pub fn extract_text(path: &Path) -> Result<String, ScrapeError> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| ScrapeError::ParsingFailed(format!("pdf load: {e}")))?;

    let mut pages_text = Vec::new();
    for (&page_number, _) in doc.get_pages().iter() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => pages_text.push(text),
            Err(e) => warn!(page = page_number, error = %e, "skipping unreadable pdf page"),
        }
    }

    if pages_text.is_empty() {
        return Err(ScrapeError::ParsingFailed(
            "no readable pages in pdf".to_string(),
        ));
    }

    Ok(pages_text.join("\n"))
}

// Tenors on the folded text. Requires an explicit unit word: a bare number
// in a rate sheet is far more likely to be a rate or a footnote.
static TERM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\s*(thang|nam)\b").unwrap());

// Rates carry a decimal separator or a percent sign; plain integers are
// ignored so tenor numbers never double as rates.
static RATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}[.,]\d{1,2}\s*%?|\d{1,2}\s*%").unwrap());

/// Line-paired pass: find a tenor in a line, then search that line and the
/// following three for the first in-band rate. Falls back to
/// [`parse_rate_table_advanced`] when it produces nothing.
pub fn parse_rate_table(text: &str) -> Vec<PdfRateRow> {
    let folded = normalize_pdf_text(text);
    let lines: Vec<&str> = folded.lines().collect();
    let mut rows = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = TERM_RE.captures(line) else {
            continue;
        };
        let Some((months, label)) = term_from_captures(&caps) else {
            continue;
        };

        // the rate may sit in the same line after the tenor, or wrapped onto
        // one of the next few lines
        let tail = &line[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
        let window = std::iter::once(tail)
            .chain(lines[i + 1..(i + 4).min(lines.len())].iter().copied());

        for candidate in window {
            if let Some(rate) = first_rate_in(candidate) {
                rows.push(PdfRateRow {
                    term_months: months,
                    term_label: label.clone(),
                    rate,
                });
                break;
            }
        }
    }

    let rows = dedup_rows(rows);
    if !rows.is_empty() {
        return rows;
    }

    debug!("line-paired pass found nothing, trying positional pairing");
    parse_rate_table_advanced(&folded)
}

/// Positional fallback for sheets whose text extraction scrambles line
/// structure entirely: the ordered list of tenors is zipped with the ordered
/// list of rates, but only when the counts agree exactly.
pub fn parse_rate_table_advanced(folded: &str) -> Vec<PdfRateRow> {
    let terms: Vec<(u32, String)> = TERM_RE
        .captures_iter(folded)
        .filter_map(|caps| term_from_captures(&caps))
        .collect();

    let rates: Vec<Decimal> = RATE_RE
        .find_iter(folded)
        .filter_map(|m| parse_rate(m.as_str()))
        .collect();

    if terms.is_empty() || terms.len() != rates.len() {
        debug!(
            terms = terms.len(),
            rates = rates.len(),
            "positional pairing counts do not match"
        );
        return Vec::new();
    }

    dedup_rows(
        terms
            .into_iter()
            .zip(rates)
            .map(|((term_months, term_label), rate)| PdfRateRow {
                term_months,
                term_label,
                rate,
            })
            .collect(),
    )
}

fn term_from_captures(caps: &regex::Captures<'_>) -> Option<(u32, String)> {
    let n: u32 = caps[1].parse().ok()?;
    match &caps[2] {
        "thang" => {
            let label = standard_term_label(n)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{n} tháng"));
            Some((n, label))
        }
        "nam" => Some((n.checked_mul(12)?, format!("{n} năm"))),
        _ => None,
    }
}

fn first_rate_in(line: &str) -> Option<Decimal> {
    RATE_RE.find_iter(line).find_map(|m| parse_rate(m.as_str()))
}

fn dedup_rows(rows: Vec<PdfRateRow>) -> Vec<PdfRateRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert((row.term_months, row.rate.round_dp(2))))
        .collect()
}
