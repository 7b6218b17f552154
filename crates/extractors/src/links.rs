use scraper::{Html, Selector};
use url::Url;

use laisuat_normalize::fold_ascii;

/// Scan a page's anchors for a rate-sheet PDF whose URL mentions one of the
/// bank's keywords (e.g. `tien-gui-tiet-kiem`). Relative hrefs are resolved
/// against the page URL. First match wins; banks list their current sheet
/// before the archive.
pub fn find_pdf_link(html: &str, page_url: &str, keywords: &[&str]) -> Option<String> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse("a[href]").ok()?;
    let base = Url::parse(page_url).ok()?;

    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let folded = fold_ascii(href);
        if !folded.contains(".pdf") {
            continue;
        }
        if !keywords.iter().any(|k| folded.contains(k)) {
            continue;
        }
        if let Ok(resolved) = base.join(href) {
            return Some(resolved.to_string());
        }
    }

    None
}
