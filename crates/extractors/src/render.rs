use std::time::Duration;

use laisuat_browser::Tab;
use laisuat_core::ScrapeError;
use tracing::{debug, warn};

// Probed in order; the first one to become visible ends the wait.
const CANDIDATE_SELECTORS: [&str; 5] = [
    "table",
    ".interest-rate-table",
    "[class*='rate']",
    "[class*='lai-suat']",
    "[class*='interest']",
];

const FIRST_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const NEXT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const SETTLE_AFTER_MISS: Duration = Duration::from_millis(2500);

/// Navigate a pooled page and give client-side rendering every chance to
/// produce a rate table: wait for load, a bounded network-idle window, then
/// probe the candidate selectors. When nothing shows up, sleep a final
/// settle window and hand back whatever HTML rendered.
pub async fn render_page(tab: &Tab, url: &str) -> Result<String, ScrapeError> {
    tab.navigate_to(url)
        .map_err(|e| classify(format!("navigate {url}: {e}")))?;
    tab.wait_until_navigated()
        .map_err(|e| classify(format!("load {url}: {e}")))?;

    wait_request_idle(tab).await;

    let mut visible = false;
    for (i, sel) in CANDIDATE_SELECTORS.iter().enumerate() {
        let timeout = if i == 0 { FIRST_PROBE_TIMEOUT } else { NEXT_PROBE_TIMEOUT };
        if tab.wait_for_element_with_custom_timeout(sel, timeout).is_ok() {
            debug!(url, selector = *sel, "rate markup visible");
            visible = true;
            break;
        }
    }
    if !visible {
        warn!(url, "no rate selector appeared, parsing what rendered");
        tokio::time::sleep(SETTLE_AFTER_MISS).await;
    }

    tab.get_content()
        .map_err(|e| classify(format!("content {url}: {e}")))
}

/// Bounded approximation of request-idle: poll until the DOM stops growing,
/// at most 3 seconds.
async fn wait_request_idle(tab: &Tab) {
    let mut last_len = 0usize;
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        match tab.get_content() {
            Ok(content) if content.len() == last_len => return,
            Ok(content) => last_len = content.len(),
            Err(_) => return,
        }
    }
}

/// Browser failures are opaque strings; deadline-looking ones are worth a
/// retry like any other network timeout.
fn classify(message: String) -> ScrapeError {
    if message.to_lowercase().contains("timeout") {
        ScrapeError::NetworkTimeout(message)
    } else {
        ScrapeError::Browser(message)
    }
}
