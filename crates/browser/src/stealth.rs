use headless_chrome::Tab;

use laisuat_core::ScrapeError;

/// Masks the fingerprints bank sites check before deciding to serve a bot
/// an empty shell: the automation flag, an empty plugin list, and a
/// language list that doesn't match the Accept-Language we send.
const STEALTH_PRELUDE: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['vi-VN', 'vi', 'en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
"#;

/// Run the stealth prelude once on a freshly created page.
pub fn apply_stealth(tab: &Tab) -> Result<(), ScrapeError> {
    tab.evaluate(STEALTH_PRELUDE, false)
        .map(|_| ())
        .map_err(|e| ScrapeError::Browser(format!("stealth prelude: {e}")))
}
