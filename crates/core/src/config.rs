use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryConfig;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub browser: BrowserPoolConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScraperConfig {
    /// Polite inter-bank sleep window (sequential mode only).
    #[serde(default = "default_min_delay")]
    pub min_delay_seconds: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,
    /// Shared transport timeout. Browser-rendered pages need more than the
    /// usual 30s, so the default is 60s.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub parallel: bool,
}

impl ScraperConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_delay_seconds)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_delay_seconds: default_min_delay(),
            max_delay_seconds: default_max_delay(),
            request_timeout_seconds: default_request_timeout(),
            parallel: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserPoolConfig {
    /// Pool capacity; also hard-limits concurrent browser scrapes.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_page_timeout")]
    pub page_timeout_seconds: u64,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
    /// Delay injected between browser actions, for debugging.
    #[serde(default)]
    pub slow_motion_ms: u64,
}

impl BrowserPoolConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_seconds)
    }

    pub fn slow_motion(&self) -> Duration {
        Duration::from_millis(self.slow_motion_ms)
    }
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            page_timeout_seconds: default_page_timeout(),
            headless: default_headless(),
            user_data_dir: None,
            slow_motion_ms: 0,
        }
    }
}

fn default_min_delay() -> u64 { 2 }
fn default_max_delay() -> u64 { 5 }
fn default_request_timeout() -> u64 { 60 }
fn default_max_pages() -> usize { 3 }
fn default_page_timeout() -> u64 { 60 }
fn default_headless() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.scraper.min_delay_seconds, 2);
        assert_eq!(config.scraper.max_delay_seconds, 5);
        assert_eq!(config.scraper.request_timeout_seconds, 60);
        assert!(!config.scraper.parallel);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.browser.max_pages, 3);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_partial_section_override() {
        let config: AppConfig = toml::from_str(
            r#"
            [scraper]
            min_delay_seconds = 0
            max_delay_seconds = 0
            parallel = true

            [browser]
            max_pages = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.scraper.min_delay_seconds, 0);
        assert!(config.scraper.parallel);
        assert_eq!(config.browser.max_pages, 1);
        // untouched sections keep their defaults
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.browser.page_timeout_seconds, 60);
    }
}
