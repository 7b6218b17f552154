//! Drives the per-bank extractors: sequentially with polite delays, or in
//! parallel with the HTTP family unconstrained and the browser family
//! bounded by the page pool. Either way the caller gets one result per
//! configured bank, in registration order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use laisuat_browser::PagePool;
use laisuat_core::{with_retry, AppConfig, RateRecord, RetryConfig, ScrapeError, ScrapeResult};
use laisuat_extractors::{registry, BankExtractor};
use laisuat_fetch::HttpFetcher;

pub mod metrics;

pub use metrics::{BankRunMetrics, MetricsCollector, RunSummary};

pub struct Orchestrator {
    extractors: Vec<Arc<dyn BankExtractor>>,
    metrics: Arc<MetricsCollector>,
    config: AppConfig,
}

impl Orchestrator {
    /// Build the shared transport and the full bank registry.
    pub fn new(config: AppConfig) -> Result<Self, ScrapeError> {
        let fetcher = Arc::new(HttpFetcher::new(config.scraper.request_timeout())?);
        let extractors = registry(fetcher);
        Ok(Self::with_extractors(config, extractors))
    }

    /// Seam for a custom extractor set (tests, partial runs).
    pub fn with_extractors(config: AppConfig, extractors: Vec<Arc<dyn BankExtractor>>) -> Self {
        Self {
            extractors,
            metrics: Arc::new(MetricsCollector::new()),
            config,
        }
    }

    pub fn extractors(&self) -> &[Arc<dyn BankExtractor>] {
        &self.extractors
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run once in the configured mode.
    pub async fn scrape(
        &self,
        token: &CancellationToken,
    ) -> (Vec<ScrapeResult>, Option<ScrapeError>) {
        if self.config.scraper.parallel {
            self.scrape_all_parallel(token).await
        } else {
            self.scrape_all(token).await
        }
    }

    /// Sequential mode: banks in registration order, a polite random pause
    /// between consecutive banks, every bank through its HTTP path. On
    /// cancellation the partial results come back together with the error;
    /// metrics are finalized either way.
    pub async fn scrape_all(
        &self,
        token: &CancellationToken,
    ) -> (Vec<ScrapeResult>, Option<ScrapeError>) {
        let run_started = Instant::now();
        info!(banks = self.extractors.len(), "starting sequential scrape run");

        let mut results = Vec::with_capacity(self.extractors.len());
        let mut cancelled = false;

        for (i, extractor) in self.extractors.iter().enumerate() {
            if token.is_cancelled() {
                cancelled = true;
                break;
            }

            results.push(self.scrape_one_http(extractor, token).await);

            let last = i + 1 == self.extractors.len();
            if !last && !self.polite_pause(token).await {
                cancelled = true;
                break;
            }
        }

        self.metrics.finish_run();
        info!(
            banks = results.len(),
            ok = results.iter().filter(|r| r.success).count(),
            elapsed_ms = run_started.elapsed().as_millis() as u64,
            cancelled,
            "sequential scrape run finished"
        );

        (results, cancelled.then_some(ScrapeError::Cancelled))
    }

    /// Parallel mode: one worker per bank. HTTP-family banks run
    /// unconstrained; browser-family banks borrow a page from the pool,
    /// which bounds their concurrency to `max_pages`. If the pool cannot be
    /// built at all, every browser bank degrades to its HTTP fallback.
    pub async fn scrape_all_parallel(
        &self,
        token: &CancellationToken,
    ) -> (Vec<ScrapeResult>, Option<ScrapeError>) {
        let pool = if self.extractors.iter().any(|e| e.channel().is_browser()) {
            match PagePool::new(self.config.browser.clone()) {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    warn!(error = %e, "browser pool unavailable, browser banks fall back to http");
                    None
                }
            }
        } else {
            None
        };

        self.scrape_parallel_with_pool(token, pool).await
    }

    async fn scrape_parallel_with_pool(
        &self,
        token: &CancellationToken,
        pool: Option<Arc<PagePool>>,
    ) -> (Vec<ScrapeResult>, Option<ScrapeError>) {
        let n = self.extractors.len();
        let run_started = Instant::now();
        info!(
            banks = n,
            browser_pool = pool.is_some(),
            "starting parallel scrape run"
        );

        let (tx, mut rx) = mpsc::channel::<(usize, ScrapeResult)>(n.max(1));
        let mut handles = Vec::with_capacity(n);

        for (index, extractor) in self.extractors.iter().enumerate() {
            let extractor = Arc::clone(extractor);
            let pool = pool.clone();
            let metrics = Arc::clone(&self.metrics);
            let retry = self.config.retry.clone();
            let token = token.clone();
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                let result = scrape_bank(extractor, pool, metrics, retry, token).await;
                let _ = tx.send((index, result)).await;
            }));
        }
        drop(tx);

        // completion order is arbitrary; index the results back into
        // registration order
        let mut slots: Vec<Option<ScrapeResult>> = (0..n).map(|_| None).collect();
        while let Some((index, result)) = rx.recv().await {
            slots[index] = Some(result);
        }
        for handle in handles {
            let _ = handle.await;
        }

        if let Some(pool) = &pool {
            pool.close();
        }
        self.metrics.finish_run();

        let results: Vec<ScrapeResult> = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| {
                    // worker died without reporting (panic or shutdown race)
                    let e = &self.extractors[i];
                    ScrapeResult::failed(
                        e.bank_code(),
                        e.bank_name(),
                        &ScrapeError::Cancelled,
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        info!(
            banks = results.len(),
            ok = results.iter().filter(|r| r.success).count(),
            elapsed_ms = run_started.elapsed().as_millis() as u64,
            "parallel scrape run finished"
        );

        let error = token.is_cancelled().then_some(ScrapeError::Cancelled);
        (results, error)
    }

    async fn scrape_one_http(
        &self,
        extractor: &Arc<dyn BankExtractor>,
        token: &CancellationToken,
    ) -> ScrapeResult {
        let code = extractor.bank_code();
        let name = extractor.bank_name();
        self.metrics.start_scrape(code);
        let started = Instant::now();
        info!(bank = code, channel = %extractor.channel(), "scraping");

        let outcome = with_retry(token, &self.config.retry, code, || {
            let extractor = Arc::clone(extractor);
            async move { non_empty(extractor.scrape_http().await) }
        })
        .await;

        match outcome {
            Ok(rates) => {
                self.metrics.record_success(code, rates.len());
                info!(bank = code, rates = rates.len(), "scraped");
                ScrapeResult::ok(code, name, rates, started.elapsed())
            }
            Err(e) => {
                self.metrics.record_failure(code, "scrape_http", &e);
                warn!(bank = code, error = %e, "scrape failed");
                ScrapeResult::failed(code, name, &e, started.elapsed())
            }
        }
    }

    /// Uniform pause in `[min_delay, max_delay)`. Returns false when the
    /// token fired during the sleep.
    async fn polite_pause(&self, token: &CancellationToken) -> bool {
        let min = self.config.scraper.min_delay();
        let max = self.config.scraper.max_delay();
        let delay = if max <= min {
            min
        } else {
            min + Duration::from_secs_f64(
                rand::thread_rng().gen_range(0.0..(max - min).as_secs_f64()),
            )
        };
        if delay.is_zero() {
            return !token.is_cancelled();
        }

        debug!(delay_ms = delay.as_millis() as u64, "polite pause");
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// Flatten the successful results into one record stream for downstream
/// persistence.
pub fn get_all_rates(results: &[ScrapeResult]) -> Vec<RateRecord> {
    results
        .iter()
        .filter(|r| r.success)
        .flat_map(|r| r.rates.iter().cloned())
        .collect()
}

/// One parallel worker: browser banks go through the pool when one exists,
/// everything else (and every degraded browser bank) through HTTP.
async fn scrape_bank(
    extractor: Arc<dyn BankExtractor>,
    pool: Option<Arc<PagePool>>,
    metrics: Arc<MetricsCollector>,
    retry: RetryConfig,
    token: CancellationToken,
) -> ScrapeResult {
    let code = extractor.bank_code();
    let name = extractor.bank_name();
    metrics.start_scrape(code);
    let started = Instant::now();

    let browser_pool = match &pool {
        Some(pool) if extractor.channel().is_browser() => Some(pool),
        _ => None,
    };
    let operation = if browser_pool.is_some() {
        "scrape_browser"
    } else {
        "scrape_http"
    };
    info!(bank = code, operation, "scraping");

    let outcome = match browser_pool {
        Some(pool) => {
            with_retry(&token, &retry, code, || {
                let extractor = Arc::clone(&extractor);
                let token = token.clone();
                async move {
                    // re-acquired per attempt so the page goes back between
                    // backoff sleeps; the guard releases on every exit path
                    let page = pool.acquire(&token).await?;
                    non_empty(extractor.scrape_browser(page.tab()).await)
                }
            })
            .await
        }
        None => {
            with_retry(&token, &retry, code, || {
                let extractor = Arc::clone(&extractor);
                async move { non_empty(extractor.scrape_http().await) }
            })
            .await
        }
    };

    match outcome {
        Ok(rates) => {
            metrics.record_success(code, rates.len());
            info!(bank = code, rates = rates.len(), "scraped");
            ScrapeResult::ok(code, name, rates, started.elapsed())
        }
        Err(e) => {
            metrics.record_failure(code, operation, &e);
            warn!(bank = code, operation, error = %e, "scrape failed");
            ScrapeResult::failed(code, name, &e, started.elapsed())
        }
    }
}

/// An extractor returning an empty list without an error is rewritten to
/// `NoDataFound` before the retry layer sees it, so empty results are
/// retried like any transient failure.
fn non_empty(result: Result<Vec<RateRecord>, ScrapeError>) -> Result<Vec<RateRecord>, ScrapeError> {
    match result {
        Ok(rates) if rates.is_empty() => Err(ScrapeError::NoDataFound),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use laisuat_core::config::ScraperConfig;
    use laisuat_core::Channel;

    use super::*;

    enum Behavior {
        /// Succeed with n records.
        Rates(usize),
        /// Empty lists for the first n calls, then records.
        EmptyUntil(u32),
        /// Fail retryably forever.
        Timeout,
    }

    struct MockBank {
        code: &'static str,
        channel: Channel,
        behavior: Behavior,
        calls: AtomicU32,
    }

    impl MockBank {
        fn new(code: &'static str, channel: Channel, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                code,
                channel,
                behavior,
                calls: AtomicU32::new(0),
            })
        }

        fn records(&self, n: usize) -> Vec<RateRecord> {
            (0..n)
                .map(|i| {
                    RateRecord::new(
                        self.code,
                        self.code,
                        (i as u32 + 1) * 3,
                        format!("{} tháng", (i + 1) * 3),
                        dec!(4.5) + rust_decimal::Decimal::from(i as u32),
                    )
                })
                .collect()
        }

        fn answer(&self) -> Result<Vec<RateRecord>, ScrapeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Rates(n) => Ok(self.records(n)),
                Behavior::EmptyUntil(empties) if call < empties => Ok(Vec::new()),
                Behavior::EmptyUntil(_) => Ok(self.records(3)),
                Behavior::Timeout => Err(ScrapeError::NetworkTimeout("mock down".into())),
            }
        }
    }

    #[async_trait]
    impl BankExtractor for MockBank {
        fn bank_code(&self) -> &'static str {
            self.code
        }

        fn bank_name(&self) -> &'static str {
            self.code
        }

        fn channel(&self) -> Channel {
            self.channel
        }

        fn primary_url(&self) -> &str {
            "https://example.vn/lai-suat"
        }

        async fn scrape_http(&self) -> Result<Vec<RateRecord>, ScrapeError> {
            self.answer()
        }
    }

    fn test_config() -> AppConfig {
        AppConfig {
            scraper: ScraperConfig {
                min_delay_seconds: 0,
                max_delay_seconds: 0,
                ..ScraperConfig::default()
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                multiplier: 2.0,
            },
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sequential_two_banks_in_order() {
        let banks: Vec<Arc<dyn BankExtractor>> = vec![
            MockBank::new("alpha", Channel::HttpHtml, Behavior::Rates(1)),
            MockBank::new("beta", Channel::HttpHtml, Behavior::Rates(1)),
        ];
        let orchestrator = Orchestrator::with_extractors(test_config(), banks);
        let token = CancellationToken::new();

        let (results, error) = orchestrator.scrape_all(&token).await;

        assert!(error.is_none());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].bank_code, "alpha");
        assert_eq!(results[1].bank_code, "beta");
        assert!(results.iter().all(|r| r.success));

        let summary = orchestrator.metrics().summary();
        assert_eq!(summary.total_runs, 1);
        assert_eq!(summary.last_run_successes, 2);
        assert_eq!(summary.last_run_failures, 0);
    }

    #[tokio::test]
    async fn test_empty_results_retry_until_data_appears() {
        let bank = MockBank::new("flaky", Channel::HttpHtml, Behavior::EmptyUntil(2));
        let orchestrator =
            Orchestrator::with_extractors(test_config(), vec![Arc::clone(&bank) as _]);
        let token = CancellationToken::new();

        let (results, error) = orchestrator.scrape_all(&token).await;

        assert!(error.is_none());
        assert!(results[0].success);
        assert_eq!(results[0].rates_scraped, 3);
        assert_eq!(bank.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_timeout_exhausts_and_reports() {
        let bank = MockBank::new("down", Channel::HttpHtml, Behavior::Timeout);
        let orchestrator =
            Orchestrator::with_extractors(test_config(), vec![Arc::clone(&bank) as _]);
        let token = CancellationToken::new();

        let (results, error) = orchestrator.scrape_all(&token).await;

        assert!(error.is_none(), "per-bank failures never fail the run");
        assert!(!results[0].success);
        let message = results[0].error.as_deref().unwrap();
        assert!(message.contains("3 attempts"));
        assert!(message.contains("network timeout"));
        assert_eq!(bank.calls.load(Ordering::SeqCst), 3);

        assert!(!orchestrator.metrics().is_healthy());
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_other_banks() {
        let banks: Vec<Arc<dyn BankExtractor>> = vec![
            MockBank::new("down", Channel::HttpHtml, Behavior::Timeout),
            MockBank::new("up", Channel::HttpHtml, Behavior::Rates(2)),
        ];
        let orchestrator = Orchestrator::with_extractors(test_config(), banks);
        let token = CancellationToken::new();

        let (results, error) = orchestrator.scrape_all(&token).await;

        assert!(error.is_none());
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(results[1].rates_scraped, 2);
    }

    #[tokio::test]
    async fn test_cancellation_mid_sleep_returns_partial_results() {
        let mut config = test_config();
        config.scraper.min_delay_seconds = 30;
        config.scraper.max_delay_seconds = 30;

        let banks: Vec<Arc<dyn BankExtractor>> = vec![
            MockBank::new("first", Channel::HttpHtml, Behavior::Rates(1)),
            MockBank::new("second", Channel::HttpHtml, Behavior::Rates(1)),
        ];
        let orchestrator = Orchestrator::with_extractors(config, banks);
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let (results, error) = orchestrator.scrape_all(&token).await;

        assert!(started.elapsed() < Duration::from_secs(10), "cancel must be prompt");
        assert_eq!(results.len(), 1, "only the first bank ran");
        assert!(matches!(error, Some(ScrapeError::Cancelled)));

        // metrics were finalized despite the cancellation
        assert_eq!(orchestrator.metrics().summary().total_runs, 1);
    }

    #[tokio::test]
    async fn test_parallel_results_in_registration_order() {
        let banks: Vec<Arc<dyn BankExtractor>> = vec![
            MockBank::new("a", Channel::HttpHtml, Behavior::Rates(1)),
            MockBank::new("b", Channel::HttpHtml, Behavior::Rates(2)),
            MockBank::new("c", Channel::HttpHtml, Behavior::Rates(3)),
        ];
        let orchestrator = Orchestrator::with_extractors(test_config(), banks);
        let token = CancellationToken::new();

        let (results, error) = orchestrator
            .scrape_parallel_with_pool(&token, None)
            .await;

        assert!(error.is_none());
        let codes: Vec<&str> = results.iter().map(|r| r.bank_code.as_str()).collect();
        assert_eq!(codes, vec!["a", "b", "c"]);
        assert_eq!(
            results.iter().map(|r| r.rates_scraped).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_browser_banks_degrade_to_http_without_pool() {
        let browser_bank = MockBank::new("rendered", Channel::Browser, Behavior::Rates(2));
        let banks: Vec<Arc<dyn BankExtractor>> = vec![
            MockBank::new("plain", Channel::HttpHtml, Behavior::Rates(1)),
            Arc::clone(&browser_bank) as _,
        ];
        let orchestrator = Orchestrator::with_extractors(test_config(), banks);
        let token = CancellationToken::new();

        // no pool: the browser bank must run through scrape_http
        let (results, error) = orchestrator
            .scrape_parallel_with_pool(&token, None)
            .await;

        assert!(error.is_none());
        assert_eq!(results.len(), 2);
        assert!(results[1].success);
        assert_eq!(results[1].rates_scraped, 2);
        assert_eq!(browser_bank.calls.load(Ordering::SeqCst), 1);

        let last = orchestrator.metrics().last_run();
        assert!(last["rendered"].success);
    }

    #[tokio::test]
    async fn test_get_all_rates_flattens_successes() {
        let banks: Vec<Arc<dyn BankExtractor>> = vec![
            MockBank::new("ok", Channel::HttpHtml, Behavior::Rates(2)),
            MockBank::new("down", Channel::HttpHtml, Behavior::Timeout),
        ];
        let orchestrator = Orchestrator::with_extractors(test_config(), banks);
        let token = CancellationToken::new();

        let (results, _) = orchestrator.scrape_all(&token).await;
        let rates = get_all_rates(&results);

        assert_eq!(rates.len(), 2);
        assert!(rates.iter().all(|r| r.bank_code == "ok"));
        assert!(rates.iter().all(|r| r.term_months >= 1));
    }
}
