use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use laisuat_core::ScrapeError;

/// Progress and outcome of one bank within one run.
#[derive(Debug, Clone)]
pub struct BankRunMetrics {
    pub bank_code: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub success: bool,
    pub rates_scraped: usize,
    /// Failure context: which operation failed, and how.
    pub operation: Option<String>,
    pub error: Option<String>,
    started: Instant,
}

impl BankRunMetrics {
    fn begin(bank_code: &str) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            started_at: Utc::now(),
            completed_at: None,
            duration: None,
            success: false,
            rates_scraped: 0,
            operation: None,
            error: None,
            started: Instant::now(),
        }
    }
}

/// Cumulative counters plus a snapshot of the most recent run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_runs: u64,
    /// Bank-level outcomes accumulated over every finished run.
    pub total_successes: u64,
    pub total_failures: u64,
    pub last_run_time: Option<DateTime<Utc>>,
    pub last_run_successes: usize,
    pub last_run_failures: usize,
}

/// A run is healthy when at least this share of banks came back with data.
const HEALTHY_SUCCESS_RATIO: f64 = 0.7;

/// Thread-safe per-bank run metrics. One lock guards both maps and the
/// counters; readers always get deep copies, never references into the
/// shared state.
#[derive(Default)]
pub struct MetricsCollector {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    current: HashMap<String, BankRunMetrics>,
    last: HashMap<String, BankRunMetrics>,
    total_runs: u64,
    total_successes: u64,
    total_failures: u64,
    last_run_time: Option<DateTime<Utc>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_scrape(&self, bank_code: &str) {
        let mut inner = self.inner.lock().expect("metrics lock poisoned");
        inner
            .current
            .insert(bank_code.to_string(), BankRunMetrics::begin(bank_code));
    }

    pub fn record_success(&self, bank_code: &str, rates_scraped: usize) {
        let mut inner = self.inner.lock().expect("metrics lock poisoned");
        let entry = inner
            .current
            .entry(bank_code.to_string())
            .or_insert_with(|| BankRunMetrics::begin(bank_code));
        entry.completed_at = Some(Utc::now());
        entry.duration = Some(entry.started.elapsed());
        entry.success = true;
        entry.rates_scraped = rates_scraped;
    }

    pub fn record_failure(&self, bank_code: &str, operation: &str, error: &ScrapeError) {
        let mut inner = self.inner.lock().expect("metrics lock poisoned");
        let entry = inner
            .current
            .entry(bank_code.to_string())
            .or_insert_with(|| BankRunMetrics::begin(bank_code));
        entry.completed_at = Some(Utc::now());
        entry.duration = Some(entry.started.elapsed());
        entry.success = false;
        entry.operation = Some(operation.to_string());
        entry.error = Some(error.to_string());
    }

    /// Close out the run: fold the per-bank outcomes into the cumulative
    /// counters and promote `current` to `last` in one critical section.
    pub fn finish_run(&self) {
        let mut inner = self.inner.lock().expect("metrics lock poisoned");

        let successes = inner.current.values().filter(|m| m.success).count() as u64;
        let failures = inner.current.len() as u64 - successes;
        inner.total_runs += 1;
        inner.total_successes += successes;
        inner.total_failures += failures;
        inner.last_run_time = Some(Utc::now());

        inner.last = std::mem::take(&mut inner.current);
        debug!(successes, failures, "run metrics finalized");
    }

    /// Deep copy of the finalized entries from the most recent run.
    pub fn last_run(&self) -> HashMap<String, BankRunMetrics> {
        self.inner.lock().expect("metrics lock poisoned").last.clone()
    }

    pub fn summary(&self) -> RunSummary {
        let inner = self.inner.lock().expect("metrics lock poisoned");
        let last_run_successes = inner.last.values().filter(|m| m.success).count();
        RunSummary {
            total_runs: inner.total_runs,
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            last_run_time: inner.last_run_time,
            last_run_successes,
            last_run_failures: inner.last.len() - last_run_successes,
        }
    }

    /// Healthy when the last run succeeded for ≥70% of its banks, or when
    /// nothing has run yet.
    pub fn is_healthy(&self) -> bool {
        let inner = self.inner.lock().expect("metrics lock poisoned");
        if inner.last.is_empty() {
            return true;
        }
        let successes = inner.last.values().filter(|m| m.success).count();
        successes as f64 / inner.last.len() as f64 >= HEALTHY_SUCCESS_RATIO
    }
}
