use std::sync::atomic::{AtomicUsize, Ordering};

/// Four plausible desktop browsers. Enough variety to not look like a bot,
/// few enough to keep TLS/header combinations coherent.
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0",
];

/// Round-robin over the table, seeded at a random offset per process so a
/// restarted scraper doesn't always lead with the same string.
pub struct UserAgentRotation {
    counter: AtomicUsize,
}

impl UserAgentRotation {
    pub fn new() -> Self {
        Self::starting_at(rand::random::<usize>())
    }

    /// Deterministic start, for tests.
    pub fn starting_at(offset: usize) -> Self {
        Self {
            counter: AtomicUsize::new(offset % USER_AGENTS.len()),
        }
    }

    pub fn next(&self) -> &'static str {
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
        USER_AGENTS[idx]
    }
}

impl Default for UserAgentRotation {
    fn default() -> Self {
        Self::new()
    }
}
