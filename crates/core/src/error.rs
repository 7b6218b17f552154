use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("bank endpoint unavailable (HTTP {status})")]
    BankUnavailable { status: u16 },

    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("parse failure: {0}")]
    ParsingFailed(String),

    #[error("no rates found")]
    NoDataFound,

    #[error("browser error: {0}")]
    Browser(String),

    #[error("page pool closed")]
    PoolClosed,

    #[error("config error: {0}")]
    Config(String),

    #[error("scrape cancelled")]
    Cancelled,

    #[error("giving up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<ScrapeError>,
    },
}

impl ScrapeError {
    /// Transient upstream conditions worth another attempt. Empty results are
    /// retryable: a bank mid-update can serve a page with no table in it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::NetworkTimeout(_)
                | ScrapeError::BankUnavailable { .. }
                | ScrapeError::RateLimited(_)
                | ScrapeError::NoDataFound
        )
    }
}
