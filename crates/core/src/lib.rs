pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::AppConfig;
pub use error::ScrapeError;
pub use retry::{with_retry, RetryConfig};
pub use types::*;
