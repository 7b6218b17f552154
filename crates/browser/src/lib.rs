//! Bounded pool of headless-browser pages. The pool pre-warms its full
//! capacity at construction, lends pages through an RAII guard and recycles
//! them on drop, so a borrower cannot leak a page on any exit path.

use std::ffi::OsString;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use headless_chrome::protocol::cdp::Network;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use laisuat_core::config::BrowserPoolConfig;
use laisuat_core::ScrapeError;

mod stealth;

pub use headless_chrome::Tab;
pub use stealth::apply_stealth;

pub struct PagePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    browser: Browser,
    config: BrowserPoolConfig,
    idle: Mutex<Vec<Arc<Tab>>>,
    slots: Semaphore,
    closed: AtomicBool,
}

impl PagePool {
    /// Launch the browser and pre-warm exactly `max_pages` stealth-prepped
    /// pages. Any page failing to come up aborts construction; dropping the
    /// half-built pool tears the browser process down.
    pub fn new(config: BrowserPoolConfig) -> Result<Self, ScrapeError> {
        let browser = launch_browser(&config)?;

        let mut idle = Vec::with_capacity(config.max_pages);
        for _ in 0..config.max_pages {
            idle.push(new_page(&browser, &config)?);
        }
        info!(pages = idle.len(), headless = config.headless, "browser page pool ready");

        Ok(Self {
            inner: Arc::new(PoolInner {
                browser,
                slots: Semaphore::new(config.max_pages),
                config,
                idle: Mutex::new(idle),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Wait for a free page. Returns promptly with `Cancelled` when the
    /// token fires, and with `PoolClosed` (without blocking) once the pool
    /// has been closed.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<PooledPage, ScrapeError> {
        let permit = tokio::select! {
            _ = token.cancelled() => return Err(ScrapeError::Cancelled),
            permit = self.inner.slots.acquire() => {
                permit.map_err(|_| ScrapeError::PoolClosed)?
            }
        };
        // the guard's Drop gives the slot back
        permit.forget();

        let recycled = self.inner.idle.lock().expect("pool lock poisoned").pop();
        let tab = match recycled {
            Some(tab) => tab,
            // the slot's previous page died on release; refill it
            None => match new_page(&self.inner.browser, &self.inner.config) {
                Ok(tab) => tab,
                Err(e) => {
                    self.inner.slots.add_permits(1);
                    return Err(e);
                }
            },
        };

        // debugging aid: slow the borrow/return cycle down to watchable speed
        if !self.inner.config.slow_motion().is_zero() {
            tokio::time::sleep(self.inner.config.slow_motion()).await;
        }

        debug!("page acquired");
        Ok(PooledPage {
            tab: Some(tab),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Idempotent. Destroys idle pages and fails all pending and future
    /// `acquire` calls; pages still lent out are destroyed as their guards
    /// drop.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.slots.close();
        let pages = std::mem::take(&mut *self.inner.idle.lock().expect("pool lock poisoned"));
        for tab in pages {
            let _ = tab.close(true);
        }
        info!("browser page pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Pages currently sitting idle in the pool.
    pub fn idle_pages(&self) -> usize {
        self.inner.idle.lock().expect("pool lock poisoned").len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.config.max_pages
    }
}

impl PoolInner {
    fn release(&self, tab: Arc<Tab>) {
        if self.closed.load(Ordering::SeqCst) {
            let _ = tab.close(true);
            return;
        }

        match reset_page(&tab) {
            Ok(()) => {
                self.idle.lock().expect("pool lock poisoned").push(tab);
                debug!("page recycled");
            }
            Err(e) => {
                warn!(error = %e, "page failed reset, destroying it");
                let _ = tab.close(true);
                // the slot stays usable; acquire() refills it lazily
            }
        }
        self.slots.add_permits(1);
    }
}

/// A lent page. Derefs to the underlying [`Tab`]; dropping it returns the
/// page to the pool (or destroys it if the pool has closed). Release never
/// blocks.
pub struct PooledPage {
    tab: Option<Arc<Tab>>,
    pool: Arc<PoolInner>,
}

impl PooledPage {
    pub fn tab(&self) -> &Arc<Tab> {
        self.tab.as_ref().expect("page already released")
    }
}

impl Deref for PooledPage {
    type Target = Tab;

    fn deref(&self) -> &Tab {
        self.tab()
    }
}

impl Drop for PooledPage {
    fn drop(&mut self) {
        if let Some(tab) = self.tab.take() {
            self.pool.release(tab);
        }
    }
}

fn launch_browser(config: &BrowserPoolConfig) -> Result<Browser, ScrapeError> {
    let extra_args: Vec<OsString> = vec![
        // required when running inside containers
        OsString::from("--no-sandbox"),
        OsString::from("--disable-dev-shm-usage"),
        OsString::from("--disable-gpu"),
        OsString::from("--disable-blink-features=AutomationControlled"),
    ];

    let mut builder = LaunchOptionsBuilder::default();
    builder
        .headless(config.headless)
        .window_size(Some((1920, 1080)))
        // the pool holds the browser across polite delays and retries; the
        // crate default (30s) would reap it mid-run
        .idle_browser_timeout(std::time::Duration::from_secs(600))
        .args(extra_args.iter().map(|a| a.as_ref()).collect());

    if let Some(dir) = &config.user_data_dir {
        builder.user_data_dir(Some(dir.clone()));
    }

    // CHROME_PATH for docker / custom installs
    if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
        builder.path(Some(std::path::PathBuf::from(chrome_path)));
    }

    let launch_options = builder
        .build()
        .map_err(|e| ScrapeError::Config(format!("browser launch options: {e}")))?;

    Browser::new(launch_options).map_err(|e| ScrapeError::Browser(format!("launch: {e}")))
}

fn new_page(browser: &Browser, config: &BrowserPoolConfig) -> Result<Arc<Tab>, ScrapeError> {
    let tab = browser
        .new_tab()
        .map_err(|e| ScrapeError::Browser(format!("new tab: {e}")))?;
    tab.set_default_timeout(config.page_timeout());
    apply_stealth(&tab)?;
    Ok(tab)
}

/// Navigate to a blank page and drop the session's cookies so the next
/// borrower starts clean.
fn reset_page(tab: &Tab) -> Result<(), ScrapeError> {
    tab.navigate_to("about:blank")
        .map_err(|e| ScrapeError::Browser(format!("reset navigate: {e}")))?;
    tab.call_method(Network::ClearBrowserCookies(None))
        .map_err(|e| ScrapeError::Browser(format!("clear cookies: {e}")))?;
    Ok(())
}
