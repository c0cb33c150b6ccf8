//! One scoped browser session per student-fetch attempt.
//!
//! The session owns the browser process and its single page. It is acquired
//! at the start of a fetch, re-acquired after a source cooldown, and closed
//! unconditionally on every exit path.

use chromiumoxide::Browser;
use tracing::debug;

use crate::browser::headless::launch_headless_browser;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::PageDriver;

pub struct ResultSession {
    browser: Browser,
    driver: PageDriver,
}

impl ResultSession {
    /// Launch a fresh browser and wrap its page in a driver.
    pub async fn acquire(config: &Config) -> AppResult<Self> {
        let (browser, page) = launch_headless_browser(config).await?;
        Ok(Self {
            browser,
            driver: PageDriver::new(page, config.element_wait_secs),
        })
    }

    pub fn driver(&self) -> &PageDriver {
        &self.driver
    }

    /// Tear down the current browser and start over; the source drops its
    /// rate-limit state with the old session.
    pub async fn reacquire(&mut self, config: &Config) -> AppResult<()> {
        debug!("re-acquiring browser session");
        let fresh = Self::acquire(config).await?;
        let old = std::mem::replace(self, fresh);
        old.close().await;
        Ok(())
    }

    /// Best-effort shutdown; the process is reaped even if the CDP goodbye
    /// is lost.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close failed (ignored): {}", e);
        }
        let _ = self.browser.wait().await;
    }
}
