use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{AppError, AppResult, BrowserError};

/// Launch a fresh headless browser with one blank page.
///
/// Each fetch worker gets its own instance; the underlying CDP session is
/// not shared across concurrent callers.
pub async fn launch_headless_browser(config: &Config) -> AppResult<(Browser, Page)> {
    debug!("launching headless browser");

    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--remote-debugging-port=0",
    ]);
    if let Some(executable) = &config.chrome_executable {
        builder = builder.chrome_executable(Path::new(executable));
    }
    let browser_config = builder.build().map_err(|detail| {
        error!("headless configuration failed: {}", detail);
        AppError::Browser(BrowserError::ConfigurationFailed { detail })
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("failed to launch headless browser: {}", e);
        AppError::launch_failed(e)
    })?;
    debug!("headless browser started");

    // Drive browser events in the background for the life of the session.
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Short delay for browser state to settle before opening pages.
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| {
            error!("failed to create page: {}", e);
            AppError::launch_failed(e)
        })?;

    Ok((browser, page))
}
