//! Page driver - infrastructure layer
//!
//! Holds the one page of a session and exposes capabilities only: navigate,
//! evaluate, bounded element waits, form fill, element screenshot. It knows
//! nothing about result pages or students.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::{Element, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};

use crate::error::{AppError, AppResult};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct PageDriver {
    page: Page,
    element_wait: Duration,
}

impl PageDriver {
    pub fn new(page: Page, element_wait_secs: u64) -> Self {
        Self {
            page,
            element_wait: Duration::from_secs(element_wait_secs),
        }
    }

    pub async fn goto(&self, url: &str) -> AppResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    /// Run JS and return the JSON result.
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// Run JS and deserialize the result into a concrete type.
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// Wait for an element to appear, polling up to the configured bound.
    pub async fn wait_for(&self, selector: &str) -> AppResult<Element> {
        self.wait_for_within(selector, self.element_wait).await
    }

    /// Same as [`wait_for`](Self::wait_for) with an explicit bound.
    pub async fn wait_for_within(&self, selector: &str, wait: Duration) -> AppResult<Element> {
        let deadline = Instant::now() + wait;
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(_) if Instant::now() < deadline => sleep(POLL_INTERVAL).await,
                Err(_) => {
                    return Err(AppError::element_wait_timed_out(
                        selector,
                        wait.as_millis() as u64,
                    ))
                }
            }
        }
    }

    /// Wait for a field, focus it and type into it.
    pub async fn fill_field(&self, selector: &str, text: &str) -> AppResult<()> {
        let field = self.wait_for(selector).await?;
        field.click().await?;
        field.type_str(text).await?;
        Ok(())
    }

    /// Wait for an element and click it.
    pub async fn click(&self, selector: &str) -> AppResult<()> {
        let element = self.wait_for(selector).await?;
        element.click().await?;
        Ok(())
    }

    /// Screenshot one element as PNG bytes.
    pub async fn screenshot_element(&self, selector: &str) -> AppResult<Vec<u8>> {
        let element = self.wait_for(selector).await?;
        let bytes = element.screenshot(CaptureScreenshotFormat::Png).await?;
        Ok(bytes)
    }
}
