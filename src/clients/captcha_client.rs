/// Captcha-recognition API client
///
/// Wraps the image-to-text service: one POST with the base64 captcha image,
/// one recognized string back. Retrying is the caller's business; the
/// fetcher's attempt budget decides how often a bad read is retried.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, CaptchaError};

pub struct CaptchaClient {
    http: reqwest::Client,
    endpoint: String,
    user_id: String,
    api_key: String,
    expected_length: usize,
    timeout: Duration,
}

impl CaptchaClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.captcha_api_url.clone(),
            user_id: config.captcha_user_id.clone(),
            api_key: config.captcha_api_key.clone(),
            expected_length: config.captcha_length,
            timeout: Duration::from_secs(config.captcha_timeout_secs),
        }
    }

    /// Recognize the captcha text from a PNG screenshot of the image element.
    pub async fn solve(&self, image_png: &[u8]) -> AppResult<String> {
        if self.user_id.is_empty() || self.api_key.is_empty() {
            return Err(AppError::Captcha(CaptchaError::CredentialsMissing));
        }

        let payload = json!({
            "userid": self.user_id,
            "apikey": self.api_key,
            "data": STANDARD.encode(image_png),
            "mode": "auto",
            "len_str": self.expected_length.to_string(),
        });

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::captcha_request_failed(self.endpoint.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Captcha(CaptchaError::BadStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            }));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::captcha_request_failed(self.endpoint.clone(), e))?;

        let text = body
            .get("result")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::Captcha(CaptchaError::MissingResult {
                    endpoint: self.endpoint.clone(),
                })
            })?;

        debug!("captcha recognized ({} chars)", text.chars().count());
        Ok(text)
    }
}
