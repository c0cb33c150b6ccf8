//! Per-student fetch state machine.
//!
//! Navigate → SolveCaptcha → Submit → Classify, looping on invalid captchas
//! (bounded) and source cooldowns (backoff + fresh session, bounded). Each
//! fetch owns its browser session and releases it on every exit path.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::browser::ResultSession;
use crate::clients::CaptchaClient;
use crate::config::Config;
use crate::error::AppError;
use crate::fetcher::failure::{FetchStage, ScrapeFailure};
use crate::fetcher::selectors::{self, AlertKind};
use crate::infrastructure::PageDriver;
use crate::models::MarkSheet;

/// Record modal text instead of letting `alert()` block the page. Installed
/// before every submit; idempotent.
const INSTALL_ALERT_HOOK: &str = r#"
(() => {
    if (!window.__alerts) {
        window.__alerts = [];
        window.alert = (msg) => { window.__alerts.push(String(msg)); };
    }
    return true;
})()
"#;

/// Pop the newest captured modal text, if any.
const TAKE_ALERT: &str = r#"
(() => {
    const alerts = window.__alerts || [];
    return alerts.length ? alerts.pop() : null;
})()
"#;

/// Empty both form fields so a captcha retry does not append to stale input.
const CLEAR_FORM_FIELDS: &str = r#"
(() => {
    for (const name of ["lns", "captchacode"]) {
        const field = document.querySelector(`input[name="${name}"]`);
        if (field) { field.value = ""; }
    }
    return true;
})()
"#;

/// USN and student name from the detail table (rows 1 and 2, second cell).
const EXTRACT_STUDENT: &str = r#"
(() => {
    const rows = document.querySelectorAll("table tbody tr");
    if (rows.length < 2) return null;
    const second = (row) => {
        const cells = row.querySelectorAll("td");
        return cells.length > 1 ? cells[1].innerText.trim() : null;
    };
    const usn = second(rows[0]);
    const name = second(rows[1]);
    return usn && name ? { usn: usn, name: name } : null;
})()
"#;

/// The marks grid as rows of cell texts; the first grid row is the header.
const EXTRACT_MARKS: &str = r#"
(() => {
    const body = document.querySelector(".divTableBody");
    if (!body) return null;
    const rows = Array.from(body.querySelectorAll(":scope > .divTableRow")).slice(1);
    return rows.map((row) =>
        Array.from(row.querySelectorAll(".divTableCell")).map((cell) => cell.innerText.trim())
    );
})()
"#;

#[derive(Debug, Deserialize)]
struct StudentHeader {
    usn: String,
    name: String,
}

enum Classified {
    Results(MarkSheet),
    InvalidIdentifier,
    InvalidCaptcha,
    Cooldown,
    Unrecognized(String),
}

enum SubmitOutcome {
    Submitted,
    /// The recognition service errored or timed out; retried against the
    /// same budget as a rejected captcha.
    CaptchaServiceFailed(AppError),
}

pub struct ResultFetcher {
    config: Config,
    captcha: Arc<CaptchaClient>,
}

impl ResultFetcher {
    pub fn new(config: Config, captcha: Arc<CaptchaClient>) -> Self {
        Self { config, captcha }
    }

    /// Fetch and parse one student's result page.
    pub async fn fetch(&self, usn: &str, url: &str) -> Result<MarkSheet, ScrapeFailure> {
        if !selectors::is_well_formed_usn(usn) {
            warn!("[{}] malformed USN, skipping fetch", usn);
            return Err(ScrapeFailure::InvalidIdentifier);
        }

        let mut session = ResultSession::acquire(&self.config)
            .await
            .map_err(|e| ScrapeFailure::Transport {
                detail: e.to_string(),
            })?;

        let outcome = self.drive(&mut session, usn, url).await;
        session.close().await;
        outcome
    }

    async fn drive(
        &self,
        session: &mut ResultSession,
        usn: &str,
        url: &str,
    ) -> Result<MarkSheet, ScrapeFailure> {
        self.navigate(session.driver(), url).await?;

        let mut captcha_attempts = 0usize;
        let mut cooldown_rounds = 0usize;

        loop {
            match self.solve_and_submit(session.driver(), usn).await? {
                SubmitOutcome::Submitted => {}
                SubmitOutcome::CaptchaServiceFailed(e) => {
                    captcha_attempts += 1;
                    if captcha_attempts >= self.config.captcha_max_attempts {
                        warn!(
                            "[{}] ✗ captcha recognition failed {} times: {}",
                            usn, captcha_attempts, e
                        );
                        return Err(ScrapeFailure::CaptchaExhausted {
                            attempts: captcha_attempts,
                        });
                    }
                    warn!(
                        "[{}] captcha recognition failed ({}), reattempting ({}/{})",
                        usn, e, captcha_attempts, self.config.captcha_max_attempts
                    );
                    continue;
                }
            }

            match self.classify(session.driver()).await? {
                Classified::Results(sheet) => {
                    info!("[{}] ✓ results parsed: {} subjects", usn, sheet.rows.len());
                    return Ok(sheet);
                }
                Classified::InvalidIdentifier => {
                    warn!("[{}] source reports USN invalid or unavailable", usn);
                    return Err(ScrapeFailure::InvalidIdentifier);
                }
                Classified::InvalidCaptcha => {
                    captcha_attempts += 1;
                    if captcha_attempts >= self.config.captcha_max_attempts {
                        warn!(
                            "[{}] ✗ captcha rejected {} times, giving up",
                            usn, captcha_attempts
                        );
                        return Err(ScrapeFailure::CaptchaExhausted {
                            attempts: captcha_attempts,
                        });
                    }
                    warn!(
                        "[{}] invalid captcha code, reattempting ({}/{})",
                        usn, captcha_attempts, self.config.captcha_max_attempts
                    );
                    // The site re-renders a fresh captcha in place; retry
                    // from the solve step on the same page.
                }
                Classified::Cooldown => {
                    cooldown_rounds += 1;
                    if cooldown_rounds > self.config.cooldown_max_rounds {
                        warn!(
                            "[{}] ✗ source still cooling down after {} rounds",
                            usn, cooldown_rounds
                        );
                        return Err(ScrapeFailure::SourceCooldown {
                            rounds: cooldown_rounds,
                        });
                    }
                    info!(
                        "[{}] source cooldown, re-acquiring session and retrying in {}s",
                        usn, self.config.cooldown_backoff_secs
                    );
                    sleep(Duration::from_secs(self.config.cooldown_backoff_secs)).await;
                    session
                        .reacquire(&self.config)
                        .await
                        .map_err(|e| ScrapeFailure::Transport {
                            detail: e.to_string(),
                        })?;
                    self.navigate(session.driver(), url).await?;
                }
                Classified::Unrecognized(text) => {
                    return Err(ScrapeFailure::unexpected(
                        FetchStage::Classify,
                        format!("unrecognized modal text: {:?}", text),
                    ));
                }
            }
        }
    }

    async fn navigate(&self, driver: &PageDriver, url: &str) -> Result<(), ScrapeFailure> {
        driver.goto(url).await.map_err(|e| ScrapeFailure::Transport {
            detail: e.to_string(),
        })
    }

    async fn solve_and_submit(
        &self,
        driver: &PageDriver,
        usn: &str,
    ) -> Result<SubmitOutcome, ScrapeFailure> {
        // SolveCaptcha
        let mut captcha = match self.solve_captcha(driver).await {
            Ok(text) => text,
            Err(e @ AppError::Captcha(_)) => return Ok(SubmitOutcome::CaptchaServiceFailed(e)),
            Err(e) => return Err(ScrapeFailure::unexpected(FetchStage::SolveCaptcha, e)),
        };

        if captcha.chars().count() != self.config.captcha_length {
            debug!(
                "[{}] recognized captcha has {} chars, refreshing once",
                usn,
                captcha.chars().count()
            );
            captcha = match self.refresh_and_resolve(driver).await {
                Ok(text) => text,
                Err(e @ AppError::Captcha(_)) => {
                    return Ok(SubmitOutcome::CaptchaServiceFailed(e))
                }
                Err(e) => return Err(ScrapeFailure::unexpected(FetchStage::SolveCaptcha, e)),
            };
        }

        // Submit
        driver
            .eval(INSTALL_ALERT_HOOK)
            .await
            .map_err(stage(FetchStage::Submit))?;
        driver
            .eval(CLEAR_FORM_FIELDS)
            .await
            .map_err(stage(FetchStage::Submit))?;
        driver
            .fill_field(selectors::USN_FIELD, usn)
            .await
            .map_err(stage(FetchStage::Submit))?;
        driver
            .fill_field(selectors::CAPTCHA_FIELD, &captcha)
            .await
            .map_err(stage(FetchStage::Submit))?;
        driver
            .click(selectors::SUBMIT_BUTTON)
            .await
            .map_err(stage(FetchStage::Submit))?;

        Ok(SubmitOutcome::Submitted)
    }

    async fn solve_captcha(&self, driver: &PageDriver) -> Result<String, AppError> {
        let image = driver.screenshot_element(selectors::CAPTCHA_IMAGE).await?;
        self.captcha.solve(&image).await
    }

    async fn refresh_and_resolve(&self, driver: &PageDriver) -> Result<String, AppError> {
        driver.click(selectors::CAPTCHA_REFRESH).await?;
        // Give the fresh image a moment to render before the screenshot.
        sleep(Duration::from_millis(500)).await;
        self.solve_captcha(driver).await
    }

    async fn classify(&self, driver: &PageDriver) -> Result<Classified, ScrapeFailure> {
        // Give the site's submit handler a moment to raise its modal.
        sleep(Duration::from_millis(self.config.alert_settle_millis)).await;

        let alert: Option<String> = driver
            .eval_as(TAKE_ALERT)
            .await
            .map_err(stage(FetchStage::Classify))?;

        if let Some(text) = alert {
            return Ok(match selectors::classify_alert(&text) {
                AlertKind::InvalidIdentifier => Classified::InvalidIdentifier,
                AlertKind::InvalidCaptcha => Classified::InvalidCaptcha,
                AlertKind::Cooldown => Classified::Cooldown,
                AlertKind::Unrecognized(text) => Classified::Unrecognized(text),
            });
        }

        // No modal: the detail pane should be rendering.
        let sheet = self.parse_marksheet(driver).await?;
        Ok(Classified::Results(sheet))
    }

    async fn parse_marksheet(&self, driver: &PageDriver) -> Result<MarkSheet, ScrapeFailure> {
        let deadline = Instant::now() + Duration::from_secs(self.config.detail_wait_secs);
        let header = loop {
            let header: Option<StudentHeader> = driver
                .eval_as(EXTRACT_STUDENT)
                .await
                .map_err(stage(FetchStage::Parse))?;
            match header {
                Some(header) => break header,
                None if Instant::now() < deadline => sleep(Duration::from_millis(200)).await,
                None => {
                    return Err(ScrapeFailure::unexpected(
                        FetchStage::Parse,
                        "student detail table did not appear",
                    ))
                }
            }
        };

        let cells: Option<Vec<Vec<String>>> = driver
            .eval_as(EXTRACT_MARKS)
            .await
            .map_err(stage(FetchStage::Parse))?;
        let cells = cells.ok_or_else(|| {
            ScrapeFailure::unexpected(FetchStage::Parse, "marks grid not found")
        })?;
        if cells.is_empty() {
            return Err(ScrapeFailure::unexpected(
                FetchStage::Parse,
                "marks grid has no subject rows",
            ));
        }

        if self.config.verbose_logging {
            for row in &cells {
                debug!("scraped row: {:?}", row);
            }
        }

        MarkSheet::from_cells(&header.usn, &header.name, cells)
            .map_err(stage(FetchStage::Parse))
    }
}

fn stage(at: FetchStage) -> impl FnOnce(AppError) -> ScrapeFailure {
    move |e| ScrapeFailure::unexpected(at, e)
}
