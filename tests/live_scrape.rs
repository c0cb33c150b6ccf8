//! Live tests against a real browser and the real result site.
//!
//! Ignored by default; they need Chrome, captcha credentials and a result
//! cycle that is actually online: `cargo test -- --ignored`.

use std::sync::Arc;

use scoresync::clients::CaptchaClient;
use scoresync::fetcher::ResultFetcher;
use scoresync::utils::logging;
use scoresync::{Config, ScrapeFailure};

#[tokio::test]
#[ignore]
async fn fetch_single_known_usn() {
    logging::init();
    let config = Config::from_env();

    let captcha = Arc::new(CaptchaClient::new(&config));
    let fetcher = ResultFetcher::new(config.clone(), captcha);

    // Use a USN known to exist in the configured result cycle.
    let usn = std::env::var("LIVE_TEST_USN").unwrap_or_else(|_| "1OX21CS001".to_string());

    let sheet = fetcher
        .fetch(&usn, &config.result_url)
        .await
        .expect("live fetch should succeed");

    assert_eq!(sheet.usn, usn.to_uppercase());
    assert!(!sheet.rows.is_empty(), "expected at least one subject row");
}

#[tokio::test]
#[ignore]
async fn unknown_usn_reports_invalid_identifier() {
    logging::init();
    let config = Config::from_env();

    let captcha = Arc::new(CaptchaClient::new(&config));
    let fetcher = ResultFetcher::new(config.clone(), captcha);

    // Well-formed but (almost certainly) unseated.
    let outcome = fetcher.fetch("1OX21CS999", &config.result_url).await;

    assert!(matches!(outcome, Err(ScrapeFailure::InvalidIdentifier)));
}

#[tokio::test]
#[ignore]
async fn browser_session_launches() {
    logging::init();
    let config = Config::from_env();

    let session = scoresync::browser::ResultSession::acquire(&config)
        .await
        .expect("should launch a headless session");
    session.close().await;
}
