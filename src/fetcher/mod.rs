pub mod failure;
pub mod result_fetcher;
pub mod selectors;

use async_trait::async_trait;

use crate::models::MarkSheet;

pub use failure::{FetchStage, ScrapeFailure};
pub use result_fetcher::ResultFetcher;

/// The fetch seam the orchestrator dispatches through. The browser-driven
/// implementation is [`ResultFetcher`]; tests substitute scripted ones.
#[async_trait]
pub trait StudentFetcher: Send + Sync {
    async fn fetch(&self, usn: &str, url: &str) -> Result<MarkSheet, ScrapeFailure>;
}

#[async_trait]
impl StudentFetcher for ResultFetcher {
    async fn fetch(&self, usn: &str, url: &str) -> Result<MarkSheet, ScrapeFailure> {
        ResultFetcher::fetch(self, usn, url).await
    }
}
