//! CLI runner: one batch over the configured section, polled to completion.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::CaptchaClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::fetcher::ResultFetcher;
use crate::orchestrator::ScrapeOrchestrator;
use crate::store::{
    roster, InMemoryEntityStore, InMemoryProgressStore, JobState, ProgressStore, ScrapeProgress,
};
use crate::utils::logging;

pub struct App {
    config: Config,
    store: Arc<InMemoryEntityStore>,
    progress: Arc<InMemoryProgressStore>,
    orchestrator: ScrapeOrchestrator,
}

impl App {
    /// Wire the pipeline: roster-seeded store, captcha client, fetcher,
    /// orchestrator.
    pub async fn initialize(config: Config) -> AppResult<Self> {
        logging::log_startup(config.max_concurrent_students);

        let store = Arc::new(InMemoryEntityStore::new());
        let loaded = roster::load_roster(Path::new(&config.roster_file)).await?;
        roster::seed_store(&store, &loaded).await;

        let progress = Arc::new(InMemoryProgressStore::new(Duration::from_secs(
            config.progress_ttl_secs,
        )));

        let captcha = Arc::new(CaptchaClient::new(&config));
        let fetcher = Arc::new(ResultFetcher::new(config.clone(), captcha));

        let orchestrator = ScrapeOrchestrator::new(
            config.clone(),
            store.clone(),
            progress.clone(),
            fetcher,
        );

        Ok(Self {
            config,
            store,
            progress,
            orchestrator,
        })
    }

    /// Start the batch and poll its progress record until it is done.
    pub async fn run(&self) -> AppResult<()> {
        let job = self
            .orchestrator
            .start_batch(
                self.config.section_id,
                self.config.semester_id,
                &self.config.result_url,
            )
            .await?;

        let snapshot = self.poll_to_completion(&job).await?;
        self.print_final_report(&snapshot).await?;

        Ok(())
    }

    async fn poll_to_completion(&self, job: &str) -> AppResult<ScrapeProgress> {
        let interval = Duration::from_secs(self.config.poll_interval_secs.max(1));
        loop {
            match self.progress.get(job).await? {
                Some(snapshot) if snapshot.is_done() => return Ok(snapshot),
                Some(snapshot) => {
                    info!(
                        "⏳ progress: {}/{} (errors: {})",
                        snapshot.completed,
                        snapshot.total,
                        snapshot.errors.len()
                    );
                }
                None => {
                    return Err(AppError::Other(format!(
                        "progress record for job {job} expired while the batch was running"
                    )));
                }
            }
            sleep(interval).await;
        }
    }

    async fn print_final_report(&self, snapshot: &ScrapeProgress) -> AppResult<()> {
        info!("{}", "=".repeat(60));
        info!("📊 batch finished");
        info!(
            "finished at: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        info!("{}", "=".repeat(60));
        info!("state: {:?}", snapshot.state);
        info!("✅ completed: {}/{}", snapshot.completed, snapshot.total);
        info!("❌ failures: {}", snapshot.errors.len());
        for entry in &snapshot.errors {
            warn!("  {} -> {}", entry.identifier, entry.reason);
        }

        if snapshot.state == JobState::Invalidated {
            return Ok(());
        }

        use crate::store::EntityStore;
        if let Some(metrics) = self
            .store
            .semester_metrics(self.config.section_id, self.config.semester_id)
            .await?
        {
            info!("{}", "─".repeat(60));
            info!(
                "section averages: sgpa {:.2} | pass {:.2}% | with backlogs {:.2}%",
                metrics.avg_sgpa, metrics.pass_percentage, metrics.fail_percentage
            );
        }
        info!("{}", "=".repeat(60));

        Ok(())
    }
}
