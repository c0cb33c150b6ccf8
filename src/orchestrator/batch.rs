//! Batch scrape orchestration - the top of the pipeline.
//!
//! Fans Fetch → Ingest out over a section's roster with bounded concurrency,
//! keeps the progress record current, and runs the aggregate recompute pass
//! exactly once after the barrier. One student's failure never aborts the
//! batch; only a failing persistence collaborator does.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, StoreError};
use crate::fetcher::{ScrapeFailure, StudentFetcher};
use crate::ingest::{IngestError, ScoreIngester};
use crate::metrics::{MetricsEngine, RecomputeQueue, RecomputeRequest};
use crate::models::{Section, SectionId, Semester, SemesterId, Student, SubjectId};
use crate::store::{EntityStore, JobState, ProgressStore, ScrapeErrorEntry};
use crate::utils::logging;

/// Final tallies for one batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct ScrapeOrchestrator {
    config: Config,
    store: Arc<dyn EntityStore>,
    progress: Arc<dyn ProgressStore>,
    fetcher: Arc<dyn StudentFetcher>,
    ingester: ScoreIngester,
}

impl ScrapeOrchestrator {
    pub fn new(
        config: Config,
        store: Arc<dyn EntityStore>,
        progress: Arc<dyn ProgressStore>,
        fetcher: Arc<dyn StudentFetcher>,
    ) -> Self {
        let ingester = ScoreIngester::new(store.clone());
        Self {
            config,
            store,
            progress,
            fetcher,
            ingester,
        }
    }

    /// Allocate a progress record sized to the active roster, spawn the
    /// batch in the background and return the poll handle immediately.
    pub async fn start_batch(
        &self,
        section_id: SectionId,
        semester_id: SemesterId,
        result_url: &str,
    ) -> AppResult<String> {
        let section = self
            .store
            .section(section_id)
            .await?
            .ok_or(AppError::Store(StoreError::MissingSection { id: section_id }))?;
        let semester = self
            .store
            .semester(semester_id)
            .await?
            .ok_or(AppError::Store(StoreError::MissingSemester { id: semester_id }))?;
        let roster = self.store.active_students_in_section(section_id).await?;

        let job = self.progress.create(roster.len()).await?;
        logging::log_batch_start(&job, &section.name, semester.number, roster.len());

        let orchestrator = self.clone();
        let handle = job.clone();
        let url = result_url.to_string();
        tokio::spawn(async move {
            orchestrator
                .run_batch(handle, section, semester, roster, url)
                .await;
        });

        Ok(job)
    }

    async fn run_batch(
        self,
        job: String,
        section: Section,
        semester: Semester,
        roster: Vec<Student>,
        url: String,
    ) {
        match self
            .process_roster(&job, &section, &semester, roster, &url)
            .await
        {
            Ok(summary) => {
                let state = if summary.cancelled {
                    JobState::Cancelled
                } else {
                    JobState::Completed
                };
                if let Err(e) = self.progress.mark_state(&job, state).await {
                    error!("failed to mark job {} as {:?}: {}", job, state, e);
                }
                logging::log_batch_complete(&job, &summary);
            }
            Err(e) => {
                // Orchestration-fatal: poison the record instead of leaving
                // a forever-running job behind.
                error!("✗ batch {} aborted: {}", job, e);
                if let Err(mark_err) = self.progress.invalidate(&job).await {
                    error!("failed to invalidate job {}: {}", job, mark_err);
                }
            }
        }
    }

    async fn process_roster(
        &self,
        job: &str,
        section: &Section,
        semester: &Semester,
        roster: Vec<Student>,
        url: &str,
    ) -> AppResult<BatchSummary> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_students.max(1)));
        let touched: Arc<Mutex<HashSet<SubjectId>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut summary = BatchSummary {
            total: roster.len(),
            ..Default::default()
        };
        let mut handles = Vec::with_capacity(roster.len());

        for student in roster {
            // Checked between dispatches: in-flight students finish, new
            // ones stop.
            if self.progress.cancel_requested(job).await? {
                info!("🛑 cancel requested for batch {}, dispatch stopped", job);
                summary.cancelled = true;
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Other(format!("worker pool closed: {e}")))?;

            let worker = self.clone();
            let job = job.to_string();
            let semester = semester.clone();
            let url = url.to_string();
            let touched = touched.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                worker
                    .process_student(job, student, semester, url, touched)
                    .await
            }));
            summary.dispatched += 1;
        }

        // Barrier: the aggregate pass must observe every per-student write.
        let mut fatal: Option<AppError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(true)) => summary.succeeded += 1,
                Ok(Ok(false)) => summary.failed += 1,
                Ok(Err(e)) => {
                    error!("student task hit a fatal store error: {}", e);
                    fatal = Some(e);
                }
                Err(e) => {
                    fatal = Some(AppError::Other(format!("student task panicked: {e}")));
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        // One SubjectMetrics recompute per touched subject, then the
        // semester rollup, in that order, exactly once per batch.
        let mut queue = RecomputeQueue::new();
        let mut subject_ids: Vec<SubjectId> = touched.lock().await.iter().copied().collect();
        subject_ids.sort_unstable();
        for subject_id in subject_ids {
            queue.push(RecomputeRequest::SubjectMetrics {
                section_id: section.id,
                subject_id,
                semester_id: semester.id,
            });
        }
        queue.push(RecomputeRequest::SemesterMetrics {
            section_id: section.id,
            semester_id: semester.id,
        });

        info!(
            "📊 batch {}: final aggregate pass ({} recomputes)",
            job,
            queue.len()
        );
        let engine = MetricsEngine::new(self.store.clone());
        queue.drain(&engine).await?;

        Ok(summary)
    }

    /// One student's pipeline: Fetch → Ingest → progress tick. Returns
    /// whether the student's marks landed; per-student failures are recorded
    /// and swallowed, only store failures propagate.
    async fn process_student(
        self,
        job: String,
        student: Student,
        semester: Semester,
        url: String,
        touched: Arc<Mutex<HashSet<SubjectId>>>,
    ) -> AppResult<bool> {
        info!("[{}] 🔍 fetching results", student.usn);

        let landed = match self.fetcher.fetch(&student.usn, &url).await {
            Ok(sheet) => {
                if sheet.usn != student.usn {
                    debug!(
                        "[{}] result page reports USN {} (roster mismatch tolerated)",
                        student.usn, sheet.usn
                    );
                }
                match self.ingester.ingest(&student, &semester, &sheet.rows).await {
                    Ok(ingested) => {
                        info!(
                            "[{}] ✓ ingested: {} created, {} updated",
                            student.usn, ingested.created, ingested.updated
                        );
                        touched.lock().await.extend(ingested.subject_ids);
                        true
                    }
                    Err(IngestError::UnknownSubject { code }) => {
                        let failure = ScrapeFailure::UnknownSubject { code };
                        warn!("[{}] ✗ {}", student.usn, failure);
                        self.record_failure(&job, &student.usn, &failure).await?;
                        false
                    }
                    Err(IngestError::Store(e)) => return Err(e),
                }
            }
            Err(failure) => {
                warn!("[{}] ✗ {}", student.usn, failure);
                self.record_failure(&job, &student.usn, &failure).await?;
                false
            }
        };

        self.progress.increment(&job).await?;
        Ok(landed)
    }

    async fn record_failure(
        &self,
        job: &str,
        usn: &str,
        failure: &ScrapeFailure,
    ) -> AppResult<()> {
        self.progress
            .append_error(
                job,
                ScrapeErrorEntry {
                    identifier: usn.to_string(),
                    reason: failure.to_string(),
                },
            )
            .await
    }
}
