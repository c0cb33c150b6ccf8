//! TTL-bound progress records for scrape batch jobs.
//!
//! One record per batch, polled by clients through an opaque UUID handle.
//! The interface is deliberately small ({create, increment, append,
//! get, cancel, mark, invalidate}) so any KV store with counters, lists
//! and expiry can back it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;

/// Default retention window for a job record (3 hours).
pub const DEFAULT_PROGRESS_TTL: Duration = Duration::from_secs(10_800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Running,
    Completed,
    Cancelled,
    /// The batch hit a fatal orchestration error; counters may be stale.
    Invalidated,
}

/// One per-student failure, surfaced verbatim to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeErrorEntry {
    pub identifier: String,
    pub reason: String,
}

/// Snapshot returned to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeProgress {
    pub total: usize,
    pub completed: usize,
    pub errors: Vec<ScrapeErrorEntry>,
    pub cancel_requested: bool,
    pub state: JobState,
}

impl ScrapeProgress {
    /// Done covers finished-with-failures, cancelled and invalidated alike;
    /// only a running job is not done.
    pub fn is_done(&self) -> bool {
        self.state != JobState::Running
    }
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Allocate a record sized to the roster and return its opaque handle.
    async fn create(&self, total: usize) -> AppResult<String>;

    /// Atomically bump the completed counter.
    async fn increment(&self, job: &str) -> AppResult<()>;

    /// Atomically append one failure to the job's error list.
    async fn append_error(&self, job: &str, entry: ScrapeErrorEntry) -> AppResult<()>;

    /// Snapshot a job. Expired or unknown handles read as `None`.
    async fn get(&self, job: &str) -> AppResult<Option<ScrapeProgress>>;

    /// Ask the batch to stop dispatching new students. Returns false for an
    /// unknown or expired handle.
    async fn request_cancel(&self, job: &str) -> AppResult<bool>;

    async fn cancel_requested(&self, job: &str) -> AppResult<bool>;

    async fn mark_state(&self, job: &str, state: JobState) -> AppResult<()>;

    /// Terminal marker for a batch that died mid-flight; pollers see
    /// `Invalidated` rather than a forever-running job.
    async fn invalidate(&self, job: &str) -> AppResult<()>;
}

#[derive(Debug)]
struct JobRecord {
    progress: ScrapeProgress,
    expires_at: DateTime<Utc>,
}

/// In-process progress store with lazy TTL enforcement.
#[derive(Debug)]
pub struct InMemoryProgressStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
    ttl: chrono::Duration,
}

impl InMemoryProgressStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(3)),
        }
    }

    fn expired(record: &JobRecord) -> bool {
        record.expires_at <= Utc::now()
    }
}

impl Default for InMemoryProgressStore {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_TTL)
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn create(&self, total: usize) -> AppResult<String> {
        let handle = Uuid::new_v4().to_string();
        let record = JobRecord {
            progress: ScrapeProgress {
                total,
                completed: 0,
                errors: Vec::new(),
                cancel_requested: false,
                state: JobState::Running,
            },
            expires_at: Utc::now() + self.ttl,
        };
        self.jobs.write().await.insert(handle.clone(), record);
        Ok(handle)
    }

    async fn increment(&self, job: &str) -> AppResult<()> {
        if let Some(record) = self.jobs.write().await.get_mut(job) {
            record.progress.completed += 1;
        }
        Ok(())
    }

    async fn append_error(&self, job: &str, entry: ScrapeErrorEntry) -> AppResult<()> {
        if let Some(record) = self.jobs.write().await.get_mut(job) {
            record.progress.errors.push(entry);
        }
        Ok(())
    }

    async fn get(&self, job: &str) -> AppResult<Option<ScrapeProgress>> {
        let mut jobs = self.jobs.write().await;
        match jobs.get(job) {
            Some(record) if Self::expired(record) => {
                jobs.remove(job);
                Ok(None)
            }
            Some(record) => Ok(Some(record.progress.clone())),
            None => Ok(None),
        }
    }

    async fn request_cancel(&self, job: &str) -> AppResult<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job) {
            Some(record) if !Self::expired(record) => {
                record.progress.cancel_requested = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_requested(&self, job: &str) -> AppResult<bool> {
        Ok(self
            .jobs
            .read()
            .await
            .get(job)
            .map(|r| r.progress.cancel_requested)
            .unwrap_or(false))
    }

    async fn mark_state(&self, job: &str, state: JobState) -> AppResult<()> {
        if let Some(record) = self.jobs.write().await.get_mut(job) {
            record.progress.state = state;
        }
        Ok(())
    }

    async fn invalidate(&self, job: &str) -> AppResult<()> {
        self.mark_state(job, JobState::Invalidated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_poll_roundtrip() {
        let store = InMemoryProgressStore::default();
        let job = store.create(12).await.expect("create");

        let snapshot = store.get(&job).await.expect("get").expect("present");
        assert_eq!(snapshot.total, 12);
        assert_eq!(snapshot.completed, 0);
        assert!(snapshot.errors.is_empty());
        assert!(!snapshot.is_done());
    }

    #[tokio::test]
    async fn increments_and_errors_accumulate() {
        let store = InMemoryProgressStore::default();
        let job = store.create(3).await.expect("create");

        store.increment(&job).await.expect("incr");
        store.increment(&job).await.expect("incr");
        store
            .append_error(
                &job,
                ScrapeErrorEntry {
                    identifier: "1OX21CS004".to_string(),
                    reason: "captcha failed after 3 attempts".to_string(),
                },
            )
            .await
            .expect("append");

        let snapshot = store.get(&job).await.expect("get").expect("present");
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.errors.len(), 1);
        assert_eq!(snapshot.errors[0].identifier, "1OX21CS004");
    }

    #[tokio::test]
    async fn expired_handles_read_as_absent() {
        let store = InMemoryProgressStore::new(Duration::from_millis(20));
        let job = store.create(1).await.expect("create");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.get(&job).await.expect("get").is_none());
        assert!(!store.request_cancel(&job).await.expect("cancel"));
    }

    #[tokio::test]
    async fn cancellation_flag_is_sticky() {
        let store = InMemoryProgressStore::default();
        let job = store.create(5).await.expect("create");

        assert!(store.request_cancel(&job).await.expect("cancel"));
        assert!(store.cancel_requested(&job).await.expect("check"));

        store.mark_state(&job, JobState::Cancelled).await.expect("mark");
        let snapshot = store.get(&job).await.expect("get").expect("present");
        assert_eq!(snapshot.state, JobState::Cancelled);
        assert!(snapshot.is_done());
    }

    #[tokio::test]
    async fn invalidation_is_visible_to_pollers() {
        let store = InMemoryProgressStore::default();
        let job = store.create(5).await.expect("create");

        store.invalidate(&job).await.expect("invalidate");
        let snapshot = store.get(&job).await.expect("get").expect("present");
        assert_eq!(snapshot.state, JobState::Invalidated);
        assert!(snapshot.is_done());
    }

    #[tokio::test]
    async fn unknown_handle_is_none() {
        let store = InMemoryProgressStore::default();
        assert!(store.get("no-such-job").await.expect("get").is_none());
    }
}
