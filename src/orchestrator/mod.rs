//! Orchestration layer
//!
//! Owns batch scheduling and nothing else: it dispatches the per-student
//! pipeline over a roster, keeps the progress record current, and triggers
//! the final aggregate recompute pass behind the barrier.
//!
//! ```text
//! ScrapeOrchestrator (roster → worker pool → barrier → aggregates)
//!     ↓
//! fetcher::ResultFetcher (one student, one browser session)
//!     ↓
//! ingest::ScoreIngester (reconcile + batched upsert)
//!     ↓
//! metrics::MetricsEngine (dependency-ordered recomputes)
//! ```

pub mod batch;

pub use batch::{BatchSummary, ScrapeOrchestrator};
