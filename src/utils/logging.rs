/// Logging helpers
///
/// Subscriber setup plus the batch lifecycle banners.
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::BatchSummary;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Banner for application startup.
pub fn log_startup(max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 result scrape runner starting");
    info!("📊 max concurrent students: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// Banner when a batch job is allocated.
pub fn log_batch_start(job: &str, section: &str, semester: u32, roster: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 batch {} started", job);
    info!(
        "📄 section {} / semester {}: {} students",
        section, semester, roster
    );
    info!("{}", "=".repeat(60));
}

/// Banner when a batch finishes (completed or cancelled).
pub fn log_batch_complete(job: &str, summary: &BatchSummary) {
    info!("{}", "─".repeat(60));
    if summary.cancelled {
        info!(
            "🛑 batch {} cancelled: {}/{} students processed",
            job, summary.dispatched, summary.total
        );
    } else {
        info!("✓ batch {} complete", job);
    }
    info!(
        "✅ succeeded: {}/{} | ❌ failed: {}",
        summary.succeeded, summary.dispatched, summary.failed
    );
    info!("{}", "─".repeat(60));
}
