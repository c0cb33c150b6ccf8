pub mod engine;
pub mod recompute;

pub use engine::MetricsEngine;
pub use recompute::{RecomputeQueue, RecomputeRequest};
