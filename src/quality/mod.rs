/// Frame quality scoring module
///
/// Provides the per-frame quality gate: raw metric computation over luma
/// buffers, normalized sub-scores, the windowed aggregate, and the failure
/// reason tags the auto-capture controller gates on.
pub mod engine;
pub mod metrics;
pub mod reasons;

pub use engine::{QualityGateEngine, QualityResult};
pub use metrics::ExposureStats;
pub use reasons::{dedup_reasons, FailReason};
