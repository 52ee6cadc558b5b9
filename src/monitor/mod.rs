//! Session monitoring: system sampling, threshold alerts, progress and the
//! end-of-session report.

pub mod alerts;
pub mod progress;
pub mod report;
pub mod sampler;
pub mod session;

pub use alerts::{AlertEvaluator, AlertThresholds};
pub use progress::{ProgressSummary, ProgressTracker};
pub use report::{CurrentStats, NamedCount, SessionReport};
pub use sampler::{PerformanceSampler, SampleSource, SysinfoSource, SystemSample, SystemStats};
pub use session::{Monitor, MonitorConfig};
