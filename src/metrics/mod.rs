pub mod collector;
pub mod snapshot;

pub use collector::{MetricsAggregator, RunningMetrics};
pub use snapshot::MetricsSnapshot;
