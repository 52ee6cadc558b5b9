pub mod config;
pub mod crawler;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod metrics;
pub mod monitor;
pub mod outcome;
pub mod output;
pub mod transport;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use crawler::{CrawlRun, CrawlerEngine};
pub use error::{Error, Result};
pub use executor::{ConcurrentExecutor, ExecutorStats, RetryingExecutor};
pub use extractor::{DefaultExtractor, Extractor};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use monitor::{Monitor, PerformanceSampler, SessionReport};
pub use outcome::FetchOutcome;
pub use transport::{Document, ReqwestTransport, Transport};
