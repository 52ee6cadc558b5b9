//! Fetch executors.
//!
//! Two execution models share the same outcome shape:
//! - [`RetryingExecutor`] processes URLs one after another with a jittered
//!   pre-request delay and an exponential backoff ladder between attempts.
//! - [`ConcurrentExecutor`] runs up to `max_concurrent` cooperative units at
//!   once with a fixed, unjittered delay and a single attempt per URL.
//!
//! Both return exactly one [`FetchOutcome`] per input URL, in input order.

pub mod concurrent;
pub mod retrying;
pub mod stats;

pub use concurrent::{ConcurrentConfig, ConcurrentExecutor};
pub use retrying::{RetryConfig, RetryingExecutor};
pub use stats::ExecutorStats;

use crate::error::Error;
use crate::extractor::Extractor;
use crate::outcome::FetchOutcome;
use crate::transport::{Document, Transport};
use std::time::Duration;
use tokio::time::Instant;

pub(crate) struct Fetched {
    document: Document,
    elapsed: Duration,
}

pub(crate) struct FailedAttempt {
    status_code: u16,
    elapsed: Duration,
    content_size: u64,
    error: Error,
}

impl FailedAttempt {
    fn into_outcome(self, url: &str) -> FetchOutcome {
        FetchOutcome::failure(
            url,
            self.status_code,
            self.elapsed,
            self.content_size,
            &self.error,
        )
    }
}

/// One request. Statuses outside 2xx/3xx count as failures.
pub(crate) async fn fetch_once(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
) -> Result<Fetched, FailedAttempt> {
    let started = Instant::now();
    let result = transport.get(url, timeout).await;
    let elapsed = started.elapsed();

    match result {
        Ok(document) if document.is_ok_status() => Ok(Fetched { document, elapsed }),
        Ok(document) => Err(FailedAttempt {
            status_code: document.status,
            elapsed,
            content_size: document.body.len() as u64,
            error: Error::HttpStatus {
                status: document.status,
                url: url.to_string(),
            },
        }),
        Err(error) => Err(FailedAttempt {
            status_code: 0,
            elapsed,
            content_size: 0,
            error,
        }),
    }
}

/// Runs the extractor on a fetched document. Extraction errors collapse into
/// an ordinary failure outcome.
pub(crate) fn complete(url: &str, fetched: Fetched, extractor: &dyn Extractor) -> FetchOutcome {
    let Fetched { document, elapsed } = fetched;
    let size = document.body.len() as u64;

    match extractor.extract(&document) {
        Ok(data) => FetchOutcome::success(url, document.status, elapsed, size, data),
        Err(e) => {
            log::error!("Failed to extract {}: {}", url, e);
            FetchOutcome::failure(url, document.status, elapsed, size, &e)
        }
    }
}
