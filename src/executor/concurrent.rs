use super::{ExecutorStats, complete, fetch_once};
use crate::error::Error;
use crate::extractor::Extractor;
use crate::outcome::FetchOutcome;
use crate::transport::Transport;
use crate::validate::validate_url;
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct ConcurrentConfig {
    pub max_concurrent: usize,
    /// Fixed pause taken after acquiring a permit. No jitter is applied.
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for ConcurrentConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Bounded cooperative executor.
///
/// Every URL becomes one unit of work that takes a permit, sleeps the fixed
/// delay, issues a single request and runs the extractor. There is no retry
/// ladder here: one attempt per URL is the contract of this executor. All
/// units are polled on the calling task, so outcome handling never races.
pub struct ConcurrentExecutor {
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    config: ConcurrentConfig,
    stats: ExecutorStats,
}

impl ConcurrentExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
        config: ConcurrentConfig,
    ) -> Self {
        Self {
            transport,
            extractor,
            config,
            stats: ExecutorStats::default(),
        }
    }

    pub fn config(&self) -> &ConcurrentConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    pub fn take_stats(&mut self) -> ExecutorStats {
        std::mem::take(&mut self.stats)
    }

    /// Fetches every URL and returns outcomes in input order. `on_outcome`
    /// sees them in completion order.
    pub async fn fetch_all<F>(&mut self, urls: &[String], mut on_outcome: F) -> Vec<FetchOutcome>
    where
        F: FnMut(&FetchOutcome),
    {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut slots: Vec<Option<FetchOutcome>> = Vec::with_capacity(urls.len());
        slots.resize_with(urls.len(), || None);
        let mut pending = FuturesUnordered::new();

        log::info!(
            "Starting to fetch {} URLs with up to {} in flight",
            urls.len(),
            self.config.max_concurrent
        );

        for (index, url) in urls.iter().enumerate() {
            if validate_url(url).is_err() {
                log::warn!("Skipping invalid URL: {}", url);
                self.stats.invalid_urls += 1;
                let outcome = FetchOutcome::invalid(url.as_str());
                on_outcome(&outcome);
                slots[index] = Some(outcome);
                continue;
            }

            let unit = fetch_unit(
                self.transport.clone(),
                self.extractor.clone(),
                permits.clone(),
                url.clone(),
                self.config.delay,
                self.config.timeout,
            );
            pending.push(async move { (index, unit.await) });
        }

        while let Some((index, outcome)) = pending.next().await {
            self.stats.requests_made += 1;
            self.stats.charge_delay(self.config.delay);
            self.stats.record_outcome(outcome.success);
            on_outcome(&outcome);
            slots[index] = Some(outcome);
        }

        slots.into_iter().flatten().collect()
    }
}

async fn fetch_unit(
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    permits: Arc<Semaphore>,
    url: String,
    delay: Duration,
    timeout: Duration,
) -> FetchOutcome {
    let work = async {
        let _permit = match permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                let error = Error::Internal(format!("permit pool closed: {}", e));
                return FetchOutcome::failure(url.as_str(), 0, Duration::ZERO, 0, &error);
            }
        };

        if !delay.is_zero() {
            sleep(delay).await;
        }

        match fetch_once(transport.as_ref(), &url, timeout).await {
            Ok(fetched) => complete(&url, fetched, extractor.as_ref()),
            Err(failed) => {
                log::error!("Failed to fetch {}: {}", url, failed.error);
                failed.into_outcome(&url)
            }
        }
    };

    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            log::error!("Fetch of {} panicked", url);
            let error = Error::Internal("fetch task panicked".into());
            FetchOutcome::failure(url.as_str(), 0, Duration::ZERO, 0, &error)
        }
    }
}
