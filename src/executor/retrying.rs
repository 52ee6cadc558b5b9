use super::{ExecutorStats, FailedAttempt, Fetched, complete, fetch_once};
use crate::extractor::Extractor;
use crate::outcome::FetchOutcome;
use crate::transport::Transport;
use crate::validate::validate_url;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Baseline pause before every attempt; up to 50% jitter is added on top.
    pub delay: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_retries: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sequential executor with jittered delays and exponential backoff.
///
/// Each valid URL gets up to `max_retries + 1` attempts. Every attempt first
/// waits `delay + uniform(0, delay / 2)`; a failed attempt with attempts left
/// waits `2^attempt_index` seconds before the next one. Only the last
/// attempt's error text survives into the outcome.
pub struct RetryingExecutor {
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    config: RetryConfig,
    stats: ExecutorStats,
}

impl RetryingExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
        config: RetryConfig,
    ) -> Self {
        log::info!(
            "Retrying executor initialized with delay={:?}, retries={}",
            config.delay,
            config.max_retries
        );
        Self {
            transport,
            extractor,
            config,
            stats: ExecutorStats::default(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    /// Hands back the accumulated stats and starts a fresh set.
    pub fn take_stats(&mut self) -> ExecutorStats {
        std::mem::take(&mut self.stats)
    }

    /// Processes one URL. Never fails: every error ends up in the outcome.
    pub async fn fetch_url(&mut self, url: &str) -> FetchOutcome {
        if validate_url(url).is_err() {
            log::warn!("Skipping invalid URL: {}", url);
            self.stats.invalid_urls += 1;
            return FetchOutcome::invalid(url);
        }

        log::info!("Fetching {}", url);
        let outcome = match self.fetch_with_retry(url).await {
            Ok(fetched) => complete(url, fetched, self.extractor.as_ref()),
            Err(failed) => {
                log::error!("Failed to fetch {}: {}", url, failed.error);
                failed.into_outcome(url)
            }
        };
        self.stats.record_outcome(outcome.success);
        outcome
    }

    /// Processes `urls` in order, handing each outcome to `on_outcome` as soon
    /// as it exists. A failing URL never stops the batch.
    pub async fn fetch_all<F>(&mut self, urls: &[String], mut on_outcome: F) -> Vec<FetchOutcome>
    where
        F: FnMut(&FetchOutcome),
    {
        let total = urls.len();
        let mut outcomes = Vec::with_capacity(total);
        log::info!("Starting to fetch {} URLs", total);

        for (i, url) in urls.iter().enumerate() {
            let done = i + 1;
            log::debug!("Fetching URL {}/{}: {}", done, total, url);
            let outcome = self.fetch_url(url).await;
            on_outcome(&outcome);
            outcomes.push(outcome);

            if done % 10 == 0 || done == total {
                let successes = outcomes.iter().filter(|o| o.success).count();
                log::info!("Progress: {}/{} completed, {} successful", done, total, successes);
            }
        }

        outcomes
    }

    async fn fetch_with_retry(&mut self, url: &str) -> Result<Fetched, FailedAttempt> {
        let attempts = self.config.max_retries + 1;
        let mut attempt_index = 0;

        loop {
            let delay = self.jittered_delay();
            self.stats.charge_delay(delay);
            if !delay.is_zero() {
                sleep(delay).await;
            }

            self.stats.requests_made += 1;
            match fetch_once(self.transport.as_ref(), url, self.config.timeout).await {
                Ok(fetched) => {
                    log::debug!("Successfully fetched {}", url);
                    return Ok(fetched);
                }
                Err(failed) => {
                    log::warn!(
                        "Request failed (attempt {}/{}): {}",
                        attempt_index + 1,
                        attempts,
                        failed.error
                    );
                    if attempt_index + 1 >= attempts {
                        return Err(failed);
                    }
                    sleep(backoff(attempt_index)).await;
                    attempt_index += 1;
                }
            }
        }
    }

    fn jittered_delay(&self) -> Duration {
        let delay = self.config.delay;
        if delay.is_zero() {
            return delay;
        }
        delay + delay.mul_f64(fastrand::f64() * 0.5)
    }
}

/// `2^attempt_index` seconds.
fn backoff(attempt_index: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt_index))
}
