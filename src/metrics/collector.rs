use crate::metrics::snapshot::MetricsSnapshot;
use crate::outcome::FetchOutcome;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Mutable per-session statistics. Owned by exactly one [`MetricsAggregator`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunningMetrics {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_urls: u64,
    pub successes: u64,
    pub failures: u64,
    pub bytes_downloaded: u64,
    pub cumulative_processing_time: f64,
    pub average_response_time: f64,
    pub requests_per_second: f64,
    pub errors_by_type: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<u16, u64>,
    pub domains: BTreeMap<String, u64>,
}

impl RunningMetrics {
    pub fn new(total_urls: u64) -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            total_urls,
            successes: 0,
            failures: 0,
            bytes_downloaded: 0,
            cumulative_processing_time: 0.0,
            average_response_time: 0.0,
            requests_per_second: 0.0,
            errors_by_type: BTreeMap::new(),
            status_codes: BTreeMap::new(),
            domains: BTreeMap::new(),
        }
    }

    pub fn completed(&self) -> u64 {
        self.successes + self.failures
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed();
        if total > 0 {
            self.successes as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Seconds between start and end, or start and now while running.
    pub fn duration_seconds(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Folds a stream of outcomes into running counts, histograms and averages.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    metrics: RunningMetrics,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MetricsAggregator {
    pub fn new(total_urls: u64) -> Self {
        Self {
            metrics: RunningMetrics::new(total_urls),
        }
    }

    pub fn metrics(&self) -> &RunningMetrics {
        &self.metrics
    }

    /// Never fails; an unparseable host just skips the domain histogram.
    pub fn record(&mut self, outcome: &FetchOutcome) {
        let m = &mut self.metrics;

        if outcome.success {
            m.successes += 1;
        } else {
            m.failures += 1;
            if let Some(error) = &outcome.error_message {
                *m.errors_by_type.entry(error.clone()).or_insert(0) += 1;
            }
        }

        if outcome.status_code != 0 {
            *m.status_codes.entry(outcome.status_code).or_insert(0) += 1;
        }

        m.bytes_downloaded += outcome.content_size;
        m.cumulative_processing_time += outcome.response_time;
        m.average_response_time = m.cumulative_processing_time / m.completed() as f64;

        if let Some(host) = outcome.host() {
            *m.domains.entry(host).or_insert(0) += 1;
        }
    }

    pub fn finalize(&mut self) {
        let m = &mut self.metrics;
        m.end_time = Some(Utc::now());
        let duration = m.duration_seconds();
        m.requests_per_second = if duration > 0.0 {
            m.completed() as f64 / duration
        } else {
            0.0
        };
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let m = &self.metrics;
        MetricsSnapshot {
            start_time: m.start_time,
            end_time: m.end_time,
            duration_seconds: m.end_time.map(|_| m.duration_seconds()),
            total_urls: m.total_urls,
            successful_requests: m.successes,
            failed_requests: m.failures,
            success_rate: m.success_rate(),
            total_bytes_downloaded: m.bytes_downloaded,
            total_processing_time: m.cumulative_processing_time,
            average_response_time: m.average_response_time,
            requests_per_second: m.requests_per_second,
            errors_by_type: m.errors_by_type.clone(),
            status_codes: m.status_codes.clone(),
            domain_stats: m.domains.clone(),
        }
    }
}
