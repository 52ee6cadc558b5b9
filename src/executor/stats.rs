use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-executor counters, owned by the executor and handed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// HTTP attempts issued, retries included.
    pub requests_made: u64,
    /// URLs that ended in a successful outcome.
    pub successful_requests: u64,
    /// Valid URLs that ended in a failed outcome.
    pub failed_requests: u64,
    /// URLs rejected by the validity gate.
    pub invalid_urls: u64,
    pub delay_intervals: u64,
    pub total_delay_secs: f64,
}

impl ExecutorStats {
    pub fn charge_delay(&mut self, delay: Duration) {
        self.delay_intervals += 1;
        self.total_delay_secs += delay.as_secs_f64();
    }

    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.successful_requests + self.failed_requests;
        if total > 0 {
            self.successful_requests as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn average_delay_secs(&self) -> f64 {
        if self.delay_intervals > 0 {
            self.total_delay_secs / self.delay_intervals as f64
        } else {
            0.0
        }
    }
}
