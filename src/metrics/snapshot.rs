use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time copy of a session's running metrics, ready for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Only known once the session is finalized.
    pub duration_seconds: Option<f64>,
    pub total_urls: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub total_bytes_downloaded: u64,
    pub total_processing_time: f64,
    pub average_response_time: f64,
    pub requests_per_second: f64,
    pub errors_by_type: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<u16, u64>,
    pub domain_stats: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn completed(&self) -> u64 {
        self.successful_requests + self.failed_requests
    }

    pub fn top_domains(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.domain_stats, n)
    }

    pub fn top_errors(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.errors_by_type, n)
    }
}

/// Highest counts first; equal counts fall back to key order.
fn top_n(counts: &BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}
