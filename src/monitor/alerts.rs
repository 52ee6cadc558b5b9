use crate::metrics::RunningMetrics;
use crate::monitor::sampler::SystemStats;
use serde::{Deserialize, Serialize};

/// The error-rate rule stays quiet until this many URLs have completed.
pub const MIN_COMPLETIONS_FOR_ERROR_RATE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub error_rate_pct: f64,
    pub response_time_secs: f64,
    pub memory_pct: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            error_rate_pct: 20.0,
            response_time_secs: 10.0,
            memory_pct: 80.0,
        }
    }
}

/// Threshold rules evaluated after every recorded outcome.
///
/// Alerts are deduplicated by their exact text, not by the rule that raised
/// them: the same rule firing with a different number yields a new alert.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
    alerts: Vec<String>,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self {
            thresholds,
            alerts: Vec::new(),
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    /// Runs every rule and returns the alerts raised by this call.
    pub fn evaluate(&mut self, metrics: &RunningMetrics, system: Option<&SystemStats>) -> Vec<String> {
        let mut raised = Vec::new();
        let completed = metrics.completed();

        if completed >= MIN_COMPLETIONS_FOR_ERROR_RATE {
            let error_rate = metrics.failures as f64 / completed as f64 * 100.0;
            if error_rate > self.thresholds.error_rate_pct {
                self.raise(
                    format!(
                        "High error rate: {:.1}% (threshold: {:?}%)",
                        error_rate, self.thresholds.error_rate_pct
                    ),
                    &mut raised,
                );
            }
        }

        if metrics.average_response_time > self.thresholds.response_time_secs {
            self.raise(
                format!(
                    "Slow response times: {:.2}s average",
                    metrics.average_response_time
                ),
                &mut raised,
            );
        }

        if let Some(stats) = system {
            if stats.avg_memory_percent > self.thresholds.memory_pct {
                self.raise(
                    format!("High memory usage: {:.1}%", stats.avg_memory_percent),
                    &mut raised,
                );
            }
        }

        raised
    }

    fn raise(&mut self, alert: String, raised: &mut Vec<String>) {
        if self.alerts.contains(&alert) {
            return;
        }
        log::warn!("ALERT: {}", alert);
        self.alerts.push(alert.clone());
        raised.push(alert);
    }
}
