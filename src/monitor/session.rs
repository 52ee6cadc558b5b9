use crate::metrics::{MetricsAggregator, MetricsSnapshot, RunningMetrics};
use crate::monitor::alerts::{AlertEvaluator, AlertThresholds};
use crate::monitor::progress::{DEFAULT_UPDATE_INTERVAL, ProgressTracker};
use crate::monitor::report::{CurrentStats, SessionReport};
use crate::monitor::sampler::{DEFAULT_INTERVAL, PerformanceSampler};
use crate::outcome::FetchOutcome;
use indicatif::MultiProgress;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    pub thresholds: AlertThresholds,
    pub progress_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_INTERVAL,
            thresholds: AlertThresholds::default(),
            progress_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

/// Ties metrics, alerts, progress and system sampling to one fetch session.
///
/// Everything except the sampler's thread is single-writer: outcomes are fed
/// through [`Monitor::record`] by whichever executor owns the session.
pub struct Monitor {
    name: String,
    config: MonitorConfig,
    aggregator: MetricsAggregator,
    alerts: AlertEvaluator,
    progress: Option<ProgressTracker>,
    sampler: PerformanceSampler,
    multi: Option<MultiProgress>,
}

impl Monitor {
    pub fn new(name: impl Into<String>, config: MonitorConfig) -> Self {
        let sampler = PerformanceSampler::new(config.sample_interval);
        Self::with_sampler(name, config, sampler)
    }

    pub fn with_sampler(
        name: impl Into<String>,
        config: MonitorConfig,
        sampler: PerformanceSampler,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            aggregator: MetricsAggregator::default(),
            alerts: AlertEvaluator::new(config.thresholds),
            progress: None,
            sampler,
            multi: None,
        }
    }

    /// Draw the session's progress bar into `multi` instead of a hidden bar.
    pub fn with_progress_bars(mut self, multi: MultiProgress) -> Self {
        self.multi = Some(multi);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_session(&mut self, total_urls: u64) {
        self.aggregator = MetricsAggregator::new(total_urls);
        self.alerts.clear();
        self.sampler.clear();
        self.sampler.start();

        self.progress = (total_urls > 0).then(|| match &self.multi {
            Some(multi) => {
                ProgressTracker::attached(total_urls, self.config.progress_interval, multi)
            }
            None => ProgressTracker::new(total_urls, self.config.progress_interval),
        });

        log::info!(
            "Monitoring session '{}' started ({} URLs)",
            self.name,
            total_urls
        );
    }

    pub fn record(&mut self, outcome: &FetchOutcome) {
        self.aggregator.record(outcome);
        log_request(outcome);

        if let Some(progress) = self.progress.as_mut() {
            progress.update(1, Some(outcome));
        }

        let system = self.sampler.current_stats();
        self.alerts
            .evaluate(self.aggregator.metrics(), system.as_ref());
    }

    pub fn end_session(&mut self) -> SessionReport {
        self.aggregator.finalize();

        if let Some(progress) = self.progress.as_mut() {
            progress.finish();
        }

        self.sampler.stop();

        let metrics = self.aggregator.snapshot();
        log::info!("{}", session_line(&metrics));

        let report = SessionReport::new(
            self.name.clone(),
            metrics,
            self.sampler.current_stats(),
            self.alerts.alerts().to_vec(),
        );
        log::info!(
            "Monitoring session '{}' completed with {} alert(s)",
            self.name,
            report.alerts.len()
        );
        report
    }

    pub fn current_stats(&self) -> CurrentStats {
        let metrics = self.aggregator.snapshot();
        CurrentStats {
            session_duration: self.aggregator.metrics().duration_seconds(),
            metrics,
            system_performance: self.sampler.current_stats(),
            alerts_count: self.alerts.alerts().len(),
        }
    }

    pub fn metrics(&self) -> &RunningMetrics {
        self.aggregator.metrics()
    }

    pub fn alerts(&self) -> &[String] {
        self.alerts.alerts()
    }

    pub fn progress(&self) -> Option<&ProgressTracker> {
        self.progress.as_ref()
    }

    pub fn sampler(&self) -> &PerformanceSampler {
        &self.sampler
    }
}

fn log_request(outcome: &FetchOutcome) {
    let line = request_line(outcome);
    if outcome.error_message.is_some() || outcome.status_code >= 400 {
        log::error!("{}", line);
    } else {
        log::info!("{}", line);
    }
}

/// Status and timing are left out when no response was obtained.
fn request_line(outcome: &FetchOutcome) -> String {
    let mut line = format!("REQUEST GET {}", outcome.url);
    if outcome.status_code != 0 {
        line.push_str(&format!(" -> {}", outcome.status_code));
    }
    if outcome.response_time > 0.0 {
        line.push_str(&format!(" ({:.1}ms)", outcome.response_time * 1000.0));
    }
    if let Some(error) = &outcome.error_message {
        line.push_str(&format!(" ERROR: {}", error));
    }
    line
}

fn session_line(metrics: &MetricsSnapshot) -> String {
    format!(
        "METRICS SESSION COMPLETE - URLs: {}, Success: {}, Failed: {}, Rate: {:.1}%, Duration: {:.1}s",
        metrics.total_urls,
        metrics.successful_requests,
        metrics.failed_requests,
        metrics.success_rate,
        metrics.duration_seconds.unwrap_or_default()
    )
}
