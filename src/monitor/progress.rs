use crate::outcome::FetchOutcome;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub url: String,
    pub success: bool,
    pub status_code: u16,
    pub response_time: f64,
}

impl From<&FetchOutcome> for ProgressItem {
    fn from(outcome: &FetchOutcome) -> Self {
        Self {
            url: outcome.url.clone(),
            success: outcome.success,
            status_code: outcome.status_code,
            response_time: outcome.response_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub duration_secs: f64,
}

/// Counts completions against a known total and projects an ETA.
///
/// The bar is a rate-limited view of the counters; the counters themselves are
/// always current.
pub struct ProgressTracker {
    total: u64,
    completed: u64,
    succeeded: Vec<ProgressItem>,
    failed: Vec<ProgressItem>,
    started: Instant,
    last_render: Option<Instant>,
    update_interval: Duration,
    bar: ProgressBar,
    renders: u64,
}

impl ProgressTracker {
    /// A tracker that renders to a hidden bar.
    pub fn new(total: u64, update_interval: Duration) -> Self {
        Self::with_bar(total, update_interval, ProgressBar::hidden())
    }

    /// A tracker drawing into `multi`, alongside bridged log output.
    pub fn attached(total: u64, update_interval: Duration, multi: &MultiProgress) -> Self {
        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self::with_bar(total, update_interval, bar)
    }

    fn with_bar(total: u64, update_interval: Duration, bar: ProgressBar) -> Self {
        bar.set_length(total);
        Self {
            total,
            completed: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
            started: Instant::now(),
            last_render: None,
            update_interval,
            bar,
            renders: 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn succeeded(&self) -> &[ProgressItem] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[ProgressItem] {
        &self.failed
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn update(&mut self, increment: u64, outcome: Option<&FetchOutcome>) {
        self.update_at(increment, outcome, Instant::now());
    }

    fn update_at(&mut self, increment: u64, outcome: Option<&FetchOutcome>, now: Instant) {
        self.completed += increment;
        if let Some(outcome) = outcome {
            let item = ProgressItem::from(outcome);
            if item.success {
                self.succeeded.push(item);
            } else {
                self.failed.push(item);
            }
        }

        let due = self
            .last_render
            .is_none_or(|last| now.saturating_duration_since(last) >= self.update_interval);
        if due {
            self.render(now);
        }
    }

    pub fn eta(&self) -> Duration {
        self.eta_at(self.started.elapsed())
    }

    /// `(elapsed / completed) * remaining`, zero before the first completion.
    pub fn eta_at(&self, elapsed: Duration) -> Duration {
        if self.completed == 0 {
            return Duration::ZERO;
        }
        let remaining = self.total.saturating_sub(self.completed);
        elapsed.div_f64(self.completed as f64).mul_f64(remaining as f64)
    }

    pub fn finish(&mut self) -> ProgressSummary {
        self.completed = self.total;
        self.render(Instant::now());

        let summary = self.summary();
        let message = format!(
            "Success: {} | Failed: {} | Rate: {:.1}% | Duration: {:.1}s",
            summary.succeeded, summary.failed, summary.success_rate, summary.duration_secs
        );
        log::info!("Progress complete - {}", message);
        self.bar.finish_with_message(message);
        summary
    }

    pub fn summary(&self) -> ProgressSummary {
        let succeeded = self.succeeded.len();
        let failed = self.failed.len();
        let classified = succeeded + failed;
        ProgressSummary {
            total: self.total,
            succeeded,
            failed,
            success_rate: if classified > 0 {
                succeeded as f64 / classified as f64 * 100.0
            } else {
                0.0
            },
            duration_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    fn render(&mut self, now: Instant) {
        let eta = self.eta_at(now.saturating_duration_since(self.started));
        self.bar.set_position(self.completed);
        self.bar.set_message(format!(
            "ok: {} | failed: {} | eta: {:.0}s",
            self.succeeded.len(),
            self.failed.len(),
            eta.as_secs_f64()
        ));
        self.last_render = Some(now);
        self.renders += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::Map;

    fn ok(url: &str) -> FetchOutcome {
        FetchOutcome::success(url, 200, Duration::from_millis(100), 10, Map::new())
    }

    fn failed(url: &str) -> FetchOutcome {
        FetchOutcome::failure(url, 500, Duration::from_millis(100), 0, &Error::Network("x".into()))
    }

    #[test]
    fn first_update_renders_then_rate_limits() {
        let mut tracker = ProgressTracker::new(10, Duration::from_secs(1));
        let t0 = tracker.started;

        tracker.update_at(1, Some(&ok("https://a.example.com/")), t0);
        assert_eq!(tracker.renders(), 1);

        tracker.update_at(1, Some(&ok("https://b.example.com/")), t0 + Duration::from_millis(400));
        tracker.update_at(1, Some(&failed("https://c.example.com/")), t0 + Duration::from_millis(900));
        assert_eq!(tracker.renders(), 1);
        assert_eq!(tracker.completed(), 3);

        tracker.update_at(1, None, t0 + Duration::from_millis(1000));
        assert_eq!(tracker.renders(), 2);
        assert_eq!(tracker.completed(), 4);
        assert_eq!(tracker.succeeded().len(), 2);
        assert_eq!(tracker.failed().len(), 1);
    }

    #[test]
    fn eta_projects_remaining_work() {
        let mut tracker = ProgressTracker::new(10, Duration::from_secs(60));
        assert_eq!(tracker.eta_at(Duration::from_secs(5)), Duration::ZERO);

        tracker.update(4, None);
        let eta = tracker.eta_at(Duration::from_secs(8));
        assert!((eta.as_secs_f64() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn eta_is_zero_when_done() {
        let mut tracker = ProgressTracker::new(3, Duration::from_secs(60));
        tracker.update(3, None);
        assert_eq!(tracker.eta_at(Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn finish_forces_total_and_summarizes() {
        let mut tracker = ProgressTracker::new(4, Duration::from_secs(60));
        tracker.update(1, Some(&ok("https://a.example.com/")));
        tracker.update(1, Some(&ok("https://b.example.com/")));
        tracker.update(1, Some(&ok("https://c.example.com/")));
        tracker.update(1, Some(&failed("https://d.example.com/")));
        let before = tracker.renders();

        let summary = tracker.finish();
        assert_eq!(tracker.completed(), 4);
        assert_eq!(tracker.renders(), before + 1);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate, 75.0);
    }

    #[test]
    fn finish_without_updates_reports_zero_rate() {
        let mut tracker = ProgressTracker::new(2, Duration::from_secs(1));
        let summary = tracker.finish();
        assert_eq!(tracker.completed(), 2);
        assert_eq!(summary.success_rate, 0.0);
    }
}
