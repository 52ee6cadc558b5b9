//! Background system-resource sampler.
//!
//! The sampler owns a dedicated OS thread so it keeps capturing while the
//! fetch pipeline is busy or blocked. Samples land in a fixed-capacity ring
//! buffer; readers take a short read lock and may see the buffer one append
//! behind the worker, which only affects report freshness.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sysinfo::{Networks, System};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// Number of most recent samples averaged by [`PerformanceSampler::current_stats`].
pub const STATS_WINDOW: usize = 10;
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_mb: f64,
    pub network_bytes_received: u64,
    pub network_bytes_sent: u64,
    pub process_count: usize,
}

/// Averages over the most recent samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub avg_cpu_percent: f64,
    pub avg_memory_percent: f64,
    pub current_memory_mb: f64,
    pub measurements_count: usize,
    pub monitoring_duration_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerExport {
    pub export_time: DateTime<Utc>,
    pub total_measurements: usize,
    pub interval_seconds: f64,
    pub metrics: Vec<SystemSample>,
}

/// Where samples come from.
pub trait SampleSource: Send + 'static {
    fn capture(&mut self) -> Result<SystemSample>;
}

pub struct SysinfoSource {
    system: System,
    networks: Networks,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta between refreshes; prime the first reading.
        system.refresh_cpu();
        Self {
            system,
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSource for SysinfoSource {
    fn capture(&mut self) -> Result<SystemSample> {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_processes();
        self.networks.refresh();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(Error::Internal("total memory unavailable".into()));
        }
        let used = self.system.used_memory();
        let (received, sent) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (rx + data.total_received(), tx + data.total_transmitted())
            });

        Ok(SystemSample {
            timestamp: Utc::now(),
            cpu_percent: self.system.global_cpu_info().cpu_usage() as f64,
            memory_percent: used as f64 / total as f64 * 100.0,
            memory_used_mb: used as f64 / 1024.0 / 1024.0,
            network_bytes_received: received,
            network_bytes_sent: sent,
            process_count: self.system.processes().len(),
        })
    }
}

/// FIFO buffer that evicts its oldest entry once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The last `n` items, oldest first.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(n))
    }
}

struct Worker {
    stop: Arc<AtomicBool>,
    exited: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

pub struct PerformanceSampler {
    interval: Duration,
    history: Arc<RwLock<RingBuffer<SystemSample>>>,
    source: Arc<Mutex<Box<dyn SampleSource>>>,
    worker: Option<Worker>,
}

impl PerformanceSampler {
    pub fn new(interval: Duration) -> Self {
        Self::with_source(interval, SysinfoSource::new())
    }

    pub fn with_source(interval: Duration, source: impl SampleSource) -> Self {
        Self {
            interval,
            history: Arc::new(RwLock::new(RingBuffer::new(DEFAULT_CAPACITY))),
            source: Arc::new(Mutex::new(Box::new(source))),
            worker: None,
        }
    }

    /// Replaces the buffer; any collected samples are dropped.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.history = Arc::new(RwLock::new(RingBuffer::new(capacity)));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawns the sampling thread. Calling it while running does nothing.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (exited_tx, exited) = mpsc::channel();
        let interval = self.interval;
        let history = self.history.clone();
        let source = self.source.clone();
        let stop_flag = stop.clone();

        let spawned = thread::Builder::new()
            .name("perf-sampler".into())
            .spawn(move || {
                sample_loop(&stop_flag, interval, &history, &source);
                let _ = exited_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                log::debug!("Performance sampler started (interval {:?})", interval);
                self.worker = Some(Worker {
                    stop,
                    exited,
                    handle,
                });
            }
            Err(e) => log::error!("Failed to start performance sampler: {}", e),
        }
    }

    /// Signals the thread and waits up to one second for it to exit. A thread
    /// still asleep at the deadline is left to finish its current wake alone.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.stop.store(true, Ordering::SeqCst);

        match worker.exited.recv_timeout(STOP_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.handle.join();
                log::debug!("Performance sampler stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                log::debug!("Performance sampler did not exit within {:?}", STOP_TIMEOUT);
            }
        }
    }

    /// Drops collected samples. Used at session start.
    pub fn clear(&mut self) {
        let mut history = write(&self.history);
        let capacity = history.capacity();
        *history = RingBuffer::new(capacity);
    }

    pub fn len(&self) -> usize {
        read(&self.history).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.history).is_empty()
    }

    pub fn samples(&self) -> Vec<SystemSample> {
        read(&self.history).iter().cloned().collect()
    }

    /// Averages of the last [`STATS_WINDOW`] samples; `None` before the first sample.
    pub fn current_stats(&self) -> Option<SystemStats> {
        summarize(&read(&self.history), self.interval)
    }

    pub fn export(&self) -> SamplerExport {
        let history = read(&self.history);
        SamplerExport {
            export_time: Utc::now(),
            total_measurements: history.len(),
            interval_seconds: self.interval.as_secs_f64(),
            metrics: history.iter().cloned().collect(),
        }
    }

    pub fn export_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, &self.export())?;
        writer.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn push_sample(&self, sample: SystemSample) {
        write(&self.history).push(sample);
    }
}

impl Drop for PerformanceSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sample_loop(
    stop: &AtomicBool,
    interval: Duration,
    history: &RwLock<RingBuffer<SystemSample>>,
    source: &Mutex<Box<dyn SampleSource>>,
) {
    while !stop.load(Ordering::SeqCst) {
        let captured = match source.lock() {
            Ok(mut source) => source.capture(),
            Err(poisoned) => poisoned.into_inner().capture(),
        };
        match captured {
            Ok(sample) => write(history).push(sample),
            Err(e) => log::debug!("Sample capture failed: {}", e),
        }
        thread::sleep(interval);
    }
}

fn summarize(history: &RingBuffer<SystemSample>, interval: Duration) -> Option<SystemStats> {
    let recent: Vec<&SystemSample> = history.latest(STATS_WINDOW).collect();
    let last = recent.last()?;
    let n = recent.len() as f64;

    let avg_cpu = recent.iter().map(|s| s.cpu_percent).sum::<f64>() / n;
    let avg_memory = recent.iter().map(|s| s.memory_percent).sum::<f64>() / n;

    Some(SystemStats {
        avg_cpu_percent: round2(avg_cpu),
        avg_memory_percent: round2(avg_memory),
        current_memory_mb: round2(last.memory_used_mb),
        measurements_count: recent.len(),
        monitoring_duration_minutes: history.len() as f64 * interval.as_secs_f64() / 60.0,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FixedSource;
    use std::time::Instant;

    fn sample(memory_percent: f64) -> SystemSample {
        SystemSample {
            timestamp: Utc::now(),
            cpu_percent: memory_percent / 2.0,
            memory_percent,
            memory_used_mb: memory_percent * 10.0,
            network_bytes_received: 0,
            network_bytes_sent: 0,
            process_count: 1,
        }
    }

    fn wait_for(sampler: &PerformanceSampler, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while sampler.len() < n && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn ring_buffer_evicts_oldest_first() {
        let mut ring = RingBuffer::new(3);
        for i in 0..8 {
            ring.push(i);
            assert!(ring.len() <= 3);
        }
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(ring.latest(2).copied().collect::<Vec<_>>(), vec![6, 7]);
        assert_eq!(ring.latest(10).count(), 3);
    }

    #[test]
    fn sampler_buffer_respects_default_capacity() {
        let sampler = PerformanceSampler::with_source(Duration::from_secs(1), FixedSource::new(1.0));
        for i in 0..(DEFAULT_CAPACITY + 25) {
            sampler.push_sample(sample(i as f64));
        }
        let samples = sampler.samples();
        assert_eq!(samples.len(), DEFAULT_CAPACITY);
        assert_eq!(samples[0].memory_percent, 25.0);
    }

    #[test]
    fn stats_empty_without_samples() {
        let sampler = PerformanceSampler::with_source(Duration::from_secs(1), FixedSource::new(1.0));
        assert_eq!(sampler.current_stats(), None);
    }

    #[test]
    fn stats_average_last_ten() {
        let sampler = PerformanceSampler::with_source(Duration::from_secs(6), FixedSource::new(1.0));
        sampler.push_sample(sample(1000.0));
        for _ in 0..9 {
            sampler.push_sample(sample(40.0));
        }
        sampler.push_sample(sample(50.0));

        let stats = sampler.current_stats().unwrap();
        assert_eq!(stats.measurements_count, STATS_WINDOW);
        assert_eq!(stats.avg_memory_percent, 41.0);
        assert_eq!(stats.avg_cpu_percent, 20.5);
        assert_eq!(stats.current_memory_mb, 500.0);
        assert!((stats.monitoring_duration_minutes - 1.1).abs() < 1e-9);
    }

    #[test]
    fn stats_with_short_history() {
        let sampler = PerformanceSampler::with_source(Duration::from_secs(1), FixedSource::new(1.0));
        sampler.push_sample(sample(30.0));
        sampler.push_sample(sample(60.0));
        let stats = sampler.current_stats().unwrap();
        assert_eq!(stats.measurements_count, 2);
        assert_eq!(stats.avg_memory_percent, 45.0);
    }

    #[test]
    fn background_thread_collects_and_stops() {
        let mut sampler =
            PerformanceSampler::with_source(Duration::from_millis(5), FixedSource::new(33.0));
        sampler.start();
        sampler.start();
        assert!(sampler.is_running());

        wait_for(&sampler, 3);
        sampler.stop();
        sampler.stop();
        assert!(!sampler.is_running());

        assert!(sampler.len() >= 3);
        assert_eq!(sampler.current_stats().unwrap().avg_memory_percent, 33.0);
    }

    #[test]
    fn capture_failures_do_not_stop_the_loop() {
        let mut sampler =
            PerformanceSampler::with_source(Duration::from_millis(5), FixedSource::flaky(12.0));
        sampler.start();
        wait_for(&sampler, 4);
        sampler.stop();
        assert!(sampler.len() >= 4);
    }

    #[test]
    fn stop_returns_after_bounded_wait() {
        let mut sampler =
            PerformanceSampler::with_source(Duration::from_secs(30), FixedSource::new(5.0));
        sampler.start();
        wait_for(&sampler, 1);

        let started = Instant::now();
        sampler.stop();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!sampler.is_running());
    }

    #[test]
    fn export_includes_metadata() {
        let sampler = PerformanceSampler::with_source(Duration::from_millis(2500), FixedSource::new(1.0));
        sampler.push_sample(sample(10.0));
        sampler.push_sample(sample(20.0));

        let export = sampler.export();
        assert_eq!(export.total_measurements, 2);
        assert_eq!(export.interval_seconds, 2.5);
        assert_eq!(export.metrics.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");
        sampler.export_to(&path).unwrap();
        let parsed: SamplerExport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.metrics, export.metrics);
    }
}
