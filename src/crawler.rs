use crate::config::{ExecutionMode, SessionConfig};
use crate::error::Result;
use crate::executor::{ConcurrentExecutor, ExecutorStats, RetryingExecutor};
use crate::extractor::{DefaultExtractor, Extractor};
use crate::monitor::{Monitor, MonitorConfig, SessionReport};
use crate::outcome::FetchOutcome;
use crate::output::OutputHandler;
use crate::transport::{ReqwestTransport, Transport};
use std::sync::Arc;

/// Result of one [`CrawlerEngine::run`].
#[derive(Debug, Clone)]
pub struct CrawlRun {
    /// One per configured URL, in configuration order.
    pub outcomes: Vec<FetchOutcome>,
    pub report: SessionReport,
    pub executor_stats: ExecutorStats,
}

/// Runs a configured URL list through one executor under a monitoring session.
pub struct CrawlerEngine {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    monitor: Monitor,
    output: Option<Box<dyn OutputHandler>>,
}

impl CrawlerEngine {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_options(&config.transport_options())?;
        let monitor = Monitor::new(config.name.clone(), MonitorConfig::from(&config.monitoring));

        Ok(Self {
            config,
            transport: Arc::new(transport),
            extractor: Arc::new(DefaultExtractor::new()),
            monitor,
            output: None,
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Outcomes are written here, in input order, once the batch completes.
    pub fn with_output(mut self, output: Box<dyn OutputHandler>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub async fn run(&mut self) -> Result<CrawlRun> {
        let urls = &self.config.urls;
        log::info!(
            "Starting session '{}': {} URLs, {:?} mode",
            self.config.name,
            urls.len(),
            self.config.mode
        );

        let monitor = &mut self.monitor;
        monitor.start_session(urls.len() as u64);

        let (outcomes, executor_stats) = match self.config.mode {
            ExecutionMode::Sequential => {
                let mut executor = RetryingExecutor::new(
                    self.transport.clone(),
                    self.extractor.clone(),
                    self.config.retry_config(),
                );
                let outcomes = executor.fetch_all(urls, |o| monitor.record(o)).await;
                (outcomes, executor.take_stats())
            }
            ExecutionMode::Concurrent => {
                let mut executor = ConcurrentExecutor::new(
                    self.transport.clone(),
                    self.extractor.clone(),
                    self.config.concurrent_config(),
                );
                let outcomes = executor.fetch_all(urls, |o| monitor.record(o)).await;
                (outcomes, executor.take_stats())
            }
        };

        let report = monitor.end_session();

        if let Some(output) = self.output.as_mut() {
            for outcome in &outcomes {
                output.write(outcome).await?;
            }
            output.close().await?;
        }
        if let Some(path) = &self.config.report_path {
            report.write_json(path)?;
        }
        if let Some(path) = &self.config.sampler_export_path {
            self.monitor.sampler().export_to(path)?;
            log::info!("Sampler history exported to {}", path);
        }

        Ok(CrawlRun {
            outcomes,
            report,
            executor_stats,
        })
    }
}
