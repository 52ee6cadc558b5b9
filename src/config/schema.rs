use crate::executor::{ConcurrentConfig, RetryConfig};
use crate::monitor::{AlertThresholds, MonitorConfig};
use crate::transport::TransportOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub urls: Vec<String>,

    #[serde(default)]
    pub mode: ExecutionMode,

    /// Baseline pause before each request.
    #[serde(default = "default_delay")]
    pub delay_ms: u64,

    /// Sequential mode only.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// Concurrent mode only.
    #[serde(default = "default_max_concurrent")]
    #[validate(range(min = 1))]
    pub max_concurrent: usize,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// Extra request headers; these win over the built-in defaults.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Proxy URL for every request, e.g. `http://127.0.0.1:3128`.
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default)]
    #[validate]
    pub monitoring: MonitoringConfig,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Where to write the end-of-session report as JSON.
    #[serde(default)]
    pub report_path: Option<String>,

    /// Where to dump the sampler's full history as JSON.
    #[serde(default)]
    pub sampler_export_path: Option<String>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

impl SessionConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            delay: Duration::from_millis(self.delay_ms),
            max_retries: self.max_retries,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            user_agent: self.user_agent.clone(),
            headers: self.headers.clone(),
            proxy: self.proxy.clone(),
        }
    }

    pub fn concurrent_config(&self) -> ConcurrentConfig {
        ConcurrentConfig {
            max_concurrent: self.max_concurrent,
            delay: Duration::from_millis(self.delay_ms),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MonitoringConfig {
    #[serde(default = "default_sample_interval")]
    #[validate(range(min = 1))]
    pub sample_interval_ms: u64,

    #[serde(default = "default_error_rate_threshold")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub error_rate_threshold_pct: f64,

    #[serde(default = "default_response_time_threshold")]
    #[validate(range(min = 0.0))]
    pub response_time_threshold_secs: f64,

    #[serde(default = "default_memory_threshold")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub memory_threshold_pct: f64,

    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval(),
            error_rate_threshold_pct: default_error_rate_threshold(),
            response_time_threshold_secs: default_response_time_threshold(),
            memory_threshold_pct: default_memory_threshold(),
            progress_interval_ms: default_progress_interval(),
        }
    }
}

impl From<&MonitoringConfig> for MonitorConfig {
    fn from(config: &MonitoringConfig) -> Self {
        Self {
            sample_interval: Duration::from_millis(config.sample_interval_ms),
            thresholds: AlertThresholds {
                error_rate_pct: config.error_rate_threshold_pct,
                response_time_secs: config.response_time_threshold_secs,
                memory_pct: config.memory_threshold_pct,
            },
            progress_interval: Duration::from_millis(config.progress_interval_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json { path: String },
}

pub(crate) fn default_delay() -> u64 {
    1000
}

pub(crate) fn default_max_retries() -> u32 {
    3
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_concurrent() -> usize {
    10
}

fn default_sample_interval() -> u64 {
    5000
}

fn default_error_rate_threshold() -> f64 {
    20.0
}

fn default_response_time_threshold() -> f64 {
    10.0
}

fn default_memory_threshold() -> f64 {
    80.0
}

fn default_progress_interval() -> u64 {
    1000
}
