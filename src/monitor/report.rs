use crate::error::Result;
use crate::metrics::MetricsSnapshot;
use crate::monitor::sampler::SystemStats;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const TOP_DOMAINS: usize = 10;
pub const TOP_ERRORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

/// Everything known about a session once it has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_name: String,
    pub metrics: MetricsSnapshot,
    pub system_performance: Option<SystemStats>,
    pub alerts: Vec<String>,
    pub top_domains: Vec<NamedCount>,
    pub top_errors: Vec<NamedCount>,
}

impl SessionReport {
    pub fn new(
        session_name: impl Into<String>,
        metrics: MetricsSnapshot,
        system_performance: Option<SystemStats>,
        alerts: Vec<String>,
    ) -> Self {
        Self {
            session_name: session_name.into(),
            top_domains: named(metrics.top_domains(TOP_DOMAINS)),
            top_errors: named(metrics.top_errors(TOP_ERRORS)),
            metrics,
            system_performance,
            alerts,
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        log::info!("Session report written to {:?}", path.as_ref());
        Ok(())
    }
}

fn named(pairs: Vec<(String, u64)>) -> Vec<NamedCount> {
    pairs
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect()
}

/// Live view of a running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStats {
    pub metrics: MetricsSnapshot,
    pub system_performance: Option<SystemStats>,
    pub alerts_count: usize,
    pub session_duration: f64,
}
