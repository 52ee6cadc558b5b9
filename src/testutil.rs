//! Handwritten mocks for the transport, extractor and sample-source seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::extractor::Extractor;
use crate::monitor::sampler::{SampleSource, SystemSample};
use crate::transport::{Document, Transport};

pub const PAGE: &str = "<html><head><title>ok</title></head><body><p>hello</p></body></html>";

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Fail(String),
}

/// Transport answering 200 with [`PAGE`] unless a URL has scripted replies.
#[derive(Clone, Default)]
pub struct MockTransport {
    scripted: Arc<Mutex<HashMap<String, Vec<Reply>>>>,
    always_fail: bool,
    latency: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a distinct network error naming the call number.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replies consumed in order for `url`; once exhausted the default applies.
    pub fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .insert(url.to_string(), replies);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<Document> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(url.to_string());
            calls.len()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.always_fail {
            return Err(Error::Network(format!("connection refused (call {call_number})")));
        }

        let reply = {
            let mut scripted = self.scripted.lock().unwrap();
            scripted
                .get_mut(url)
                .filter(|replies| !replies.is_empty())
                .map(|replies| replies.remove(0))
        };

        match reply {
            Some(Reply::Fail(message)) => Err(Error::Network(message)),
            Some(Reply::Status(status)) => Ok(Document {
                url: url.to_string(),
                final_url: url.to_string(),
                status,
                body: PAGE.to_string(),
            }),
            None => Ok(Document {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                body: PAGE.to_string(),
            }),
        }
    }
}

/// Extractor returning the body length, or failing/panicking on demand.
#[derive(Clone, Copy, Default)]
pub struct MockExtractor {
    fail: bool,
    panic: bool,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            panic: false,
        }
    }

    pub fn panicking() -> Self {
        Self {
            fail: false,
            panic: true,
        }
    }
}

impl Extractor for MockExtractor {
    fn extract(&self, document: &Document) -> Result<Map<String, Value>> {
        if self.panic {
            panic!("extractor blew up on {}", document.url);
        }
        if self.fail {
            return Err(Error::Extraction("no title found".into()));
        }
        let mut data = Map::new();
        data.insert("text_length".into(), json!(document.body.len()));
        Ok(data)
    }
}

/// Sample source producing a fixed memory reading, optionally failing every other call.
pub struct FixedSource {
    pub memory_percent: f64,
    pub fail_every_other: bool,
    calls: u64,
}

impl FixedSource {
    pub fn new(memory_percent: f64) -> Self {
        Self {
            memory_percent,
            fail_every_other: false,
            calls: 0,
        }
    }

    pub fn flaky(memory_percent: f64) -> Self {
        Self {
            fail_every_other: true,
            ..Self::new(memory_percent)
        }
    }
}

impl SampleSource for FixedSource {
    fn capture(&mut self) -> Result<SystemSample> {
        self.calls += 1;
        if self.fail_every_other && self.calls % 2 == 0 {
            return Err(Error::Internal("sensor unavailable".into()));
        }
        Ok(SystemSample {
            timestamp: Utc::now(),
            cpu_percent: 10.0,
            memory_percent: self.memory_percent,
            memory_used_mb: 512.0,
            network_bytes_received: 0,
            network_bytes_sent: 0,
            process_count: 42,
        })
    }
}
