use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Terminal result for one URL's full attempt sequence.
///
/// Executors produce exactly one of these per input URL, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub url: String,
    pub success: bool,
    /// `0` when no response status was obtained.
    pub status_code: u16,
    /// Seconds spent on the final request.
    pub response_time: f64,
    pub content_size: u64,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl FetchOutcome {
    pub fn success(
        url: impl Into<String>,
        status_code: u16,
        response_time: Duration,
        content_size: u64,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            url: url.into(),
            success: true,
            status_code,
            response_time: response_time.as_secs_f64(),
            content_size,
            error_message: None,
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn failure(
        url: impl Into<String>,
        status_code: u16,
        response_time: Duration,
        content_size: u64,
        error: &Error,
    ) -> Self {
        Self {
            url: url.into(),
            success: false,
            status_code,
            response_time: response_time.as_secs_f64(),
            content_size,
            error_message: Some(error.to_string()),
            timestamp: Utc::now(),
            data: Map::new(),
        }
    }

    /// Outcome for a URL rejected by the validity gate.
    pub fn invalid(url: impl Into<String>) -> Self {
        let url = url.into();
        let error = Error::InvalidUrl { url: url.clone() };
        Self::failure(url, 0, Duration::ZERO, 0, &error)
    }

    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_outcome_shape() {
        let outcome = FetchOutcome::invalid("not-a-url");
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, 0);
        assert_eq!(outcome.response_time, 0.0);
        assert_eq!(outcome.error_message.as_deref(), Some("Invalid URL"));
        assert!(outcome.data.is_empty());
    }

    #[test]
    fn host_is_parsed_from_url() {
        let outcome = FetchOutcome::invalid("https://news.example.com:8443/a?b=c");
        assert_eq!(outcome.host().as_deref(), Some("news.example.com"));
        assert_eq!(FetchOutcome::invalid("not-a-url").host(), None);
    }
}
