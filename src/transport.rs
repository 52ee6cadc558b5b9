use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "fetchwatch/0.1";

/// A retrieved document, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The URL that was requested.
    pub url: String,
    /// Where the response came from after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl Document {
    /// 2xx and 3xx count as a usable response.
    pub fn is_ok_status(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Issues a single GET. Implementations must not retry; executors own that.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Document>;
}

/// Client settings beyond the per-request timeout.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub user_agent: Option<String>,
    /// Sent with every request; overrides the built-in browser headers.
    pub headers: BTreeMap<String, String>,
    /// Proxy URL applied to all schemes.
    pub proxy: Option<String>,
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_options(&TransportOptions::default())
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        Self::with_options(&TransportOptions {
            user_agent: Some(user_agent.to_string()),
            ..TransportOptions::default()
        })
    }

    pub fn with_options(options: &TransportOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid value for header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        // Accept-Encoding is set by reqwest itself through the gzip/deflate features.
        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
            .default_headers(headers);

        if let Some(proxy) = &options.proxy {
            builder = builder.proxy(Proxy::all(proxy.as_str())?);
            log::debug!("Routing requests through proxy {}", proxy);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Document> {
        log::debug!("GET {}", url);

        let res = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = res.status().as_u16();
        let final_url = res.url().to_string();
        let body = res.text().await.map_err(|e| classify(e, timeout))?;
        log::debug!("{} -> {} ({} bytes)", final_url, status, body.len());

        Ok(Document {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout(timeout)
    } else if e.is_connect() {
        Error::Network(format!("Connection failed: {}", e))
    } else {
        Error::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client() {
        assert!(ReqwestTransport::new().is_ok());
        assert!(ReqwestTransport::with_user_agent("custom/1.0").is_ok());
    }

    #[test]
    fn accepts_custom_headers_and_proxy() {
        let options = TransportOptions {
            user_agent: None,
            headers: [("X-Trace".to_string(), "abc".to_string())].into(),
            proxy: Some("http://127.0.0.1:3128".into()),
        };
        assert!(ReqwestTransport::with_options(&options).is_ok());
    }

    #[test]
    fn rejects_malformed_header_and_proxy() {
        let bad_header = TransportOptions {
            headers: [("bad header".to_string(), "x".to_string())].into(),
            ..TransportOptions::default()
        };
        assert!(matches!(
            ReqwestTransport::with_options(&bad_header),
            Err(Error::Config(_))
        ));

        let bad_proxy = TransportOptions {
            proxy: Some("http://127.0.0.1:notaport".into()),
            ..TransportOptions::default()
        };
        assert!(ReqwestTransport::with_options(&bad_proxy).is_err());
    }

    #[test]
    fn status_classification() {
        let doc = |status| Document {
            url: "http://example.com".into(),
            final_url: "http://example.com/".into(),
            status,
            body: String::new(),
        };
        assert!(doc(200).is_ok_status());
        assert!(doc(301).is_ok_status());
        assert!(!doc(404).is_ok_status());
        assert!(!doc(500).is_ok_status());
        assert!(!doc(102).is_ok_status());
    }
}
