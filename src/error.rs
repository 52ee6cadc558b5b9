use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The URL has no scheme or no host; rejected before any request is made.
    #[error("Invalid URL")]
    InvalidUrl { url: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_has_fixed_text() {
        let err = Error::InvalidUrl {
            url: "not-a-url".into(),
        };
        assert_eq!(err.to_string(), "Invalid URL");
    }

    #[test]
    fn status_error_names_code_and_url() {
        let err = Error::HttpStatus {
            status: 503,
            url: "http://example.com/a".into(),
        };
        assert_eq!(err.to_string(), "HTTP 503 for http://example.com/a");
        assert_eq!(
            Error::Timeout(Duration::from_secs(3)).to_string(),
            "Request timed out after 3s"
        );
    }
}
