//! Error taxonomy for the crawl pipeline.
//!
//! Most failures are absorbed close to where they happen: a discovery
//! strategy that fails contributes zero URLs, an extraction that fails is
//! recorded on its [`ArticleResult`](crate::models::ArticleResult), and an
//! alias source that fails contributes nothing. Only configuration and setup
//! problems ([`CrawlError::Config`], [`CrawlError::Setup`]) stop a run, and
//! they do so before any network work begins.

use thiserror::Error;

/// Errors produced by the crawler and its collaborators.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The HTTP client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level failure (connection refused, TLS, body decoding, ...).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server answered with a non-success status after any retries.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to parse XML from {url}: {message}")]
    Xml { url: String, message: String },

    #[error("failed to decode JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Required inputs are missing; the run cannot start.
    #[error("setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl CrawlError {
    /// Build an error from a `reqwest` failure, separating timeouts out so
    /// callers can report them distinctly.
    pub fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            CrawlError::Timeout {
                url: url.to_string(),
            }
        } else {
            CrawlError::Http {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Whether the transport layer should try the request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            CrawlError::Timeout { .. } => true,
            CrawlError::Http { source, .. } => source.is_connect() || source.is_request(),
            CrawlError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Statuses the transport retries with backoff.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

pub type Result<T, E = CrawlError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_retryable_statuses() {
        for code in [429u16, 500, 502, 503, 504] {
            assert!(is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        for code in [200u16, 301, 400, 401, 403, 404, 501] {
            assert!(!is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn test_status_error_retry_classification() {
        let busy = CrawlError::Status {
            url: "https://example.com".into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        let missing = CrawlError::Status {
            url: "https://example.com".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(busy.is_retryable());
        assert!(!missing.is_retryable());
        assert!(CrawlError::Timeout { url: "x".into() }.is_retryable());
        assert!(!CrawlError::Setup("no sites".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = CrawlError::Timeout {
            url: "https://example.com/a".into(),
        };
        assert_eq!(err.to_string(), "request to https://example.com/a timed out");
        let err = CrawlError::Setup("no websites to crawl".into());
        assert_eq!(err.to_string(), "setup failed: no websites to crawl");
    }
}
