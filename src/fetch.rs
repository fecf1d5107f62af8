//! HTTP fetcher with ETag and conditional request support.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Typed fetch failures.
///
/// Timeout, network, rate-limit, and server errors are transient; NotFound
/// and Forbidden are permanent content outcomes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("not found (404)")]
    NotFound,
    #[error("forbidden (403)")]
    Forbidden,
    #[error("rate limited (429)")]
    RateLimited,
    #[error("server error ({0})")]
    ServerError(u16),
    #[error("response body was not HTML ({0})")]
    NonHtml(String),
}

impl FetchError {
    /// Transient errors do not mark a URL do-not-scrape.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Network(_) | Self::RateLimited | Self::ServerError(_)
        )
    }

    /// Short machine-readable kind for attempt records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::Network(_) => "NETWORK",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError(_) => "SERVER_ERROR",
            Self::NonHtml(_) => "PARSE_ERROR",
        }
    }
}

/// Conditional request hints for a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchConditions {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// A successful fetch outcome.
///
/// `body` is `None` for 304 Not Modified responses.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub body: Option<String>,
    pub status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<u64>,
}

impl FetchResponse {
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Seam for fetching tournament pages; tests substitute a stub.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        conditions: &FetchConditions,
    ) -> Result<FetchResponse, FetchError>;
}

/// Reqwest-backed fetcher.
pub struct HttpFetcher {
    client: Client,
    request_delay: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given user agent and per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration, request_delay: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            request_delay,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        conditions: &FetchConditions,
    ) -> Result<FetchResponse, FetchError> {
        let mut request = self.client.get(url);
        if let Some(etag) = &conditions.if_none_match {
            request = request.header("If-None-Match", etag);
        }
        if let Some(lm) = &conditions.if_modified_since {
            request = request.header("If-Modified-Since", lm);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let etag = header_string(&response, "etag");
        let last_modified = header_string(&response, "last-modified");
        let content_type = header_string(&response, "content-type");
        let content_length = response.content_length();

        // Base politeness delay between requests
        tokio::time::sleep(self.request_delay).await;

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchResponse {
                body: None,
                status: 304,
                etag,
                last_modified,
                content_length,
            });
        }

        match status.as_u16() {
            404 => return Err(FetchError::NotFound),
            403 => return Err(FetchError::Forbidden),
            429 => return Err(FetchError::RateLimited),
            code if code >= 500 => return Err(FetchError::ServerError(code)),
            _ => {}
        }

        if let Some(ct) = &content_type {
            if !ct.contains("html") && !ct.contains("text/plain") {
                return Err(FetchError::NonHtml(ct.clone()));
            }
        }

        let code = status.as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(FetchResponse {
            body: Some(body),
            status: code,
            etag,
            last_modified,
            content_length,
        })
    }
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::ServerError(503).is_transient());
        assert!(!FetchError::NotFound.is_transient());
        assert!(!FetchError::Forbidden.is_transient());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(FetchError::NotFound.kind(), "NOT_FOUND");
        assert_eq!(FetchError::ServerError(500).kind(), "SERVER_ERROR");
    }

    #[test]
    fn test_not_modified_response() {
        let r = FetchResponse {
            body: None,
            status: 304,
            etag: None,
            last_modified: None,
            content_length: None,
        };
        assert!(r.is_not_modified());
    }
}
