//! MediaWiki Action API client
//!
//! This module talks to `api.php` and turns its responses into canonical
//! page identities:
//! - Title resolution through `normalized` and `redirects` mappings
//! - Paginated outbound link enumeration via opaque continuation tokens
//! - Politeness delay before every request
//! - Retry with exponential backoff for transient failures

mod client;
mod pager;
mod response;

pub use client::{build_http_client, WikiClient};
pub use pager::LinkPager;
pub use response::{ErrorBody, PageEntry, QueryBody, QueryResponse, TitleMapping};

use std::time::Duration;
use thiserror::Error;

/// MediaWiki error codes that clear up on their own
const TRANSIENT_API_CODES: &[&str] = &["maxlag", "ratelimited", "readonly"];

/// Errors returned by the upstream API client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited by upstream (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("API error '{code}': {info}")]
    Upstream { code: String, info: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Page not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// True when retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::RateLimited { .. } => true,
            ApiError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request() || e.is_body(),
            ApiError::Http { status, .. } => *status >= 500,
            ApiError::Upstream { code, .. } => TRANSIENT_API_CODES.contains(&code.as_str()),
            ApiError::MalformedResponse(_) | ApiError::NotFound(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else if error.is_decode() {
            ApiError::MalformedResponse(error.to_string())
        } else {
            ApiError::Network(error)
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Bounded exponential backoff for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(1000),
            backoff_max: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `attempt` (1-based)
    ///
    /// A `Retry-After` hint from a 429 replaces the computed backoff; both
    /// are capped at `backoff_max`.
    pub fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        if let ApiError::RateLimited {
            retry_after: Some(secs),
        } = error
        {
            return Duration::from_secs(*secs).min(self.backoff_max);
        }

        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_max)
    }
}
