//! HTTP client for the MediaWiki Action API
//!
//! Every request goes through [`WikiClient::query`], which applies the
//! politeness delay, classifies failures and retries the transient ones.

use crate::config::{ApiConfig, Config, UserAgentConfig};
use crate::mediawiki::pager::LinkPager;
use crate::mediawiki::{ApiError, ApiResult, QueryResponse, RetryPolicy};
use crate::state::CanonicalPage;
use crate::ConfigError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Parameters sent with every request
const BASE_PARAMS: [(&str, &str); 3] = [
    ("action", "query"),
    ("format", "json"),
    ("formatversion", "2"),
];

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use wiki_walker::config::{ApiConfig, UserAgentConfig};
/// use wiki_walker::mediawiki::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &ApiConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    api: &ApiConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(api.timeout_secs))
        .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for one MediaWiki endpoint
///
/// Requests are awaited one at a time; the client never has more than one in
/// flight.
#[derive(Debug, Clone)]
pub struct WikiClient {
    http: Client,
    endpoint: Url,
    request_delay: Duration,
    retry: RetryPolicy,
}

impl WikiClient {
    pub fn new(http: Client, endpoint: Url, request_delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            http,
            endpoint,
            request_delay,
            retry,
        }
    }

    /// Creates a client from the walker configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let endpoint = Url::parse(&config.api.endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;
        let http = build_http_client(&config.user_agent, &config.api)?;

        let retry = RetryPolicy {
            max_retries: config.api.max_retries,
            backoff_base: Duration::from_millis(config.api.retry_backoff_ms),
            backoff_max: Duration::from_millis(config.api.retry_backoff_max_ms),
        };

        Ok(Self::new(
            http,
            endpoint,
            Duration::from_millis(config.walker.request_delay_ms),
            retry,
        ))
    }

    /// Resolves a title to its canonical page, following normalization and
    /// redirects
    pub async fn resolve_title(&self, title: &str) -> ApiResult<CanonicalPage> {
        let params = vec![
            param("titles", title),
            param("redirects", "1"),
            param("prop", "info"),
        ];
        let response = self.query(&params).await?;

        let body = response
            .query
            .ok_or_else(|| ApiError::MalformedResponse("response has no query".to_string()))?;

        let resolved = body.resolve_title(title);
        let entry = body
            .page_titled(&resolved)
            .or_else(|| body.pages.first())
            .ok_or_else(|| ApiError::NotFound(title.to_string()))?;

        let page = entry
            .canonical()
            .ok_or_else(|| ApiError::NotFound(title.to_string()))?;

        if page.title != title {
            debug!("Resolved '{}' to '{}' ({})", title, page.title, page.page_id);
        }

        Ok(page)
    }

    /// Looks up the current title of a stored page id
    ///
    /// Fails with `NotFound` when the page was deleted upstream.
    pub async fn lookup_page(&self, page_id: i64) -> ApiResult<CanonicalPage> {
        let params = vec![param("pageids", &page_id.to_string()), param("prop", "info")];
        let response = self.query(&params).await?;

        response
            .canonical_pages()
            .into_iter()
            .find(|p| p.page_id == page_id)
            .ok_or_else(|| ApiError::NotFound(format!("page id {}", page_id)))
    }

    /// Starts a fresh traversal of a page's outbound article links
    pub fn outbound_links(&self, page_id: i64) -> LinkPager<'_> {
        LinkPager::new(self, page_id)
    }

    /// Sends one `action=query` request with retries for transient failures
    pub(crate) async fn query(&self, params: &[(String, String)]) -> ApiResult<QueryResponse> {
        let mut attempt = 0;
        loop {
            match self.query_once(params).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let wait = self.retry.delay_for(attempt, &e);
                    warn!(
                        "Transient API failure ({}), retry {}/{} in {:?}",
                        e, attempt, self.retry.max_retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn query_once(&self, params: &[(String, String)]) -> ApiResult<QueryResponse> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&BASE_PARAMS[..])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(ApiError::RateLimited { retry_after });
        }

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let mut body: QueryResponse = response.json().await?;
        if let Some(error) = body.error.take() {
            return Err(ApiError::Upstream {
                code: error.code,
                info: error.info,
            });
        }

        Ok(body)
    }
}

pub(crate) fn param(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}
