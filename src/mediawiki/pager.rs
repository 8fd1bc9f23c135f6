//! Lazy traversal of a page's outbound links
//!
//! Links are enumerated with `generator=links`, so every batch already holds
//! canonical identities: redirects resolved, red links dropped.

use crate::mediawiki::client::{param, WikiClient};
use crate::mediawiki::{ApiError, ApiResult};
use crate::state::CanonicalPage;
use std::collections::HashSet;
use tracing::debug;

/// Paginated cursor over the article-namespace links of one page
///
/// Each upstream response is one batch. The cursor copies the opaque
/// `continue` object into the next request and ends when a response
/// carries none.
pub struct LinkPager<'a> {
    client: &'a WikiClient,
    page_id: i64,
    continuation: Option<Vec<(String, String)>>,
    seen_tokens: HashSet<Vec<(String, String)>>,
    finished: bool,
    batches: u32,
}

impl<'a> LinkPager<'a> {
    pub(crate) fn new(client: &'a WikiClient, page_id: i64) -> Self {
        Self {
            client,
            page_id,
            continuation: None,
            seen_tokens: HashSet::new(),
            finished: false,
            batches: 0,
        }
    }

    /// Fetches the next batch of link targets, or `None` once exhausted
    ///
    /// On error the cursor stays where it was; calling again re-sends the
    /// same request.
    pub async fn next_batch(&mut self) -> ApiResult<Option<Vec<CanonicalPage>>> {
        if self.finished {
            return Ok(None);
        }

        let mut params = vec![
            param("generator", "links"),
            param("gplnamespace", "0"),
            param("gpllimit", "max"),
            param("prop", "info"),
            param("redirects", "1"),
            param("pageids", &self.page_id.to_string()),
        ];
        if let Some(continuation) = &self.continuation {
            params.extend(continuation.iter().cloned());
        }

        let response = self.client.query(&params).await?;
        self.batches += 1;

        match response.continuation_params() {
            Some(token) => {
                if !self.seen_tokens.insert(token.clone()) {
                    self.finished = true;
                    return Err(ApiError::MalformedResponse(format!(
                        "continuation token repeated for page {}: {:?}",
                        self.page_id, token
                    )));
                }
                self.continuation = Some(token);
            }
            None => {
                self.finished = true;
                self.continuation = None;
            }
        }

        let pages = response.canonical_pages();
        debug!(
            "Page {} link batch {}: {} targets",
            self.page_id,
            self.batches,
            pages.len()
        );

        Ok(Some(pages))
    }

    /// Drains the cursor, de-duplicating targets by page id in first-seen
    /// order
    pub async fn collect_all(mut self) -> ApiResult<Vec<CanonicalPage>> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        while let Some(batch) = self.next_batch().await? {
            for page in batch {
                if seen.insert(page.page_id) {
                    targets.push(page);
                }
            }
        }

        Ok(targets)
    }
}
