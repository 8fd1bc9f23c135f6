//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus`: where a stored page sits in the frontier state machine
//! - `CanonicalPage`: a page identity as reported by the upstream wiki

mod crawl_status;

pub use crawl_status::CrawlStatus;

/// A page identified by its stable upstream id plus the title last seen for it
///
/// The id is the identity; the title is a mutable snapshot and must never be
/// used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPage {
    pub page_id: i64,
    pub title: String,
}

impl CanonicalPage {
    pub fn new(page_id: i64, title: impl Into<String>) -> Self {
        Self {
            page_id,
            title: title.into(),
        }
    }
}
