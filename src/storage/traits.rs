//! Storage traits and error types
//!
//! This module defines the repository interface the walker talks to. Every
//! mutation of `crawl_status` and `last_links_recorded_at` goes through it.

use crate::state::{CanonicalPage, CrawlStatus};
use crate::storage::{CompletionOutcome, LinkRecord, PageRecord, RunRecord, RunStatus};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Page {0} cannot be completed: its links are already recorded or it does not exist")]
    NotClaimable(i64),

    #[error("Unknown crawl status in database: {0}")]
    CorruptStatus(String),

    #[error("Database schema version {found} is not supported (expected {supported})")]
    SchemaVersion { found: u32, supported: u32 },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Repository interface for the page frontier and link graph
///
/// Implementations assume a single active claimer. A lease/claimant column
/// can be added behind `claim_next_pending` without changing its signature.
pub trait PageStore {
    // ===== Frontier =====

    /// Inserts the page as pending if absent, otherwise refreshes its title
    ///
    /// Never touches `crawl_status` or `last_links_recorded_at` of an
    /// existing row.
    fn upsert_page(&mut self, page: &CanonicalPage) -> StorageResult<PageRecord>;

    /// Atomically moves one pending, unrecorded page to `in_progress`
    fn claim_next_pending(&mut self) -> StorageResult<Option<PageRecord>>;

    /// Records the full outbound link set of `source` and marks it done
    ///
    /// Runs as one transaction: target pages are upserted, edges inserted
    /// with duplicates ignored, and the source completed. Nothing is visible
    /// unless all of it commits.
    fn record_links_and_complete(
        &mut self,
        source: &CanonicalPage,
        targets: &[CanonicalPage],
    ) -> StorageResult<CompletionOutcome>;

    /// Marks a page as permanently failed
    ///
    /// Returns false when the page already has its links recorded.
    fn mark_failed(&mut self, page_id: i64, message: &str) -> StorageResult<bool>;

    /// Hands a claimed page back to the frontier without recording a failure
    ///
    /// Used when the upstream is unavailable rather than the page being bad.
    /// Returns false when the page is not claimed or already recorded.
    fn release_claim(&mut self, page_id: i64, message: &str) -> StorageResult<bool>;

    /// Returns interrupted `in_progress` pages to `pending`
    fn requeue_interrupted(&mut self) -> StorageResult<u64>;

    /// Returns `failed` pages to `pending`
    fn requeue_failed(&mut self) -> StorageResult<u64>;

    // ===== Lookups =====

    fn get_page(&self, page_id: i64) -> StorageResult<Option<PageRecord>>;

    /// Pages whose stored title matches exactly
    fn find_pages_by_title(&self, title: &str) -> StorageResult<Vec<PageRecord>>;

    /// True when no page has ever been stored
    fn is_empty(&self) -> StorageResult<bool>;

    // ===== Graph reads =====

    /// All pages, or only those with recorded links
    fn list_pages(&self, recorded_only: bool) -> StorageResult<Vec<PageRecord>>;

    /// All links, or only those whose endpoints both have recorded links
    fn list_links(&self, recorded_only: bool) -> StorageResult<Vec<LinkRecord>>;

    /// Target ids of a page's stored outbound links
    fn outgoing_links(&self, page_id: i64) -> StorageResult<Vec<i64>>;

    // ===== Statistics =====

    fn count_by_status(&self, status: CrawlStatus) -> StorageResult<u64>;

    fn count_pages(&self) -> StorageResult<u64>;

    fn count_links(&self) -> StorageResult<u64>;

    /// Pages carrying the crawl-once marker
    fn count_recorded(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_completed: u64,
        pages_failed: u64,
    ) -> StorageResult<()>;

    /// Marks runs left `running` by a killed process as interrupted
    fn interrupt_stale_runs(&mut self) -> StorageResult<u64>;

    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Snapshots =====

    /// Copies the live database into a new file at `dest`
    fn snapshot_to(&self, dest: &Path) -> StorageResult<()>;
}
