//! Storage module for persisting the crawl frontier and link graph
//!
//! This module handles all database operations for the walker, including:
//! - SQLite database initialization and schema management
//! - The page table, which doubles as the crawl queue
//! - Deduplicated link recording
//! - Run tracking for auditing

mod schema;
mod sqlite;
mod traits;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStore;
pub use traits::{PageStore, StorageError, StorageResult};

use crate::state::CrawlStatus;
use chrono::{SecondsFormat, Utc};
use std::path::Path;

/// Opens (or creates) the page store at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::open(path)
}

/// Current time formatted for storage
///
/// Fixed-width microsecond precision keeps timestamps lexicographically
/// ordered, which the claim order relies on.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Represents a page row in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub page_id: i64,
    pub title: String,
    pub crawl_status: CrawlStatus,
    pub discovered_at: String,
    pub last_enqueued_at: Option<String>,
    pub last_started_at: Option<String>,
    pub last_finished_at: Option<String>,
    pub last_links_recorded_at: Option<String>,
    pub last_error: Option<String>,
    pub last_error_at: Option<String>,
}

impl PageRecord {
    /// True once the page's outbound links have been recorded (crawl-once marker)
    pub fn links_recorded(&self) -> bool {
        self.last_links_recorded_at.is_some()
    }
}

/// Represents a directed link between two pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub source_page_id: i64,
    pub target_page_id: i64,
    pub first_seen_at: String,
}

/// What a `record_links_and_complete` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// Edges inserted by this call
    pub links_added: u64,
    /// Edges that were already stored
    pub links_existing: u64,
    /// Target pages inserted as pending by this call
    pub pages_discovered: u64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_completed: u64,
    pub pages_failed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
