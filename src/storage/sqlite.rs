//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::state::{CanonicalPage, CrawlStatus};
use crate::storage::schema::{initialize_schema, SCHEMA_VERSION};
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{
    timestamp_now, CompletionOutcome, LinkRecord, PageRecord, RunRecord, RunStatus,
};
use rusqlite::types::Type;
use rusqlite::{
    params, Connection, DatabaseName, OpenFlags, OptionalExtension, Row, TransactionBehavior,
};
use std::path::Path;
use std::time::Duration;

const PAGE_COLUMNS: &str = "page_id, title, crawl_status, discovered_at, last_enqueued_at, \
     last_started_at, last_finished_at, last_links_recorded_at, last_error, last_error_at";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// A database stamped with a newer schema version is refused before
    /// anything is written to it.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let found = schema_version(&conn)?;
        if found > SCHEMA_VERSION {
            return Err(StorageError::SchemaVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Opens an existing database for reporting; never writes to it
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let found = schema_version(&conn)?;
        if found != SCHEMA_VERSION {
            return Err(StorageError::SchemaVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for tests and dry runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

fn map_page_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let status: String = row.get(2)?;
    let crawl_status = CrawlStatus::from_db_string(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            Box::new(StorageError::CorruptStatus(status.clone())),
        )
    })?;

    Ok(PageRecord {
        page_id: row.get(0)?,
        title: row.get(1)?,
        crawl_status,
        discovered_at: row.get(3)?,
        last_enqueued_at: row.get(4)?,
        last_started_at: row.get(5)?,
        last_finished_at: row.get(6)?,
        last_links_recorded_at: row.get(7)?,
        last_error: row.get(8)?,
        last_error_at: row.get(9)?,
    })
}

fn map_run_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Interrupted),
        pages_completed: row.get::<_, i64>(5)? as u64,
        pages_failed: row.get::<_, i64>(6)? as u64,
    })
}

fn fetch_page(conn: &Connection, page_id: i64) -> rusqlite::Result<Option<PageRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM pages WHERE page_id = ?1", PAGE_COLUMNS),
        params![page_id],
        map_page_row,
    )
    .optional()
}

/// Inserts a pending page or refreshes the title of an existing one
///
/// Returns true when the row was newly inserted.
fn upsert_page_row(conn: &Connection, page: &CanonicalPage, now: &str) -> rusqlite::Result<bool> {
    let inserted = conn
        .prepare_cached(
            "INSERT INTO pages (page_id, title, crawl_status, discovered_at, last_enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(page_id) DO NOTHING",
        )?
        .execute(params![
            page.page_id,
            page.title,
            CrawlStatus::Pending.to_db_string(),
            now
        ])?;

    if inserted == 0 {
        conn.prepare_cached("UPDATE pages SET title = ?1 WHERE page_id = ?2 AND title <> ?1")?
            .execute(params![page.title, page.page_id])?;
    }

    Ok(inserted == 1)
}

fn count(conn: &Connection, sql: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

impl PageStore for SqliteStore {
    // ===== Frontier =====

    fn upsert_page(&mut self, page: &CanonicalPage) -> StorageResult<PageRecord> {
        let now = timestamp_now();
        upsert_page_row(&self.conn, page, &now)?;
        fetch_page(&self.conn, page.page_id)?.ok_or(StorageError::PageNotFound(page.page_id))
    }

    fn claim_next_pending(&mut self) -> StorageResult<Option<PageRecord>> {
        let now = timestamp_now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate: Option<i64> = tx
            .query_row(
                "SELECT page_id FROM pages
                 WHERE crawl_status = ?1 AND last_links_recorded_at IS NULL
                 ORDER BY last_enqueued_at IS NULL, last_enqueued_at ASC, page_id ASC
                 LIMIT 1",
                params![CrawlStatus::Pending.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(page_id) = candidate else {
            return Ok(None);
        };

        // Compare-and-swap on the status; the transaction rolls back on drop
        let changed = tx.execute(
            "UPDATE pages SET crawl_status = ?1, last_started_at = ?2
             WHERE page_id = ?3 AND crawl_status = ?4 AND last_links_recorded_at IS NULL",
            params![
                CrawlStatus::InProgress.to_db_string(),
                now,
                page_id,
                CrawlStatus::Pending.to_db_string()
            ],
        )?;
        if changed != 1 {
            return Err(StorageError::NotClaimable(page_id));
        }

        let page = fetch_page(&tx, page_id)?.ok_or(StorageError::PageNotFound(page_id))?;
        tx.commit()?;

        Ok(Some(page))
    }

    fn record_links_and_complete(
        &mut self,
        source: &CanonicalPage,
        targets: &[CanonicalPage],
    ) -> StorageResult<CompletionOutcome> {
        let now = timestamp_now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "UPDATE pages SET title = ?1 WHERE page_id = ?2 AND title <> ?1",
            params![source.title, source.page_id],
        )?;

        let mut outcome = CompletionOutcome::default();
        {
            let mut insert_link = tx.prepare_cached(
                "INSERT OR IGNORE INTO page_links (source_page_id, target_page_id, first_seen_at)
                 VALUES (?1, ?2, ?3)",
            )?;

            for target in targets {
                if upsert_page_row(&tx, target, &now)? {
                    outcome.pages_discovered += 1;
                }

                if insert_link.execute(params![source.page_id, target.page_id, now])? == 1 {
                    outcome.links_added += 1;
                } else {
                    outcome.links_existing += 1;
                }
            }
        }

        let completed = tx.execute(
            "UPDATE pages
             SET crawl_status = ?1, last_links_recorded_at = ?2, last_finished_at = ?2,
                 last_error = NULL, last_error_at = NULL
             WHERE page_id = ?3 AND last_links_recorded_at IS NULL",
            params![CrawlStatus::Done.to_db_string(), now, source.page_id],
        )?;
        if completed != 1 {
            return Err(StorageError::NotClaimable(source.page_id));
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn mark_failed(&mut self, page_id: i64, message: &str) -> StorageResult<bool> {
        let now = timestamp_now();
        let changed = self.conn.execute(
            "UPDATE pages
             SET crawl_status = ?1, last_error = ?2, last_error_at = ?3, last_finished_at = ?3
             WHERE page_id = ?4 AND last_links_recorded_at IS NULL",
            params![CrawlStatus::Failed.to_db_string(), message, now, page_id],
        )?;

        if changed == 0 && fetch_page(&self.conn, page_id)?.is_none() {
            return Err(StorageError::PageNotFound(page_id));
        }

        Ok(changed == 1)
    }

    fn release_claim(&mut self, page_id: i64, message: &str) -> StorageResult<bool> {
        let now = timestamp_now();
        let changed = self.conn.execute(
            "UPDATE pages
             SET crawl_status = ?1, last_error = ?2, last_error_at = ?3
             WHERE page_id = ?4 AND crawl_status = ?5 AND last_links_recorded_at IS NULL",
            params![
                CrawlStatus::Pending.to_db_string(),
                message,
                now,
                page_id,
                CrawlStatus::InProgress.to_db_string()
            ],
        )?;

        Ok(changed == 1)
    }

    fn requeue_interrupted(&mut self) -> StorageResult<u64> {
        let now = timestamp_now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let requeued = tx.execute(
            "UPDATE pages SET crawl_status = ?1, last_enqueued_at = ?2
             WHERE crawl_status = ?3 AND last_links_recorded_at IS NULL",
            params![
                CrawlStatus::Pending.to_db_string(),
                now,
                CrawlStatus::InProgress.to_db_string()
            ],
        )?;

        // A recorded page can only be done; repair any row that says otherwise
        tx.execute(
            "UPDATE pages SET crawl_status = ?1
             WHERE crawl_status <> ?1 AND last_links_recorded_at IS NOT NULL",
            params![CrawlStatus::Done.to_db_string()],
        )?;

        tx.commit()?;
        Ok(requeued as u64)
    }

    fn requeue_failed(&mut self) -> StorageResult<u64> {
        let now = timestamp_now();
        let requeued = self.conn.execute(
            "UPDATE pages SET crawl_status = ?1, last_enqueued_at = ?2
             WHERE crawl_status = ?3 AND last_links_recorded_at IS NULL",
            params![
                CrawlStatus::Pending.to_db_string(),
                now,
                CrawlStatus::Failed.to_db_string()
            ],
        )?;
        Ok(requeued as u64)
    }

    // ===== Lookups =====

    fn get_page(&self, page_id: i64) -> StorageResult<Option<PageRecord>> {
        Ok(fetch_page(&self.conn, page_id)?)
    }

    fn find_pages_by_title(&self, title: &str) -> StorageResult<Vec<PageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages WHERE title = ?1 ORDER BY page_id",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![title], map_page_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn is_empty(&self) -> StorageResult<bool> {
        let exists: bool = self
            .conn
            .query_row("SELECT EXISTS(SELECT 1 FROM pages)", [], |row| row.get(0))?;
        Ok(!exists)
    }

    // ===== Graph reads =====

    fn list_pages(&self, recorded_only: bool) -> StorageResult<Vec<PageRecord>> {
        let filter = if recorded_only {
            "WHERE last_links_recorded_at IS NOT NULL"
        } else {
            ""
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pages {} ORDER BY page_id",
            PAGE_COLUMNS, filter
        ))?;

        let pages = stmt
            .query_map([], map_page_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn list_links(&self, recorded_only: bool) -> StorageResult<Vec<LinkRecord>> {
        let sql = if recorded_only {
            "SELECT l.source_page_id, l.target_page_id, l.first_seen_at
             FROM page_links l
             JOIN pages s ON s.page_id = l.source_page_id
             JOIN pages t ON t.page_id = l.target_page_id
             WHERE s.last_links_recorded_at IS NOT NULL
               AND t.last_links_recorded_at IS NOT NULL
             ORDER BY l.source_page_id, l.target_page_id"
        } else {
            "SELECT source_page_id, target_page_id, first_seen_at
             FROM page_links
             ORDER BY source_page_id, target_page_id"
        };

        let mut stmt = self.conn.prepare(sql)?;
        let links = stmt
            .query_map([], |row| {
                Ok(LinkRecord {
                    source_page_id: row.get(0)?,
                    target_page_id: row.get(1)?,
                    first_seen_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    fn outgoing_links(&self, page_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT target_page_id FROM page_links WHERE source_page_id = ?1 ORDER BY target_page_id",
        )?;

        let targets = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(targets)
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: CrawlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE crawl_status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM pages")
    }

    fn count_links(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM page_links")
    }

    fn count_recorded(&self) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM pages WHERE last_links_recorded_at IS NOT NULL",
        )
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = timestamp_now();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_completed: u64,
        pages_failed: u64,
    ) -> StorageResult<()> {
        let now = timestamp_now();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_completed = ?3, pages_failed = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                pages_completed as i64,
                pages_failed as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    fn interrupt_stale_runs(&mut self) -> StorageResult<u64> {
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(changed as u64)
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, pages_completed, pages_failed
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                map_run_row,
            )
            .optional()?;

        Ok(run)
    }

    // ===== Snapshots =====

    fn snapshot_to(&self, dest: &Path) -> StorageResult<()> {
        self.conn.backup(DatabaseName::Main, dest, None)?;
        Ok(())
    }
}
