//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the walker database.

/// Version stamped into `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_completed INTEGER NOT NULL DEFAULT 0,
    pages_failed INTEGER NOT NULL DEFAULT 0
);

-- Every page ever resolved; this table is also the crawl queue
CREATE TABLE IF NOT EXISTS pages (
    page_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    crawl_status TEXT NOT NULL DEFAULT 'pending'
        CHECK (crawl_status IN ('pending', 'in_progress', 'done', 'failed')),
    discovered_at TEXT NOT NULL,
    last_enqueued_at TEXT,
    last_started_at TEXT,
    last_finished_at TEXT,
    last_links_recorded_at TEXT,
    last_error TEXT,
    last_error_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_pages_claim ON pages(crawl_status, last_enqueued_at, page_id);
CREATE INDEX IF NOT EXISTS idx_pages_title ON pages(title);

-- Directed links, one row per (source, target) pair
CREATE TABLE IF NOT EXISTS page_links (
    source_page_id INTEGER NOT NULL REFERENCES pages(page_id),
    target_page_id INTEGER NOT NULL REFERENCES pages(page_id),
    first_seen_at TEXT NOT NULL,
    PRIMARY KEY (source_page_id, target_page_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_page_links_target ON page_links(target_page_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
