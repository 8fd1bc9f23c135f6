//! Database snapshots with retention
//!
//! Snapshots are online copies of the live database written next to each
//! other as `<db-file-name>.<YYYYMMDDTHHMMSSmmmZ>`. The timestamp suffix sorts
//! lexicographically, so the oldest snapshots are pruned first.

use crate::config::Config;
use crate::storage::PageStore;
use crate::WalkerError;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Format of the snapshot suffix
const SNAPSHOT_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// Length of a formatted suffix, e.g. `20240101T120000123Z`
const SNAPSHOT_SUFFIX_LEN: usize = 19;

/// Creates periodic snapshots and keeps the newest `max_count`
#[derive(Debug, Clone)]
pub struct BackupManager {
    directory: PathBuf,
    prefix: String,
    max_count: usize,
    every_pages: u64,
}

impl BackupManager {
    pub fn new(
        directory: impl Into<PathBuf>,
        database_path: &Path,
        max_count: usize,
        every_pages: u64,
    ) -> Self {
        let prefix = database_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "walker.sqlite3".to_string());

        Self {
            directory: directory.into(),
            prefix,
            max_count: max_count.max(1),
            every_pages: every_pages.max(1),
        }
    }

    /// Manager for the configured database, or `None` when backups are off
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.backup.enabled {
            return None;
        }

        Some(Self::new(
            &config.backup.directory,
            Path::new(&config.walker.database_path),
            config.backup.max_count,
            config.backup.every_pages,
        ))
    }

    /// True after every `every_pages` completed pages
    pub fn should_run(&self, pages_completed: u64) -> bool {
        pages_completed > 0 && pages_completed % self.every_pages == 0
    }

    /// Writes a snapshot of `store` and prunes old ones
    ///
    /// Must not be called while a write transaction is open on the store.
    pub fn run<S: PageStore + ?Sized>(&self, store: &S) -> crate::Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;

        let stamp = Utc::now().format(SNAPSHOT_TIME_FORMAT).to_string();
        let dest = self.directory.join(format!("{}.{}", self.prefix, stamp));

        store
            .snapshot_to(&dest)
            .map_err(|e| WalkerError::Backup(format!("{}: {}", dest.display(), e)))?;
        info!("Database snapshot written to {}", dest.display());

        let removed = self.prune()?;
        if !removed.is_empty() {
            debug!("Pruned {} old snapshot(s)", removed.len());
        }

        Ok(dest)
    }

    /// Snapshot files in the directory, oldest first
    pub fn list_snapshots(&self) -> crate::Result<Vec<PathBuf>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_snapshot_name(&name) {
                snapshots.push(entry.path());
            }
        }

        snapshots.sort();
        Ok(snapshots)
    }

    /// Removes snapshots beyond `max_count`, returning the deleted paths
    pub fn prune(&self) -> crate::Result<Vec<PathBuf>> {
        let snapshots = self.list_snapshots()?;
        let excess = snapshots.len().saturating_sub(self.max_count);

        let mut removed = Vec::with_capacity(excess);
        for path in snapshots.into_iter().take(excess) {
            fs::remove_file(&path)?;
            removed.push(path);
        }

        Ok(removed)
    }

    fn is_snapshot_name(&self, name: &str) -> bool {
        let Some(suffix) = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            return false;
        };

        suffix.len() == SNAPSHOT_SUFFIX_LEN
            && suffix.ends_with('Z')
            && suffix.as_bytes()[8] == b'T'
            && suffix
                .chars()
                .enumerate()
                .all(|(i, c)| i == 8 || i == SNAPSHOT_SUFFIX_LEN - 1 || c.is_ascii_digit())
    }
}
