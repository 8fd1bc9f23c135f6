//! Crawler module
//!
//! This module contains the crawl orchestration: the claim-and-process loop
//! and the entry point that wires it to configuration.

mod walker;

pub use walker::{RunSummary, StopReason, Walker};

use crate::backup::BackupManager;
use crate::config::Config;
use crate::mediawiki::WikiClient;
use crate::storage::open_store;
use std::path::Path;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open (or create) the database
/// 2. Build the API client
/// 3. Recover, seed and walk the frontier up to the page budget
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    retry_failed: bool,
) -> crate::Result<RunSummary> {
    let store = open_store(Path::new(&config.walker.database_path))?;
    let client = WikiClient::from_config(config)?;

    let mut walker = Walker::new(store, client, config.walker.seed_title.clone())
        .with_max_pages(config.walker.max_pages)
        .with_retry_failed(retry_failed)
        .with_config_hash(config_hash)
        .with_backup(BackupManager::from_config(config));

    walker.run().await
}
