//! Statistics generation from the walker database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::CrawlStatus;
use crate::storage::{PageStore, RunRecord};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of pages stored
    pub total_pages: u64,

    /// Count of pages by crawl status
    pub pages_by_status: HashMap<CrawlStatus, u64>,

    /// Total number of directed links stored
    pub total_links: u64,

    /// Pages whose outbound links are recorded
    pub recorded_pages: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    pub fn count(&self, status: CrawlStatus) -> u64 {
        self.pages_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
pub fn load_statistics<S: PageStore + ?Sized>(store: &S) -> crate::Result<CrawlStatistics> {
    let mut pages_by_status = HashMap::new();
    for status in CrawlStatus::all() {
        let count = store.count_by_status(status)?;
        if count > 0 {
            pages_by_status.insert(status, count);
        }
    }

    Ok(CrawlStatistics {
        total_pages: store.count_pages()?,
        pages_by_status,
        total_links: store.count_links()?,
        recorded_pages: store.count_recorded()?,
        latest_run: store.latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Walker Statistics ===\n");

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Pages with recorded links: {}", stats.recorded_pages);
    println!("  Total links: {}", stats.total_links);
    println!();

    println!("Pages by Status:");
    for status in CrawlStatus::all() {
        let count = stats.count(status);
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run:");
        println!("  Id: {}", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!(
            "  Pages: {} completed, {} failed",
            run.pages_completed, run.pages_failed
        );
    } else {
        println!("No crawl runs recorded yet.");
    }
}
