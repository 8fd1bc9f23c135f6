//! Output module for reporting on and exporting the stored graph
//!
//! This module handles:
//! - Printing crawl statistics
//! - Exporting the link graph as Graphviz DOT or JSON
//! - Finding shortest paths between stored pages
//!
//! Everything here reads the store; nothing mutates crawl state.

mod dot;
mod json;
mod path;
pub mod stats;

pub use dot::{render_dot, DotOptions};
pub use json::{build_export, render_json, ExportedPage};
pub use path::{print_path, shortest_path, shortest_path_ids, PagePath};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::storage::{PageRecord, PageStore};
use crate::WalkerError;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes rendered output to `output_path`, creating parent directories
pub fn write_output(output_path: &Path, content: &str) -> crate::Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// The single stored page with exactly this title
///
/// Titles are not unique identities, so an ambiguous title is an error.
pub(crate) fn find_unique_page<S: PageStore + ?Sized>(
    store: &S,
    title: &str,
) -> crate::Result<PageRecord> {
    let mut matches = store.find_pages_by_title(title)?;
    match matches.len() {
        0 => Err(WalkerError::Export(format!(
            "title not found in database: '{}'",
            title
        ))),
        1 => Ok(matches.remove(0)),
        _ => {
            let ids: Vec<String> = matches.iter().map(|p| p.page_id.to_string()).collect();
            Err(WalkerError::Export(format!(
                "multiple pages titled '{}' (page ids: {})",
                title,
                ids.join(", ")
            )))
        }
    }
}
