//! JSON export of the link graph
//!
//! The document maps page ids to the page's title, status and the titles it
//! links to.

use crate::storage::{PageRecord, PageStore};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One exported page
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportedPage {
    pub title: String,
    pub crawl_status: String,
    pub last_links_recorded_at: Option<String>,
    pub links_to: Vec<String>,
}

/// Builds the export document keyed by page id
pub fn build_export<S: PageStore + ?Sized>(
    store: &S,
    all_pages: bool,
) -> crate::Result<BTreeMap<i64, ExportedPage>> {
    let titles: HashMap<i64, String> = store
        .list_pages(false)?
        .into_iter()
        .map(|p| (p.page_id, p.title))
        .collect();

    let mut export = BTreeMap::new();
    for page in store.list_pages(!all_pages)? {
        let links_to = store
            .outgoing_links(page.page_id)?
            .into_iter()
            .filter_map(|id| titles.get(&id).cloned())
            .collect();

        let PageRecord {
            page_id,
            title,
            crawl_status,
            last_links_recorded_at,
            ..
        } = page;

        export.insert(
            page_id,
            ExportedPage {
                title,
                crawl_status: crawl_status.to_db_string().to_string(),
                last_links_recorded_at,
                links_to,
            },
        );
    }

    Ok(export)
}

/// Renders the export document as pretty-printed JSON
pub fn render_json<S: PageStore + ?Sized>(store: &S, all_pages: bool) -> crate::Result<String> {
    let export = build_export(store, all_pages)?;
    serde_json::to_string_pretty(&export).map_err(|e| crate::WalkerError::Export(e.to_string()))
}
