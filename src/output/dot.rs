//! Graphviz DOT export
//!
//! Produces DOT source only; rendering is left to the Graphviz tools.

use crate::output::find_unique_page;
use crate::storage::{PageRecord, PageStore};
use crate::WalkerError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// What part of the graph to export
#[derive(Debug, Clone, Default)]
pub struct DotOptions {
    /// Include pages whose links are not recorded yet
    pub all_pages: bool,

    /// Start page for a bounded export; requires `depth`
    pub start_title: Option<String>,

    /// Maximum hops from `start_title` along outgoing links
    pub depth: Option<u32>,

    /// Keep at most one incoming edge per node
    pub tree: bool,
}

/// Nodes and edges selected for export
#[derive(Debug, Default)]
struct Selection {
    nodes: Vec<(i64, String)>,
    edges: Vec<(i64, i64)>,
}

/// Renders the stored graph as DOT source
pub fn render_dot<S: PageStore + ?Sized>(store: &S, options: &DotOptions) -> crate::Result<String> {
    let selection = match (&options.start_title, options.depth) {
        (None, None) => select_all(store, options)?,
        (Some(title), Some(depth)) => select_from_start(store, options, title, depth)?,
        (Some(_), None) => {
            return Err(WalkerError::Export(
                "a start title requires a depth".to_string(),
            ))
        }
        (None, Some(_)) => {
            return Err(WalkerError::Export(
                "a depth requires a start title".to_string(),
            ))
        }
    };

    let mut out = String::new();
    out.push_str("digraph \"wikipedia\" {\n");
    out.push_str("\tgraph [rankdir=LR];\n");
    out.push_str("\tnode [shape=box];\n");

    for (page_id, title) in &selection.nodes {
        out.push_str(&format!("\t{} [label=\"{}\"];\n", page_id, escape_label(title)));
    }
    for (source, target) in &selection.edges {
        out.push_str(&format!("\t{} -> {};\n", source, target));
    }

    out.push_str("}\n");
    Ok(out)
}

fn select_all<S: PageStore + ?Sized>(store: &S, options: &DotOptions) -> crate::Result<Selection> {
    let recorded_only = !options.all_pages;

    let nodes = store
        .list_pages(recorded_only)?
        .into_iter()
        .map(|p| (p.page_id, p.title))
        .collect();

    let mut reached = HashSet::new();
    let edges = store
        .list_links(recorded_only)?
        .into_iter()
        .map(|l| (l.source_page_id, l.target_page_id))
        .filter(|(_, target)| !options.tree || reached.insert(*target))
        .collect();

    Ok(Selection { nodes, edges })
}

fn select_from_start<S: PageStore + ?Sized>(
    store: &S,
    options: &DotOptions,
    start_title: &str,
    depth: u32,
) -> crate::Result<Selection> {
    let start = find_unique_page(store, start_title)?;
    if !options.all_pages && !start.links_recorded() {
        return Err(WalkerError::Export(format!(
            "start page '{}' has not been crawled yet; crawl it first or include all pages",
            start_title
        )));
    }

    let pages: HashMap<i64, PageRecord> = store
        .list_pages(false)?
        .into_iter()
        .map(|p| (p.page_id, p))
        .collect();
    let included = |id: &i64| {
        pages
            .get(id)
            .map(|p| options.all_pages || p.links_recorded())
            .unwrap_or(false)
    };

    let mut visited: BTreeSet<i64> = BTreeSet::new();
    visited.insert(start.page_id);
    let mut frontier = vec![start.page_id];
    let mut edges = Vec::new();

    for _ in 0..depth {
        if frontier.is_empty() {
            break;
        }

        let mut next = Vec::new();
        for source in &frontier {
            for target in store.outgoing_links(*source)? {
                if !included(&target) {
                    continue;
                }
                let newly_reached = visited.insert(target);
                if newly_reached {
                    next.push(target);
                }
                if newly_reached || !options.tree {
                    edges.push((*source, target));
                }
            }
        }
        frontier = next;
    }

    edges.sort_unstable();
    edges.dedup();

    let nodes = visited
        .into_iter()
        .filter_map(|id| pages.get(&id).map(|p| (id, p.title.clone())))
        .collect();

    Ok(Selection { nodes, edges })
}

/// Escapes a title for use inside a quoted DOT string
fn escape_label(title: &str) -> String {
    title.replace('\\', "\\\\").replace('"', "\\\"")
}
