//! Shortest path between two stored pages
//!
//! Edges are unweighted, so a breadth-first search finds a shortest path.

use crate::output::find_unique_page;
use crate::storage::PageStore;
use std::collections::{HashMap, VecDeque};

/// A path of pages from start to goal, both inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePath {
    pub steps: Vec<(i64, String)>,
}

impl PagePath {
    /// Number of edges on the path
    pub fn len(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shortest chain of page ids from `start` to `goal` over stored links
pub fn shortest_path_ids<S: PageStore + ?Sized>(
    store: &S,
    start: i64,
    goal: i64,
) -> crate::Result<Option<Vec<i64>>> {
    if start == goal {
        return Ok(Some(vec![start]));
    }

    let mut previous: HashMap<i64, i64> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for next in store.outgoing_links(current)? {
            if next == start || previous.contains_key(&next) {
                continue;
            }
            previous.insert(next, current);

            if next == goal {
                let mut path = vec![goal];
                let mut cursor = goal;
                while let Some(&prev) = previous.get(&cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Ok(Some(path));
            }

            queue.push_back(next);
        }
    }

    Ok(None)
}

/// Shortest path between two titles, which must each match one stored page
pub fn shortest_path<S: PageStore + ?Sized>(
    store: &S,
    from_title: &str,
    to_title: &str,
) -> crate::Result<Option<PagePath>> {
    let start = find_unique_page(store, from_title)?;
    let goal = find_unique_page(store, to_title)?;

    let Some(ids) = shortest_path_ids(store, start.page_id, goal.page_id)? else {
        return Ok(None);
    };

    let mut steps = Vec::with_capacity(ids.len());
    for id in ids {
        let title = store
            .get_page(id)?
            .map(|p| p.title)
            .unwrap_or_else(|| format!("<missing title for {}>", id));
        steps.push((id, title));
    }

    Ok(Some(PagePath { steps }))
}

/// Prints a path as a numbered list followed by an arrow chain
pub fn print_path(path: &PagePath) {
    println!("Shortest path length (edges): {}", path.len());
    println!("Path:");
    for (i, (page_id, title)) in path.steps.iter().enumerate() {
        println!("  {:>2}. {} (page_id={})", i + 1, title, page_id);
    }

    let titles: Vec<&str> = path.steps.iter().map(|(_, t)| t.as_str()).collect();
    println!("\nAs titles:");
    println!("{}", titles.join(" -> "));
}
