//! Typed views of `action=query` responses (`formatversion=2`)

use crate::state::CanonicalPage;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Top-level response envelope
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub query: Option<QueryBody>,

    /// Opaque continuation object; absent on the last page
    #[serde(rename = "continue", default)]
    pub continuation: Option<BTreeMap<String, Value>>,

    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    pub normalized: Vec<TitleMapping>,

    #[serde(default)]
    pub redirects: Vec<TitleMapping>,

    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

/// A `from -> to` entry of the `normalized` or `redirects` lists
#[derive(Debug, Clone, Deserialize)]
pub struct TitleMapping {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageEntry {
    #[serde(default)]
    pub pageid: Option<i64>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub missing: bool,

    #[serde(default)]
    pub invalid: bool,
}

impl PageEntry {
    /// The canonical identity, or `None` for missing and invalid pages
    pub fn canonical(&self) -> Option<CanonicalPage> {
        if self.missing || self.invalid {
            return None;
        }
        match (self.pageid, &self.title) {
            (Some(id), Some(title)) if id > 0 => Some(CanonicalPage::new(id, title.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,

    #[serde(default)]
    pub info: String,
}

impl QueryResponse {
    /// Canonical pages of the response, dropping missing and invalid entries
    pub fn canonical_pages(&self) -> Vec<CanonicalPage> {
        self.query
            .as_ref()
            .map(|q| q.pages.iter().filter_map(PageEntry::canonical).collect())
            .unwrap_or_default()
    }

    /// Continuation parameters to send with the next request
    ///
    /// Returns `None` when the response is the last page.
    pub fn continuation_params(&self) -> Option<Vec<(String, String)>> {
        let map = self.continuation.as_ref()?;
        if map.is_empty() {
            return None;
        }

        let params = map
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        Some(params)
    }
}

impl QueryBody {
    /// Follows `normalized` then `redirects` from the requested title
    ///
    /// Redirect chains are followed hop by hop; a cycle stops at the first
    /// title seen twice. Fragments are not part of the mapping.
    pub fn resolve_title(&self, requested: &str) -> String {
        let normalized: HashMap<&str, &str> = self
            .normalized
            .iter()
            .map(|m| (m.from.as_str(), m.to.as_str()))
            .collect();
        let redirects: HashMap<&str, &str> = self
            .redirects
            .iter()
            .map(|m| (m.from.as_str(), m.to.as_str()))
            .collect();

        let mut current = normalized.get(requested).copied().unwrap_or(requested);

        let mut seen = HashSet::new();
        seen.insert(current);
        while let Some(next) = redirects.get(current).copied() {
            if !seen.insert(next) {
                break;
            }
            current = next;
        }

        current.to_string()
    }

    /// The page entry whose title matches exactly
    pub fn page_titled(&self, title: &str) -> Option<&PageEntry> {
        self.pages
            .iter()
            .find(|p| p.title.as_deref() == Some(title))
    }
}
