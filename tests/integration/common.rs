//! Shared helpers: a scripted MediaWiki API on a wiremock server

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiki_walker::config::{ApiConfig, UserAgentConfig};
use wiki_walker::mediawiki::{build_http_client, RetryPolicy, WikiClient};
use wiki_walker::storage::SqliteStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const API_PATH: &str = "/w/api.php";

/// Matches requests that do not carry the given query parameter
pub struct MissingParam(pub &'static str);

impl Match for MissingParam {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == self.0)
    }
}

pub fn test_client(server: &MockServer) -> WikiClient {
    client_for(&format!("{}{}", server.uri(), API_PATH), Duration::ZERO)
}

/// A client for `endpoint` that waits `delay` before every request
pub fn client_for(endpoint: &str, delay: Duration) -> WikiClient {
    let http = build_http_client(&UserAgentConfig::default(), &ApiConfig::default()).unwrap();
    let endpoint = Url::parse(endpoint).unwrap();
    WikiClient::new(
        http,
        endpoint,
        delay,
        RetryPolicy {
            max_retries: 2,
            backoff_base: Duration::from_millis(5),
            backoff_max: Duration::from_millis(20),
        },
    )
}

/// A database file inside a temporary directory
pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("walker.sqlite3");
    (dir, db_path)
}

pub fn open(db_path: &Path) -> SqliteStore {
    SqliteStore::open(db_path).unwrap()
}

pub fn page_json(page_id: i64, title: &str) -> Value {
    json!({"pageid": page_id, "ns": 0, "title": title})
}

pub fn title_of(page_id: i64) -> String {
    format!("Page {}", page_id)
}

/// `titles=<requested>` resolves to the given canonical page
pub async fn mount_title(server: &MockServer, requested: &str, page_id: i64, title: &str) {
    let mut query = json!({"pages": [page_json(page_id, title)]});
    if requested != title {
        query["redirects"] = json!([{"from": requested, "to": title}]);
    }

    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("titles", requested))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": true,
            "query": query
        })))
        .mount(server)
        .await;
}

/// `pageids=<id>` without a generator returns the page's current title
pub async fn mount_page_info(server: &MockServer, page_id: i64, title: &str) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("pageids", page_id.to_string()))
        .and(MissingParam("generator"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batchcomplete": true,
            "query": {"pages": [page_json(page_id, title)]}
        })))
        .mount(server)
        .await;
}

/// `pageids=<id>` reports the page as deleted
pub async fn mount_missing_page(server: &MockServer, page_id: i64) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("pageids", page_id.to_string()))
        .and(MissingParam("generator"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"pages": [{"pageid": page_id, "missing": true}]}
        })))
        .mount(server)
        .await;
}

/// Outbound links of `page_id`, served as one response per batch
///
/// Batch `i > 0` is only served for the continuation token handed out by
/// batch `i - 1`. With `expected_traversals` set, the server verifies on drop
/// that every batch was requested exactly that many times.
pub async fn mount_link_batches(
    server: &MockServer,
    page_id: i64,
    batches: &[Vec<i64>],
    expected_traversals: Option<u64>,
) {
    for (i, batch) in batches.iter().enumerate() {
        let pages: Vec<Value> = batch.iter().map(|id| page_json(*id, &title_of(*id))).collect();
        let mut body = json!({"query": {"pages": pages}});
        if i + 1 < batches.len() {
            body["continue"] = json!({
                "gplcontinue": format!("{}|{}", page_id, i + 1),
                "continue": "gplcontinue||"
            });
        } else {
            body["batchcomplete"] = json!(true);
        }

        let mock = Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("generator", "links"))
            .and(query_param("pageids", page_id.to_string()));

        let mock = if i == 0 {
            mock.and(MissingParam("gplcontinue"))
        } else {
            mock.and(query_param("gplcontinue", format!("{}|{}", page_id, i)))
        };

        let mock = mock.respond_with(ResponseTemplate::new(200).set_body_json(body));
        let mock = match expected_traversals {
            Some(times) => mock.expect(times),
            None => mock,
        };
        mock.mount(server).await;
    }
}

/// A page whose info and single link batch are both served
pub async fn mount_page(server: &MockServer, page_id: i64, links: &[i64]) {
    mount_page_info(server, page_id, &title_of(page_id)).await;
    mount_link_batches(server, page_id, &[links.to_vec()], None).await;
}
