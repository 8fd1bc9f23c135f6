//! End-to-end crawl cycles against a scripted API

use crate::common::*;
use std::time::{Duration, Instant};
use wiki_walker::crawler::{StopReason, Walker};
use wiki_walker::state::{CanonicalPage, CrawlStatus};
use wiki_walker::storage::{PageStore, RunStatus};
use wiki_walker::WalkerError;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_full_crawl_small_graph() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page(&server, 1, &[2, 3]).await;
    mount_page(&server, 2, &[3, 1]).await;
    mount_page(&server, 3, &[]).await;

    let (_dir, db_path) = temp_db();
    let mut walker = Walker::new(open(&db_path), test_client(&server), "Start");
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(summary.pages_completed, 3);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.links_added, 4);
    assert_eq!(summary.pages_discovered, 2);

    let store = walker.store();
    assert_eq!(store.count_pages().unwrap(), 3);
    assert_eq!(store.count_by_status(CrawlStatus::Done).unwrap(), 3);
    assert_eq!(store.count_links().unwrap(), 4);
    assert_eq!(store.outgoing_links(2).unwrap(), vec![1, 3]);

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_completed, 3);
}

#[tokio::test]
async fn test_pagination_collects_every_batch() {
    let server = MockServer::start().await;
    mount_title(&server, "Hub", 1, "Page 1").await;
    mount_page_info(&server, 1, "Page 1").await;
    let batches = vec![
        (100..105).collect::<Vec<i64>>(),
        (105..110).collect(),
        (110..115).collect(),
    ];
    mount_link_batches(&server, 1, &batches, Some(1)).await;

    let (_dir, db_path) = temp_db();
    let mut walker =
        Walker::new(open(&db_path), test_client(&server), "Hub").with_max_pages(1);
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.pages_completed, 1);
    assert_eq!(summary.links_added, 15);
    assert_eq!(summary.pages_discovered, 15);

    let store = walker.store();
    let targets = store.outgoing_links(1).unwrap();
    assert_eq!(targets, (100..115).collect::<Vec<i64>>());
    assert_eq!(store.count_links().unwrap(), 15);
    assert_eq!(store.count_by_status(CrawlStatus::Pending).unwrap(), 15);
}

#[tokio::test]
async fn test_overlapping_batches_store_no_duplicate_edges() {
    let server = MockServer::start().await;
    mount_title(&server, "Hub", 1, "Page 1").await;
    mount_page_info(&server, 1, "Page 1").await;
    mount_link_batches(&server, 1, &[vec![2, 3], vec![3, 4], vec![2, 4]], Some(1)).await;

    let (_dir, db_path) = temp_db();
    let mut walker =
        Walker::new(open(&db_path), test_client(&server), "Hub").with_max_pages(1);
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.links_added, 3);
    assert_eq!(walker.store().count_links().unwrap(), 3);
    assert_eq!(walker.store().outgoing_links(1).unwrap(), vec![2, 3, 4]);
}

#[tokio::test]
async fn test_seed_redirect_resolves_to_canonical_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("titles", "dream theater"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batchcomplete": true,
            "query": {
                "normalized": [{"from": "dream theater", "to": "Dream theater"}],
                "redirects": [{"from": "Dream theater", "to": "Dream Theater", "tofragment": "Members"}],
                "pages": [{"pageid": 8896, "ns": 0, "title": "Dream Theater"}]
            }
        })))
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut walker =
        Walker::new(open(&db_path), test_client(&server), "dream theater").with_max_pages(1);
    // Page info is not mounted, so the single claim fails; the seed row is what matters
    walker.run().await.unwrap();

    let store = walker.store();
    assert_eq!(store.count_pages().unwrap(), 1);
    let seed = store.get_page(8896).unwrap().unwrap();
    assert_eq!(seed.title, "Dream Theater");
    assert!(store.find_pages_by_title("dream theater").unwrap().is_empty());
}

#[tokio::test]
async fn test_redirected_link_targets_share_identity() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page_info(&server, 1, "Page 1").await;
    // Two link titles redirect to the same article; the generator reports it once per batch
    Mock::given(method("GET"))
        .and(query_param("generator", "links"))
        .and(query_param("pageids", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "batchcomplete": true,
            "query": {
                "redirects": [
                    {"from": "DT", "to": "Dream Theater"},
                    {"from": "Dream theatre", "to": "Dream Theater"}
                ],
                "pages": [
                    {"pageid": 8896, "ns": 0, "title": "Dream Theater"},
                    {"ns": 0, "title": "Unwritten article", "missing": true}
                ]
            }
        })))
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut walker =
        Walker::new(open(&db_path), test_client(&server), "Start").with_max_pages(1);
    walker.run().await.unwrap();

    let store = walker.store();
    assert_eq!(store.outgoing_links(1).unwrap(), vec![8896]);
    assert_eq!(store.count_pages().unwrap(), 2);
}

#[tokio::test]
async fn test_budget_limits_claims() {
    let server = MockServer::start().await;
    for id in 1..=10 {
        mount_page(&server, id, &[]).await;
    }

    let (_dir, db_path) = temp_db();
    let mut store = open(&db_path);
    for id in 1..=10 {
        store
            .upsert_page(&CanonicalPage::new(id, title_of(id)))
            .unwrap();
    }

    // A non-empty store never re-resolves the seed; no titles= mock exists
    let mut walker = Walker::new(store, test_client(&server), "Unused seed").with_max_pages(3);
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(summary.pages_completed, 3);
    assert_eq!(walker.store().count_by_status(CrawlStatus::Done).unwrap(), 3);
    assert_eq!(walker.store().count_by_status(CrawlStatus::Pending).unwrap(), 7);
}

#[tokio::test]
async fn test_empty_frontier_stops_without_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut store = open(&db_path);
    store.upsert_page(&CanonicalPage::new(1, "Only")).unwrap();
    store.claim_next_pending().unwrap();
    store
        .record_links_and_complete(&CanonicalPage::new(1, "Only"), &[])
        .unwrap();

    let mut walker = Walker::new(store, test_client(&server), "Only").with_max_pages(5);
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(summary.pages_claimed(), 0);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page_info(&server, 1, "Page 1").await;
    Mock::given(method("GET"))
        .and(query_param("generator", "links"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_link_batches(&server, 1, &[vec![2]], Some(1)).await;

    let (_dir, db_path) = temp_db();
    let mut walker =
        Walker::new(open(&db_path), test_client(&server), "Start").with_max_pages(1);
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.pages_completed, 1);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(walker.store().outgoing_links(1).unwrap(), vec![2]);
}

#[tokio::test]
async fn test_unresolvable_seed_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("titles", "No such page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "query": {"pages": [{"ns": 0, "title": "No such page", "missing": true}]}
        })))
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut walker = Walker::new(open(&db_path), test_client(&server), "No such page");
    let result = walker.run().await;

    assert!(matches!(result, Err(WalkerError::SeedNotFound { .. })));
    let store = walker.store();
    assert!(store.is_empty().unwrap());
    assert_eq!(store.latest_run().unwrap().unwrap().status, RunStatus::Failed);
}

#[tokio::test]
async fn test_upstream_outage_leaves_frontier_pending() {
    let server = MockServer::start().await;
    // First page: one attempt plus two retries, then the run stops
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let (_dir, db_path) = temp_db();
    let mut store = open(&db_path);
    for id in 1..=5 {
        store
            .upsert_page(&CanonicalPage::new(id, title_of(id)))
            .unwrap();
    }

    let mut walker = Walker::new(store, test_client(&server), "Unused");
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::UpstreamUnavailable);
    assert_eq!(summary.pages_claimed(), 0);

    let store = walker.store();
    assert_eq!(store.count_by_status(CrawlStatus::Failed).unwrap(), 0);
    assert_eq!(store.count_by_status(CrawlStatus::InProgress).unwrap(), 0);
    assert_eq!(store.count_by_status(CrawlStatus::Pending).unwrap(), 5);
    assert_eq!(store.latest_run().unwrap().unwrap().status, RunStatus::Failed);
}

#[tokio::test]
async fn test_unreachable_api_does_not_fail_pages() {
    let (_dir, db_path) = temp_db();
    let mut store = open(&db_path);
    for id in 1..=5 {
        store
            .upsert_page(&CanonicalPage::new(id, title_of(id)))
            .unwrap();
    }

    // Nothing listens on the discard port; every connect is refused
    let client = client_for("http://127.0.0.1:9/w/api.php", Duration::ZERO);
    let mut walker = Walker::new(store, client, "Unused");
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::UpstreamUnavailable);
    assert_eq!(summary.pages_failed, 0);

    let store = walker.store();
    assert_eq!(store.count_by_status(CrawlStatus::Failed).unwrap(), 0);
    assert_eq!(store.count_by_status(CrawlStatus::Pending).unwrap(), 5);

    let released = store.find_pages_by_title("Page 1").unwrap();
    let page = released.first().unwrap();
    assert!(page.last_error.is_some());
    assert!(!page.links_recorded());
}

#[tokio::test]
async fn test_politeness_delay_spaces_crawl_requests() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page(&server, 1, &[]).await;

    let (_dir, db_path) = temp_db();
    let client = client_for(
        &format!("{}{}", server.uri(), API_PATH),
        Duration::from_millis(100),
    );
    let mut walker = Walker::new(open(&db_path), client, "Start");

    let started = Instant::now();
    let summary = walker.run().await.unwrap();
    let elapsed = started.elapsed();

    // Seed resolution, page lookup and one link batch
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(summary.pages_completed, 1);
    assert!(elapsed >= Duration::from_millis(100) * requests.len() as u32);
}
