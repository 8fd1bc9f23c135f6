//! Resumption across runs: crash recovery, crawl-once and failed pages

use crate::common::*;
use wiki_walker::backup::BackupManager;
use wiki_walker::crawler::{StopReason, Walker};
use wiki_walker::state::{CanonicalPage, CrawlStatus};
use wiki_walker::storage::{PageStore, RunStatus};
use wiki_walker::WalkerError;
use wiremock::MockServer;

#[tokio::test]
async fn test_links_fetched_once_across_runs() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page_info(&server, 1, "Page 1").await;
    mount_link_batches(&server, 1, &[vec![2, 3]], Some(1)).await;
    mount_link_batches(&server, 2, &[vec![3]], Some(1)).await;
    mount_page_info(&server, 2, "Page 2").await;
    mount_link_batches(&server, 3, &[vec![]], Some(1)).await;
    mount_page_info(&server, 3, "Page 3").await;

    let (_dir, db_path) = temp_db();

    let mut first = Walker::new(open(&db_path), test_client(&server), "Start").with_max_pages(1);
    let summary = first.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(summary.pages_completed, 1);
    drop(first);

    let mut second = Walker::new(open(&db_path), test_client(&server), "Start");
    let summary = second.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(summary.pages_completed, 2);
    drop(second);

    // Nothing left to claim; a third run makes no requests at all
    let mut third = Walker::new(open(&db_path), test_client(&server), "Start");
    let summary = third.run().await.unwrap();
    assert_eq!(summary.pages_claimed(), 0);

    let store = third.into_store();
    assert_eq!(store.count_recorded().unwrap(), 3);
    assert_eq!(store.count_links().unwrap(), 3);
}

#[tokio::test]
async fn test_interrupted_claim_is_recovered() {
    let server = MockServer::start().await;
    mount_page(&server, 7, &[8]).await;
    mount_page(&server, 8, &[]).await;

    let (_dir, db_path) = temp_db();
    {
        // Simulate a process killed between claim and commit
        let mut store = open(&db_path);
        store.upsert_page(&CanonicalPage::new(7, title_of(7))).unwrap();
        store.create_run("before-crash").unwrap();
        let claimed = store.claim_next_pending().unwrap().unwrap();
        assert_eq!(claimed.crawl_status, CrawlStatus::InProgress);
    }

    let store = open(&db_path);
    assert_eq!(store.count_by_status(CrawlStatus::InProgress).unwrap(), 1);

    let mut walker = Walker::new(store, test_client(&server), "Unused");
    let summary = walker.run().await.unwrap();

    assert_eq!(summary.pages_completed, 2);
    let store = walker.store();
    assert_eq!(store.count_by_status(CrawlStatus::InProgress).unwrap(), 0);
    assert_eq!(store.count_by_status(CrawlStatus::Done).unwrap(), 2);
    assert_eq!(store.outgoing_links(7).unwrap(), vec![8]);
    assert_eq!(store.latest_run().unwrap().unwrap().status, RunStatus::Completed);
}

#[tokio::test]
async fn test_failed_pages_wait_for_explicit_retry() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page(&server, 1, &[2]).await;
    mount_missing_page(&server, 2).await;

    let (_dir, db_path) = temp_db();

    let mut walker = Walker::new(open(&db_path), test_client(&server), "Start");
    let summary = walker.run().await.unwrap();
    assert_eq!(summary.pages_completed, 1);
    assert_eq!(summary.pages_failed, 1);

    let failed = walker.store().get_page(2).unwrap().unwrap();
    assert_eq!(failed.crawl_status, CrawlStatus::Failed);
    assert!(failed.last_error.is_some());
    assert!(!failed.links_recorded());
    drop(walker);

    // A plain rerun leaves the failed page alone
    let mut walker = Walker::new(open(&db_path), test_client(&server), "Start");
    let summary = walker.run().await.unwrap();
    assert_eq!(summary.stop_reason, StopReason::FrontierEmpty);
    assert_eq!(summary.pages_claimed(), 0);
    drop(walker);

    // The page comes back upstream; an explicit retry picks it up
    server.reset().await;
    mount_page(&server, 2, &[1]).await;

    let mut walker = Walker::new(open(&db_path), test_client(&server), "Start")
        .with_retry_failed(true);
    let summary = walker.run().await.unwrap();
    assert_eq!(summary.pages_completed, 1);
    assert_eq!(summary.pages_failed, 0);

    let store = walker.store();
    assert_eq!(store.count_by_status(CrawlStatus::Failed).unwrap(), 0);
    assert_eq!(store.count_by_status(CrawlStatus::Done).unwrap(), 2);
    assert_eq!(store.outgoing_links(2).unwrap(), vec![1]);
}

#[tokio::test]
async fn test_snapshots_taken_during_crawl() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page(&server, 1, &[2, 3]).await;
    mount_page(&server, 2, &[]).await;
    mount_page(&server, 3, &[]).await;

    let (dir, db_path) = temp_db();
    let manager = BackupManager::new(dir.path().join("backups"), &db_path, 2, 1);

    let mut walker = Walker::new(open(&db_path), test_client(&server), "Start")
        .with_backup(Some(manager.clone()));
    let summary = walker.run().await.unwrap();
    assert_eq!(summary.pages_completed, 3);

    let snapshots = manager.list_snapshots().unwrap();
    assert!(!snapshots.is_empty());
    assert!(snapshots.len() <= 2);

    let newest = snapshots.last().unwrap();
    let copy = open(newest);
    assert_eq!(copy.count_pages().unwrap(), 3);
    assert_eq!(copy.count_recorded().unwrap(), 3);
}

#[tokio::test]
async fn test_storage_failure_keeps_run_tallies() {
    let server = MockServer::start().await;
    mount_title(&server, "Start", 1, "Page 1").await;
    mount_page(&server, 1, &[2]).await;
    mount_page(&server, 2, &[]).await;

    let (_dir, db_path) = temp_db();
    let store = open(&db_path);

    // Completing page 2 fails inside the commit transaction
    rusqlite::Connection::open(&db_path)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_page_two BEFORE UPDATE OF crawl_status ON pages
             WHEN NEW.page_id = 2 AND NEW.crawl_status = 'done'
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

    let mut walker = Walker::new(store, test_client(&server), "Start");
    let result = walker.run().await;
    assert!(matches!(result, Err(WalkerError::Storage(_))));

    let store = walker.store();
    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.pages_completed, 1);
    assert_eq!(run.pages_failed, 0);

    // The failed commit left nothing half-done; a restart requeues the page
    let page = store.get_page(2).unwrap().unwrap();
    assert_eq!(page.crawl_status, CrawlStatus::InProgress);
    assert!(!page.links_recorded());
}
