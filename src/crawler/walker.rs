//! Walker - the claim-and-process loop
//!
//! This module drives a crawl:
//! - Recovering pages left `in_progress` by an interrupted run
//! - Seeding an empty database from the configured title
//! - Claiming one pending page at a time, fetching its links and committing
//!   them atomically
//! - Triggering periodic database snapshots
//!
//! No work list is kept in memory. Everything the loop needs on restart is
//! re-derived from the store.

use crate::backup::BackupManager;
use crate::mediawiki::{ApiResult, WikiClient};
use crate::state::{CanonicalPage, CrawlStatus};
use crate::storage::{PageRecord, PageStore, RunStatus};
use crate::WalkerError;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Claims between two progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The page budget was used up
    BudgetExhausted,
    /// No claimable page was left
    FrontierEmpty,
    /// The API kept failing with transient errors after all retries
    UpstreamUnavailable,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted => write!(f, "page budget exhausted"),
            StopReason::FrontierEmpty => write!(f, "frontier empty"),
            StopReason::UpstreamUnavailable => write!(f, "upstream unavailable"),
        }
    }
}

/// Totals of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_completed: u64,
    pub pages_failed: u64,
    pub links_added: u64,
    pub pages_discovered: u64,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            pages_completed: 0,
            pages_failed: 0,
            links_added: 0,
            pages_discovered: 0,
            stop_reason: StopReason::FrontierEmpty,
        }
    }

    /// Pages claimed during the run
    pub fn pages_claimed(&self) -> u64 {
        self.pages_completed + self.pages_failed
    }
}

/// Sequential crawl driver over a page store and an API client
pub struct Walker<S: PageStore> {
    store: S,
    client: WikiClient,
    seed_title: String,
    max_pages: u64,
    retry_failed: bool,
    config_hash: String,
    backup: Option<BackupManager>,
}

impl<S: PageStore> Walker<S> {
    pub fn new(store: S, client: WikiClient, seed_title: impl Into<String>) -> Self {
        Self {
            store,
            client,
            seed_title: seed_title.into(),
            max_pages: 0,
            retry_failed: false,
            config_hash: String::new(),
            backup: None,
        }
    }

    /// Caps the number of claims per run (0 = unlimited)
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Returns `failed` pages to the frontier before walking
    pub fn with_retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn with_backup(mut self, backup: Option<BackupManager>) -> Self {
        self.backup = backup;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs one crawl and records it in the run log
    ///
    /// Terminal per-page API failures mark the page `failed` and the walk
    /// goes on. A transient failure that outlives its retries hands the page
    /// back to the frontier and stops the run as `UpstreamUnavailable`.
    /// Storage failures and an unresolvable seed end the run with an error.
    pub async fn run(&mut self) -> crate::Result<RunSummary> {
        let stale = self.store.interrupt_stale_runs()?;
        if stale > 0 {
            warn!("Marked {} unfinished previous run(s) as interrupted", stale);
        }

        let run_id = self.store.create_run(&self.config_hash)?;
        info!("Starting crawl run {}", run_id);

        let mut summary = RunSummary::new();
        let result = match self.prepare().await {
            Ok(()) => self.walk(&mut summary).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                let status = match summary.stop_reason {
                    StopReason::UpstreamUnavailable => RunStatus::Failed,
                    StopReason::BudgetExhausted | StopReason::FrontierEmpty => {
                        RunStatus::Completed
                    }
                };
                self.store.finish_run(
                    run_id,
                    status,
                    summary.pages_completed,
                    summary.pages_failed,
                )?;
                info!(
                    "Run {} finished ({}): {} completed, {} failed, {} links added, {} pages discovered",
                    run_id,
                    summary.stop_reason,
                    summary.pages_completed,
                    summary.pages_failed,
                    summary.links_added,
                    summary.pages_discovered
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Run {} aborted: {}", run_id, e);
                if let Err(finish_err) = self.store.finish_run(
                    run_id,
                    RunStatus::Failed,
                    summary.pages_completed,
                    summary.pages_failed,
                ) {
                    warn!("Could not record failure of run {}: {}", run_id, finish_err);
                }
                Err(e)
            }
        }
    }

    /// Startup recovery and seeding
    async fn prepare(&mut self) -> crate::Result<()> {
        let requeued = self.store.requeue_interrupted()?;
        if requeued > 0 {
            info!("Requeued {} page(s) interrupted mid-crawl", requeued);
        }

        if self.retry_failed {
            let retried = self.store.requeue_failed()?;
            info!("Requeued {} failed page(s)", retried);
        }

        if self.store.is_empty()? {
            let seed = self
                .client
                .resolve_title(&self.seed_title)
                .await
                .map_err(|source| WalkerError::SeedNotFound {
                    title: self.seed_title.clone(),
                    source,
                })?;
            self.store.upsert_page(&seed)?;
            info!("Seeded frontier with '{}' ({})", seed.title, seed.page_id);
        } else {
            debug!(
                "Database already holds pages; seed '{}' not re-resolved",
                self.seed_title
            );
        }

        Ok(())
    }

    /// Claims and processes pages, tallying into `summary` as it goes
    async fn walk(&mut self, summary: &mut RunSummary) -> crate::Result<()> {
        let started = Instant::now();

        loop {
            if self.max_pages > 0 && summary.pages_claimed() >= self.max_pages {
                summary.stop_reason = StopReason::BudgetExhausted;
                break;
            }

            let Some(page) = self.store.claim_next_pending()? else {
                summary.stop_reason = StopReason::FrontierEmpty;
                break;
            };
            debug!("Claimed page {} '{}'", page.page_id, page.title);

            match self.fetch_links(&page).await {
                Ok((source, targets)) => {
                    let outcome = self.store.record_links_and_complete(&source, &targets)?;
                    summary.pages_completed += 1;
                    summary.links_added += outcome.links_added;
                    summary.pages_discovered += outcome.pages_discovered;
                    info!(
                        "Recorded '{}' ({}): {} links, {} new edges, {} new pages",
                        source.title,
                        source.page_id,
                        targets.len(),
                        outcome.links_added,
                        outcome.pages_discovered
                    );

                    self.maybe_backup(summary.pages_completed);
                }
                Err(e) if e.is_transient() => {
                    error!(
                        "Upstream unavailable while crawling '{}' ({}): {}",
                        page.title, page.page_id, e
                    );
                    self.store.release_claim(page.page_id, &e.to_string())?;
                    summary.stop_reason = StopReason::UpstreamUnavailable;
                    break;
                }
                Err(e) => {
                    warn!("Page '{}' ({}) failed: {}", page.title, page.page_id, e);
                    self.store.mark_failed(page.page_id, &e.to_string())?;
                    summary.pages_failed += 1;
                }
            }

            if summary.pages_claimed() % PROGRESS_INTERVAL == 0 {
                self.log_progress(summary, started)?;
            }
        }

        Ok(())
    }

    /// Resolves the claimed page and drains its outbound links
    async fn fetch_links(&self, page: &PageRecord) -> ApiResult<(CanonicalPage, Vec<CanonicalPage>)> {
        let source = self.client.lookup_page(page.page_id).await?;
        let targets = self.client.outbound_links(page.page_id).collect_all().await?;
        Ok((source, targets))
    }

    fn maybe_backup(&self, pages_completed: u64) {
        let Some(backup) = &self.backup else {
            return;
        };
        if !backup.should_run(pages_completed) {
            return;
        }

        if let Err(e) = backup.run(&self.store) {
            warn!("Snapshot failed, continuing crawl: {}", e);
        }
    }

    fn log_progress(&self, summary: &RunSummary, started: Instant) -> crate::Result<()> {
        let elapsed = started.elapsed().as_secs_f64().max(f64::EPSILON);
        info!(
            "Progress: {} claimed this run ({:.2} pages/sec); store has {} done, {} pending, {} failed",
            summary.pages_claimed(),
            summary.pages_claimed() as f64 / elapsed,
            self.store.count_by_status(CrawlStatus::Done)?,
            self.store.count_by_status(CrawlStatus::Pending)?,
            self.store.count_by_status(CrawlStatus::Failed)?
        );
        Ok(())
    }
}
