//! Scrape run orchestration.
//!
//! Drives one adapter across a page range, absorbing page-level failures
//! into the run summary. A run only fails outright when the very first
//! page cannot be reached at all, which is read as a total source outage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::{PageError, SourceAdapter};
use crate::fetch::{FetchConfig, Fetcher};
use crate::models::{JobRecord, JobSource, ScrapeRun};
use crate::normalize;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The source was unreachable on the first page of the run.
    #[error("source {source} unreachable: {reason}")]
    FatalSource { source: JobSource, reason: String },
    #[error("scrape task failed: {0}")]
    TaskFailed(String),
}

/// Records plus the honest account of what happened while collecting them.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub records: Vec<JobRecord>,
    pub summary: ScrapeRun,
}

/// Cooperative stop signal, checked between pages.
///
/// Cancelling never discards work: records collected before the signal
/// are returned as usual.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run one adapter across `max_pages` pages.
///
/// Pages are fetched sequentially so the fetcher's pacing holds for the
/// source; independent sources belong in separate [`run_many`] tasks.
pub async fn run(
    adapter: &dyn SourceAdapter,
    fetcher: &Fetcher,
    query: &str,
    location: &str,
    max_pages: u32,
    cancel: &CancelToken,
) -> Result<ScrapeOutcome, ScrapeError> {
    let source = adapter.source();
    let started = Instant::now();
    let scraped_at = Utc::now();
    let mut summary = ScrapeRun::new(source, query, location, max_pages);
    let mut records = Vec::new();

    info!(%source, query, location, max_pages, "starting scrape run");

    for page in 1..=max_pages {
        if cancel.is_cancelled() {
            info!(%source, page, "run cancelled, keeping collected records");
            summary.cancelled = true;
            break;
        }

        match adapter.list_page(fetcher, query, location, page).await {
            Ok(postings) => {
                summary.pages_fetched += 1;
                if postings.is_empty() {
                    debug!(%source, page, "no postings on page, end of listings");
                    break;
                }
                for raw in &postings {
                    match normalize::normalize(raw, source, scraped_at) {
                        Ok(record) => {
                            summary.parsed_ok += 1;
                            records.push(record);
                        }
                        Err(e) => {
                            summary.parse_failed += 1;
                            debug!(%source, page, error = %e, "skipping unnormalizable posting");
                        }
                    }
                }
            }
            Err(PageError::Parse(e)) => {
                // The page came back but was not recognizable; skip it and
                // keep going.
                summary.pages_fetched += 1;
                summary.parse_failed += 1;
                warn!(%source, page, error = %e, "page failed to parse, skipping");
            }
            Err(PageError::Fetch(e)) => {
                if page == 1 && records.is_empty() {
                    return Err(ScrapeError::FatalSource {
                        source,
                        reason: e.to_string(),
                    });
                }
                summary.fetch_failed += 1;
                if e.should_stop_run() {
                    warn!(%source, page, error = %e, "skipping remaining pages of this run");
                    break;
                }
                warn!(%source, page, error = %e, "page fetch exhausted retries, treating as empty");
            }
        }
    }

    summary.duration = started.elapsed();
    info!(
        %source,
        pages = summary.pages_fetched,
        ok = summary.parsed_ok,
        failed = summary.parse_failed,
        "scrape run finished"
    );
    Ok(ScrapeOutcome { records, summary })
}

/// Drive several independent adapters concurrently, one task per adapter.
///
/// Each task gets its own fetcher so request pacing stays per-source.
/// Results come back in the order the adapters were given.
pub async fn run_many(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fetch_config: FetchConfig,
    user_agent: &str,
    query: &str,
    location: &str,
    max_pages: u32,
    cancel: &CancelToken,
) -> Vec<Result<ScrapeOutcome, ScrapeError>> {
    let mut handles = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        let fetcher = Fetcher::new(fetch_config.clone(), user_agent);
        let query = query.to_string();
        let location = location.to_string();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            run(adapter.as_ref(), &fetcher, &query, &location, max_pages, &cancel).await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => Err(ScrapeError::TaskFailed(e.to_string())),
        });
    }
    results
}
