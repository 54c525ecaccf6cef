//! Pagination driver.
//!
//! A run resumes from the dataset, fetches pages by offset (0, 10, 20, ...),
//! parses them, merges the new records and persists. It ends when a page
//! has no results container, when the container is empty, or when the page
//! budget is spent. A page that fails to fetch counts as zero new records.
//!
//! Two modes:
//!
//! - [`run_bounded`]: a fixed set of pages scraped concurrently against one
//!   identity snapshot, reconciled and persisted once at the end.
//! - [`run_sequential`]: one page at a time, persisted after each page, with
//!   the identity set growing as it goes.

use crate::config::RunConfig;
use crate::detail;
use crate::error::{Result, ScrapeError};
use crate::fetch::Fetcher;
use crate::parser::{parse_page, PageOutcome};
use crate::store::{reconcile, DatasetStore, PAGE_STEP};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Query parameter carrying the result offset
const START_PARAM: &str = "start";

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back without a results container
    NoContainer,
    /// A page's results container was empty
    NoResults,
    /// All requested pages were scraped
    PageBudget,
    /// Sequential mode hit too many failed pages in a row
    TooManyFailures,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub start_offset: u32,
    pub pages_attempted: u32,
    pub pages_failed: u32,
    pub records_added: usize,
    pub stop: StopReason,
}

/// 1-based page number for a result offset.
pub fn page_index(offset: u32) -> u32 {
    offset / PAGE_STEP + 1
}

/// The `start` offset written in a search URL, or 0.
pub fn url_start_offset(base_url: &str) -> u32 {
    Url::parse(base_url)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == START_PARAM)
                .and_then(|(_, value)| value.parse().ok())
        })
        .unwrap_or(0)
}

/// `base_url` with its `start` parameter set to `offset`, appended if absent.
pub fn page_url(base_url: &str, offset: u32) -> Result<String> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ScrapeError::Config(format!("Invalid target URL '{}': {}", base_url, e)))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let offset = offset.to_string();
    let mut replaced = false;
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &pairs {
            if key == START_PARAM {
                query.append_pair(START_PARAM, &offset);
                replaced = true;
            } else {
                query.append_pair(key, value);
            }
        }
        if !replaced {
            query.append_pair(START_PARAM, &offset);
        }
    }

    Ok(url.to_string())
}

/// Fetch, parse and (optionally) enrich one page.
async fn scrape_page(
    fetcher: &dyn Fetcher,
    config: &RunConfig,
    offset: u32,
    known: &HashSet<String>,
) -> Result<PageOutcome> {
    let page = page_index(offset);
    let url = page_url(&config.target_url, offset)?;

    let delay = config.politeness_delay();
    debug!(page = page, delay_ms = delay.as_millis() as u64, "Waiting before fetch");
    tokio::time::sleep(delay).await;

    info!(page = page, url = %url, "Scraping page");
    let html = fetcher.fetch(&url).await?;
    let outcome = parse_page(&html, page, known);

    match outcome {
        PageOutcome::Results { fragments, records } if config.detail_enrichment_enabled => {
            let mut enriched = Vec::with_capacity(records.len());
            for record in records {
                enriched.push(detail::enrich(fetcher, record).await);
            }
            Ok(PageOutcome::Results {
                fragments,
                records: enriched,
            })
        }
        other => Ok(other),
    }
}

fn log_page_failure(offset: u32, err: &ScrapeError) {
    if err.is_transient() {
        warn!(page = page_index(offset), error = %err, "Page failed, continuing");
    } else {
        error!(page = page_index(offset), error = %err, "Page failed, continuing");
    }
}

fn terminal_reason(outcome: &PageOutcome) -> Option<StopReason> {
    match outcome {
        PageOutcome::NoContainer => Some(StopReason::NoContainer),
        PageOutcome::NoResults => Some(StopReason::NoResults),
        PageOutcome::Results { .. } => None,
    }
}

/// Scrape `config.page_count` pages concurrently, then merge and persist once.
///
/// Every page is checked against the identities known before dispatch, so
/// the combined output is reconciled before it reaches the store.
pub async fn run_bounded(
    fetcher: &dyn Fetcher,
    store: &mut DatasetStore,
    config: &RunConfig,
) -> Result<RunSummary> {
    config.validate()?;

    let start_offset = store.resume_offset(url_start_offset(&config.target_url))?;
    let last_offset = (config.page_count - 1)
        .checked_mul(PAGE_STEP)
        .and_then(|span| start_offset.checked_add(span))
        .ok_or_else(|| {
            ScrapeError::Config(format!(
                "{} pages from offset {} exceed the addressable range",
                config.page_count, start_offset
            ))
        })?;
    let offsets: Vec<u32> = (start_offset..=last_offset)
        .step_by(PAGE_STEP as usize)
        .collect();
    let snapshot = store.seen_identities().clone();

    info!(
        first_page = page_index(start_offset),
        pages = config.page_count,
        concurrency = config.concurrency,
        known = snapshot.len(),
        "Starting bounded run"
    );

    let reports: Vec<(u32, Result<PageOutcome>)> = stream::iter(offsets)
        .map(|offset| {
            let known = &snapshot;
            async move { (offset, scrape_page(fetcher, config, offset, known).await) }
        })
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let mut batch = Vec::new();
    let mut pages_failed = 0;
    let mut first_terminal: Option<(u32, StopReason)> = None;

    // Completion order
    for (offset, report) in reports {
        match report {
            Ok(outcome) => {
                if let Some(reason) = terminal_reason(&outcome) {
                    if first_terminal.map_or(true, |(seen, _)| offset < seen) {
                        first_terminal = Some((offset, reason));
                    }
                }
                batch.extend(outcome.into_records());
            }
            Err(e) => {
                pages_failed += 1;
                log_page_failure(offset, &e);
            }
        }
    }

    let batch = reconcile(batch, &snapshot);
    let records_added = batch.len();
    if records_added > 0 {
        store.merge(batch);
        store.persist()?;
        info!(added = records_added, path = ?store.path(), "Saved new results");
    }

    let stop = first_terminal
        .map(|(_, reason)| reason)
        .unwrap_or(StopReason::PageBudget);

    Ok(RunSummary {
        start_offset,
        pages_attempted: config.page_count,
        pages_failed,
        records_added,
        stop,
    })
}

/// Scrape page after page until the results run out, persisting after each.
pub async fn run_sequential(
    fetcher: &dyn Fetcher,
    store: &mut DatasetStore,
    config: &RunConfig,
) -> Result<RunSummary> {
    config.validate()?;

    let start_offset = store.resume_offset(url_start_offset(&config.target_url))?;
    info!(
        first_page = page_index(start_offset),
        max_pages = ?config.max_pages,
        known = store.seen_identities().len(),
        "Starting sequential run"
    );

    let mut offset = start_offset;
    let mut pages_attempted = 0;
    let mut pages_failed = 0;
    let mut consecutive_failures = 0;
    let mut records_added = 0;

    let stop = loop {
        if config.max_pages.is_some_and(|max| pages_attempted >= max) {
            break StopReason::PageBudget;
        }
        pages_attempted += 1;

        let result = scrape_page(fetcher, config, offset, store.seen_identities()).await;
        match result {
            Ok(outcome) => {
                if let Some(reason) = terminal_reason(&outcome) {
                    info!(page = page_index(offset), reason = ?reason, "End of results");
                    break reason;
                }
                consecutive_failures = 0;

                let records = outcome.into_records();
                if !records.is_empty() {
                    let count = records.len();
                    store.merge(records);
                    store.persist()?;
                    records_added += count;
                    info!(page = page_index(offset), added = count, "Saved new results");
                }
            }
            Err(e) => {
                pages_failed += 1;
                consecutive_failures += 1;
                log_page_failure(offset, &e);
                if consecutive_failures >= config.max_consecutive_failures {
                    warn!(failures = consecutive_failures, "Giving up after repeated failures");
                    break StopReason::TooManyFailures;
                }
            }
        }

        offset = match offset.checked_add(PAGE_STEP) {
            Some(next) => next,
            None => {
                warn!(offset = offset, "No addressable page after this offset");
                break StopReason::PageBudget;
            }
        };
    };

    Ok(RunSummary {
        start_offset,
        pages_attempted,
        pages_failed,
        records_added,
        stop,
    })
}
