//! Crawl orchestration.
//!
//! A run moves through [`RunPhase`]s: sites are discovered one after the
//! other, then every discovered URL is pushed through a bounded pool of
//! tokio tasks that extract and match it.
//!
//! # Shared state
//!
//! The visited set, the statistics, and the retained results live behind a
//! single `parking_lot` mutex. A URL is claimed (check-and-insert plus
//! `processed += 1`) under that lock before any network work, so duplicate
//! entries from several strategies or sites are dispatched at most once. The
//! lock is never held across an `.await`.
//!
//! # Failure isolation
//!
//! Extraction errors are recorded on the result and counted. A task that
//! panics is caught at the join boundary, counted as an error, and logged;
//! the rest of the batch carries on.

use crate::config::CrawlerConfig;
use crate::discovery::DiscoveryEngine;
use crate::error::{CrawlError, Result};
use crate::extract::ContentExtractor;
use crate::http::HttpClient;
use crate::matching::{Matcher, describe_match};
use crate::models::{ArticleResult, CrawlReport, RunStatistics, SiteSummary, StatsSnapshot};
use crate::utils::truncate_for_log;
use futures::future;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const PROGRESS_EVERY: usize = 10;
const SUMMARY_EVERY: usize = 25;

/// Where a [`Crawler`] is in its run.
///
/// Phases only move forward: `Idle` → `Discovering` → `Extracting` →
/// `Reporting` → `Done`. `Extracting` is skipped when discovery finds no URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Discovering,
    Extracting,
    Reporting,
    Done,
}

#[derive(Debug, Default)]
struct SharedState {
    visited: HashSet<String>,
    stats: RunStatistics,
    results: Vec<ArticleResult>,
}

/// Drives discovery, extraction, and matching for one run.
#[derive(Debug)]
pub struct Crawler {
    config: Arc<CrawlerConfig>,
    discovery: DiscoveryEngine,
    extractor: ContentExtractor,
    matcher: Matcher,
    state: Mutex<SharedState>,
    phase: Mutex<RunPhase>,
}

impl Crawler {
    /// Build a crawler around a shared configuration, HTTP client, and
    /// prepared [`Matcher`].
    ///
    /// The discovery engine and content extractor share the one `http`
    /// client, so connection pooling and retry policy are common to both.
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration; workers, pacing, and caps are read from it
    /// * `http` - Client used for discovery and article fetches
    /// * `matcher` - Company aliases and keywords to match against
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Setup`] when the matcher holds no companies.
    /// An empty keyword list is accepted and only logged.
    pub fn new(config: Arc<CrawlerConfig>, http: HttpClient, matcher: Matcher) -> Result<Self> {
        if matcher.company_count() == 0 {
            return Err(CrawlError::Setup("no companies to match".into()));
        }
        if matcher.keyword_count() == 0 {
            info!("No keywords configured; matching companies only");
        }
        Ok(Self {
            discovery: DiscoveryEngine::new(http.clone(), Arc::clone(&config)),
            extractor: ContentExtractor::new(http, config.content_min_length),
            matcher,
            config,
            state: Mutex::new(SharedState::default()),
            phase: Mutex::new(RunPhase::Idle),
        })
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.lock()
    }

    fn set_phase(&self, phase: RunPhase) {
        *self.phase.lock() = phase;
        debug!(?phase, "Run phase changed");
    }

    /// Current counters. May trail in-flight workers slightly, so use the
    /// snapshot for display, not for control decisions.
    pub fn statistics(&self) -> StatsSnapshot {
        let state = self.state.lock();
        state.stats.snapshot(state.results.len())
    }

    /// Process one URL: claim it, pace, extract, match, and record.
    ///
    /// The URL is claimed under the shared lock before any network work, and
    /// `processed` is bumped at that point. The worker then sleeps for
    /// `request_delay`, fetches and extracts the page, and runs the matcher.
    /// Statistics are recorded for every claimed URL; the result is retained
    /// only when at least one company matched.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute article URL, as produced by discovery
    ///
    /// # Returns
    ///
    /// `Some(result)` for a retained match, or `None` when the URL was
    /// already claimed, extraction failed, or no company matched.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let crawler = Arc::new(Crawler::new(config, http, matcher)?);
    /// if let Some(hit) = crawler.process_url("https://site.com/news/a".into()).await {
    ///     println!("{}", describe_match(&hit));
    /// }
    /// ```
    pub async fn process_url(&self, url: String) -> Option<ArticleResult> {
        {
            let mut state = self.state.lock();
            if !state.visited.insert(url.clone()) {
                debug!(%url, "Already dispatched; skipping");
                return None;
            }
            state.stats.processed += 1;
        }
        if self.config.log_urls {
            debug!(%url, "Processing URL");
        }

        sleep(self.config.request_delay()).await;
        let extracted = self.extractor.extract(&url).await;
        let result = self.matcher.analyze(extracted);

        let mut state = self.state.lock();
        state.stats.record(&result);
        if !result.has_companies() {
            return None;
        }

        info!(
            %url,
            title = %truncate_for_log(&result.title, 120),
            companies = result.matched_companies.len(),
            keywords = result.matched_keywords.len(),
            "Match found"
        );
        if self.config.log_url_details {
            debug!(%url, "{}", describe_match(&result));
        }
        state.results.push(result.clone());
        Some(result)
    }

    fn log_progress(&self, done: usize, total: usize) {
        let stats = self.statistics();
        let rate = stats.rate();
        let remaining = total.saturating_sub(done);
        let eta_secs = if rate > 0.0 {
            (remaining as f64 / rate).round() as u64
        } else {
            0
        };

        if done % PROGRESS_EVERY == 0 {
            info!(
                done,
                total,
                percent = format!("{:.1}", done as f64 * 100.0 / total.max(1) as f64),
                rate = format!("{rate:.2}/s"),
                eta_secs,
                with_companies = stats.with_companies,
                with_keywords = stats.with_keywords,
                with_both = stats.with_both,
                saved = stats.matches_saved,
                "Progress"
            );
        }
        if done % SUMMARY_EVERY == 0 {
            info!(
                processed = stats.processed,
                errors = stats.errors,
                with_companies = stats.with_companies,
                with_keywords = stats.with_keywords,
                with_both = stats.with_both,
                saved = stats.matches_saved,
                "Periodic summary"
            );
        }
    }

    /// Run discovery over `sites`, then extract and match everything found.
    ///
    /// Sites are discovered one after the other. The combined URL list is
    /// then fed through [`process_url`](Self::process_url) on spawned tasks,
    /// at most `max_workers` at a time. Progress is logged every
    /// 10 URLs and a statistics summary every 25.
    ///
    /// # Arguments
    ///
    /// * `sites` - Normalized site base URLs, in input order
    ///
    /// # Returns
    ///
    /// A [`CrawlReport`] with the retained results, the final statistics
    /// snapshot, and one [`SiteSummary`] per input site.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Setup`] when `sites` is empty. Per-site and
    /// per-URL failures are logged and counted, never returned.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let crawler = Arc::new(Crawler::new(config, http, matcher)?);
    /// let report = Arc::clone(&crawler).run(&sites).await?;
    /// info!(matches = report.results.len(), "Done");
    /// ```
    #[instrument(level = "info", skip_all, fields(sites = sites.len()))]
    pub async fn run(self: Arc<Self>, sites: &[String]) -> Result<CrawlReport> {
        if sites.is_empty() {
            return Err(CrawlError::Setup("no websites to crawl".into()));
        }

        self.set_phase(RunPhase::Discovering);
        let mut urls = Vec::new();
        let mut summaries = Vec::with_capacity(sites.len());
        for site in sites {
            let outcome = self.discovery.discover(site).await;
            info!(%site, found = outcome.urls.len(), "Site discovered");
            if self.config.log_urls {
                for url in &outcome.urls {
                    debug!(%site, %url, "Discovered URL");
                }
            }
            summaries.push(SiteSummary {
                site: site.clone(),
                urls_found: outcome.urls.len(),
                per_strategy: outcome
                    .per_strategy
                    .iter()
                    .map(|(method, count)| (method.to_string(), *count))
                    .collect(),
            });
            urls.extend(outcome.urls);
        }

        let total = urls.len();
        if total == 0 {
            warn!("No article URLs discovered; nothing to extract");
        } else {
            self.set_phase(RunPhase::Extracting);
            info!(total, workers = self.config.max_workers, "Extracting articles");

            let mut done = 0usize;
            stream::iter(urls)
                .map(|url| {
                    let crawler = Arc::clone(&self);
                    tokio::spawn(async move { crawler.process_url(url).await })
                })
                .buffer_unordered(self.config.max_workers.max(1))
                .for_each(|joined| {
                    done += 1;
                    if let Err(e) = joined {
                        error!(error = %e, "Worker task failed");
                        self.state.lock().stats.errors += 1;
                    }
                    self.log_progress(done, total);
                    future::ready(())
                })
                .await;
        }

        self.set_phase(RunPhase::Reporting);
        let (results, statistics) = {
            let mut state = self.state.lock();
            let results = std::mem::take(&mut state.results);
            let statistics = state.stats.snapshot(results.len());
            (results, statistics)
        };
        info!(
            processed = statistics.processed,
            matches = results.len(),
            errors = statistics.errors,
            "Crawl finished"
        );
        self.set_phase(RunPhase::Done);

        Ok(CrawlReport {
            results,
            statistics,
            sites: summaries,
        })
    }
}
