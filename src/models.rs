//! Data models for crawled articles and run statistics.
//!
//! - [`ArticleResult`]: one extracted (and later matched) article
//! - [`RunStatistics`]: counters mutated by the workers during a run
//! - [`StatsSnapshot`]: a point-in-time, serializable copy of the counters
//! - [`CrawlReport`]: everything a result sink needs once the run is over

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Extraction and matching outcome for a single URL.
///
/// The extractor fills `url` through `published_date` (or `error`); the
/// matching engine fills the `matched_*` sets. Only results with at least
/// one matched company are kept by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleResult {
    pub url: String,
    pub title: String,
    pub body: String,
    /// Page metadata, e.g. `<meta>` name/content pairs.
    pub metadata: BTreeMap<String, String>,
    pub published_date: Option<String>,
    /// Canonical company names whose aliases were found.
    pub matched_companies: BTreeSet<String>,
    pub matched_keywords: BTreeSet<String>,
    /// The alias strings that actually hit, for reporting.
    pub matched_aliases: BTreeSet<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ArticleResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            body: String::new(),
            metadata: BTreeMap::new(),
            published_date: None,
            matched_companies: BTreeSet::new(),
            matched_keywords: BTreeSet::new(),
            matched_aliases: BTreeSet::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(url: impl Into<String>, error: impl ToString) -> Self {
        let mut result = Self::new(url);
        result.error = Some(error.to_string());
        result
    }

    pub fn has_companies(&self) -> bool {
        !self.matched_companies.is_empty()
    }

    pub fn has_keywords(&self) -> bool {
        !self.matched_keywords.is_empty()
    }
}

/// Running counters for one crawl.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub processed: u64,
    pub with_companies: u64,
    pub with_keywords: u64,
    pub with_both: u64,
    pub errors: u64,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            processed: 0,
            with_companies: 0,
            with_keywords: 0,
            with_both: 0,
            errors: 0,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Fold one finished result into the counters.
    pub fn record(&mut self, result: &ArticleResult) {
        let companies = result.has_companies();
        let keywords = result.has_keywords();
        if companies {
            self.with_companies += 1;
        }
        if keywords {
            self.with_keywords += 1;
        }
        if companies && keywords {
            self.with_both += 1;
        }
        if result.error.is_some() {
            self.errors += 1;
        }
    }

    pub fn snapshot(&self, matches_saved: usize) -> StatsSnapshot {
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        StatsSnapshot {
            processed: self.processed,
            with_companies: self.with_companies,
            with_keywords: self.with_keywords,
            with_both: self.with_both,
            errors: self.errors,
            matches_saved,
            started_at: self.started_at,
            elapsed_secs,
        }
    }
}

/// Serializable copy of [`RunStatistics`] taken at one instant.
///
/// Good enough for display; values may lag slightly behind in-flight workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub with_companies: u64,
    pub with_keywords: u64,
    pub with_both: u64,
    pub errors: u64,
    pub matches_saved: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

impl StatsSnapshot {
    /// Articles per second since the run started.
    pub fn rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.processed as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// `part` as a percentage of processed articles.
    pub fn percent(&self, part: u64) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            part as f64 * 100.0 / self.processed as f64
        }
    }
}

/// Per-site discovery outcome kept for the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub site: String,
    pub urls_found: usize,
    /// URLs each strategy contributed before deduplication.
    pub per_strategy: BTreeMap<String, usize>,
}

/// Final product of a run: the retained matches plus the statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub results: Vec<ArticleResult>,
    pub statistics: StatsSnapshot,
    pub sites: Vec<SiteSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_is_empty() {
        let result = ArticleResult::new("https://example.com/news/a");
        assert_eq!(result.url, "https://example.com/news/a");
        assert!(result.title.is_empty());
        assert!(!result.has_companies());
        assert!(!result.has_keywords());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_record_counts_flags() {
        let mut stats = RunStatistics::new();

        let mut both = ArticleResult::new("https://example.com/1");
        both.matched_companies.insert("Tesla".into());
        both.matched_keywords.insert("recall".into());
        stats.record(&both);

        let mut company_only = ArticleResult::new("https://example.com/2");
        company_only.matched_companies.insert("Tesla".into());
        stats.record(&company_only);

        stats.record(&ArticleResult::failed("https://example.com/3", "timed out"));
        stats.record(&ArticleResult::new("https://example.com/4"));

        assert_eq!(stats.with_companies, 2);
        assert_eq!(stats.with_keywords, 1);
        assert_eq!(stats.with_both, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_snapshot_rates() {
        let mut stats = RunStatistics::new();
        stats.processed = 4;
        stats.with_companies = 1;
        let snapshot = stats.snapshot(1);
        assert_eq!(snapshot.percent(snapshot.with_companies), 25.0);
        assert_eq!(snapshot.matches_saved, 1);

        let empty = RunStatistics::new().snapshot(0);
        assert_eq!(empty.percent(0), 0.0);
    }

    #[test]
    fn test_result_serialization() {
        let mut result = ArticleResult::new("https://example.com/news/a");
        result.title = "Google announces new AI model".into();
        result.matched_companies.insert("Alphabet (Google)".into());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("Alphabet (Google)"));
        let back: ArticleResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
