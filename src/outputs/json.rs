//! JSON output.
//!
//! Results are written as one array per run. Bodies are cut to
//! [`BODY_PREVIEW_CHARS`] characters to keep the files reviewable; the run
//! summary carries the final statistics and per-site discovery counts.

use crate::error::Result;
use crate::models::{ArticleResult, CrawlReport, SiteSummary, StatsSnapshot};
use crate::utils::truncate_chars;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const BODY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    url: &'a str,
    title: &'a str,
    body: String,
    metadata: &'a BTreeMap<String, String>,
    published_date: Option<&'a str>,
    matched_companies: &'a BTreeSet<String>,
    matched_keywords: &'a BTreeSet<String>,
    matched_aliases: &'a BTreeSet<String>,
    error: Option<&'a str>,
    timestamp: DateTime<Utc>,
}

impl<'a> From<&'a ArticleResult> for ResultRecord<'a> {
    fn from(result: &'a ArticleResult) -> Self {
        Self {
            url: &result.url,
            title: &result.title,
            body: truncate_chars(&result.body, BODY_PREVIEW_CHARS, "..."),
            metadata: &result.metadata,
            published_date: result.published_date.as_deref(),
            matched_companies: &result.matched_companies,
            matched_keywords: &result.matched_keywords,
            matched_aliases: &result.matched_aliases,
            error: result.error.as_deref(),
            timestamp: result.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    generated_at: DateTime<Utc>,
    statistics: &'a StatsSnapshot,
    sites: &'a [SiteSummary],
}

/// Write `news_results_<stamp>.json`.
#[instrument(level = "info", skip_all, fields(count = results.len()))]
pub async fn write_results(results: &[ArticleResult], output_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let records: Vec<ResultRecord<'_>> = results.iter().map(ResultRecord::from).collect();
    let json = serde_json::to_string_pretty(&records)?;

    fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(format!("news_results_{stamp}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON results");
    Ok(path)
}

/// Write `run_summary_<stamp>.json`.
#[instrument(level = "info", skip_all)]
pub async fn write_summary(report: &CrawlReport, output_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let summary = RunSummary {
        generated_at: Utc::now(),
        statistics: &report.statistics,
        sites: &report.sites,
    };
    let json = serde_json::to_string_pretty(&summary)?;

    fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(format!("run_summary_{stamp}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote run summary");
    Ok(path)
}
