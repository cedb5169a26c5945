//! Result sinks.
//!
//! A finished [`CrawlReport`] is persisted in the formats listed in the
//! configuration's `output_formats`:
//!
//! - [`json`]: `news_results_<ts>.json` plus a `run_summary_<ts>.json`
//! - [`csv`]: `news_results_<ts>.csv`, one row per matched article
//!
//! ```text
//! output_dir/
//! ├── news_results_20250904_153012.json
//! ├── news_results_20250904_153012.csv
//! └── run_summary_20250904_153012.json
//! ```

pub mod csv;
pub mod json;

use crate::config::{CrawlerConfig, OutputFormat};
use crate::error::Result;
use crate::models::CrawlReport;
use crate::utils::file_timestamp;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Write every configured format for a finished run.
///
/// All files of one run share a single timestamp.
///
/// # Arguments
///
/// * `report` - Results, statistics, and site summaries from the crawler
/// * `output_dir` - Destination directory; created if missing
/// * `config` - Supplies `output_formats`
///
/// # Returns
///
/// The paths written, in write order. Empty when the report holds no
/// matches, in which case nothing is written at all.
///
/// # Errors
///
/// The first serialization or I/O error from any writer.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_report(
    report: &CrawlReport,
    output_dir: &Path,
    config: &CrawlerConfig,
) -> Result<Vec<PathBuf>> {
    if report.results.is_empty() {
        warn!("No matching articles; no result files written");
        return Ok(Vec::new());
    }

    let stamp = file_timestamp();
    let mut written = Vec::new();
    if config.writes(OutputFormat::Json) {
        written.push(json::write_results(&report.results, output_dir, &stamp).await?);
        written.push(json::write_summary(report, output_dir, &stamp).await?);
    }
    if config.writes(OutputFormat::Csv) {
        written.push(self::csv::write_results(&report.results, output_dir, &stamp).await?);
    }
    info!(files = written.len(), "Results saved");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleResult, RunStatistics};

    fn report(results: Vec<ArticleResult>) -> CrawlReport {
        CrawlReport {
            statistics: RunStatistics::new().snapshot(results.len()),
            results,
            sites: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_report_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_report(&report(vec![]), dir.path(), &CrawlerConfig::default())
            .await
            .unwrap();
        assert!(written.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_formats_follow_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = ArticleResult::new("https://site.com/news/a");
        result.matched_companies.insert("Tesla".into());
        let report = report(vec![result]);

        let both = write_report(&report, dir.path(), &CrawlerConfig::default())
            .await
            .unwrap();
        assert_eq!(both.len(), 3);

        let config = CrawlerConfig {
            output_formats: vec![OutputFormat::Csv],
            ..CrawlerConfig::default()
        };
        let csv_only = write_report(&report, dir.path(), &config).await.unwrap();
        assert_eq!(csv_only.len(), 1);
        assert!(csv_only[0].extension().is_some_and(|e| e == "csv"));
    }
}
