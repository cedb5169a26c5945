//! CSV output: one row per matched article.

use crate::error::{CrawlError, Result};
use crate::models::ArticleResult;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const HEADER: [&str; 7] = ["URL", "Title", "Companies", "Keywords", "Date", "Timestamp", "Error"];

fn joined(set: &BTreeSet<String>) -> String {
    set.iter().join("; ")
}

/// Encode `results` as CSV: a header row, then one row per article.
fn encode(results: &[ArticleResult]) -> Result<Vec<u8>> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for result in results {
        writer.write_record([
            result.url.as_str(),
            result.title.as_str(),
            joined(&result.matched_companies).as_str(),
            joined(&result.matched_keywords).as_str(),
            result.published_date.as_deref().unwrap_or(""),
            result.timestamp.to_rfc3339().as_str(),
            result.error.as_deref().unwrap_or(""),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| CrawlError::Io(e.into_error()))
}

/// Write `news_results_<stamp>.csv`.
///
/// Columns are `URL, Title, Companies, Keywords, Date, Timestamp, Error`;
/// company and keyword sets are joined with `"; "`.
///
/// # Arguments
///
/// * `results` - Matched articles to write
/// * `output_dir` - Directory for the file; created if missing
/// * `stamp` - Run timestamp used in the file name
///
/// # Returns
///
/// The path of the written file.
///
/// # Errors
///
/// A CSV encoding error, or an I/O error creating the directory or writing
/// the file.
#[instrument(level = "info", skip_all, fields(count = results.len()))]
pub async fn write_results(results: &[ArticleResult], output_dir: &Path, stamp: &str) -> Result<PathBuf> {
    let bytes = encode(results)?;

    fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(format!("news_results_{stamp}.csv"));
    fs::write(&path, bytes).await?;

    info!(path = %path.display(), "Wrote CSV results");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_results_encode_header_only() {
        let bytes = encode(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "URL,Title,Companies,Keywords,Date,Timestamp,Error\n"
        );
    }

    #[tokio::test]
    async fn test_rows_and_joined_lists() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = ArticleResult::new("https://site.com/news/a");
        result.title = "Apple, Google, and \"AI\"".into();
        result.published_date = Some("2025-09-04".into());
        result.matched_companies.extend(["Apple".to_string(), "Alphabet (Google)".to_string()]);
        result.matched_keywords.insert("ai".into());

        let path = write_results(&[result], dir.path(), "stamp").await.unwrap();
        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap(), HEADER.as_slice());

        let rows: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "https://site.com/news/a");
        assert_eq!(&rows[0][1], "Apple, Google, and \"AI\"");
        assert_eq!(&rows[0][2], "Alphabet (Google); Apple");
        assert_eq!(&rows[0][3], "ai");
        assert_eq!(&rows[0][4], "2025-09-04");
        assert_eq!(&rows[0][6], "");
    }
}
