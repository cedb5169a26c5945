//! Utility functions for input loading, string handling, and file system checks.
//!
//! - Reading the website/company/keyword list files
//! - Normalizing site URLs and company entries
//! - String truncation for logging
//! - Elapsed time formatting for the final statistics
//! - File system validation for output directories

use crate::error::{CrawlError, Result};
use chrono::Local;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Read a list file: one entry per line, blank lines and `#` comment lines skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_list_file(path: &Path) -> std::io::Result<Vec<String>> {
    let text = stdfs::read_to_string(path)?;
    let items: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    info!(path = %path.display(), count = items.len(), "Loaded list file");
    Ok(items)
}

/// Like [`load_list_file`], but a missing or empty list is a setup error.
pub fn load_required_list(path: &Path, what: &str) -> Result<Vec<String>> {
    let items = load_list_file(path).map_err(|e| {
        CrawlError::Setup(format!("cannot read {what} list {}: {e}", path.display()))
    })?;
    if items.is_empty() {
        return Err(CrawlError::Setup(format!(
            "{what} list {} has no entries",
            path.display()
        )));
    }
    Ok(items)
}

/// Drop a trailing `# comment` from a company entry.
pub fn strip_inline_comment(entry: &str) -> &str {
    entry.split('#').next().unwrap_or("").trim()
}

/// Give scheme-less site entries an `https://` prefix.
pub fn normalize_site(site: &str) -> String {
    let site = site.trim();
    if site.starts_with("http://") || site.starts_with("https://") {
        site.to_string()
    } else {
        format!("https://{site}")
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped characters appended. Cuts always land on a character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => {
            let dropped = s[cut..].chars().count();
            format!("{}…(+{} chars)", &s[..cut], dropped)
        }
    }
}

/// Keep at most `max` characters, appending `suffix` when something was cut.
pub fn truncate_chars(s: &str, max: usize, suffix: &str) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}{}", &s[..cut], suffix),
    }
}

/// `HH:MM:SS` when the run took an hour or more, `MM:SS` otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Local timestamp used in output file names, e.g. `20250904_153012`.
pub fn file_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::result::Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 chars)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "Zürich–München über Straßen";
        let result = truncate_for_log(s, 2);
        assert!(result.starts_with("Zü…"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3, "..."), "abc...");
        assert_eq!(truncate_chars("abc", 3, "..."), "abc");
    }

    #[test]
    fn test_load_list_file_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# news sites\nhttps://a.example\n\n   https://b.example  \n#https://c.example").unwrap();
        let items = load_list_file(file.path()).unwrap();
        assert_eq!(items, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_load_list_file_missing() {
        assert!(load_list_file(Path::new("/no/such/list.txt")).is_err());
    }

    #[test]
    fn test_load_required_list() {
        let empty = tempfile::NamedTempFile::new().unwrap();
        let err = load_required_list(empty.path(), "websites").unwrap_err();
        assert!(matches!(err, CrawlError::Setup(_)));

        let err = load_required_list(Path::new("/no/such/companies.txt"), "companies").unwrap_err();
        assert!(err.to_string().contains("companies"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Tesla").unwrap();
        assert_eq!(load_required_list(file.path(), "companies").unwrap(), vec!["Tesla"]);
    }

    #[test]
    fn test_strip_inline_comment() {
        assert_eq!(strip_inline_comment("Alphabet (Google) # search"), "Alphabet (Google)");
        assert_eq!(strip_inline_comment("Tesla"), "Tesla");
    }

    #[test]
    fn test_normalize_site() {
        assert_eq!(normalize_site("example.com"), "https://example.com");
        assert_eq!(normalize_site(" http://example.com "), "http://example.com");
        assert_eq!(normalize_site("https://example.com/news"), "https://example.com/news");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "01:02:05");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("output/nested");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
