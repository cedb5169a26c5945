//! Typed crawler configuration.
//!
//! Every option has a documented default, so a configuration file only needs
//! to list the keys it wants to change. Unknown keys are ignored. Files are
//! read with `serde_yaml`, which also accepts plain JSON documents.

use crate::error::{CrawlError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration files looked up in the working directory when none is given.
const DEFAULT_CONFIG_FILES: &[&str] = &["config.yaml", "config.yml", "config.json"];

/// Upper bound for every seconds-valued option (one day).
pub const MAX_SECONDS: f64 = 86_400.0;

pub const DEFAULT_USER_AGENT: &str = "NewsBot/1.0 (+https://example.com/bot)";

/// One of the independent ways of finding candidate article URLs for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// RSS/Atom feeds advertised by or conventionally located on the site.
    #[serde(alias = "rss")]
    Feed,
    Sitemap,
    /// Article-looking links on the homepage.
    Crawl,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Feed => "feed",
            SearchMethod::Sitemap => "sitemap",
            SearchMethod::Crawl => "crawl",
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
}

/// Runtime options for a crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Size of the extraction worker pool.
    pub max_workers: usize,
    /// Pause before each article fetch, in seconds.
    pub request_delay: f64,
    /// Per-request timeout, in seconds.
    pub timeout: f64,
    pub max_retries: u32,
    /// Base delay of the exponential retry backoff, in seconds.
    pub retry_backoff: f64,
    pub user_agent: String,
    pub max_articles_per_site: usize,
    /// Minimum body length (characters) for an extraction to count as content.
    pub content_min_length: usize,
    pub search_methods: Vec<SearchMethod>,
    pub output_formats: Vec<OutputFormat>,
    pub case_sensitive: bool,
    pub log_level: String,
    pub log_urls: bool,
    pub log_url_details: bool,
    pub use_online_company_aliases: bool,
    pub alphavantage_api_key: String,
    pub alias_cache_file: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            request_delay: 1.0,
            timeout: 30.0,
            max_retries: 3,
            retry_backoff: 1.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_articles_per_site: 50,
            content_min_length: 100,
            search_methods: vec![SearchMethod::Feed, SearchMethod::Sitemap, SearchMethod::Crawl],
            output_formats: vec![OutputFormat::Json, OutputFormat::Csv],
            case_sensitive: false,
            log_level: "info".to_string(),
            log_urls: false,
            log_url_details: false,
            use_online_company_aliases: true,
            alphavantage_api_key: "demo".to_string(),
            alias_cache_file: PathBuf::from("output/company_aliases_cache.json"),
        }
    }
}

impl CrawlerConfig {
    /// Parse a YAML (or JSON) document. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| CrawlError::Config(e.to_string()))
    }

    /// Load configuration from `path`, or from the first default file found.
    ///
    /// A missing or unreadable file is not fatal: a warning is logged and the
    /// defaults are used, so a fresh checkout runs without any setup.
    pub fn load(path: Option<&Path>) -> Self {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => DEFAULT_CONFIG_FILES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        let Some(candidate) = candidate else {
            info!("No configuration file found; using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&candidate) {
            Ok(text) => match Self::from_yaml(&text) {
                Ok(config) => {
                    info!(path = %candidate.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "Failed to parse configuration; using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %candidate.display(), error = %e, "Configuration file not readable; using defaults");
                Self::default()
            }
        }
    }

    /// Reject values the crawler cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Config`] naming the first offending option:
    /// a zero worker pool or per-site cap, an empty `search_methods` list,
    /// a seconds value that is negative, non-finite, or above
    /// [`MAX_SECONDS`], or a zero `timeout`.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(CrawlError::Config("max_workers must be at least 1".into()));
        }
        if self.max_articles_per_site == 0 {
            return Err(CrawlError::Config(
                "max_articles_per_site must be at least 1".into(),
            ));
        }
        if self.search_methods.is_empty() {
            return Err(CrawlError::Config("search_methods must not be empty".into()));
        }
        for (name, secs) in [
            ("request_delay", self.request_delay),
            ("timeout", self.timeout),
            ("retry_backoff", self.retry_backoff),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(CrawlError::Config(format!(
                    "{name} must be a non-negative number of seconds"
                )));
            }
            if secs > MAX_SECONDS {
                return Err(CrawlError::Config(format!(
                    "{name} must be at most {MAX_SECONDS} seconds, got {secs}"
                )));
            }
        }
        if self.timeout == 0.0 {
            return Err(CrawlError::Config("timeout must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn writes(&self, format: OutputFormat) -> bool {
        self.output_formats.contains(&format)
    }

    pub fn request_delay(&self) -> Duration {
        seconds(self.request_delay)
    }

    pub fn timeout(&self) -> Duration {
        seconds(self.timeout)
    }

    pub fn retry_backoff(&self) -> Duration {
        seconds(self.retry_backoff)
    }
}

/// Clamp to `0..=MAX_SECONDS`; NaN becomes zero.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.clamp(0.0, MAX_SECONDS)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_workers, 10);
        assert_eq!(config.request_delay(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_articles_per_site, 50);
        assert_eq!(config.content_min_length, 100);
        assert!(config.search_methods.contains(&SearchMethod::Feed));
        assert!(config.search_methods.contains(&SearchMethod::Sitemap));
        assert!(config.search_methods.contains(&SearchMethod::Crawl));
        assert!(!config.case_sensitive);
        assert!(config.use_online_company_aliases);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults_and_ignores_unknown_keys() {
        let yaml = r#"
max_workers: 4
request_delay: 0.25
search_methods: [rss, crawl]
some_future_option: true
"#;
        let config = CrawlerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.request_delay(), Duration::from_millis(250));
        assert_eq!(config.search_methods, vec![SearchMethod::Feed, SearchMethod::Crawl]);
        assert!(!config.search_methods.contains(&SearchMethod::Sitemap));
        assert_eq!(config.timeout, 30.0);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_json_config_is_accepted() {
        let json = r#"{"case_sensitive": true, "output_formats": ["json"], "max_articles_per_site": 5}"#;
        let config = CrawlerConfig::from_yaml(json).unwrap();
        assert!(config.case_sensitive);
        assert!(config.writes(OutputFormat::Json));
        assert!(!config.writes(OutputFormat::Csv));
        assert_eq!(config.max_articles_per_site, 5);
    }

    #[test]
    fn test_unknown_search_method_is_an_error() {
        let err = CrawlerConfig::from_yaml("search_methods: [carrier_pigeon]").unwrap_err();
        assert!(matches!(err, CrawlError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CrawlerConfig::default();
        config.max_workers = 0;
        assert!(config.validate().is_err());

        let mut config = CrawlerConfig::default();
        config.request_delay = -1.0;
        assert!(config.validate().is_err());

        let mut config = CrawlerConfig::default();
        config.search_methods.clear();
        assert!(config.validate().is_err());

        let mut config = CrawlerConfig::default();
        config.timeout = 0.0;
        assert!(config.validate().is_err());

        let mut config = CrawlerConfig::default();
        config.max_articles_per_site = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_seconds_are_rejected_and_never_panic() {
        let config = CrawlerConfig::from_yaml("timeout: 1e20\nrequest_delay: .inf").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CrawlError::Config(ref msg) if msg.contains("request_delay")));

        let config = CrawlerConfig::from_yaml("timeout: 1e20").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CrawlError::Config(ref msg) if msg.contains("timeout")));

        assert_eq!(config.timeout(), Duration::from_secs(86_400));
        assert_eq!(
            CrawlerConfig { request_delay: f64::NAN, ..CrawlerConfig::default() }.request_delay(),
            Duration::ZERO
        );
        assert_eq!(
            CrawlerConfig { retry_backoff: f64::INFINITY, ..CrawlerConfig::default() }.retry_backoff(),
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn test_load_from_file_and_fallbacks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_workers: 2\nlog_urls: true").unwrap();
        let config = CrawlerConfig::load(Some(file.path()));
        assert_eq!(config.max_workers, 2);
        assert!(config.log_urls);

        let missing = CrawlerConfig::load(Some(Path::new("/definitely/not/here.yaml")));
        assert_eq!(missing.max_workers, 10);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        writeln!(broken, "max_workers: [not a number").unwrap();
        let config = CrawlerConfig::load(Some(broken.path()));
        assert_eq!(config.max_workers, 10);
    }
}
