//! URL discovery for a single news site.
//!
//! Three independent strategies find candidate article URLs:
//!
//! | Strategy | Module | Source |
//! |----------|--------|--------|
//! | [`SearchMethod::Feed`] | [`feed`] | RSS/Atom feeds, advertised or at conventional paths |
//! | [`SearchMethod::Sitemap`] | [`sitemap`] | `sitemap.xml` and friends, filtered to editorial paths |
//! | [`SearchMethod::Crawl`] | [`links`] | article-looking anchors on the homepage |
//!
//! Each strategy is fault-tolerant on its own: a failure is logged and
//! contributes zero URLs. Results are unioned in strategy order with exact
//! string deduplication, then cut to `max_articles_per_site`.

pub mod feed;
pub mod links;
pub mod sitemap;
pub mod xml;

use crate::config::{CrawlerConfig, SearchMethod};
use crate::error::{CrawlError, Result};
use crate::http::HttpClient;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

/// URLs found for one site, with the raw count each strategy produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryOutcome {
    pub urls: Vec<String>,
    pub per_strategy: BTreeMap<SearchMethod, usize>,
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| CrawlError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|source| CrawlError::InvalidUrl {
        url: format!("{base}{path}"),
        source,
    })
}

/// Resolve `href` against `base`, keeping only http(s) targets and
/// dropping any fragment.
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let mut url = base.join(href.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Runs the configured strategies against a site.
#[derive(Debug, Clone)]
pub struct DiscoveryEngine {
    http: HttpClient,
    config: Arc<CrawlerConfig>,
}

impl DiscoveryEngine {
    pub fn new(http: HttpClient, config: Arc<CrawlerConfig>) -> Self {
        Self { http, config }
    }

    async fn run_strategy(&self, method: SearchMethod, base: &Url) -> Result<Vec<String>> {
        match method {
            SearchMethod::Feed => feed::discover(&self.http, base, &self.config).await,
            SearchMethod::Sitemap => sitemap::discover(&self.http, base, &self.config).await,
            SearchMethod::Crawl => links::discover(&self.http, base, &self.config).await,
        }
    }

    /// Discover candidate article URLs for `site`.
    ///
    /// Each configured strategy runs once, in configuration order. A failing
    /// strategy is logged and counted as zero. The per-strategy lists are
    /// concatenated, exact duplicates dropped (first occurrence wins), and
    /// the result cut to `max_articles_per_site`.
    ///
    /// # Arguments
    ///
    /// * `site` - Absolute site base URL
    ///
    /// # Returns
    ///
    /// A [`DiscoveryOutcome`] with the combined URLs and the raw count each
    /// strategy produced. Never fails; an unparsable site URL yields an
    /// empty outcome.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = DiscoveryEngine::new(http, Arc::clone(&config));
    /// let outcome = engine.discover("https://site.com").await;
    /// info!(found = outcome.urls.len(), "Discovered");
    /// ```
    #[instrument(level = "info", skip_all, fields(%site))]
    pub async fn discover(&self, site: &str) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();
        let base = match parse_url(site) {
            Ok(base) => base,
            Err(e) => {
                warn!(error = %e, "Skipping site with invalid URL");
                return outcome;
            }
        };

        let mut found_all = Vec::new();
        for &method in &self.config.search_methods {
            if outcome.per_strategy.contains_key(&method) {
                continue;
            }
            let found = match self.run_strategy(method, &base).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(strategy = %method, error = %e, "Discovery strategy failed");
                    Vec::new()
                }
            };
            info!(strategy = %method, count = found.len(), "Strategy finished");
            outcome.per_strategy.insert(method, found.len());
            found_all.extend(found);
        }

        outcome.urls = found_all
            .into_iter()
            .unique()
            .take(self.config.max_articles_per_site)
            .collect();
        info!(
            total = outcome.urls.len(),
            per_strategy = ?outcome.per_strategy,
            "Discovery complete"
        );
        outcome
    }
}
