//! Sitemap strategy.
//!
//! Conventional sitemap locations are fetched in turn. A `<urlset>`
//! contributes its `<loc>` entries directly; a `<sitemapindex>` has its
//! first few child sitemaps fetched as well. Only locations whose path
//! looks like editorial content are kept.

use super::xml::{Node, walk};
use super::{join, resolve_link};
use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::http::HttpClient;
use tracing::{debug, info, instrument};
use url::Url;

const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/news-sitemap.xml"];

/// Child sitemaps followed per index document.
const MAX_CHILD_SITEMAPS: usize = 5;

const NEWS_INDICATORS: &[&str] = &["news", "article", "post"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sitemap {
    /// `<urlset>`: page locations.
    Urls(Vec<String>),
    /// `<sitemapindex>`: locations of further sitemaps.
    Index(Vec<String>),
}

/// Parse a sitemap or sitemap index document.
///
/// # Returns
///
/// [`Sitemap::Index`] when the root element is `<sitemapindex>`, otherwise
/// [`Sitemap::Urls`] with every trimmed, non-empty `<loc>`.
///
/// # Errors
///
/// Returns [`CrawlError::Xml`](crate::error::CrawlError::Xml) for malformed
/// markup, naming `source` in the message.
pub fn parse_sitemap(xml: &str, source: &str) -> Result<Sitemap> {
    let mut is_index = false;
    let mut root_seen = false;
    let mut in_loc = false;
    let mut buffer = String::new();
    let mut locs = Vec::new();

    walk(xml, source, |node| match node {
        Node::Open { name, .. } => {
            if !root_seen {
                root_seen = true;
                is_index = name == "sitemapindex";
            }
            if name == "loc" {
                in_loc = true;
                buffer.clear();
            }
        }
        Node::Text(text) => {
            if in_loc {
                buffer.push_str(&text);
            }
        }
        Node::Close { name } => {
            if name == "loc" && in_loc {
                in_loc = false;
                let loc = buffer.trim();
                if !loc.is_empty() {
                    locs.push(loc.to_string());
                }
            }
        }
    })?;

    Ok(if is_index {
        Sitemap::Index(locs)
    } else {
        Sitemap::Urls(locs)
    })
}

/// Whether the URL path carries a news/article/post marker.
///
/// Only the path is inspected, so `https://news.example.com/about-us` does
/// not qualify while `https://example.com/news/2025/09/04/story` does.
pub fn has_news_indicator(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    NEWS_INDICATORS.iter().any(|marker| path.contains(marker))
}

async fn fetch_sitemap(http: &HttpClient, url: &str) -> Option<Sitemap> {
    let xml = match http.get_text(url).await {
        Ok(xml) => xml,
        Err(e) => {
            debug!(sitemap = %url, error = %e, "Sitemap not available");
            return None;
        }
    };
    match parse_sitemap(&xml, url) {
        Ok(sitemap) => Some(sitemap),
        Err(e) => {
            debug!(sitemap = %url, error = %e, "Sitemap did not parse");
            None
        }
    }
}

/// Run the sitemap strategy for one site.
///
/// The conventional sitemap paths are fetched in order. A `<urlset>`
/// contributes its `<loc>` entries directly; a `<sitemapindex>` has its
/// first five children fetched (nested indexes are ignored). Only URLs
/// passing [`has_news_indicator`] are kept, and fetching stops as soon as
/// the per-site cap is reached.
///
/// # Arguments
///
/// * `http` - Shared client
/// * `base` - Site base URL
/// * `config` - Supplies `max_articles_per_site` and the URL logging flags
///
/// # Returns
///
/// Deduplicated article URLs in sitemap order. Missing or malformed
/// sitemaps contribute nothing.
///
/// # Errors
///
/// Only URL construction failures.
#[instrument(level = "info", skip_all, fields(site = %base))]
pub async fn discover(http: &HttpClient, base: &Url, config: &CrawlerConfig) -> Result<Vec<String>> {
    let cap = config.max_articles_per_site;
    let mut urls: Vec<String> = Vec::new();

    'paths: for path in SITEMAP_PATHS {
        if urls.len() >= cap {
            break;
        }
        let sitemap_url = join(base, path)?.to_string();
        let pages = match fetch_sitemap(http, &sitemap_url).await {
            None => continue,
            Some(Sitemap::Urls(locs)) => locs,
            Some(Sitemap::Index(children)) => {
                info!(sitemap = %sitemap_url, children = children.len(), "Sitemap index found");
                let mut pages = Vec::new();
                for child in children.iter().take(MAX_CHILD_SITEMAPS) {
                    match fetch_sitemap(http, child).await {
                        Some(Sitemap::Urls(locs)) => pages.extend(locs),
                        Some(Sitemap::Index(_)) => {
                            debug!(sitemap = %child, "Nested sitemap index ignored")
                        }
                        None => {}
                    }
                }
                pages
            }
        };

        for loc in pages {
            if urls.len() >= cap {
                break 'paths;
            }
            let Some(url) = resolve_link(base, &loc) else {
                continue;
            };
            if !has_news_indicator(&url) {
                continue;
            }
            let url = url.to_string();
            if urls.contains(&url) {
                continue;
            }
            if config.log_urls || config.log_url_details {
                debug!(%url, sitemap = %sitemap_url, "Sitemap entry");
            }
            urls.push(url);
        }
    }

    Ok(urls)
}
