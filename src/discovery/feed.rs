//! Feed strategy: RSS and Atom entries.
//!
//! Feed endpoints come from two places: `<link>` tags on the homepage that
//! advertise an RSS/Atom type, and HEAD probes of conventional feed paths.
//! Every feed found is parsed and its entry links collected until the
//! per-site cap is reached.

use super::{join, parse_url, resolve_link};
use super::xml::{Node, attr, walk};
use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::http::HttpClient;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

const FEED_PATHS: &[&str] = &["/rss", "/feed", "/rss.xml", "/feed.xml", "/atom.xml"];

static FEED_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"link[type*="rss"], link[type*="atom"]"#).expect("static feed selector")
});

/// One feed item, RSS `<item>` or Atom `<entry>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub link: String,
    pub title: Option<String>,
    pub published: Option<String>,
}

/// Feed URLs advertised by `<link type="application/rss+xml">` or
/// `type="application/atom+xml"` tags, resolved against `base`.
pub fn advertised_feeds(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut feeds = Vec::new();
    for element in document.select(&FEED_LINK) {
        if let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(base, href))
        {
            let url = url.to_string();
            if !feeds.contains(&url) {
                feeds.push(url);
            }
        }
    }
    feeds
}

/// Parse an RSS or Atom document. Entries without a link are skipped.
///
/// Atom entries take the `href` of their first `rel="alternate"` (or
/// rel-less) `<link>`. Dates come from `pubDate`, `published`, or `dc:date`,
/// with `updated` as a last resort.
pub fn parse_feed(xml: &str, source: &str) -> Result<Vec<FeedEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<String> = None;
    let mut buffer = String::new();

    walk(xml, source, |node| match node {
        Node::Open { name, attrs } => {
            let Some(entry) = current.as_mut() else {
                if name == "item" || name == "entry" {
                    current = Some(FeedEntry::default());
                }
                return;
            };
            match name.as_str() {
                "link" => match attr(&attrs, "href") {
                    Some(href) => {
                        let alternate = matches!(attr(&attrs, "rel"), None | Some("alternate"));
                        if alternate && entry.link.is_empty() {
                            entry.link = href.trim().to_string();
                        }
                    }
                    None => {
                        field = Some(name.clone());
                        buffer.clear();
                    }
                },
                "title" | "pubDate" | "published" | "updated" | "date" => {
                    field = Some(name.clone());
                    buffer.clear();
                }
                _ => {}
            }
        }
        Node::Text(text) => {
            if field.is_some() {
                buffer.push_str(&text);
            }
        }
        Node::Close { name } => {
            if name == "item" || name == "entry" {
                if let Some(entry) = current.take() {
                    if !entry.link.is_empty() {
                        entries.push(entry);
                    }
                }
                field = None;
                return;
            }
            if field.as_deref() != Some(name.as_str()) {
                return;
            }
            field = None;
            let value = buffer.trim().to_string();
            buffer.clear();
            let Some(entry) = current.as_mut() else {
                return;
            };
            if value.is_empty() {
                return;
            }
            match name.as_str() {
                "link" if entry.link.is_empty() => entry.link = value,
                "title" if entry.title.is_none() => entry.title = Some(value),
                "pubDate" | "published" | "date" => entry.published = Some(value),
                "updated" if entry.published.is_none() => entry.published = Some(value),
                _ => {}
            }
        }
    })?;

    Ok(entries)
}

/// Run the feed strategy for one site.
///
/// 1. Collect feeds advertised on the homepage. A homepage that cannot be
///    fetched is not fatal; probing still runs.
/// 2. HEAD-probe the conventional feed paths (`/rss`, `/feed`, `/rss.xml`,
///    `/feed.xml`, `/atom.xml`) not already known.
/// 3. Fetch and parse each feed in turn, taking entry links until the
///    per-site cap is reached. Feeds that fail to fetch or parse are skipped.
///
/// # Arguments
///
/// * `http` - Shared client
/// * `base` - Site base URL
/// * `config` - Supplies `max_articles_per_site` and the URL logging flags
///
/// # Returns
///
/// Absolute, fragment-free entry links, deduplicated, in feed order.
///
/// # Errors
///
/// Only URL construction failures; network and parse errors are absorbed.
#[instrument(level = "info", skip_all, fields(site = %base))]
pub async fn discover(http: &HttpClient, base: &Url, config: &CrawlerConfig) -> Result<Vec<String>> {
    let cap = config.max_articles_per_site;
    let mut feeds = match http.get_text(base.as_str()).await {
        Ok(html) => advertised_feeds(&html, base),
        Err(e) => {
            debug!(error = %e, "Homepage unavailable for feed links; probing only");
            Vec::new()
        }
    };

    for path in FEED_PATHS {
        let candidate = join(base, path)?.to_string();
        if !feeds.contains(&candidate) && http.probe(&candidate).await {
            feeds.push(candidate);
        }
    }
    info!(feeds = feeds.len(), "Feed endpoints located");

    let mut urls: Vec<String> = Vec::new();
    for feed in &feeds {
        if urls.len() >= cap {
            break;
        }
        let entries = match http.get_text(feed).await {
            Ok(xml) => match parse_feed(&xml, feed) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(%feed, error = %e, "Feed did not parse");
                    continue;
                }
            },
            Err(e) => {
                debug!(%feed, error = %e, "Feed fetch failed");
                continue;
            }
        };

        let feed_url = parse_url(feed)?;
        for entry in entries {
            if urls.len() >= cap {
                break;
            }
            let Some(link) = resolve_link(&feed_url, &entry.link) else {
                continue;
            };
            let link = link.to_string();
            if urls.contains(&link) {
                continue;
            }
            if config.log_url_details {
                debug!(
                    url = %link,
                    title = entry.title.as_deref().unwrap_or(""),
                    published = entry.published.as_deref().unwrap_or(""),
                    %feed,
                    "Feed entry"
                );
            } else if config.log_urls {
                debug!(url = %link, "Feed entry");
            }
            urls.push(link);
        }
    }

    Ok(urls)
}
