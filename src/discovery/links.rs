//! Link-crawl strategy: article-looking anchors on the homepage.

use super::resolve_link;
use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::http::HttpClient;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

const LINK_SELECTORS: &[&str] = &[
    r#"a[href*="article"]"#,
    r#"a[href*="news"]"#,
    r#"a[href*="post"]"#,
    "article a",
    ".article a",
    ".news a",
    ".post a",
];

const ARTICLE_MARKERS: &[&str] = &["article", "news", "post", "story", "blog"];

static SELECTORS: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    LINK_SELECTORS
        .iter()
        .map(|s| (*s, Selector::parse(s).expect("static link selector")))
        .collect()
});

static DATE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}/\d{2}/\d{2}").expect("static date pattern"));

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(?:/|$)").expect("static numeric pattern"));

/// An accepted anchor, with what found it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleLink {
    pub url: String,
    pub text: String,
    pub selector: &'static str,
}

/// Whether a URL looks like it points at an article: an editorial marker
/// word, a `yyyy/mm/dd` run, or a purely numeric path segment. Only the
/// path and query are considered.
pub fn is_article_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    let query = url.query().unwrap_or("").to_lowercase();
    ARTICLE_MARKERS
        .iter()
        .any(|m| path.contains(m) || query.contains(m))
        || DATE_PATH.is_match(&path)
        || NUMERIC_SEGMENT.is_match(&path)
}

/// Collect article links from homepage markup, stopping after the selector
/// during which `cap` was reached.
pub fn article_links(html: &str, base: &Url, cap: usize) -> Vec<ArticleLink> {
    let document = Html::parse_document(html);
    let mut links: Vec<ArticleLink> = Vec::new();

    for (selector_text, selector) in SELECTORS.iter() {
        for element in document.select(selector) {
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(base, href))
            else {
                continue;
            };
            if !is_article_url(&url) {
                continue;
            }
            let url = url.to_string();
            if links.iter().any(|l| l.url == url) {
                continue;
            }
            let text = element.text().collect::<Vec<_>>().join(" ");
            links.push(ArticleLink {
                url,
                text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                selector: selector_text,
            });
        }
        if links.len() >= cap {
            break;
        }
    }

    links.truncate(cap);
    links
}

/// Run the link-crawl strategy for one site.
///
/// # Arguments
///
/// * `http` - Shared client
/// * `base` - Site base URL; its homepage is fetched once
/// * `config` - Supplies `max_articles_per_site` and the URL logging flags
///
/// # Returns
///
/// Article-looking links from [`article_links`], in selector order.
///
/// # Errors
///
/// Any failure fetching the homepage. The discovery engine logs it and
/// counts the strategy as having found nothing.
#[instrument(level = "info", skip_all, fields(site = %base))]
pub async fn discover(http: &HttpClient, base: &Url, config: &CrawlerConfig) -> Result<Vec<String>> {
    let html = http.get_text(base.as_str()).await?;
    let links = article_links(&html, base, config.max_articles_per_site);

    for link in &links {
        if config.log_url_details {
            debug!(url = %link.url, text = %link.text, selector = link.selector, "Homepage link");
        } else if config.log_urls {
            debug!(url = %link.url, "Homepage link");
        }
    }

    Ok(links.into_iter().map(|l| l.url).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_article_heuristic() {
        assert!(is_article_url(&url("https://site.com/news/tesla")));
        assert!(is_article_url(&url("https://site.com/2025/09/04/tesla-recall")));
        assert!(is_article_url(&url("https://site.com/world/123456")));
        assert!(is_article_url(&url("https://site.com/world/123456/")));
        assert!(is_article_url(&url("https://site.com/Stories/big-one")));
        assert!(!is_article_url(&url("https://site.com/about")));
        assert!(!is_article_url(&url("https://site.com/v2api")));
        assert!(!is_article_url(&url("https://news.site.com/contact")));
    }

    #[test]
    fn test_article_links_resolve_filter_and_dedup() {
        let html = r##"<html><body>
            <a href="/news/one#comments">One</a>
            <a href="/news/one">One again</a>
            <a href="mailto:desk@site.com?subject=news">Mail</a>
            <a href="javascript:void(0)">news</a>
            <article>
              <a href="https://site.com/2025/09/04/two">  Two
                 lines </a>
              <a href="/about">About</a>
            </article>
            <div class="post"><a href="/p/42">Numeric</a></div>
        </body></html>"##;
        let links = article_links(html, &url("https://site.com/"), 10);
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://site.com/news/one",
                "https://site.com/2025/09/04/two",
                "https://site.com/p/42",
            ]
        );
        assert_eq!(links[0].selector, r#"a[href*="news"]"#);
        assert_eq!(links[1].text, "Two lines");
    }

    #[test]
    fn test_article_links_respect_cap() {
        let html: String = (0..20)
            .map(|i| format!(r#"<a href="/news/{i}-story">s</a>"#))
            .collect();
        let links = article_links(&html, &url("https://site.com/"), 5);
        assert_eq!(links.len(), 5);
    }
}
