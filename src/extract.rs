//! Article content extraction.
//!
//! A page is fetched once and run through two strategies:
//!
//! 1. **Rich**: structured article data from JSON-LD (`Article`,
//!    `NewsArticle`, `BlogPosting`, `ReportageNewsArticle`), with `og:title`
//!    and paragraph text filling any gaps. Accepted only when it yields a
//!    title and at least `content_min_length` characters of body.
//! 2. **Generic**: `<title>`/`<h1>` plus the first content container, from a
//!    fixed priority list, whose text clears the minimum length.
//!
//! Page `<meta>` tags are always collected into the metadata map. A fetch
//! failure produces an [`ArticleResult`] with `error` set and no content;
//! it is never escalated.

use crate::http::HttpClient;
use crate::models::ArticleResult;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "ReportageNewsArticle",
];

const CONTENT_CONTAINERS: &[&str] = &[
    "article",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".content",
    "main",
    ".main-content",
];

const DATE_META_KEYS: &[&str] = &[
    "article:published_time",
    "og:published_time",
    "datePublished",
    "pubdate",
    "publishdate",
    "date",
    "dc.date",
];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static extraction selector")
}

static JSON_LD: Lazy<Selector> = Lazy::new(|| selector(r#"script[type="application/ld+json"]"#));
static META: Lazy<Selector> = Lazy::new(|| selector("meta"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static ARTICLE_P: Lazy<Selector> = Lazy::new(|| selector("article p"));
static ANY_P: Lazy<Selector> = Lazy::new(|| selector("p"));
static CONTAINERS: Lazy<Vec<Selector>> =
    Lazy::new(|| CONTENT_CONTAINERS.iter().map(|css| selector(css)).collect());

/// Fetches pages and turns them into partially filled [`ArticleResult`]s.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    http: HttpClient,
    min_length: usize,
}

impl ContentExtractor {
    /// # Arguments
    ///
    /// * `http` - Client used to fetch article pages
    /// * `min_length` - Body length (characters) the rich strategy must reach
    pub fn new(http: HttpClient, min_length: usize) -> Self {
        Self { http, min_length }
    }

    /// Fetch `url` once and extract its title, body, metadata, and date.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute article URL
    ///
    /// # Returns
    ///
    /// Always a result, never an error. A failed fetch is logged and
    /// returned as [`ArticleResult::failed`], with `error` set and every
    /// content field empty, so the caller can count it and move on.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let extractor = ContentExtractor::new(http, config.content_min_length);
    /// let article = extractor.extract("https://site.com/news/a").await;
    /// if let Some(e) = &article.error { warn!(error = %e, "skipped"); }
    /// ```
    #[instrument(level = "debug", skip(self))]
    pub async fn extract(&self, url: &str) -> ArticleResult {
        match self.http.get_text(url).await {
            Ok(html) => extract_from_html(url, &html, self.min_length),
            Err(e) => {
                warn!(%url, error = %e, "Extraction failed");
                ArticleResult::failed(url, e)
            }
        }
    }
}

/// Run both extraction strategies over already-fetched markup.
///
/// # Strategies
///
/// 1. **Rich**: headline, body, date, authors, and keywords from a JSON-LD
///    `Article`/`NewsArticle` (also inside `@graph` or arrays), title
///    falling back to `og:title`, body falling back to `article p` and then
///    `p` paragraphs. Accepted when it yields a title and a body of at
///    least `min_length` characters.
/// 2. **Generic**: `<title>` or the first `<h1>`, and the text of the first
///    content container long enough, else the last non-empty one.
///
/// Meta tags are collected into `metadata` either way, and supply the
/// published date when the rich strategy did not.
///
/// # Arguments
///
/// * `url` - Page URL, copied onto the result
/// * `html` - Raw page markup
/// * `min_length` - Minimum body length for the rich strategy
pub fn extract_from_html(url: &str, html: &str, min_length: usize) -> ArticleResult {
    let document = Html::parse_document(html);
    let mut result = ArticleResult::new(url);
    result.metadata = meta_tags(&document);

    match rich_article(&document, &result.metadata, min_length) {
        Some(rich) => {
            debug!(%url, chars = rich.body.chars().count(), "Rich extraction accepted");
            result.title = rich.title;
            result.body = rich.body;
            result.published_date = rich.published;
            if !rich.authors.is_empty() {
                result.metadata.insert("authors".into(), rich.authors.join(", "));
            }
            if !rich.keywords.is_empty() {
                result.metadata.insert("keywords".into(), rich.keywords.join(", "));
            }
        }
        None => {
            debug!(%url, "Falling back to generic extraction");
            result.title = generic_title(&document);
            result.body = generic_body(&document, min_length);
        }
    }

    if result.published_date.is_none() {
        result.published_date = DATE_META_KEYS
            .iter()
            .find_map(|key| result.metadata.get(*key))
            .cloned();
    }
    result
}

/// Whitespace-normalized text of an element.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `<meta>` name/property/itemprop -> content. First occurrence wins.
fn meta_tags(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for element in document.select(&META) {
        let meta = element.value();
        let key = meta
            .attr("name")
            .or_else(|| meta.attr("property"))
            .or_else(|| meta.attr("itemprop"));
        if let (Some(key), Some(content)) = (key, meta.attr("content")) {
            let content = content.trim();
            if !key.is_empty() && !content.is_empty() {
                metadata
                    .entry(key.to_string())
                    .or_insert_with(|| content.to_string());
            }
        }
    }
    metadata
}

#[derive(Debug, Default)]
struct RichArticle {
    title: String,
    body: String,
    published: Option<String>,
    authors: Vec<String>,
    keywords: Vec<String>,
}

fn is_article_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

/// First article-typed object in a JSON-LD document, looking through
/// arrays and `@graph` containers.
fn find_article(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_article),
        Value::Object(map) => {
            if is_article_type(value) {
                Some(value)
            } else {
                map.get("@graph").and_then(find_article)
            }
        }
        _ => None,
    }
}

fn json_ld_article(document: &Html) -> Option<Value> {
    document.select(&JSON_LD).find_map(|script| {
        let raw = script.text().collect::<String>();
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        find_article(&value).cloned()
    })
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Author names from a string, a `Person`-like object, or a list of either.
fn names(value: Option<&Value>) -> Vec<String> {
    let found: Vec<String> = match value {
        Some(Value::String(name)) => vec![name.trim().to_string()],
        Some(object @ Value::Object(_)) => text_field(object, "name").into_iter().collect(),
        Some(Value::Array(items)) => items.iter().flat_map(|i| names(Some(i))).collect(),
        _ => Vec::new(),
    };
    found.into_iter().filter(|n| !n.is_empty()).collect()
}

fn keyword_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn paragraphs(document: &Html) -> String {
    let collect = |sel: &Selector| {
        document
            .select(sel)
            .map(element_text)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let in_article = collect(&ARTICLE_P);
    if in_article.is_empty() {
        collect(&ANY_P)
    } else {
        in_article
    }
}

fn rich_article(
    document: &Html,
    metadata: &BTreeMap<String, String>,
    min_length: usize,
) -> Option<RichArticle> {
    let mut rich = RichArticle::default();
    if let Some(ld) = json_ld_article(document) {
        rich.title = text_field(&ld, "headline").unwrap_or_default();
        rich.body = text_field(&ld, "articleBody").unwrap_or_default();
        rich.published = text_field(&ld, "datePublished");
        rich.authors = names(ld.get("author"));
        rich.keywords = keyword_list(ld.get("keywords"));
    }
    if rich.title.is_empty() {
        rich.title = metadata.get("og:title").cloned().unwrap_or_default();
    }
    if rich.body.chars().count() < min_length {
        let text = paragraphs(document);
        if text.chars().count() > rich.body.chars().count() {
            rich.body = text;
        }
    }

    (!rich.title.is_empty() && rich.body.chars().count() >= min_length).then_some(rich)
}

fn generic_title(document: &Html) -> String {
    [&*TITLE, &*H1]
        .into_iter()
        .find_map(|sel| {
            document
                .select(sel)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_default()
}

/// First container clearing `min_length`, else the last non-empty one seen.
fn generic_body(document: &Html, min_length: usize) -> String {
    let mut fallback = String::new();
    for container in CONTAINERS.iter() {
        let Some(element) = document.select(container).next() else {
            continue;
        };
        let text = element_text(element);
        if text.chars().count() >= min_length {
            return text;
        }
        if !text.is_empty() {
            fallback = text;
        }
    }
    fallback
}
