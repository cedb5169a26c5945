//! Online alias sources.
//!
//! Each source takes a company name and returns candidate names, ticker
//! symbols, or domains. They are all optional and independent: the resolver
//! treats an error from one exactly like an empty answer.
//!
//! | Source | Endpoint | Yields |
//! |--------|----------|--------|
//! | [`AlphaVantage`] | `SYMBOL_SEARCH` | names and symbols of the top 5 matches |
//! | [`FinancialModelingPrep`] | `/api/v3/search` | names and symbols of the top 5 matches |
//! | [`Clearbit`] | name-to-domain | the domain and its first label |
//! | [`Wikipedia`] | page summary | the page title and "also known as" phrases |

use crate::error::Result;
use crate::http::HttpClient;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use urlencoding::encode;

const MAX_MATCHES: usize = 5;

pub const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co";
pub const FMP_URL: &str = "https://financialmodelingprep.com";
pub const CLEARBIT_URL: &str = "https://company.clearbit.com";
pub const WIKIPEDIA_URL: &str = "https://en.wikipedia.org";

/// Corporate-form fragments that a comma split of "Facebook, Inc." leaves
/// behind. Too generic to match on.
const BARE_SUFFIXES: &[&str] = &[
    "inc",
    "corp",
    "corporation",
    "ltd",
    "limited",
    "llc",
    "co",
    "company",
    "plc",
];

static ALSO_KNOWN_AS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)also known as ([^.]*)",
        r"(?i)formerly ([^.]*)",
        r"(?i)commonly called ([^.]*)",
        r"(?i)branded as ([^.]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static alias pattern"))
    .collect()
});

/// A lookup service that can suggest aliases for a company.
///
/// Implementations only fetch and parse; cleaning (lowercasing, length
/// filtering, dedup) and fallback decisions belong to the
/// [`AliasResolver`](super::AliasResolver).
///
/// # Example
///
/// ```ignore
/// struct Fixed;
///
/// #[async_trait]
/// impl AliasSource for Fixed {
///     fn name(&self) -> &'static str { "fixed" }
///     async fn lookup(&self, _company: &str) -> Result<Vec<String>> {
///         Ok(vec!["acme".into()])
///     }
/// }
/// ```
#[async_trait]
pub trait AliasSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Look up raw alias candidates for `company`.
    ///
    /// # Errors
    ///
    /// Any transport, status, or decoding failure. The resolver logs it and
    /// treats the source as having no answer.
    async fn lookup(&self, company: &str) -> Result<Vec<String>>;
}

/// Search services choke on parentheses, so `"Alphabet (Google)"` is sent
/// as `"Alphabet Google"`.
fn search_name(company: &str) -> String {
    company
        .replace(['(', ')'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Alpha Vantage `SYMBOL_SEARCH`.
#[derive(Debug, Clone)]
pub struct AlphaVantage {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl AlphaVantage {
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Names and symbols from the first five `bestMatches` entries. A rate-limit
/// notice or any other shape yields nothing.
pub fn alpha_vantage_aliases(body: &Value) -> Vec<String> {
    body.get("bestMatches")
        .and_then(Value::as_array)
        .map(|matches| {
            matches
                .iter()
                .take(MAX_MATCHES)
                .flat_map(|m| [str_field(m, "2. name"), str_field(m, "1. symbol")])
                .flatten()
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl AliasSource for AlphaVantage {
    fn name(&self) -> &'static str {
        "alphavantage"
    }

    async fn lookup(&self, company: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/query?function=SYMBOL_SEARCH&keywords={}&apikey={}",
            self.base_url,
            encode(&search_name(company)),
            encode(&self.api_key)
        );
        let body: Value = self.http.get_json(&url).await?;
        Ok(alpha_vantage_aliases(&body))
    }
}

/// Financial Modeling Prep company search.
#[derive(Debug, Clone)]
pub struct FinancialModelingPrep {
    http: HttpClient,
    base_url: String,
}

impl FinancialModelingPrep {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: FMP_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Names and symbols from the first five search hits.
pub fn fmp_aliases(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|companies| {
            companies
                .iter()
                .take(MAX_MATCHES)
                .flat_map(|c| [str_field(c, "name"), str_field(c, "symbol")])
                .flatten()
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl AliasSource for FinancialModelingPrep {
    fn name(&self) -> &'static str {
        "financialmodelingprep"
    }

    async fn lookup(&self, company: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/api/v3/search?query={}&limit={}&apikey=demo",
            self.base_url,
            encode(&search_name(company)),
            MAX_MATCHES
        );
        let body: Value = self.http.get_json(&url).await?;
        Ok(fmp_aliases(&body))
    }
}

/// Clearbit name-to-domain.
#[derive(Debug, Clone)]
pub struct Clearbit {
    http: HttpClient,
    base_url: String,
}

impl Clearbit {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: CLEARBIT_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// The matched domain plus its first label (`tesla.com` gives `tesla`).
pub fn clearbit_aliases(body: &Value) -> Vec<String> {
    let Some(domain) = str_field(body, "domain") else {
        return Vec::new();
    };
    let mut aliases = vec![domain.clone()];
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > 1 {
        aliases.push(labels[0].to_string());
    }
    aliases
}

#[async_trait]
impl AliasSource for Clearbit {
    fn name(&self) -> &'static str {
        "clearbit"
    }

    async fn lookup(&self, company: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/v1/domains/find?name={}",
            self.base_url,
            encode(&search_name(company))
        );
        let body: Value = self.http.get_json(&url).await?;
        Ok(clearbit_aliases(&body))
    }
}

/// Wikipedia REST page summary.
#[derive(Debug, Clone)]
pub struct Wikipedia {
    http: HttpClient,
    base_url: String,
}

impl Wikipedia {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: WIKIPEDIA_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// The page title plus every comma-separated phrase after "also known as",
/// "formerly", "commonly called", or "branded as" in the summary, up to the
/// next period.
///
/// Bare corporate forms such as `Inc` are dropped, since they would match
/// inside ordinary words.
///
/// # Examples
///
/// ```ignore
/// let body = json!({"title": "Meta Platforms", "extract": "Meta, formerly Facebook, Inc., is ..."});
/// assert_eq!(wikipedia_aliases(&body), vec!["Meta Platforms", "Facebook"]);
/// ```
pub fn wikipedia_aliases(body: &Value) -> Vec<String> {
    let mut aliases: Vec<String> = str_field(body, "title").into_iter().collect();
    if let Some(extract) = str_field(body, "extract") {
        for pattern in ALSO_KNOWN_AS.iter() {
            for caps in pattern.captures_iter(&extract) {
                aliases.extend(
                    caps[1]
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty() && !is_bare_suffix(s))
                        .map(str::to_string),
                );
            }
        }
    }
    aliases
}

fn is_bare_suffix(phrase: &str) -> bool {
    let phrase = phrase.trim_end_matches('.').to_lowercase();
    BARE_SUFFIXES.contains(&phrase.as_str())
}

#[async_trait]
impl AliasSource for Wikipedia {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn lookup(&self, company: &str) -> Result<Vec<String>> {
        let title = search_name(company).replace(' ', "_");
        let url = format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base_url,
            encode(&title)
        );
        let body: Value = self.http.get_json(&url).await?;
        Ok(wikipedia_aliases(&body))
    }
}

/// Build the full set of online sources, in lookup order.
///
/// # Arguments
///
/// * `http` - Shared client; each source keeps a cheap clone
/// * `alphavantage_api_key` - Key for [`AlphaVantage`]; `"demo"` works for light use
///
/// # Returns
///
/// Alpha Vantage, Financial Modeling Prep, Clearbit, and Wikipedia, boxed
/// for [`AliasResolver::new`](super::AliasResolver::new).
pub fn default_sources(http: &HttpClient, alphavantage_api_key: &str) -> Vec<Box<dyn AliasSource>> {
    vec![
        Box::new(AlphaVantage::new(http.clone(), alphavantage_api_key)),
        Box::new(FinancialModelingPrep::new(http.clone())),
        Box::new(Clearbit::new(http.clone())),
        Box::new(Wikipedia::new(http.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        let config = CrawlerConfig {
            timeout: 2.0,
            max_retries: 0,
            ..CrawlerConfig::default()
        };
        HttpClient::new(&config).unwrap()
    }

    #[test]
    fn test_search_name_drops_parentheses() {
        assert_eq!(search_name("Alphabet (Google)"), "Alphabet Google");
        assert_eq!(search_name("Tesla"), "Tesla");
    }

    #[test]
    fn test_alpha_vantage_parsing_limits_matches() {
        let matches: Vec<Value> = (0..8)
            .map(|i| json!({"1. symbol": format!("SYM{i}"), "2. name": format!("Name {i}")}))
            .collect();
        let aliases = alpha_vantage_aliases(&json!({ "bestMatches": matches }));
        assert_eq!(aliases.len(), 10);
        assert_eq!(aliases[0], "Name 0");
        assert_eq!(aliases[1], "SYM0");

        let rate_limited = json!({"Information": "demo key limit"});
        assert!(alpha_vantage_aliases(&rate_limited).is_empty());
    }

    #[test]
    fn test_fmp_parsing() {
        let body = json!([{"symbol": "TSLA", "name": "Tesla, Inc."}, {"symbol": "TL0.DE"}]);
        assert_eq!(fmp_aliases(&body), vec!["Tesla, Inc.", "TSLA", "TL0.DE"]);
        assert!(fmp_aliases(&json!({"error": "bad key"})).is_empty());
    }

    #[test]
    fn test_clearbit_parsing() {
        let aliases = clearbit_aliases(&json!({"name": "Tesla", "domain": "tesla.com"}));
        assert_eq!(aliases, vec!["tesla.com", "tesla"]);
        assert!(clearbit_aliases(&json!({})).is_empty());
    }

    #[test]
    fn test_wikipedia_parsing() {
        let body = json!({
            "title": "Meta Platforms",
            "extract": "Meta Platforms, Inc., formerly Facebook, Inc. and TheFacebook, is an American company."
        });
        let aliases = wikipedia_aliases(&body);
        assert_eq!(aliases[0], "Meta Platforms");
        assert!(aliases.contains(&"Facebook".to_string()));
        assert!(!aliases.iter().any(|a| a.eq_ignore_ascii_case("inc")));
        assert_eq!(aliases.len(), 2);
    }

    #[test]
    fn test_wikipedia_drops_bare_corporate_forms() {
        let body = json!({
            "title": "Acme",
            "extract": "Acme, also known as Acme Widgets, Corp, LLC, Co., is a maker of widgets."
        });
        assert_eq!(wikipedia_aliases(&body), vec!["Acme", "Acme Widgets"]);
    }

    #[tokio::test]
    async fn test_alpha_vantage_lookup_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "SYMBOL_SEARCH"))
            .and(query_param("keywords", "Alphabet Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bestMatches": [{"1. symbol": "GOOGL", "2. name": "Alphabet Inc - Class A"}]
            })))
            .mount(&server)
            .await;

        let source = AlphaVantage::new(client(), "demo").with_base_url(server.uri());
        let aliases = source.lookup("Alphabet (Google)").await.unwrap();
        assert_eq!(aliases, vec!["Alphabet Inc - Class A", "GOOGL"]);
    }

    #[tokio::test]
    async fn test_fmp_lookup_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/search"))
            .and(query_param("query", "Alphabet Google"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "GOOGL", "name": "Alphabet Inc."},
                {"symbol": "GOOG", "name": "Alphabet Inc."}
            ])))
            .mount(&server)
            .await;

        let source = FinancialModelingPrep::new(client()).with_base_url(server.uri());
        let aliases = source.lookup("Alphabet (Google)").await.unwrap();
        assert_eq!(aliases, vec!["Alphabet Inc.", "GOOGL", "Alphabet Inc.", "GOOG"]);
    }

    #[tokio::test]
    async fn test_wikipedia_lookup_missing_page_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rest_v1/page/summary/Unknown_Corp"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = Wikipedia::new(client()).with_base_url(server.uri());
        assert!(source.lookup("Unknown Corp").await.is_err());
    }

    #[tokio::test]
    async fn test_clearbit_lookup_against_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/domains/find"))
            .and(query_param("name", "Tesla"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"domain": "tesla.com"})))
            .mount(&server)
            .await;

        let source = Clearbit::new(client()).with_base_url(server.uri());
        assert_eq!(source.lookup("Tesla").await.unwrap(), vec!["tesla.com", "tesla"]);
    }
}
