//! Company and keyword matching.
//!
//! Two haystacks are searched with plain substring containment:
//!
//! - `title body url`: the URL is included because slugs often name the
//!   company when the prose uses a pronoun or a brand
//! - every metadata value, joined with spaces
//!
//! A company matches when any of its aliases occurs in either haystack.
//! Keywords are only looked for once at least one company matched, and only
//! in the first haystack, so `matched_keywords` is never populated without
//! `matched_companies`.

use crate::aliases::CompanyAliases;
use crate::models::ArticleResult;
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct CompanyPatterns {
    name: String,
    patterns: Vec<String>,
}

/// Read-only matcher shared by every worker.
#[derive(Debug, Clone)]
pub struct Matcher {
    companies: Vec<CompanyPatterns>,
    /// `(as configured, as searched)`
    keywords: Vec<(String, String)>,
    case_sensitive: bool,
}

impl Matcher {
    /// Build a matcher from resolved companies and raw keywords.
    ///
    /// Alias sets are lowercase. When `case_sensitive` is set, haystacks are
    /// searched as-is, so each company also matches its canonical name
    /// exactly as configured.
    ///
    /// # Arguments
    ///
    /// * `companies` - Resolved alias sets, one per canonical company
    /// * `keywords` - Keywords as listed; blanks are dropped
    /// * `case_sensitive` - Search haystacks without lowercasing them
    ///
    /// # Example
    ///
    /// ```ignore
    /// let companies = resolver.resolve_all(&names).await;
    /// let matcher = Matcher::new(companies, keywords, config.case_sensitive);
    /// ```
    pub fn new(companies: Vec<CompanyAliases>, keywords: Vec<String>, case_sensitive: bool) -> Self {
        let companies = companies
            .into_iter()
            .map(|company| {
                let mut patterns: BTreeSet<String> = company
                    .aliases
                    .iter()
                    .map(|a| if case_sensitive { a.clone() } else { a.to_lowercase() })
                    .filter(|a| !a.is_empty())
                    .collect();
                let name = company.name.trim();
                if case_sensitive && !name.is_empty() {
                    patterns.insert(name.to_string());
                }
                CompanyPatterns {
                    name: company.name,
                    patterns: patterns.into_iter().collect(),
                }
            })
            .collect();

        let keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| {
                let needle = if case_sensitive { k.clone() } else { k.to_lowercase() };
                (k, needle)
            })
            .collect();

        Self {
            companies,
            keywords,
            case_sensitive,
        }
    }

    pub fn company_count(&self) -> usize {
        self.companies.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    fn normalize(&self, text: String) -> String {
        if self.case_sensitive {
            text
        } else {
            text.to_lowercase()
        }
    }

    /// Populate the `matched_*` sets of an extracted result.
    ///
    /// Every alias is tested at most once per article, even when several
    /// companies share it. `matched_aliases` records the aliases that hit,
    /// for [`describe_match`].
    ///
    /// # Arguments
    ///
    /// * `result` - Output of the content extractor
    ///
    /// # Returns
    ///
    /// The same result with `matched_companies`, `matched_aliases`, and
    /// `matched_keywords` filled in. Results that carry an extraction error
    /// are returned untouched. `matched_keywords` stays empty unless at
    /// least one company matched.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let result = matcher.analyze(extractor.extract(&url).await);
    /// if result.has_companies() {
    ///     info!("{}", describe_match(&result));
    /// }
    /// ```
    pub fn analyze(&self, mut result: ArticleResult) -> ArticleResult {
        if result.error.is_some() {
            return result;
        }

        let text = self.normalize(format!("{} {} {}", result.title, result.body, result.url));
        let meta = self.normalize(result.metadata.values().cloned().collect::<Vec<_>>().join(" "));

        // Aliases are often shared between companies; test each one once.
        let mut seen: HashMap<&str, bool> = HashMap::new();
        for company in &self.companies {
            let hits: Vec<&str> = company
                .patterns
                .iter()
                .map(String::as_str)
                .filter(|alias| {
                    *seen
                        .entry(*alias)
                        .or_insert_with(|| text.contains(alias) || meta.contains(alias))
                })
                .collect();
            if !hits.is_empty() {
                result.matched_companies.insert(company.name.clone());
                result
                    .matched_aliases
                    .extend(hits.into_iter().map(str::to_string));
            }
        }

        if result.has_companies() {
            result.matched_keywords = self
                .keywords
                .iter()
                .filter(|(_, needle)| text.contains(needle.as_str()))
                .map(|(keyword, _)| keyword.clone())
                .collect();
        }

        result
    }
}

/// One-line description of a match for logs, e.g.
/// `Companies mentioned: Tesla (via: tesla, tsla)`.
pub fn describe_match(result: &ArticleResult) -> String {
    let mut line = format!(
        "Companies mentioned: {} (via: {})",
        result.matched_companies.iter().join(", "),
        result.matched_aliases.iter().join(", ")
    );
    if result.has_keywords() {
        line.push_str(&format!("; keywords: {}", result.matched_keywords.iter().join(", ")));
    }
    line
}
