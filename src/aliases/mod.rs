//! Company alias expansion.
//!
//! A canonical company name such as `"Alphabet (Google)"` is expanded into an
//! [`AliasSet`] of lowercase strings (names, tickers, domains, brands) that
//! the matching engine searches for. Expansion combines optional online
//! [`sources`] with deterministic local heuristics, and every resolution is
//! persisted to an on-disk cache keyed by a hash of the lowercased name.
//!
//! Resolution never fails: a source that errors contributes nothing, and thin
//! or missing online results fall back to [`local_aliases`].

pub mod sources;

use crate::error::Result;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

pub use sources::AliasSource;

/// Lowercase strings considered equivalent to one canonical company.
pub type AliasSet = BTreeSet<String>;

/// Online results with fewer distinct aliases than this get the local
/// heuristics added on top.
const MIN_EXTERNAL_ALIASES: usize = 3;

/// Aliases shorter than this (in characters) are dropped.
const MIN_ALIAS_CHARS: usize = 2;

const CORPORATE_SUFFIXES: &[&str] = &[" inc", " corp", " ltd", " llc"];

const SUFFIX_VARIANTS: &[&str] = &[
    "inc",
    "corp",
    "corporation",
    "ltd",
    "limited",
    "llc",
    "company",
    "co",
];

/// Well-known companies: if the lowercased name contains any trigger, the
/// aliases are added. First matching row wins.
const KNOWN_COMPANIES: &[(&[&str], &[&str])] = &[
    (&["google", "alphabet"], &["google", "alphabet", "google.com", "goog", "googl"]),
    (&["microsoft"], &["microsoft", "msft", "ms", "microsoft.com"]),
    (&["apple"], &["apple", "aapl", "apple.com"]),
    (&["amazon"], &["amazon", "amzn", "amazon.com"]),
    (&["meta", "facebook"], &["meta", "facebook", "fb", "facebook.com", "meta.com"]),
    (&["nvidia"], &["nvidia", "nvda", "nvidia.com"]),
    (&["tesla"], &["tesla", "tsla", "tesla.com"]),
    (&["netflix"], &["netflix", "nflx", "netflix.com"]),
    (&["samsung"], &["samsung", "samsung.com"]),
    (&["ibm"], &["ibm", "international business machines", "ibm.com"]),
    (&["oracle"], &["oracle", "orcl", "oracle.com"]),
    (&["cisco"], &["cisco", "csco", "cisco.com"]),
    (&["amd"], &["amd", "advanced micro devices", "amd.com"]),
    (&["salesforce"], &["salesforce", "crm", "salesforce.com"]),
    (&["uber"], &["uber", "uber.com"]),
    (&["spotify"], &["spotify", "spot", "spotify.com"]),
    (&["adobe"], &["adobe", "adbe", "adobe.com"]),
    (&["sony"], &["sony", "sony.com"]),
    (&["qualcomm"], &["qualcomm", "qcom", "qualcomm.com"]),
];

/// Stable cache key: hex SHA-256 of the lowercased name.
pub fn cache_key(company: &str) -> String {
    let digest = Sha256::digest(company.trim().to_lowercase().as_bytes());
    hex::encode(digest)
}

/// Split `"Alphabet (Google)"` into `("Alphabet", Some("Google"))`.
fn split_parenthetical(name: &str) -> (&str, Option<&str>) {
    match (name.find('('), name.find(')')) {
        (Some(open), Some(close)) if open < close => {
            (name[..open].trim(), Some(name[open + 1..close].trim()))
        }
        _ => (name.trim(), None),
    }
}

fn strip_corporate_suffixes(name: &str) -> String {
    let tidy = |s: &str| s.trim().trim_end_matches(['.', ',']).trim_end().to_string();
    let mut base = tidy(name);
    while let Some(rest) = CORPORATE_SUFFIXES
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
    {
        base = tidy(rest);
    }
    base
}

/// Deterministic alias expansion that needs no network.
///
/// Produces the lowercased name, the main and parenthetical forms (and the
/// parenthetical's words), the suffix-stripped base with its corporate
/// variants, `.com`/`.org` forms of single-word bases, and any entries from
/// the well-known company table.
pub fn local_aliases(company: &str) -> AliasSet {
    let lower = company.trim().to_lowercase();
    let mut aliases = AliasSet::new();
    aliases.insert(lower.clone());

    let (main, parenthetical) = split_parenthetical(&lower);
    if let Some(inner) = parenthetical {
        aliases.insert(main.to_string());
        aliases.insert(inner.to_string());
        if inner.contains(' ') {
            aliases.extend(inner.split_whitespace().map(str::to_string));
        }
    }

    let base = strip_corporate_suffixes(main);
    if !base.is_empty() {
        aliases.insert(base.clone());
        for suffix in SUFFIX_VARIANTS {
            aliases.insert(format!("{base} {suffix}"));
        }
        if !base.contains(' ') {
            aliases.insert(format!("{base}.com"));
            aliases.insert(format!("{base}.org"));
        }
    }

    if let Some((_, known)) = KNOWN_COMPANIES
        .iter()
        .find(|(triggers, _)| triggers.iter().any(|t| lower.contains(t)))
    {
        aliases.extend(known.iter().map(|a| a.to_string()));
    }

    aliases
}

/// Lowercase, trim, and drop aliases that are too short to match safely.
fn clean_aliases<I>(raw: I) -> AliasSet
where
    I: IntoIterator<Item = String>,
{
    raw.into_iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| a.chars().count() >= MIN_ALIAS_CHARS)
        .collect()
}

/// Persisted alias cache: cache key -> alias set.
///
/// The on-disk form is a pretty-printed JSON object mapping the
/// [`cache_key`] of each company to its sorted alias list:
///
/// ```text
/// {
///   "9f2b…": ["tesla", "tesla.com", "tsla"]
/// }
/// ```
#[derive(Debug, Default)]
pub struct AliasCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, AliasSet>,
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct CacheFile(BTreeMap<String, AliasSet>);

/// Serialized cache contents, taken under the resolver lock and written
/// after it is released.
#[derive(Debug)]
pub struct CacheSnapshot {
    path: PathBuf,
    json: String,
}

impl CacheSnapshot {
    /// Write the snapshot, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Io`](crate::error::CrawlError::Io) if the
    /// directory cannot be created or the file cannot be written.
    pub async fn write(self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, self.json).await?;
        Ok(())
    }
}

impl AliasCache {
    /// In-memory only; nothing is written.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache file at `path`.
    ///
    /// The cache is always bound to `path`, so later resolutions are
    /// written there even when the file did not exist yet.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the JSON cache file
    ///
    /// # Returns
    ///
    /// The loaded cache. A missing file starts empty silently; a corrupt
    /// one starts empty with a warning and is overwritten on the next save.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<CacheFile>(&text) {
                Ok(CacheFile(entries)) => {
                    info!(path = %path.display(), entries = entries.len(), "Loaded alias cache");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Alias cache unreadable; starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "No alias cache yet");
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<&AliasSet> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn insert(&mut self, key: String, aliases: AliasSet) {
        self.entries.insert(key, aliases);
    }

    /// Serialize the current entries for writing.
    ///
    /// # Returns
    ///
    /// `Ok(None)` for an in-memory cache, otherwise the snapshot to hand to
    /// [`CacheSnapshot::write`].
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the entries cannot be serialized.
    pub fn snapshot(&self) -> Result<Option<CacheSnapshot>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let json = serde_json::to_string_pretty(&self.entries)?;
        Ok(Some(CacheSnapshot {
            path: path.clone(),
            json,
        }))
    }
}

/// A canonical company with its frozen alias set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyAliases {
    pub name: String,
    pub aliases: AliasSet,
}

/// Expands canonical company names into alias sets.
///
/// Holds the configured online [`AliasSource`]s and the [`AliasCache`].
/// Each company is resolved once at startup; the resulting sets are frozen
/// into [`CompanyAliases`] and never change during the crawl.
pub struct AliasResolver {
    sources: Vec<Box<dyn AliasSource>>,
    cache: Mutex<AliasCache>,
}

impl std::fmt::Debug for AliasResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("AliasResolver")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("cached", &cache.len())
            .field("cache_path", &cache.path())
            .finish()
    }
}

impl AliasResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `sources` - Online lookups to query, in order; may be empty
    /// * `cache` - Cache consulted before any source and updated after every miss
    ///
    /// # Example
    ///
    /// ```ignore
    /// let sources = default_sources(&http, &config.alphavantage_api_key);
    /// let resolver = AliasResolver::new(sources, AliasCache::load(&config.alias_cache_file).await);
    /// ```
    pub fn new(sources: Vec<Box<dyn AliasSource>>, cache: AliasCache) -> Self {
        Self {
            sources,
            cache: Mutex::new(cache),
        }
    }

    /// Heuristics only, no cache file.
    #[cfg(test)]
    pub fn offline() -> Self {
        Self::new(Vec::new(), AliasCache::in_memory())
    }

    /// Resolve one canonical company name into its alias set.
    ///
    /// 1. A cache hit is returned as-is, with no source queried.
    /// 2. Otherwise every source is queried concurrently. Failed sources are
    ///    logged and skipped.
    /// 3. If no source answered, or they produced fewer than three aliases,
    ///    the [`local_aliases`] heuristics are added.
    /// 4. The lowercased canonical name is always added, then the set is
    ///    stored in the cache and the cache file rewritten.
    ///
    /// # Arguments
    ///
    /// * `company` - The user-supplied canonical name
    ///
    /// # Returns
    ///
    /// The alias set, which always contains the trimmed, lowercased
    /// `company`. An empty name yields a set holding only the empty string.
    /// Resolution never fails; a cache write error is logged.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve(&self, company: &str) -> AliasSet {
        let canonical = company.trim().to_lowercase();
        if canonical.is_empty() {
            return AliasSet::from([canonical]);
        }

        let key = cache_key(company);
        let cached = self.cache.lock().get(&key).cloned();
        if let Some(hit) = cached {
            debug!(aliases = hit.len(), "Alias cache hit");
            return hit;
        }

        let lookups = join_all(self.sources.iter().map(|source| async move {
            (source.name(), source.lookup(company).await)
        }))
        .await;

        let mut external = AliasSet::new();
        let mut any_source_answered = false;
        for (source, outcome) in lookups {
            match outcome {
                Ok(found) if !found.is_empty() => {
                    debug!(source, count = found.len(), "Alias source answered");
                    any_source_answered = true;
                    external.extend(clean_aliases(found));
                }
                Ok(_) => debug!(source, "Alias source had nothing"),
                Err(e) => warn!(source, error = %e, "Alias source failed"),
            }
        }

        let mut aliases = external;
        if !any_source_answered || aliases.len() < MIN_EXTERNAL_ALIASES {
            debug!(online = aliases.len(), "Adding local heuristic aliases");
            aliases.extend(clean_aliases(local_aliases(company)));
        }
        aliases.insert(canonical);

        let snapshot = {
            let mut cache = self.cache.lock();
            cache.insert(key, aliases.clone());
            cache.snapshot()
        };
        match snapshot {
            Ok(Some(snapshot)) => {
                if let Err(e) = snapshot.write().await {
                    warn!(error = %e, "Failed to persist alias cache");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to serialize alias cache"),
        }
        aliases
    }

    /// Resolve every company once, in input order.
    ///
    /// Companies are resolved sequentially so cache writes never race.
    ///
    /// # Arguments
    ///
    /// * `companies` - Canonical names as loaded from the companies list
    ///
    /// # Returns
    ///
    /// One [`CompanyAliases`] per input name, in the same order.
    pub async fn resolve_all(&self, companies: &[String]) -> Vec<CompanyAliases> {
        let mut resolved = Vec::with_capacity(companies.len());
        for company in companies {
            let aliases = self.resolve(company).await;
            info!(company = %company, terms = aliases.len(), "Resolved company aliases");
            resolved.push(CompanyAliases {
                name: company.clone(),
                aliases,
            });
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        calls: Arc<AtomicUsize>,
        answer: Vec<&'static str>,
    }

    #[async_trait]
    impl AliasSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn lookup(&self, _company: &str) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.iter().map(|s| s.to_string()).collect())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl AliasSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn lookup(&self, _company: &str) -> Result<Vec<String>> {
            Err(CrawlError::Timeout {
                url: "https://api.example.com".into(),
            })
        }
    }

    fn fixed(answer: Vec<&'static str>) -> (Box<dyn AliasSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FixedSource {
            calls: Arc::clone(&calls),
            answer,
        };
        (Box::new(source), calls)
    }

    #[test]
    fn test_parenthetical_expansion() {
        let aliases = local_aliases("Alphabet (Google)");
        assert!(aliases.contains("alphabet"));
        assert!(aliases.contains("google"));
        assert!(aliases.contains("alphabet (google)"));
        assert!(aliases.contains("googl"));
        assert!(aliases.contains("goog"));
    }

    #[test]
    fn test_multi_word_parenthetical_adds_words() {
        let aliases = local_aliases("Meta Platforms (Facebook Instagram)");
        assert!(aliases.contains("facebook instagram"));
        assert!(aliases.contains("facebook"));
        assert!(aliases.contains("instagram"));
        assert!(aliases.contains("meta platforms"));
    }

    #[test]
    fn test_suffix_stripping_and_variants() {
        let aliases = local_aliases("Acme Corp");
        assert!(aliases.contains("acme"));
        assert!(aliases.contains("acme inc"));
        assert!(aliases.contains("acme corporation"));
        assert!(aliases.contains("acme limited"));
        assert!(aliases.contains("acme.com"));
        assert!(aliases.contains("acme.org"));

        let aliases = local_aliases("Widget Works Inc.");
        assert!(aliases.contains("widget works"));
        assert!(!aliases.contains("widget works.com"));
    }

    #[test]
    fn test_known_company_table() {
        let aliases = local_aliases("Tesla");
        assert!(aliases.contains("tsla"));
        assert!(aliases.contains("tesla.com"));

        let aliases = local_aliases("NVIDIA Corporation");
        assert!(aliases.contains("nvda"));
    }

    #[test]
    fn test_cache_key_is_case_insensitive_and_stable() {
        assert_eq!(cache_key("Tesla"), cache_key("  TESLA "));
        assert_ne!(cache_key("Tesla"), cache_key("Apple"));
        assert_eq!(cache_key("Tesla").len(), 64);
    }

    #[tokio::test]
    async fn test_resolve_always_contains_canonical_name() {
        let resolver = AliasResolver::offline();
        for name in ["Alphabet (Google)", "Tesla", "Some Obscure Startup LLC", "X"] {
            let aliases = resolver.resolve(name).await;
            assert!(aliases.contains(&name.to_lowercase()), "missing canonical for {name}");
        }
    }

    #[tokio::test]
    async fn test_short_aliases_are_discarded() {
        let (source, _) = fixed(vec!["x", "y", "tesla motors", "tsla", "tesla inc"]);
        let resolver = AliasResolver::new(vec![source], AliasCache::in_memory());
        let aliases = resolver.resolve("Tesla").await;
        assert!(!aliases.contains("x"));
        assert!(!aliases.contains("y"));
        assert!(aliases.contains("tesla motors"));
    }

    #[tokio::test]
    async fn test_empty_name_returns_singleton() {
        let resolver = AliasResolver::offline();
        let aliases = resolver.resolve("   ").await;
        assert_eq!(aliases, AliasSet::from([String::new()]));
    }

    #[tokio::test]
    async fn test_warm_cache_is_idempotent_and_skips_sources() {
        let (source, calls) = fixed(vec!["Tesla Inc", "TSLA", "Tesla Motors"]);
        let resolver = AliasResolver::new(vec![source], AliasCache::in_memory());

        let first = resolver.resolve("Tesla").await;
        let second = resolver.resolve("Tesla").await;
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rich_online_result_skips_heuristics() {
        let (source, _) = fixed(vec!["Tesla Inc", "TSLA", "Tesla Motors"]);
        let resolver = AliasResolver::new(vec![source], AliasCache::in_memory());
        let aliases = resolver.resolve("Tesla").await;
        assert_eq!(
            aliases,
            AliasSet::from(["tesla inc", "tsla", "tesla motors", "tesla"].map(String::from))
        );
    }

    #[tokio::test]
    async fn test_failed_or_thin_sources_fall_back_to_heuristics() {
        let (thin, _) = fixed(vec!["tesla motors"]);
        let resolver = AliasResolver::new(
            vec![Box::new(BrokenSource), thin],
            AliasCache::in_memory(),
        );
        let aliases = resolver.resolve("Tesla").await;
        assert!(aliases.contains("tesla motors"));
        assert!(aliases.contains("tsla"));
        assert!(aliases.contains("tesla corp"));

        let resolver = AliasResolver::new(vec![Box::new(BrokenSource)], AliasCache::in_memory());
        let aliases = resolver.resolve("Alphabet (Google)").await;
        assert!(aliases.contains("alphabet"));
        assert!(aliases.contains("google"));
    }

    #[tokio::test]
    async fn test_cache_persists_across_resolvers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/aliases.json");

        let (source, first_calls) = fixed(vec!["Acme Widgets", "ACMW", "acme.io"]);
        let resolver = AliasResolver::new(vec![source], AliasCache::load(&path).await);
        let first = resolver.resolve("Acme").await;
        assert!(path.exists());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);

        let (source, second_calls) = fixed(vec!["something else entirely"]);
        let resolver = AliasResolver::new(vec![source], AliasCache::load(&path).await);
        let second = resolver.resolve("ACME").await;
        assert_eq!(first, second);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_each_resolution_rewrites_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        let resolver = AliasResolver::new(Vec::new(), AliasCache::load(&path).await);

        resolver.resolve("Tesla").await;
        let written: BTreeMap<String, AliasSet> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[&cache_key("Tesla")].contains("tsla"));

        resolver.resolve("Netflix").await;
        let written: BTreeMap<String, AliasSet> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.contains_key(&cache_key("netflix")));
    }

    #[tokio::test]
    async fn test_corrupt_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cache = AliasCache::load(&path).await;
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_input_order() {
        let resolver = AliasResolver::offline();
        let companies = vec!["Tesla".to_string(), "Alphabet (Google)".to_string()];
        let resolved = resolver.resolve_all(&companies).await;
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "Tesla");
        assert!(resolved[1].aliases.contains("google"));
    }
}
