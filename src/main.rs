//! # newswatch
//!
//! Crawls a list of news sites, extracts article content, and keeps the
//! articles that mention any company on a watch list, recording which
//! keywords they mention as well.
//!
//! ## Usage
//!
//! ```sh
//! newswatch --websites input/websites.txt --companies input/companies.txt -o output
//! ```
//!
//! ## Architecture
//!
//! 1. **Setup**: load configuration and input lists, expand every company
//!    into an alias set (online sources plus local heuristics, cached)
//! 2. **Discovery**: find candidate article URLs per site via feeds,
//!    sitemaps, and homepage links
//! 3. **Extraction & matching**: fetch each distinct URL once on a bounded
//!    worker pool, extract content, match companies and keywords
//! 4. **Output**: write JSON/CSV results and a run summary

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aliases;
mod cli;
mod config;
mod crawler;
mod discovery;
mod error;
mod extract;
mod http;
mod matching;
mod models;
mod outputs;
mod utils;

use aliases::{AliasCache, AliasResolver, sources::default_sources};
use cli::Cli;
use config::CrawlerConfig;
use crawler::Crawler;
use http::HttpClient;
use matching::Matcher;
use models::StatsSnapshot;
use utils::{
    ensure_writable_dir, format_elapsed, load_list_file, load_required_list, normalize_site,
    strip_inline_comment,
};

fn log_final_statistics(stats: &StatsSnapshot) {
    info!(
        elapsed = %format_elapsed(Duration::from_secs_f64(stats.elapsed_secs)),
        rate = format!("{:.2} articles/s", stats.rate()),
        processed = stats.processed,
        "Final statistics"
    );
    info!(
        with_companies = stats.with_companies,
        companies_pct = format!("{:.1}%", stats.percent(stats.with_companies)),
        with_keywords = stats.with_keywords,
        keywords_pct = format!("{:.1}%", stats.percent(stats.with_keywords)),
        with_both = stats.with_both,
        both_pct = format!("{:.1}%", stats.percent(stats.with_both)),
        "Match counts"
    );
    info!(
        errors = stats.errors,
        errors_pct = format!("{:.1}%", stats.percent(stats.errors)),
        matches_saved = stats.matches_saved,
        "Errors and saved matches"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();
    let args = Cli::parse();
    let mut config = CrawlerConfig::load(args.config.as_deref());

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("newswatch starting up");
    debug!(?args, "Parsed CLI arguments");

    if args.offline_aliases {
        config.use_online_company_aliases = false;
    }
    if let Some(key) = &args.alphavantage_api_key {
        config.alphavantage_api_key = key.clone();
    }
    if let Some(workers) = args.max_workers {
        config.max_workers = workers;
    }
    config.validate()?;
    info!(
        workers = config.max_workers,
        delay_secs = config.request_delay,
        timeout_secs = config.timeout,
        per_site = config.max_articles_per_site,
        methods = ?config.search_methods,
        online_aliases = config.use_online_company_aliases,
        "Configuration in effect"
    );

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Inputs ----
    let sites: Vec<String> = load_required_list(&args.websites, "websites")?
        .iter()
        .map(|s| normalize_site(s))
        .collect();
    let companies: Vec<String> = load_required_list(&args.companies, "companies")?
        .iter()
        .map(|c| strip_inline_comment(c).to_string())
        .filter(|c| !c.is_empty())
        .collect();
    let keywords = load_list_file(&args.keywords).unwrap_or_else(|e| {
        warn!(path = %args.keywords.display(), error = %e, "Keyword list unavailable; continuing without keywords");
        Vec::new()
    });
    info!(
        sites = sites.len(),
        companies = companies.len(),
        keywords = keywords.len(),
        "Inputs loaded"
    );

    // ---- Aliases ----
    let http = HttpClient::new(&config)?;
    let sources = if config.use_online_company_aliases {
        default_sources(&http, &config.alphavantage_api_key)
    } else {
        Vec::new()
    };
    let resolver = AliasResolver::new(sources, AliasCache::load(&config.alias_cache_file).await);
    debug!(?resolver, "Alias resolver ready");
    let resolved = resolver.resolve_all(&companies).await;
    let matcher = Matcher::new(resolved, keywords, config.case_sensitive);

    // ---- Crawl ----
    let config = Arc::new(config);
    let crawler = Arc::new(Crawler::new(Arc::clone(&config), http, matcher)?);
    let report = Arc::clone(&crawler).run(&sites).await?;
    debug!(phase = ?crawler.phase(), sites = report.sites.len(), "Crawler finished");
    log_final_statistics(&report.statistics);

    // ---- Output ----
    match outputs::write_report(&report, &args.output_dir, &config).await {
        Ok(files) => {
            for file in files {
                info!(path = %file.display(), "Saved");
            }
        }
        Err(e) => error!(error = %e, "Failed to write results"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
