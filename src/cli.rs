//! Command-line interface definitions.
//!
//! Every option has a default, so a bare `newswatch` run reads
//! `input/websites.txt`, `input/companies.txt`, `input/keywords.txt` and the
//! first of `config.yaml`/`config.yml`/`config.json` it finds, and writes
//! into `output/`.

use clap::Parser;
use std::path::PathBuf;

/// Crawl news sites for articles mentioning a set of companies.
///
/// # Examples
///
/// ```sh
/// # Defaults everywhere
/// newswatch
///
/// # Custom lists and config, heuristic aliases only
/// newswatch --websites sites.txt --companies watchlist.txt -c crawl.yaml --offline-aliases
///
/// # More workers, results elsewhere
/// newswatch --max-workers 20 -o /tmp/news
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// News sites to crawl, one per line
    #[arg(long, default_value = "input/websites.txt")]
    pub websites: PathBuf,

    /// Companies to look for, one per line (`# comments` allowed)
    #[arg(long, default_value = "input/companies.txt")]
    pub companies: PathBuf,

    /// Keywords to record alongside company matches, one per line
    #[arg(long, default_value = "input/keywords.txt")]
    pub keywords: PathBuf,

    /// Optional path to a YAML or JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for result files
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Skip online alias lookups and use local heuristics only
    #[arg(long)]
    pub offline_aliases: bool,

    /// Alpha Vantage API key for ticker/name lookups
    #[arg(long, env = "ALPHAVANTAGE_API_KEY")]
    pub alphavantage_api_key: Option<String>,

    /// Override the configured worker pool size
    #[arg(long)]
    pub max_workers: Option<usize>,
}
