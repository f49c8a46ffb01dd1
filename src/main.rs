//! webscraper main entry point
//!
//! This is the command-line interface for the single-domain crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webscraper::config::{load_config_with_hash, Config};
use webscraper::{Coordinator, ProxyInfo};

/// webscraper: crawls one domain and re-encodes the images it finds
///
/// Starting from URL, every same-domain link is followed up to the given
/// depth while honouring robots.txt. Large images are recompressed to JPEG
/// and recorded in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "webscraper")]
#[command(version = "1.0.0")]
#[command(about = "A single-domain crawler with image re-encoding", long_about = None)]
struct Cli {
    /// Seed URL; its host is the crawl domain
    #[arg(value_name = "URL")]
    url: String,

    /// Maximum link depth to follow (the seed is depth 0)
    #[arg(short, long, default_value_t = 2)]
    depth: u32,

    /// Delay between requests in milliseconds (robots.txt Crawl-delay wins)
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// Proxy to route document fetches through; may be repeated
    #[arg(long = "proxy", value_name = "HOST:PORT")]
    proxies: Vec<ProxyInfo>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let coordinator =
        Coordinator::from_config(&config).context("Failed to initialize the crawler")?;

    match coordinator
        .start_scraping(&cli.url, cli.depth, cli.delay, cli.proxies)
        .await
    {
        Ok(visited) if visited.is_empty() => {
            println!("No content found for {}", cli.url);
            Ok(())
        }
        Ok(visited) => {
            let mut links: Vec<_> = visited.into_iter().collect();
            links.sort();
            for link in &links {
                println!("{}", link);
            }
            tracing::info!("{} links visited", links.len());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webscraper=info,warn"),
            1 => EnvFilter::new("webscraper=debug,info"),
            2 => EnvFilter::new("webscraper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
