//! Sumi-Crawl main entry point
//!
//! This is the command-line interface for the Sumi-Crawl site crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_crawl::config::{load_config_with_hash, Config};
use sumi_crawl::output::{format_result_line, print_statistics, CrawlStatistics};
use sumi_crawl::{CrawlResult, Crawler};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Sumi-Crawl: a same-host, depth-bounded site crawler
///
/// Sumi-Crawl walks every page reachable from a seed URL on the seed's own
/// host, optionally fetching embedded images, and prints one line per page.
#[derive(Parser, Debug)]
#[command(name = "sumi-crawl")]
#[command(version)]
#[command(about = "A same-host, depth-bounded site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the seed URL from the config file
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Override the maximum crawl depth (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Override the number of concurrent page workers
    #[arg(long, value_name = "N")]
    max_workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_crawl=info,warn"),
            1 => EnvFilter::new("sumi_crawl=debug,info"),
            2 => EnvFilter::new("sumi_crawl=trace,debug"),
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

/// Applies command-line overrides on top of the config file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(seed) = &cli.seed {
        config.crawler.seed = seed.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(max_workers) = cli.max_workers {
        config.crawler.max_workers = max_workers;
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed: {}", config.crawler.seed);
    println!(
        "  Max depth: {}",
        match config.crawler.max_depth {
            0 => "unlimited".to_string(),
            depth => depth.to_string(),
        }
    );
    println!("  Max workers: {}", config.crawler.max_workers);
    println!(
        "  Timeout: {}",
        match config.crawler.timeout {
            0 => "none".to_string(),
            seconds => format!("{}s", seconds),
        }
    );
    if let Some(user_agent) = &config.crawler.user_agent {
        println!("  User agent: {}", user_agent);
    }
    println!(
        "  Relative links resolve against: {}",
        if config.crawler.resolve_against_page {
            "page"
        } else {
            "origin root"
        }
    );

    println!("\nImages:");
    println!("  Enabled: {}", config.images.enabled);
    println!("  Workers: {}", config.images.workers);
    println!("  Cross-host: {}", config.images.cross_host);

    println!("\nAuth: {}", if config.auth.is_some() { "basic" } else { "none" });

    println!("\nHeaders ({}):", config.headers.len());
    let mut headers: Vec<_> = config.headers.iter().collect();
    headers.sort();
    for (name, value) in headers {
        println!("  - {}: {}", name, value);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(64);

    let mut crawler = Crawler::from_config(config);
    crawler.set_callback_channel(tx);
    crawler
        .start()
        .with_context(|| format!("Failed to start crawl of {}", config.crawler.seed))?;

    let reporter = tokio::spawn(report_results(rx));

    tokio::select! {
        _ = crawler.wait() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Interrupted, waiting for in-flight pages to finish");
            crawler.stop();
            crawler.wait().await;
        }
    }

    // Dropping the crawler closes the result channel
    drop(crawler);

    let mut stats = reporter.await.context("Result reporter task failed")?;
    stats.finish();
    println!();
    print_statistics(&stats);

    Ok(())
}

/// Prints every delivered result and aggregates statistics
async fn report_results(mut rx: mpsc::Receiver<CrawlResult>) -> CrawlStatistics {
    let mut stats = CrawlStatistics::new();

    while let Some(result) = rx.recv().await {
        println!("{}", format_result_line(&result));
        stats.record(&result);
    }

    stats
}
