//! Seedcrawl main entry point
//!
//! This is the command-line interface for the Seedcrawl content crawler.

use anyhow::{bail, Context};
use clap::Parser;
use seedcrawl::config::{load_config_with_hash, Config, OutputFormat};
use seedcrawl::crawler::{crawl, StopSignal};
use seedcrawl::output::{build_event_sink, load_statistics, print_statistics, print_summary};
use seedcrawl::storage::{
    fallback_path, open_sink, persist_batch, read_records, JsonLinesSink, RecordSink, SqliteSink,
};
use seedcrawl::topics::{InlineTopics, TopicFile, TopicSource};
use seedcrawl::{CrawlBatch, TopicMap};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Seedcrawl: a polite single-site content crawler
///
/// Seedcrawl fetches one page per seed topic under a strict rate limit,
/// extracts title, body text, categories and content links, and stores
/// the records as JSON lines or in SQLite.
#[derive(Parser, Debug)]
#[command(name = "seedcrawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-site content crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Read seed topics from this TOML file instead of the config
    #[arg(long, value_name = "FILE")]
    topics: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit logs as JSON objects
    #[arg(long)]
    json_logs: bool,

    /// Validate config and topics and show what would be crawled
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the configured output and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.json_logs);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    let topics = load_topics(&config, cli.topics.as_deref())?;

    if cli.dry_run {
        handle_dry_run(&config, &topics);
        return Ok(());
    }

    handle_crawl(&config, &config_hash, &topics).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, json: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seedcrawl=info,warn"),
            1 => EnvFilter::new("seedcrawl=debug,info"),
            2 => EnvFilter::new("seedcrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(false)
        .with_file(false);

    if json {
        builder.json().with_current_span(false).init();
    } else {
        builder.with_target(false).init();
    }
}

fn load_topics(config: &Config, topics_file: Option<&Path>) -> anyhow::Result<TopicMap> {
    let topics = match topics_file {
        Some(path) => TopicFile::new(path)
            .load_topics()
            .with_context(|| format!("failed to load topics from {}", path.display()))?,
        None => InlineTopics::new(&config.topics)
            .load_topics()
            .context("failed to load topics from config")?,
    };
    Ok(topics)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, topics: &TopicMap) {
    println!("=== Seedcrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Delay between requests: {}s",
        config.crawler.rate_limit_delay
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages
    );
    println!(
        "  Retries: {} (backoff {}ms)",
        config.crawler.max_retries, config.crawler.retry_backoff
    );
    println!("  User-Agent: {}", config.user_agent.header_value());

    println!("\nSite:");
    println!("  Origin: {}", config.site.origin);
    println!("  Content prefix: {}", config.site.content_path_prefix);

    println!("\nOutput:");
    println!("  {:?}: {}", config.output.format, config.output.path);

    println!("\nTopics ({}):", topics.len());
    for topic in topics {
        println!("  - {}: {}", topic.name, topic.url);
    }

    let hosts = topics.hosts();
    if hosts.len() > 1 {
        println!("\n! Topics span {} hosts; the rate limit is shared", hosts.len());
    }

    println!("\n✓ Configuration is valid");
    let minimum = config.crawler.rate_limit_delay * topics.len().saturating_sub(1) as f64;
    println!(
        "✓ Would fetch {} pages, taking at least {:.1}s",
        topics.len(),
        minimum
    );
}

/// Handles the --stats mode: shows statistics from the configured output
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.output.path);
    println!("Output: {}\n", path.display());

    match config.output.format {
        OutputFormat::Sqlite => {
            let reader = SqliteSink::open_read_only(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let stats = load_statistics(&reader.queries())?;
            print_statistics(&stats);
        }
        OutputFormat::Jsonl => {
            let records = read_records(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let characters: usize = records.iter().map(|r| r.content_length()).sum();
            let links: usize = records.iter().map(|r| r.links().len()).sum();

            println!("=== Record File Statistics ===\n");
            println!("  Records: {}", records.len());
            println!("  Links recorded: {}", links);
            println!("  Body text: {} characters", characters);
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, topics: &TopicMap) -> anyhow::Result<()> {
    let events = build_event_sink(&config.events, "seedcrawl")
        .context("failed to open event sink")?;

    let stop = StopSignal::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing pages already in flight");
            interrupt.request_stop();
        }
    });

    let batch = crawl(config, topics, events, stop).await?;

    let stored = store_batch(config, config_hash, &batch);
    print_summary(&batch.summary, &batch.failures);
    stored
}

/// Persists the batch, rescuing the records to a JSON lines file on failure
fn store_batch(config: &Config, config_hash: &str, batch: &CrawlBatch) -> anyhow::Result<()> {
    let result = open_sink(&config.output, config_hash).and_then(|mut sink| {
        let stored = persist_batch(sink.as_mut(), batch)?;
        Ok((stored, sink.describe()))
    });

    match result {
        Ok((stored, target)) => {
            tracing::info!("Stored {} records in {}", stored, target);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to store records: {}", e);
            let path = fallback_path(&config.output);
            let mut fallback = JsonLinesSink::create(&path)?;
            fallback
                .store(&batch.records)
                .with_context(|| format!("fallback write to {} failed", path.display()))?;
            tracing::warn!(
                "Saved {} records to {} instead",
                batch.records.len(),
                path.display()
            );
            bail!("records could not be written to {}: {}", config.output.path, e)
        }
    }
}
