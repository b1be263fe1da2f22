//! Forage main entry point
//!
//! This is the command-line interface for the Forage crawler and search engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use forage::config::{load_config_with_hash, Config};
use forage::crawler::{crawl, seed, CrawlOptions};
use forage::output::{load_statistics, print_crawl_summary, print_results, print_statistics};
use forage::search::{
    build_index_from_path, read_index, write_index, write_lengths, SearchEngine, DOCUMENTS_FILE,
    WORD_IDS_FILE,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Forage: a polite single-site crawler with tf-idf search
///
/// Forage crawls one site while respecting robots.txt and adapting its
/// request rate to the server's feedback, checkpoints its progress so a
/// crawl survives restarts, and searches extracted page records with a
/// tf-idf ranked inverted index.
#[derive(Parser, Debug)]
#[command(name = "forage")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-site crawler with tf-idf search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Also write logs to daily rotating files in this directory
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured site, resuming from the checkpoint if present
    Crawl {
        /// Start a fresh crawl, ignoring the stored checkpoint
        #[arg(long)]
        fresh: bool,

        /// Stop after this many iterations
        #[arg(long, value_name = "N")]
        max_iterations: Option<u64>,
    },

    /// Build the inverted index and precompute document lengths
    Index {
        /// Tab-separated extract to index (defaults to `index.input`)
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,

        /// Directory for the index artifacts (defaults to `index.output-dir`)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Recompute document lengths for an existing index
    Precompute {
        /// Index directory (defaults to `index.output-dir`)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Search the index, interactively unless --query is given
    Search {
        /// Index directory (defaults to `index.output-dir`)
        #[arg(long, value_name = "DIR")]
        index: Option<PathBuf>,

        /// Number of results to show (defaults to `search.top-k`)
        #[arg(long, value_name = "K")]
        top_k: Option<usize>,

        /// Run a single query and exit
        #[arg(long, value_name = "QUERY")]
        query: Option<String>,

        /// Show term weights and per-term score contributions
        #[arg(long)]
        explain: bool,
    },

    /// Show statistics from the crawl checkpoint
    Stats,

    /// Put URLs at the head of the checkpointed queue
    Seed {
        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// Validate the config and show what would be crawled
    DryRun,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = setup_logging(cli.verbose, cli.quiet, cli.log_dir.as_deref())?;

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Crawl {
            fresh,
            max_iterations,
        } => handle_crawl(&config, fresh, max_iterations).await,
        Command::Index { input, output } => {
            let input = input.unwrap_or_else(|| config.index.input.clone());
            let output = output.unwrap_or_else(|| config.index.output_dir.clone());
            handle_index(&input, &output)
        }
        Command::Precompute { output } => {
            let output = output.unwrap_or_else(|| config.index.output_dir.clone());
            handle_precompute(&output)
        }
        Command::Search {
            index,
            top_k,
            query,
            explain,
        } => {
            let index = index.unwrap_or_else(|| config.index.output_dir.clone());
            let top_k = top_k.unwrap_or(config.search.top_k).max(1);
            handle_search(&index, top_k, query.as_deref(), explain)
        }
        Command::Stats => handle_stats(&config),
        Command::Seed { urls } => handle_seed(&config, &urls),
        Command::DryRun => {
            handle_dry_run(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Returns the worker guard of the file appender when `log_dir` is set.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forage=info,warn"),
            1 => EnvFilter::new("forage=debug,info"),
            2 => EnvFilter::new("forage=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "forage.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    fresh: bool,
    max_iterations: Option<u64>,
) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring stored checkpoint)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoint if present)");
    }
    tracing::info!(
        base_url = %config.crawler.base_url,
        delay = config.crawler.initial_crawl_delay,
        "Crawl target"
    );

    let summary = crawl(
        config,
        CrawlOptions {
            fresh,
            max_iterations,
        },
    )
    .await
    .context("crawl failed")?;

    print_crawl_summary(&summary);
    Ok(())
}

/// Handles `index`: builds the index and writes every artifact
fn handle_index(input: &Path, output: &Path) -> anyhow::Result<()> {
    let (mut index, report) = build_index_from_path(input)
        .with_context(|| format!("failed to build index from {}", input.display()))?;
    write_index(&index, output)?;

    index.compute_wf_lengths();
    write_lengths(&index, output)?;

    println!(
        "Indexed {} documents ({} words, {} rows skipped) into {}",
        report.documents,
        report.words,
        report.skipped_rows,
        output.display()
    );
    Ok(())
}

/// Handles `precompute`: recomputes `documents_w_length.json` from the base artifacts
fn handle_precompute(dir: &Path) -> anyhow::Result<()> {
    let mut index = read_index(dir, DOCUMENTS_FILE).with_context(|| {
        format!(
            "failed to load {} and {} from {}",
            DOCUMENTS_FILE,
            WORD_IDS_FILE,
            dir.display()
        )
    })?;
    index.compute_wf_lengths();
    write_lengths(&index, dir)?;

    println!(
        "Precomputed lengths for {} documents in {}",
        index.documents.len(),
        dir.display()
    );
    Ok(())
}

/// Handles `search`: one query, or a prompt loop until EOF or `exit`
fn handle_search(
    dir: &Path,
    top_k: usize,
    query: Option<&str>,
    explain: bool,
) -> anyhow::Result<()> {
    let engine = SearchEngine::open(dir)?;

    if let Some(query) = query {
        print_results(&engine.search(query, top_k), explain);
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Enter a search query: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        print_results(&engine.search(query, top_k), explain);
    }

    tracing::info!("Exiting search");
    Ok(())
}

/// Handles `stats`: shows statistics from the checkpoint database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Checkpoint: {}\n", config.storage.checkpoint_path.display());

    match load_statistics(config)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No checkpoint found; no crawl has been run yet."),
    }
    Ok(())
}

/// Handles `seed`: prepends URLs to the checkpointed queue
fn handle_seed(config: &Config, urls: &[String]) -> anyhow::Result<()> {
    let placed = seed(config, urls).context("failed to seed the frontier")?;
    println!(
        "Placed {} of {} URLs at the head of the queue",
        placed,
        urls.len()
    );
    Ok(())
}

/// Handles `dry-run`: prints the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Forage Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Checkpoint every: {} saved pages", config.crawler.save_interval);
    println!("  Initial crawl delay: {}s", config.crawler.initial_crawl_delay);
    println!("  Minimum delay on resume: {}s", config.crawler.resume_min_delay);
    println!("  Reorder interval: {}", config.crawler.reorder_interval);
    println!("  Page load timeout: {}s", config.crawler.page_load_timeout);
    println!("  Product detail prefix: {}", config.crawler.detail_path_prefix);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Pages: {}", config.storage.data_dir.display());
    println!("  Ledger: {}", config.storage.ledger_path.display());
    println!("  Checkpoint: {}", config.storage.checkpoint_path.display());

    println!("\nIndex:");
    println!("  Input: {}", config.index.input.display());
    println!("  Output: {}", config.index.output_dir.display());
    println!("  Top-k: {}", config.search.top_k);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling at {} after fetching {}/robots.txt",
        config.crawler.base_url, config.crawler.base_url
    );
}
