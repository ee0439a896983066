//! Bookmark-Sync main entry point
//!
//! This is the command-line interface for the bookmarks timeline follower.

use anyhow::Context;
use bookmark_sync::config::{load_config_with_hash, Config};
use bookmark_sync::output::{load_statistics, print_statistics};
use bookmark_sync::storage::{open_storage, ArchiveConsumer, RunStatus, Storage};
use bookmark_sync::sync::{BookmarkConsumer, ChainEnd, SyncEngine, SyncScheduler};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Bookmark-Sync: follows a bookmarks timeline and archives every item
///
/// Bookmark-Sync bootstraps a logged-in browser session, discovers the
/// private API identifiers and walks the bookmarks timeline on a schedule,
/// archiving each item into SQLite.
#[derive(Parser, Debug)]
#[command(name = "bookmark-sync")]
#[command(version = "1.0.0")]
#[command(about = "A resumable bookmarks timeline follower", long_about = None)]
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

    /// Remove each bookmark upstream after archiving it
    #[arg(long, conflicts_with_all = ["discover", "stats"])]
    remove: bool,

    /// Run a single chain and exit
    #[arg(long, conflicts_with_all = ["discover", "stats"])]
    once: bool,

    /// Discover API identifiers, print them as config keys and exit
    #[arg(long, conflicts_with_all = ["once", "stats"])]
    discover: bool,

    /// Show statistics from the archive and exit
    #[arg(long, conflicts_with_all = ["once", "discover"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)
    } else if cli.discover {
        handle_discover(&config).await
    } else {
        handle_sync(&config, &config_hash, cli.remove, cli.once).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bookmark_sync=info,warn"),
            1 => EnvFilter::new("bookmark_sync=debug,info"),
            2 => EnvFilter::new("bookmark_sync=trace,debug"),
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

/// Handles the --stats mode: shows statistics from the archive
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open archive")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --discover mode: prints fresh identifiers as config keys
async fn handle_discover(config: &Config) -> anyhow::Result<()> {
    let engine = SyncEngine::from_config(config)?;
    let identifiers = engine.bootstrap().await.context("bootstrap failed")?;

    let mut record = config.session_record();
    record.access_token = identifiers.bearer_token;
    record.list_operation_id = identifiers.list_operation_id;
    record.delete_operation_id = identifiers.delete_operation_id;

    print!("{}", toml::to_string(&record)?);
    Ok(())
}

/// Handles the main sync operation
///
/// Default mode follows the list from the top and stops each chain at the
/// first archived item. `remove` resumes from the stored cursor and deletes
/// each item upstream once archived.
async fn handle_sync(
    config: &Config,
    config_hash: &str,
    remove: bool,
    once: bool,
) -> anyhow::Result<()> {
    let engine = Arc::new(SyncEngine::from_config(config)?);

    let mut storage = open_storage(Path::new(&config.output.database_path))
        .context("failed to open archive")?;
    let run_id = storage.create_run(config_hash)?;
    tracing::info!("Started run {}", run_id);

    let (consumer, removals) = if remove {
        let (consumer, rx) = ArchiveConsumer::removing(storage, run_id);
        (Arc::new(consumer), Some(rx))
    } else {
        (Arc::new(ArchiveConsumer::catch_up(storage, run_id)), None)
    };
    let deleter = removals.map(|rx| spawn_deleter(engine.clone(), consumer.clone(), rx));

    let result = if once {
        run_once(&engine, consumer.as_ref(), remove).await
    } else {
        run_scheduled(&engine, consumer.clone(), config, remove).await
    };

    consumer.close_removals();
    if let Some(deleter) = deleter {
        tracing::info!("Waiting for queued removals");
        if let Err(e) = deleter.await {
            tracing::error!("Removal task panicked: {}", e);
        }
    }

    let status = if result.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    consumer.finish_run(status)?;
    tracing::info!(
        "Run {} finished ({}), {} new bookmarks archived",
        run_id,
        status.to_db_string(),
        consumer.archived()
    );

    result
}

async fn run_once(
    engine: &SyncEngine,
    consumer: &dyn BookmarkConsumer,
    resume: bool,
) -> anyhow::Result<()> {
    engine.bootstrap().await.context("bootstrap failed")?;

    let Some(report) = engine.run_chain(resume, consumer).await else {
        return Ok(());
    };
    println!(
        "Fetched {} pages in {} requests, delivered {} items ({} empty)",
        report.pages, report.attempts, report.delivered, report.empty
    );

    match report.end {
        ChainEnd::Failed(e) => Err(e).context("chain failed"),
        ChainEnd::RetriesExhausted { errors } => Err(anyhow::anyhow!(
            "API failed {} times, last error: {}",
            errors.len(),
            errors.last().map(String::as_str).unwrap_or("")
        )),
        ChainEnd::Exhausted | ChainEnd::ConsumerStopped => Ok(()),
    }
}

async fn run_scheduled(
    engine: &Arc<SyncEngine>,
    consumer: Arc<ArchiveConsumer>,
    config: &Config,
    resume: bool,
) -> anyhow::Result<()> {
    let mut scheduler = SyncScheduler::new(engine.clone(), consumer)
        .with_interval(config.engine.fetch_interval());
    scheduler.start(resume).await.context("bootstrap failed")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Interrupted, stopping scheduler");
    scheduler.stop().await;

    Ok(())
}

/// Runs the consumer's removal loop on its own task
fn spawn_deleter(
    engine: Arc<SyncEngine>,
    consumer: Arc<ArchiveConsumer>,
    rx: mpsc::UnboundedReceiver<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move { consumer.process_removals(&engine, rx).await })
}
