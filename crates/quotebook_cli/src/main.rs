//! Quotebook command-line front end.
//!
//! # Responsibility
//! - Parse commands and render results as plain text.
//! - Own process bootstrap: configuration, logging, storage, remote.
//!
//! # Invariants
//! - All data logic lives in `quotebook_core`; this binary only formats.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quotebook_core::{
    init_logging, log_startup, CategoryFilter, CycleOutcome, HttpRemoteSource, Quote,
    QuoteRepository, QuoteService, QuotebookConfig, SqliteKeyValueStore, ALL_CATEGORIES,
    DEFAULT_EXPORT_FILE_NAME,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const NO_QUOTES_MESSAGE: &str = "No quotes available for this category.";
const SYNCED_MESSAGE: &str = "Quotes synced with server!";

#[derive(Parser)]
#[command(name = "quotebook")]
#[command(version)]
#[command(about = "Quote cards with local persistence and server sync")]
struct Cli {
    /// SQLite database path
    #[arg(long, env = "QUOTEBOOK_DB_PATH")]
    db: Option<PathBuf>,

    /// Directory for rolling log files (absolute)
    #[arg(long, env = "QUOTEBOOK_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = "QUOTEBOOK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Session id. Session values are stored in the database and outlive a
    /// single run until `end-session` clears them.
    #[arg(long, env = "QUOTEBOOK_SESSION_ID")]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a random quote
    Random {
        /// Category to draw from; defaults to the saved selection
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a new quote
    Add { text: String, category: String },
    /// List categories
    Categories,
    /// Save the category selection and show a quote from it
    Filter { category: String },
    /// Show the last quote viewed in this session (kept across runs until end-session)
    Last,
    /// Sync quotes with the server once
    Sync,
    /// Sync quotes with the server periodically until Ctrl-C
    Watch {
        /// Seconds between syncs
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Append quotes from a JSON file
    Import { file: PathBuf },
    /// Write all quotes to a JSON file
    Export { file: Option<PathBuf> },
    /// End the current session, forgetting its last viewed quote
    EndSession,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = QuotebookConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = log_dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(session) = cli.session {
        config.session_id = session;
    }

    match init_logging(&config.log_level, &config.log_dir) {
        Ok(()) => log_startup(&config),
        Err(err) => eprintln!("logging disabled: {err}"),
    }

    let store = SqliteKeyValueStore::open(&config.db_path, &config.session_id)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let repo = QuoteRepository::load(store).context("failed to load quotes")?;
    let remote = HttpRemoteSource::new(&config.remote).context("failed to build http client")?;
    let service = QuoteService::new(repo, Arc::new(remote));

    match cli.command {
        Commands::Random { category } => {
            let filter = category.as_deref().map(CategoryFilter::parse);
            print_quote(service.show_random(filter).await?);
        }
        Commands::Add { text, category } => match service.add_quote(&text, &category).await {
            Ok(_) => {
                println!("Quote added successfully!");
                let pending = service.drain_publishes(config.remote.timeout).await;
                if pending > 0 {
                    eprintln!("Server did not confirm the new quote in time.");
                }
            }
            Err(err) if err.is_validation() => println!("Please fill in both fields!"),
            Err(err) => return Err(err.into()),
        },
        Commands::Categories => {
            let selected = service.selected_category().await?;
            let mut options = vec![ALL_CATEGORIES.to_string()];
            options.extend(service.categories().await);
            for option in options {
                let marker = if option == selected.as_str() { "*" } else { " " };
                println!("{marker} {option}");
            }
        }
        Commands::Filter { category } => {
            print_quote(
                service
                    .select_category(CategoryFilter::parse(&category))
                    .await?,
            );
        }
        Commands::Last => match service.last_viewed().await? {
            Some(quote) => println!("{quote}"),
            None => println!("No quote viewed in this session."),
        },
        Commands::Sync => {
            println!("Syncing quotes with server...");
            print_cycle(service.sync_now().await?);
        }
        Commands::Watch { interval_secs } => {
            let period = interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(config.sync_interval);
            println!("Syncing every {}s; press Ctrl-C to stop.", period.as_secs());
            let handle = service.start_periodic_sync(period);
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            handle.abort();
            println!("Stopped.");
        }
        Commands::Import { file } => {
            let added = service.import_file(&file).await?;
            println!("Quotes imported successfully! ({added} added)");
        }
        Commands::Export { file } => {
            let path = file.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE_NAME));
            let written = service.export_file(&path).await?;
            println!(
                "Quotes exported successfully! ({written} written to {})",
                path.display()
            );
        }
        Commands::EndSession => {
            service.end_session().await?;
            println!("Session ended.");
        }
    }

    log::logger().flush();
    Ok(())
}

fn print_quote(quote: Option<Quote>) {
    match quote {
        Some(quote) => println!("{quote}"),
        None => println!("{NO_QUOTES_MESSAGE}"),
    }
}

fn print_cycle(outcome: CycleOutcome) {
    match outcome {
        CycleOutcome::Completed(report) if !report.remote_available => {
            println!("{SYNCED_MESSAGE}");
            println!(
                "Server unavailable: {}",
                report.unavailable_reason.unwrap_or_default()
            );
        }
        CycleOutcome::Completed(report) => {
            println!("{SYNCED_MESSAGE}");
            println!(
                "{} new, {} already present.",
                report.accepted, report.rejected
            );
        }
        CycleOutcome::Skipped => println!("A sync is already in progress."),
    }
}
