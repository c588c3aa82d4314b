//! Command-line interface for seforim.
//!
//! Provides commands for running a full ingestion, ingesting a single
//! book, saving the table of contents, and inspecting the local store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::adapters::SefariaClient;
use crate::config::{self, ResolvedConfig};
use crate::core::{
    normalize, reference, AuditLog, Blacklist, DirectoryBuilder, DirectoryOptions, IngestContext,
    VersePipeline,
};
use crate::store::Store;

/// seforim - Sefaria corpus ingestion
#[derive(Parser, Debug)]
#[command(name = "seforim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the resolved configuration
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Output directory for the generated tree
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Verses processed concurrently
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// API root URL
    #[arg(long)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest the whole corpus
    Ingest {
        /// Only these root categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Build the directory tree without fetching verses
        #[arg(long)]
        no_books: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Ingest a single book (complex books expand to their parts)
    Book {
        /// Book title, e.g. "Genesis"
        title: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Fetch and save the table of contents
    Toc {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Normalize a citation and show the resolved chapter/verse
    Normalize {
        /// Raw citation, e.g. "Leviticus 6:2"
        reference: String,

        /// Title of the citing book, stripped before normalizing
        #[arg(long, default_value = "")]
        index_title: String,
    },

    /// Print a stored verse as JSON
    Verse {
        book: String,
        chapter: u32,
        verse: u32,

        /// SQLite database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print a stored book index as JSON
    Index {
        book: String,

        /// SQLite database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Ingest {
                categories,
                no_books,
                run,
            } => ingest_all(&run, categories, no_books).await,
            Commands::Book { title, run } => ingest_book(&run, &title).await,
            Commands::Toc { run } => save_toc(&run).await,
            Commands::Normalize {
                reference,
                index_title,
            } => show_normalized(&reference, &index_title),
            Commands::Verse {
                book,
                chapter,
                verse,
                database,
            } => show_verse(database, &book, chapter, verse),
            Commands::Index { book, database } => show_index(database, &book),
            Commands::Config => show_config(),
        }
    }
}

/// Configuration with command-line overrides applied
fn resolve(run: &RunArgs) -> Result<ResolvedConfig> {
    let mut cfg = config::config()?.clone();

    if let Some(output) = &run.output {
        // A custom output keeps the database next to it unless set explicitly
        if cfg.database == cfg.output.join("seforim.db") {
            cfg.database = output.join("seforim.db");
        }
        cfg.output = output.clone();
    }
    if let Some(database) = &run.database {
        cfg.database = database.clone();
    }
    if let Some(concurrency) = run.concurrency {
        cfg.concurrency = concurrency.max(1);
    }
    if let Some(api_url) = &run.api_url {
        cfg.api.base_url = api_url.clone();
    }

    Ok(cfg)
}

fn open_store(path: &std::path::Path) -> Result<Store> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Store::open(path).with_context(|| format!("Failed to open database: {}", path.display()))
}

fn open_context(cfg: &ResolvedConfig) -> Result<IngestContext> {
    std::fs::create_dir_all(&cfg.output)
        .with_context(|| format!("Failed to create output directory: {}", cfg.output.display()))?;

    let client = SefariaClient::new(cfg.api.clone()).context("Failed to create API client")?;
    let store = open_store(&cfg.database)?;

    Ok(IngestContext::new(Arc::new(client), store)
        .with_blacklist(Blacklist::with_defaults(&cfg.blacklist))
        .with_audit(AuditLog::in_dir(&cfg.output))
        .with_concurrency(cfg.concurrency))
}

async fn ingest_all(run: &RunArgs, categories: Vec<String>, no_books: bool) -> Result<()> {
    let cfg = resolve(run)?;
    let ctx = open_context(&cfg)?;

    eprintln!("Ingesting into {}", cfg.output.display());
    eprintln!("Database: {}", cfg.database.display());

    let builder = DirectoryBuilder::new(
        VersePipeline::new(ctx),
        cfg.output.clone(),
        DirectoryOptions {
            create_books: cfg.create_books && !no_books,
            categories,
        },
    );

    let outcome = builder.run().await.context("Ingestion aborted")?;
    let report = &outcome.report;

    eprintln!("\n[Run {} completed]", report.id);
    eprintln!("  Categories:      {}", outcome.roots.len());
    eprintln!("  Books processed: {}", report.books_processed);
    eprintln!("  Books failed:    {}", report.books_failed);
    eprintln!("  Verses written:  {}", report.verses_written);
    eprintln!("  Verses skipped:  {}", report.verses_skipped);
    eprintln!("  Unresolved refs: {}", report.unresolved_refs);

    Ok(())
}

async fn ingest_book(run: &RunArgs, title: &str) -> Result<()> {
    let cfg = resolve(run)?;
    let pipeline = VersePipeline::new(open_context(&cfg)?);

    let book_run = pipeline
        .ingest_book(title)
        .await
        .with_context(|| format!("Failed to ingest '{}'", title))?;

    println!("{:<40} {:>8} {:>8} {:>10}", "BOOK", "WRITTEN", "SKIPPED", "UNRESOLVED");
    println!("{}", "-".repeat(70));
    for report in &book_run.reports {
        println!(
            "{:<40} {:>8} {:>8} {:>10}",
            report.title, report.verses_written, report.verses_skipped, report.unresolved_refs
        );
    }
    for failed in &book_run.failed {
        println!("{:<40} {:>8}", failed, "FAILED");
    }

    Ok(())
}

async fn save_toc(run: &RunArgs) -> Result<()> {
    let cfg = resolve(run)?;
    let builder = DirectoryBuilder::new(
        VersePipeline::new(open_context(&cfg)?),
        cfg.output.clone(),
        DirectoryOptions::default(),
    );

    let toc = builder.save_toc().await.context("Failed to fetch table of contents")?;
    eprintln!(
        "Saved {} root categories to {}",
        toc.len(),
        cfg.output.display()
    );
    Ok(())
}

fn show_normalized(raw: &str, index_title: &str) -> Result<()> {
    let stripped = reference::strip_title_prefix(raw, index_title);
    println!("Normalized: {}", normalize(stripped));

    match reference::resolve(raw, index_title) {
        Ok(citation) => println!("Chapter: {}  Verse: {}", citation.chapter, citation.verse),
        Err(e) => println!("Unresolved: {}", e),
    }
    Ok(())
}

fn store_for(database: Option<PathBuf>) -> Result<Store> {
    let path = match database {
        Some(path) => path,
        None => config::config()?.database.clone(),
    };

    if !path.exists() {
        anyhow::bail!("Database not found: {}", path.display());
    }
    Store::open_read_only(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

fn show_verse(database: Option<PathBuf>, book: &str, chapter: u32, verse: u32) -> Result<()> {
    let store = store_for(database)?;
    let record = store
        .get_verse(book, chapter, verse)?
        .with_context(|| format!("No verse {} {}:{}", book, chapter, verse))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn show_index(database: Option<PathBuf>, book: &str) -> Result<()> {
    let store = store_for(database)?;
    let index = store
        .get_book_index(book)?
        .with_context(|| format!("No index for '{}'", book))?;

    println!("{}", serde_json::to_string_pretty(&index)?);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Seforim Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Output:   {}", cfg.output.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("API:");
    println!("  Base URL:        {}", cfg.api.base_url);
    println!("  Request timeout: {}s", cfg.api.request_timeout.as_secs());
    println!("  Deadline:        {}s", cfg.api.deadline.as_secs());
    println!(
        "  Retry:           {} attempts, {}ms initial, x{}, {}ms cap",
        cfg.api.retry.max_attempts,
        cfg.api.retry.initial_delay_ms,
        cfg.api.retry.backoff_multiplier,
        cfg.api.retry.max_delay_ms
    );
    println!();
    println!("Ingest:");
    println!("  Concurrency:  {}", cfg.concurrency);
    println!("  Create books: {}", cfg.create_books);
    if cfg.blacklist.is_empty() {
        println!("  Extra blacklist: (none)");
    } else {
        println!("  Extra blacklist:");
        for entry in &cfg.blacklist {
            println!("    {}", entry);
        }
    }

    Ok(())
}
