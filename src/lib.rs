//! seforim - Sefaria corpus ingestion
//!
//! Ingests the Sefaria library into a local SQLite store (one record per
//! verse, with its commentaries) and a navigable category index.
//!
//! # Architecture
//!
//! The run is a batch job:
//! - The table of contents is walked and mirrored as directories
//! - Each book's shape and schema decide its chapters and addressing
//! - Verses are fetched and stored concurrently, bounded by a semaphore
//! - Book indices are written once every verse task has joined
//!
//! # Modules
//!
//! - `adapters`: Remote API seam (Fetcher, SefariaClient, RetryPolicy)
//! - `core`: Ingestion logic (shape, schema, references, pipeline, directory)
//! - `domain`: Data structures (Verse, BookIndex, DirectoryNode)
//! - `store`: SQLite persistence
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Ingest everything under one category
//! seforim ingest --category Tanakh
//!
//! # Ingest a single book
//! seforim book Genesis
//!
//! # Read a verse back
//! seforim verse Genesis 1 1
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod store;

// Re-export main types at crate root for convenience
pub use adapters::{Fetcher, RetryPolicy, SefariaClient};
pub use core::{DirectoryBuilder, DirectoryOptions, IngestContext, VersePipeline};
pub use domain::{BookIndex, DirectoryNode, Verse};
pub use error::IngestError;
pub use store::{Store, StoreError};
