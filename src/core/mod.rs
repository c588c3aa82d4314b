//! Core ingestion logic.
//!
//! This module contains:
//! - Daf: Talmud page/side addressing
//! - Reference: citation normalization
//! - Blacklist: excluded books and commentators
//! - Shape / Schema: book structure discovery
//! - Commentary: link aggregation and commentator paths
//! - Pipeline: bounded-concurrency verse ingestion
//! - Directory: table-of-contents traversal and index output
//! - Audit: unresolved-citation log

pub mod audit;
pub mod blacklist;
pub mod commentary;
pub mod daf;
pub mod directory;
pub mod pipeline;
pub mod reference;
pub mod schema;
pub mod shape;

// Re-export commonly used types
pub use audit::{AuditEntry, AuditLog};
pub use blacklist::Blacklist;
pub use commentary::{aggregate, CommentatorCache, LinkRecord};
pub use directory::{DirectoryBuilder, DirectoryOptions, DirectoryOutcome};
pub use pipeline::{build_book_index, BookRun, IngestContext, VersePipeline, DEFAULT_CONCURRENCY};
pub use reference::{normalize, resolve, Citation};
pub use shape::{resolve_shape, BookShape};
