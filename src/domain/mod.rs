//! Domain types for the ingestion pipeline.
//!
//! This module contains the core data structures:
//! - Toc: remote table of contents and the generated directory index
//! - Book: shape, schema and persisted book index
//! - Verse: verse records and typed commentary
//! - Report: run/book summaries

pub mod book;
pub mod report;
pub mod toc;
pub mod verse;

// Re-export commonly used types
pub use book::{BookIndex, BookSchema, BookType, ChapterIndex, ShapeItem};
pub use report::{BookReport, RunReport};
pub use toc::{ContentNode, DirectoryNode};
pub use verse::{CommentaryCategory, CommentaryEntry, Commentator, Reference, TextWithRef, Verse};
