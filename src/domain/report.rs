//! Run and book summaries.
//!
//! A run has no user-facing error surface; its outcome is the log and
//! the `run.json` summary written next to the generated index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of running the verse pipeline on one book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReport {
    pub title: String,
    pub verses_written: u64,
    pub verses_skipped: u64,
    pub unresolved_refs: u64,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub id: Uuid,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub books_processed: u64,

    pub books_failed: u64,

    pub verses_written: u64,

    pub verses_skipped: u64,

    pub unresolved_refs: u64,

    /// Titles of books whose pipeline failed
    #[serde(default)]
    pub failed_books: Vec<String>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            books_processed: 0,
            books_failed: 0,
            verses_written: 0,
            verses_skipped: 0,
            unresolved_refs: 0,
            failed_books: Vec::new(),
        }
    }

    /// Fold a finished book into the totals
    pub fn record_book(&mut self, book: &BookReport) {
        self.books_processed += 1;
        self.verses_written += book.verses_written;
        self.verses_skipped += book.verses_skipped;
        self.unresolved_refs += book.unresolved_refs;
    }

    pub fn record_failure(&mut self, title: impl Into<String>) {
        self.books_failed += 1;
        self.failed_books.push(title.into());
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = RunReport::new();
        report.record_book(&BookReport {
            title: "Ruth".to_string(),
            verses_written: 85,
            verses_skipped: 0,
            unresolved_refs: 2,
        });
        report.record_book(&BookReport {
            title: "Esther".to_string(),
            verses_written: 160,
            verses_skipped: 7,
            unresolved_refs: 0,
        });
        report.record_failure("Tur");
        report.complete();

        assert_eq!(report.books_processed, 2);
        assert_eq!(report.books_failed, 1);
        assert_eq!(report.verses_written, 245);
        assert_eq!(report.verses_skipped, 7);
        assert_eq!(report.unresolved_refs, 2);
        assert_eq!(report.failed_books, vec!["Tur".to_string()]);
        assert!(report.completed_at.is_some());
    }
}
