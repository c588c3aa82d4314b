//! Audit log of citations that could not be resolved.
//!
//! Entries are appended as newline-delimited JSON (JSONL) to
//! `unresolved_refs.jsonl` in the output directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::IngestError;

pub const AUDIT_FILE: &str = "unresolved_refs.jsonl";

/// One unresolved citation, with the verse it was attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub index_title: String,
    pub raw_ref: String,
    pub normalized: String,
}

/// Append-only JSONL audit log
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Audit log inside `output_dir`, created on first write
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(AUDIT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append entries in order
    pub async fn append(&self, entries: &[AuditEntry]) -> Result<(), IngestError> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut buffer = String::new();
        for entry in entries {
            buffer.push_str(&serde_json::to_string(entry)?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Read back every entry
    pub async fn replay(&self) -> Result<Vec<AuditEntry>, IngestError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut entries = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }
}
