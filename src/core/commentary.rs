//! Commentary aggregation.
//!
//! `/links/{ref}` returns one record per linked text. Records are grouped
//! by the commentator's collective title, their citations resolved to
//! (chapter, verse), and each group becomes one typed `CommentaryEntry`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::blacklist::Blacklist;
use super::reference;
use super::schema::load_schema;
use crate::adapters::Fetcher;
use crate::domain::{CommentaryCategory, CommentaryEntry, Commentator, Reference, TextWithRef};
use crate::error::IngestError;

/// Group name used when a record has no collective title
const UNKNOWN_COMMENTATOR: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CollectiveTitle {
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub he: Option<String>,
}

/// One record of a `/links` response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(default, rename = "index_title")]
    pub index_title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source_ref: String,
    #[serde(default)]
    pub source_he_ref: String,
    #[serde(default)]
    pub collective_title: CollectiveTitle,
    /// Hebrew text: a string or (nested) arrays of strings
    #[serde(default)]
    pub he: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
}

impl LinkRecord {
    /// Name the record is grouped under: Hebrew, then English collective title
    pub fn group_name(&self) -> &str {
        [
            self.collective_title.he.as_deref(),
            self.collective_title.en.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_COMMENTATOR)
    }

    fn is_blacklisted(&self, blacklist: &Blacklist) -> bool {
        blacklist.contains(&self.index_title)
            || self
                .collective_title
                .en
                .as_deref()
                .is_some_and(|name| blacklist.contains(name))
    }

    /// Linked text, Hebrew preferred
    pub fn content(&self) -> String {
        let he = self.he.as_ref().map(flatten_text).unwrap_or_default();
        if !he.is_empty() {
            return he;
        }
        self.text.as_ref().map(flatten_text).unwrap_or_default()
    }
}

/// Join a string or nested arrays of strings with spaces
pub fn flatten_text(value: &Value) -> String {
    fn walk(value: &Value, parts: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    parts.push(s.to_string());
                }
            }
            Value::Array(items) => items.iter().for_each(|item| walk(item, parts)),
            _ => {}
        }
    }

    let mut parts = Vec::new();
    walk(value, &mut parts);
    parts.join(" ")
}

/// Decode a `/links` payload, skipping malformed records
pub fn parse_links(payload: &Value) -> Result<Vec<LinkRecord>, IngestError> {
    let records = payload
        .as_array()
        .ok_or_else(|| IngestError::parse("links", "expected an array of link records"))?;

    Ok(records
        .iter()
        .filter_map(|record| match LinkRecord::deserialize(record) {
            Ok(link) => Some(link),
            Err(e) => {
                debug!(error = %e, "Skipping malformed link record");
                None
            }
        })
        .collect())
}

/// Citation that could not be mapped to a chapter/verse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub index_title: String,
    pub raw_ref: String,
    pub normalized: String,
}

/// Result of aggregating the links of one verse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    /// One entry per commentator, in order of first appearance
    pub entries: Vec<CommentaryEntry>,
    pub unresolved: Vec<UnresolvedRef>,
}

impl Aggregated {
    /// Names of commentators in the `Commentary` category
    pub fn commentator_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.category == CommentaryCategory::Commentary)
            .map(|entry| entry.commentator.name.as_str())
    }
}

/// Group link records into commentary entries.
///
/// Commentator paths are left equal to the book id; see
/// [`CommentatorCache::fill_paths`].
pub fn aggregate(records: &[LinkRecord], blacklist: &Blacklist) -> Aggregated {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&LinkRecord>> = HashMap::new();

    for record in records.iter().filter(|r| !r.is_blacklisted(blacklist)) {
        let name = record.group_name();
        groups
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(record);
    }

    let mut aggregated = Aggregated::default();

    for name in order {
        let Some(members) = groups.get(name) else {
            continue;
        };
        let Some(first) = members.first() else {
            continue;
        };

        let mut texts = Vec::new();
        for member in members {
            let citation = match reference::resolve(&member.source_ref, &member.index_title) {
                Ok(citation) => citation,
                Err(IngestError::Reference { raw, normalized }) => {
                    aggregated.unresolved.push(UnresolvedRef {
                        index_title: member.index_title.clone(),
                        raw_ref: raw,
                        normalized,
                    });
                    continue;
                }
                Err(_) => continue,
            };

            let text = member.content();
            if text.is_empty() {
                continue;
            }

            texts.push(TextWithRef {
                text,
                reference: Reference {
                    chapter: citation.chapter,
                    verse: citation.verse,
                    raw_ref: member.source_ref.clone(),
                    he_ref: member.source_he_ref.clone(),
                },
            });
        }

        if texts.is_empty() {
            continue;
        }

        aggregated.entries.push(CommentaryEntry {
            category: CommentaryCategory::classify(&first.category),
            commentator: Commentator {
                name: name.to_string(),
                book_id: first.index_title.clone(),
                path: first.index_title.clone(),
            },
            texts,
        });
    }

    aggregated
}

/// Run-scoped cache of commentator paths, keyed by index title
#[derive(Debug, Clone, Default)]
pub struct CommentatorCache {
    paths: Arc<RwLock<HashMap<String, String>>>,
}

impl CommentatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a path without fetching
    pub async fn insert(&self, index_title: impl Into<String>, path: impl Into<String>) {
        self.paths.write().await.insert(index_title.into(), path.into());
    }

    pub async fn len(&self) -> usize {
        self.paths.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Place of a commentator's book in the category hierarchy.
    ///
    /// `Category/Sub/Title`, or just the title when the schema has no
    /// categories or cannot be fetched.
    pub async fn path_for(&self, fetcher: &dyn Fetcher, index_title: &str) -> String {
        if let Some(path) = self.paths.read().await.get(index_title) {
            return path.clone();
        }

        let schema = load_schema(fetcher, index_title).await;
        let path = if schema.categories.is_empty() {
            index_title.to_string()
        } else {
            format!("{}/{}", schema.categories.join("/"), index_title)
        };

        self.paths
            .write()
            .await
            .entry(index_title.to_string())
            .or_insert(path)
            .clone()
    }

    /// Resolve the path of every entry's commentator
    pub async fn fill_paths(&self, fetcher: &dyn Fetcher, entries: &mut [CommentaryEntry]) {
        for entry in entries.iter_mut() {
            if entry.commentator.book_id.is_empty() {
                continue;
            }
            entry.commentator.path = self.path_for(fetcher, &entry.commentator.book_id).await;
        }
    }
}
