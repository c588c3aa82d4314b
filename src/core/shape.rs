//! Shape resolution: chapter/verse counts of a book.
//!
//! `/shape/{title}` describes a book as an array whose first element either
//! carries the chapter counts directly or, with `isComplex: true`, lists
//! sub-book descriptors under `chapters`. The wire `chapters` field may be
//! an integer, a flat array of integers or an array of arrays; it is
//! normalized here and nowhere else.

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::adapters::{encode_title, fetch_json, Fetcher};
use crate::domain::ShapeItem;
use crate::error::IngestError;

/// Resolved structure of a top-level book
#[derive(Debug, Clone, PartialEq)]
pub struct BookShape {
    /// Book is split into sub-books
    pub complex: bool,
    /// One item for a simple book, one per sub-book otherwise
    pub items: Vec<ShapeItem>,
}

/// Normalize a wire `chapters` value into verse counts per chapter.
///
/// Zero-verse chapters are dropped. Mixed or unknown forms give an
/// empty list.
pub fn normalize_chapters(raw: &Value) -> Vec<u32> {
    match raw {
        Value::Number(n) => n
            .as_u64()
            .filter(|&count| count > 0)
            .map(|count| vec![count as u32])
            .unwrap_or_default(),
        Value::Array(items) if items.iter().all(Value::is_u64) => items
            .iter()
            .filter_map(Value::as_u64)
            .filter(|&count| count > 0)
            .map(|count| count as u32)
            .collect(),
        Value::Array(items) if items.iter().all(Value::is_array) => items
            .iter()
            .filter_map(Value::as_array)
            .map(|verses| verses.len() as u32)
            .filter(|&count| count > 0)
            .collect(),
        other => {
            debug!(chapters = %other, "Unsupported chapters structure");
            Vec::new()
        }
    }
}

fn is_complex(node: &Value) -> bool {
    node.get("isComplex").and_then(Value::as_bool).unwrap_or(false)
}

fn str_field<'a>(node: &'a Value, key: &str) -> Option<&'a str> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Build a simple item, filling missing fields from `parent`
fn simple_item(node: &Value, parent: &ShapeItem) -> ShapeItem {
    let title = str_field(node, "title").unwrap_or(&parent.title).to_string();
    ShapeItem {
        section: str_field(node, "section").unwrap_or(&parent.section).to_string(),
        he_title: str_field(node, "heTitle").unwrap_or(&parent.he_title).to_string(),
        book: str_field(node, "book").unwrap_or(&parent.book).to_string(),
        he_book: str_field(node, "heBook").unwrap_or(&parent.he_book).to_string(),
        chapters: node.get("chapters").map(normalize_chapters).unwrap_or_default(),
        title,
    }
}

/// Walk sub-book descriptors of a complex node, depth first
fn collect_sub_books(node: &Value, parent: &ShapeItem, out: &mut Vec<ShapeItem>) {
    let Some(children) = node.get("chapters").and_then(Value::as_array) else {
        return;
    };

    for child in children {
        if !child.is_object() {
            debug!(book = %parent.book, "Skipping non-object sub-book descriptor");
            continue;
        }

        if str_field(child, "title").is_none() {
            debug!(book = %parent.book, "Skipping sub-book without title");
            continue;
        }

        let nested = child
            .get("chapters")
            .and_then(Value::as_array)
            .is_some_and(|c| c.iter().any(Value::is_object));

        if is_complex(child) || nested {
            let inner = simple_item(child, parent);
            collect_sub_books(child, &inner, out);
        } else {
            out.push(simple_item(child, parent));
        }
    }
}

/// Decode a `/shape/{title}` payload
pub fn parse_shape(title: &str, payload: &Value) -> Result<BookShape, IngestError> {
    let first = match payload {
        Value::Array(entries) => entries.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    }
    .ok_or_else(|| IngestError::parse(format!("shape of {}", title), "empty shape payload"))?;

    if !first.is_object() {
        return Err(IngestError::parse(
            format!("shape of {}", title),
            "shape entry is not an object",
        ));
    }

    let root = ShapeItem {
        section: String::new(),
        title: title.to_string(),
        he_title: String::new(),
        book: title.to_string(),
        he_book: String::new(),
        chapters: Vec::new(),
    };

    if is_complex(first) {
        let parent = simple_item(first, &root);
        let mut items = Vec::new();
        collect_sub_books(first, &parent, &mut items);
        return Ok(BookShape {
            complex: true,
            items,
        });
    }

    // A simple payload may list several books; each one is its own item
    let entries: Vec<&Value> = match payload {
        Value::Array(entries) => entries.iter().collect(),
        _ => vec![payload],
    };

    let items = entries
        .into_iter()
        .filter(|entry| {
            let keep = entry.is_object();
            if !keep {
                debug!(book = %title, "Skipping non-object shape entry");
            }
            keep
        })
        .map(|entry| simple_item(entry, &root))
        .collect();

    Ok(BookShape {
        complex: false,
        items,
    })
}

/// Fetch and decode the shape of a book
#[instrument(skip(fetcher))]
pub async fn resolve_shape(fetcher: &dyn Fetcher, title: &str) -> Result<BookShape, IngestError> {
    let payload = fetch_json(fetcher, &format!("/shape/{}", encode_title(title))).await?;
    let shape = parse_shape(title, &payload)?;

    info!(
        complex = shape.complex,
        parts = shape.items.len(),
        "Resolved shape"
    );
    Ok(shape)
}
