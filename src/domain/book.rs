//! Book structure: shape, schema and the persisted book index.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Resolved structure of one simple book (or one sub-book of a complex book)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeItem {
    pub section: String,
    pub title: String,
    pub he_title: String,
    /// Top-level book this item belongs to (equals `title` for simple books)
    pub book: String,
    pub he_book: String,
    /// Verse count per chapter, zero-verse chapters removed
    pub chapters: Vec<u32>,
}

impl ShapeItem {
    /// Total number of verses across chapters
    pub fn total_verses(&self) -> u64 {
        self.chapters.iter().map(|&c| c as u64).sum()
    }

    /// Single-chapter introductions are fetched as a whole book
    pub fn is_whole_book(&self) -> bool {
        self.chapters.len() == 1 && self.title.contains("Introduction")
    }

    /// Cumulative verse count preceding `chapter_index` (0-based)
    pub fn offset(&self, chapter_index: usize) -> u32 {
        self.chapters.iter().take(chapter_index).sum()
    }
}

/// Addressing information derived from `/v2/raw/index/{title}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSchema {
    pub address_types: Vec<String>,
    pub section_names: Vec<String>,
    /// Verse numbers run across chapters (`index_offsets_by_depth` present)
    pub offsetting: bool,
    /// Category path of the book, when the schema carries one
    #[serde(default)]
    pub categories: Vec<String>,
}

impl BookSchema {
    /// Daf/amud addressing is active
    pub fn is_talmud(&self) -> bool {
        self.address_types.iter().any(|t| t == "Talmud")
    }

    pub fn book_type(&self) -> BookType {
        if self.is_talmud() {
            BookType::Talmud
        } else {
            BookType::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookType {
    Talmud,
    Other,
}

impl Default for BookType {
    fn default() -> Self {
        Self::Other
    }
}

/// Per-chapter entry of the book index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterIndex {
    /// 1-based chapter number (daf-relative for Talmud books)
    pub chapter_number: u32,
    /// Verses preceding this chapter, 0 when offsetting is off
    pub offset: u32,
    pub number_of_verses: u32,
    /// Commentators seen on this chapter, sorted
    pub commentators: BTreeSet<String>,
}

/// Persisted description of one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookIndex {
    #[serde(rename = "type")]
    pub book_type: BookType,
    pub title: String,
    pub he_title: String,
    pub number_of_chapters: u32,
    pub chapters: Vec<ChapterIndex>,
    pub section_names: Vec<String>,
}

impl BookIndex {
    pub fn is_talmud(&self) -> bool {
        self.book_type == BookType::Talmud
    }

    /// Total verses listed in the index
    pub fn total_verses(&self) -> u64 {
        self.chapters.iter().map(|c| c.number_of_verses as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(title: &str, chapters: Vec<u32>) -> ShapeItem {
        ShapeItem {
            section: "Tanakh".to_string(),
            title: title.to_string(),
            he_title: String::new(),
            book: title.to_string(),
            he_book: String::new(),
            chapters,
        }
    }

    #[test]
    fn test_cumulative_offsets() {
        let item = shape("Sample", vec![10, 5, 8]);
        let offsets: Vec<u32> = (0..3).map(|i| item.offset(i)).collect();
        assert_eq!(offsets, vec![0, 10, 15]);
        assert_eq!(item.total_verses(), 23);
    }

    #[test]
    fn test_whole_book_detection() {
        assert!(shape("Mishneh Torah, Introduction", vec![12]).is_whole_book());
        assert!(!shape("Mishneh Torah, Introduction", vec![12, 3]).is_whole_book());
        assert!(!shape("Ruth", vec![22]).is_whole_book());
    }

    #[test]
    fn test_schema_talmud_detection() {
        let schema = BookSchema {
            address_types: vec!["Talmud".to_string(), "Integer".to_string()],
            ..Default::default()
        };
        assert!(schema.is_talmud());
        assert_eq!(schema.book_type(), BookType::Talmud);
        assert_eq!(BookSchema::default().book_type(), BookType::Other);
    }

    #[test]
    fn test_book_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&BookType::Talmud).unwrap(), "\"TALMUD\"");
    }
}
