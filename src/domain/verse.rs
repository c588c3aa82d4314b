//! Verse records and the commentary attached to them.

use serde::{Deserialize, Serialize};

/// Classification of a linked text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentaryCategory {
    Commentary,
    Targum,
    QuotingCommentary,
    Source,
    OtherLinks,
}

impl CommentaryCategory {
    /// Classify a raw link category, case-insensitively
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "commentary" => Self::Commentary,
            "targum" => Self::Targum,
            "quoting commentary" => Self::QuotingCommentary,
            "reference" | "source" => Self::Source,
            _ => Self::OtherLinks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commentator {
    /// Collective display name (Hebrew when available)
    pub name: String,
    /// Title of the commentator's book
    pub book_id: String,
    /// Place of that book in the category hierarchy
    pub path: String,
}

/// Where a commentary text points in the commented book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub chapter: u32,
    pub verse: u32,
    pub raw_ref: String,
    /// Localized display form of the reference
    pub he_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextWithRef {
    pub text: String,
    pub reference: Reference,
}

/// All resolved texts of one commentator on one verse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryEntry {
    pub category: CommentaryCategory,
    pub commentator: Commentator,
    pub texts: Vec<TextWithRef>,
}

/// Persisted unit of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    /// Verse number, including any cumulative chapter offset
    pub number: u32,
    pub text: String,
    #[serde(default)]
    pub commentary: Vec<CommentaryEntry>,
    #[serde(default)]
    pub targum: Vec<CommentaryEntry>,
    #[serde(default)]
    pub quoting_commentary: Vec<CommentaryEntry>,
    #[serde(default)]
    pub source: Vec<CommentaryEntry>,
    #[serde(default)]
    pub other_links: Vec<CommentaryEntry>,
}

impl Verse {
    /// Build a verse, routing each entry to the list of its category
    pub fn new(number: u32, text: impl Into<String>, entries: Vec<CommentaryEntry>) -> Self {
        let mut verse = Self {
            number,
            text: text.into(),
            commentary: Vec::new(),
            targum: Vec::new(),
            quoting_commentary: Vec::new(),
            source: Vec::new(),
            other_links: Vec::new(),
        };

        for entry in entries {
            let list = match entry.category {
                CommentaryCategory::Commentary => &mut verse.commentary,
                CommentaryCategory::Targum => &mut verse.targum,
                CommentaryCategory::QuotingCommentary => &mut verse.quoting_commentary,
                CommentaryCategory::Source => &mut verse.source,
                CommentaryCategory::OtherLinks => &mut verse.other_links,
            };
            list.push(entry);
        }

        verse
    }

    /// Every attached entry, whatever its category
    pub fn entries(&self) -> impl Iterator<Item = &CommentaryEntry> {
        self.commentary
            .iter()
            .chain(&self.targum)
            .chain(&self.quoting_commentary)
            .chain(&self.source)
            .chain(&self.other_links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: CommentaryCategory, name: &str) -> CommentaryEntry {
        CommentaryEntry {
            category,
            commentator: Commentator {
                name: name.to_string(),
                book_id: format!("{} on Genesis", name),
                path: String::new(),
            },
            texts: vec![TextWithRef {
                text: "text".to_string(),
                reference: Reference {
                    chapter: 1,
                    verse: 1,
                    raw_ref: "1:1".to_string(),
                    he_ref: String::new(),
                },
            }],
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(CommentaryCategory::classify("Commentary"), CommentaryCategory::Commentary);
        assert_eq!(CommentaryCategory::classify("TARGUM"), CommentaryCategory::Targum);
        assert_eq!(
            CommentaryCategory::classify("Quoting Commentary"),
            CommentaryCategory::QuotingCommentary
        );
        assert_eq!(CommentaryCategory::classify("reference"), CommentaryCategory::Source);
        assert_eq!(CommentaryCategory::classify("Midrash"), CommentaryCategory::OtherLinks);
        assert_eq!(CommentaryCategory::classify(""), CommentaryCategory::OtherLinks);
    }

    #[test]
    fn test_verse_routes_entries_by_category() {
        let verse = Verse::new(
            3,
            "In the beginning",
            vec![
                entry(CommentaryCategory::Commentary, "Rashi"),
                entry(CommentaryCategory::Targum, "Onkelos"),
                entry(CommentaryCategory::Commentary, "Ramban"),
                entry(CommentaryCategory::OtherLinks, "Zohar"),
            ],
        );

        assert_eq!(verse.commentary.len(), 2);
        assert_eq!(verse.targum.len(), 1);
        assert_eq!(verse.other_links.len(), 1);
        assert!(verse.source.is_empty());
        assert_eq!(verse.entries().count(), 4);
    }

    #[test]
    fn test_verse_bincode_roundtrip() {
        let verse = Verse::new(1, "text", vec![entry(CommentaryCategory::Source, "Mishnah")]);
        let bytes = bincode::serialize(&verse).unwrap();
        let decoded: Verse = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, verse);
    }
}
