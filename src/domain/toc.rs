//! Table-of-contents structures.
//!
//! `ContentNode` is the raw tree returned by `/index/`; `DirectoryNode` is
//! the navigable index written for the reader.

use serde::{Deserialize, Serialize};

/// A category or book entry from the remote table of contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Book title (set on book entries)
    #[serde(default)]
    pub title: Option<String>,

    /// Hebrew book title
    #[serde(default)]
    pub he_title: Option<String>,

    /// Category name (set on category entries)
    #[serde(default)]
    pub category: Option<String>,

    /// Hebrew category name
    #[serde(default)]
    pub he_category: Option<String>,

    /// Nested entries; absent or empty on books
    #[serde(default)]
    pub contents: Option<Vec<ContentNode>>,

    /// Ordering hint from the remote catalog
    #[serde(default)]
    pub order: Option<f64>,
}

impl ContentNode {
    /// Category entry with children
    pub fn category(name: impl Into<String>, contents: Vec<ContentNode>) -> Self {
        Self {
            category: Some(name.into()),
            contents: Some(contents),
            ..Default::default()
        }
    }

    /// Book entry (leaf)
    pub fn book(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Attach a Hebrew title
    pub fn with_he_title(mut self, he_title: impl Into<String>) -> Self {
        self.he_title = Some(he_title.into());
        self
    }

    /// Display name: title, then category, then `fallback`
    pub fn display_name(&self, fallback: &str) -> String {
        [self.title.as_deref(), self.category.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// Hebrew display name: Hebrew title, then Hebrew category
    pub fn hebrew_name(&self) -> Option<String> {
        self.he_title
            .as_deref()
            .or(self.he_category.as_deref())
            .map(|s| s.trim().to_string())
    }

    /// A node is a leaf when it has no nested contents
    pub fn is_leaf(&self) -> bool {
        self.contents.as_ref().map_or(true, |c| c.is_empty())
    }
}

/// One entry of the navigable index persisted for the reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryNode {
    pub english_name: String,
    pub hebrew_name: Option<String>,
    /// `/`-separated path relative to the output root
    pub index_path: String,
    #[serde(default)]
    pub children: Vec<DirectoryNode>,
    #[serde(default)]
    pub is_leaf: bool,
}

impl DirectoryNode {
    /// Leaf node for a book
    pub fn leaf(
        english_name: impl Into<String>,
        hebrew_name: Option<String>,
        index_path: impl Into<String>,
    ) -> Self {
        Self {
            english_name: english_name.into(),
            hebrew_name,
            index_path: index_path.into(),
            children: Vec::new(),
            is_leaf: true,
        }
    }

    /// Number of leaves below (or at) this node
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf {
            1
        } else {
            self.children.iter().map(DirectoryNode::leaf_count).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_deserialization() {
        let json = r#"[{
            "category": "Tanakh",
            "heCategory": "תנ״ך",
            "order": 1.0,
            "contents": [
                {"category": "Torah", "heCategory": "תורה", "contents": [
                    {"title": "Genesis", "heTitle": "בראשית", "order": 1.0}
                ]}
            ]
        }]"#;

        let toc: Vec<ContentNode> = serde_json::from_str(json).unwrap();
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].display_name("Uncategorized"), "Tanakh");
        assert!(!toc[0].is_leaf());

        let torah = &toc[0].contents.as_ref().unwrap()[0];
        let genesis = &torah.contents.as_ref().unwrap()[0];
        assert!(genesis.is_leaf());
        assert_eq!(genesis.display_name("Untitled"), "Genesis");
        assert_eq!(genesis.hebrew_name(), Some("בראשית".to_string()));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let blank = ContentNode {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.display_name("Untitled"), "Untitled");

        let category = ContentNode {
            category: Some(" Halakhah ".to_string()),
            he_category: Some("הלכה".to_string()),
            ..Default::default()
        };
        assert_eq!(category.display_name("Untitled"), "Halakhah");
        assert_eq!(category.hebrew_name(), Some("הלכה".to_string()));
    }

    #[test]
    fn test_directory_node_json_field_names() {
        let node = DirectoryNode::leaf("Genesis", Some("בראשית".to_string()), "Tanakh/Torah/Genesis");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["englishName"], "Genesis");
        assert_eq!(json["indexPath"], "Tanakh/Torah/Genesis");
        assert_eq!(json["isLeaf"], true);
        assert_eq!(node.leaf_count(), 1);
    }
}
