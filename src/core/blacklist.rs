//! Excluded books and commentators.
//!
//! Names are matched case-insensitively. Extra entries from configuration
//! may be glob patterns (`"Steinsaltz on *"`).

use std::collections::HashSet;

use glob::{MatchOptions, Pattern};

/// Names shipped with the crate, one per line
const DEFAULT_ENTRIES: &str = include_str!("blacklist.txt");

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    /// Lowercased exact names
    names: HashSet<String>,
    /// Glob patterns
    patterns: Vec<Pattern>,
}

impl Blacklist {
    /// Empty blacklist
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in entries plus `extra`
    pub fn with_defaults<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blacklist = Self::from_entries(DEFAULT_ENTRIES.lines());
        for entry in extra {
            blacklist.add(entry.as_ref());
        }
        blacklist
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blacklist = Self::empty();
        for entry in entries {
            blacklist.add(entry.as_ref());
        }
        blacklist
    }

    /// Add a name, or a glob pattern when it contains wildcards
    pub fn add(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }

        if entry.contains(['*', '?', '[']) {
            if let Ok(pattern) = Pattern::new(entry) {
                self.patterns.push(pattern);
                return;
            }
        }

        self.names.insert(entry.to_lowercase());
    }

    /// Check whether a book or commentator name is excluded
    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        self.names.contains(&name.to_lowercase())
            || self
                .patterns
                .iter()
                .any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
    }

    pub fn len(&self) -> usize {
        self.names.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_loaded() {
        let blacklist = Blacklist::with_defaults(Vec::<String>::new());
        assert!(!blacklist.is_empty());
        assert!(blacklist.contains("Book of Tobit"));
        assert!(blacklist.contains("Cassuto on Genesis"));
        assert!(!blacklist.contains("Genesis"));
    }

    #[test]
    fn test_case_insensitive_names() {
        let blacklist = Blacklist::from_entries(["Shadal on Exodus"]);
        assert!(blacklist.contains("shadal on exodus"));
        assert!(blacklist.contains("  SHADAL ON EXODUS "));
        assert!(!blacklist.contains("Shadal on Genesis"));
    }

    #[test]
    fn test_glob_patterns() {
        let blacklist = Blacklist::from_entries(["Steinsaltz on *"]);
        assert!(blacklist.contains("Steinsaltz on Berakhot"));
        assert!(blacklist.contains("steinsaltz on shabbat"));
        assert!(!blacklist.contains("Rashi on Berakhot"));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let blacklist = Blacklist::from_entries(["", "   "]);
        assert!(blacklist.is_empty());
        assert!(!blacklist.contains(""));
    }
}
