//! Citation normalization.
//!
//! Link records cite their target with free-form strings: `"Leviticus 6:2"`,
//! `"4:27-28"`, `"2a:3:1"`, `"Positive Commandments 217"`. Normalization maps
//! them to a `"<chapter>:<verse>"` form, first matching rule wins:
//!
//! 1. Talmud locator (`<n><a|b>` with up to two `:<n>` segments, optionally
//!    ending in a `-` range) keeps its first two segments.
//! 2. `<n>:<m>-<k>` keeps the start of the range.
//! 3. Anything with a colon yields its first `<n>:<m>`, else `<first n>:1`.
//! 4. Anything with a digit collapses to its digits, `<digits>:1`.
//! 5. Everything else is returned unchanged and fails to resolve.
//!
//! The mapping is heuristic. Citations that do not resolve are dropped by
//! the caller and written to the audit log.

use std::sync::LazyLock;

use regex::Regex;

use super::daf;
use crate::error::IngestError;

static TALMUD_LOCATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d+[ab](?::\d+){0,2})(?:-\S*)?$").unwrap());

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+):(\d+)-(\d+)$").unwrap());

static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+):(\d+)").unwrap());

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// A citation resolved to a chapter/verse pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// 1-based chapter number (Talmud pages converted through daf addressing)
    pub chapter: u32,
    pub verse: u32,
    /// Normalized `chapter:verse` form the pair was read from
    pub normalized: String,
}

/// Normalize a raw citation string. Pure and deterministic.
pub fn normalize(raw: &str) -> String {
    let input = raw.trim();

    if let Some(caps) = TALMUD_LOCATOR_RE.captures(input) {
        let locator = &caps[1];
        return locator.split(':').take(2).collect::<Vec<_>>().join(":");
    }

    if let Some(caps) = RANGE_RE.captures(input) {
        return format!("{}:{}", &caps[1], &caps[2]);
    }

    if input.contains(':') {
        if let Some(caps) = PAIR_RE.captures(input) {
            return format!("{}:{}", &caps[1], &caps[2]);
        }
        if let Some(number) = NUMBER_RE.find(input) {
            return format!("{}:1", number.as_str());
        }
        return input.to_string();
    }

    if input.bytes().any(|b| b.is_ascii_digit()) {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
        return format!("{}:1", digits);
    }

    input.to_string()
}

/// Remove the commentator's own book title from the front of a citation
pub fn strip_title_prefix<'a>(raw: &'a str, index_title: &str) -> &'a str {
    let trimmed = raw.trim();
    if index_title.is_empty() {
        return trimmed;
    }
    trimmed.strip_prefix(index_title).unwrap_or(trimmed).trim()
}

/// Resolve a raw citation into a (chapter, verse) pair
pub fn resolve(raw: &str, index_title: &str) -> Result<Citation, IngestError> {
    let normalized = normalize(strip_title_prefix(raw, index_title));
    let unresolved = || IngestError::Reference {
        raw: raw.to_string(),
        normalized: normalized.clone(),
    };

    let mut segments = normalized.split(':');
    let (Some(first), Some(second)) = (segments.next(), segments.next()) else {
        return Err(unresolved());
    };

    let chapter = match daf::to_linear_index(first) {
        Some(index) => index.checked_add(1).ok_or_else(unresolved)?,
        None => first.trim().parse::<u32>().map_err(|_| unresolved())?,
    };

    let verse = second
        .split('-')
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<u32>()
        .map_err(|_| unresolved())?;

    if chapter == 0 || verse == 0 {
        return Err(unresolved());
    }

    Ok(Citation {
        chapter,
        verse,
        normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_documented_cases() {
        assert_eq!(normalize("4:27-28"), "4:27");
        assert_eq!(normalize("Leviticus 6:2"), "6:2");
        assert_eq!(normalize("Positive Commandments 217"), "217:1");
        assert_eq!(normalize("2a:3:1"), "2a:3");
    }

    #[test]
    fn test_normalize_talmud_locators() {
        assert_eq!(normalize("2a"), "2a");
        assert_eq!(normalize("15b:7"), "15b:7");
        assert_eq!(normalize("Berakhot 64a:2:3"), "64a:2");
    }

    #[test]
    fn test_normalize_talmud_ranges_keep_start() {
        assert_eq!(normalize("2a:3-5"), "2a:3");
        assert_eq!(normalize("Shabbat 31a:2:1-4"), "31a:2");
        assert_eq!(normalize("12b-13a"), "12b");
    }

    #[test]
    fn test_normalize_colon_fallbacks() {
        assert_eq!(normalize("Genesis 1:1-2:3"), "1:1");
        assert_eq!(normalize("Introduction, Part 3: Laws"), "3:1");
        assert_eq!(normalize("Preface: Opening"), "Preface: Opening");
    }

    #[test]
    fn test_normalize_hebrew_with_number() {
        assert_eq!(normalize("הלכות שבת 12"), "12:1");
    }

    #[test]
    fn test_normalize_without_digits_is_unchanged() {
        assert_eq!(normalize("Introduction"), "Introduction");
        assert_eq!(normalize("  Preface "), "Preface");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        for raw in ["Leviticus 6:2", "2a:3:1", "Positive Commandments 217", "x"] {
            assert_eq!(normalize(raw), normalize(raw));
        }
    }

    #[test]
    fn test_resolve_plain_reference() {
        let citation = resolve("Leviticus 6:2", "Rashi on Leviticus").unwrap();
        assert_eq!(citation.chapter, 6);
        assert_eq!(citation.verse, 2);
        assert_eq!(citation.normalized, "6:2");
    }

    #[test]
    fn test_resolve_strips_commentator_title() {
        let citation = resolve("Rashi on Horayot 2a:3:1", "Rashi on Horayot").unwrap();
        assert_eq!(citation.normalized, "2a:3");
        assert_eq!(citation.chapter, 1);
        assert_eq!(citation.verse, 3);

        let citation = resolve("Rashi on Berakhot 3b:4", "Rashi on Berakhot").unwrap();
        assert_eq!(citation.chapter, 4);
    }

    #[test]
    fn test_resolve_range() {
        let citation = resolve("Ramban on Genesis 4:27-28", "Ramban on Genesis").unwrap();
        assert_eq!((citation.chapter, citation.verse), (4, 27));
    }

    #[test]
    fn test_resolve_talmud_range() {
        let citation = resolve("Berakhot 2a:3-5", "Berakhot").unwrap();
        assert_eq!(citation.normalized, "2a:3");
        assert_eq!((citation.chapter, citation.verse), (1, 3));
    }

    #[test]
    fn test_resolve_huge_page_is_unresolved() {
        for raw in ["Rashi on X 3000000000a:1", "Rashi on X 2147483649b:1"] {
            assert!(matches!(
                resolve(raw, "Rashi on X"),
                Err(IngestError::Reference { .. })
            ));
        }
    }

    #[test]
    fn test_resolve_single_number() {
        let citation = resolve("Sefer HaMitzvot, Positive Commandments 217", "Sefer HaMitzvot").unwrap();
        assert_eq!((citation.chapter, citation.verse), (217, 1));
    }

    #[test]
    fn test_resolve_rejects_unusable() {
        assert!(matches!(
            resolve("Introduction", "Kuzari"),
            Err(IngestError::Reference { .. })
        ));
        assert!(resolve("2a", "Rashi on Berakhot").is_err());
        assert!(resolve("0:4", "").is_err());
    }
}
