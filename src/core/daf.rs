//! Talmud page/side (daf/amud) addressing.
//!
//! Talmud tractates start at page 2 side "a". Linear (0-based) chapter
//! index `i` maps to `"2a", "2b", "3a", ...`.

/// Linear 0-based chapter index to its page/side label
pub fn to_page_side(index: u32) -> String {
    let page = index / 2 + 2;
    let side = if index % 2 == 0 { 'a' } else { 'b' };
    format!("{}{}", page, side)
}

/// Page/side label (`"12b"`) back to its linear 0-based index.
///
/// Returns `None` for anything that is not `<page><a|b>` with page >= 2.
pub fn to_linear_index(label: &str) -> Option<u32> {
    let label = label.trim();
    let side = label.chars().last()?;
    let digits = &label[..label.len() - side.len_utf8()];

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let page: u32 = digits.parse().ok()?;
    if page < 2 {
        return None;
    }

    let side_offset = match side.to_ascii_lowercase() {
        'a' => 0,
        'b' => 1,
        _ => return None,
    };

    // Pages near u32::MAX have no linear index
    page.checked_sub(2)?.checked_mul(2)?.checked_add(side_offset)
}

/// Chapter label used in API addresses: page/side for Talmud, else 1-based number
pub fn chapter_label(chapter_index: u32, talmud: bool) -> String {
    if talmud {
        to_page_side(chapter_index)
    } else {
        (chapter_index + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pages() {
        assert_eq!(to_page_side(0), "2a");
        assert_eq!(to_page_side(1), "2b");
        assert_eq!(to_page_side(2), "3a");
        assert_eq!(to_page_side(125), "64b");
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!(to_linear_index("2a"), Some(0));
        assert_eq!(to_linear_index("2b"), Some(1));
        assert_eq!(to_linear_index("3a"), Some(2));
        assert_eq!(to_linear_index("64B"), Some(125));
    }

    #[test]
    fn test_rejects_invalid_labels() {
        for label in ["", "a", "2", "2c", "1a", "0b", "x2a", "2 a", "-2a"] {
            assert_eq!(to_linear_index(label), None, "label {:?}", label);
        }
    }

    #[test]
    fn test_huge_page_has_no_index() {
        assert_eq!(to_linear_index("3000000000a"), None);
        assert_eq!(to_linear_index("4294967295b"), None);
        assert_eq!(to_linear_index("99999999999a"), None);
        assert_eq!(to_linear_index("2147483649b"), Some(u32::MAX));
    }

    #[test]
    fn test_conversion_is_bijective() {
        for index in 0..2_000 {
            assert_eq!(to_linear_index(&to_page_side(index)), Some(index));
        }

        for page in 2..1_000 {
            for side in ["a", "b"] {
                let label = format!("{}{}", page, side);
                let index = to_linear_index(&label).unwrap();
                assert_eq!(to_page_side(index), label);
            }
        }
    }

    #[test]
    fn test_chapter_label() {
        assert_eq!(chapter_label(0, false), "1");
        assert_eq!(chapter_label(4, false), "5");
        assert_eq!(chapter_label(4, true), "4a");
    }
}
