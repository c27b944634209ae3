//! Content normalization.
//!
//! Every body passes through [`normalize`] before it may enter the index.
//! Short or empty content is an expected outcome, reported as `None`.

/// Minimum number of characters a normalized body must have to be indexed.
pub const MIN_LENGTH: usize = 50;

/// Collapse whitespace runs to a single space and trim.
///
/// Returns `None` when the input is absent or the result is shorter than
/// [`MIN_LENGTH`] characters.
///
/// # Example
///
/// ```rust
/// use course_ta_core::normalize::normalize;
///
/// assert_eq!(normalize(Some("  too\n\n short ")), None);
/// let long = "Graded assignments are due every Sunday at 23:59 IST.\n\nLate work is not accepted.";
/// assert_eq!(
///     normalize(Some(long)).as_deref(),
///     Some("Graded assignments are due every Sunday at 23:59 IST. Late work is not accepted.")
/// );
/// ```
pub fn normalize(raw: Option<&str>) -> Option<String> {
    normalize_with(raw, MIN_LENGTH)
}

/// [`normalize`] with a caller-chosen minimum length.
pub fn normalize_with(raw: Option<&str>, min_length: usize) -> Option<String> {
    let raw = raw?;
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() || out.chars().count() < min_length {
        None
    } else {
        Some(out)
    }
}

/// Best-effort decode of raw bytes followed by [`normalize`].
///
/// Invalid UTF-8 sequences become U+FFFD rather than an error.
pub fn normalize_bytes(raw: &[u8]) -> Option<String> {
    normalize(Some(&String::from_utf8_lossy(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_and_empty_are_absent() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
        assert_eq!(normalize(Some(" \n\t ")), None);
    }

    #[test]
    fn exactly_min_length_is_kept() {
        let text = "a".repeat(MIN_LENGTH);
        assert_eq!(normalize(Some(&text)), Some(text.clone()));
        assert_eq!(normalize(Some(&text[1..])), None);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 49 two-byte characters: 98 bytes but still too short.
        let text = "é".repeat(MIN_LENGTH - 1);
        assert_eq!(normalize(Some(&text)), None);
    }

    #[test]
    fn whitespace_padding_does_not_count() {
        let text = format!("   {}   \n\n", "x".repeat(MIN_LENGTH - 1));
        assert_eq!(normalize(Some(&text)), None);
    }

    #[test]
    fn collapses_mixed_whitespace() {
        let text = "Week 1:\n\n\tIntroduction   to\r\nthe  course, tools and grading policy.";
        assert_eq!(
            normalize(Some(text)).as_deref(),
            Some("Week 1: Introduction to the course, tools and grading policy.")
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut bytes = b"Project 1 is due on the fifteenth; submissions close at noon ".to_vec();
        bytes.push(0xff);
        let out = normalize_bytes(&bytes).unwrap();
        assert!(out.ends_with('\u{FFFD}'));
    }

    #[test]
    fn custom_minimum() {
        let text = "Graded assignments are due weekly.";
        assert_eq!(normalize(Some(text)), None);
        assert_eq!(normalize_with(Some(text), 20).as_deref(), Some(text));
        assert_eq!(normalize_with(Some("   "), 0), None);
    }
}
