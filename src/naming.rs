//! Filesystem-safe chapter labels.
//!
//! A chapter's label names both its image cache directory and its PDF, so it
//! must survive every filesystem we care about. Labels derive from the page
//! title when one exists, with a positional fallback otherwise.

/// Maximum label length in characters.
pub const MAX_LABEL_LEN: usize = 80;

/// Characters that are illegal in filenames on at least one target platform.
const ILLEGAL: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Reduce a raw title to a filesystem-safe token.
///
/// Illegal and control characters are dropped, whitespace runs collapse to a
/// single underscore, the result is capped at [`MAX_LABEL_LEN`] characters,
/// and stray leading/trailing underscores and dots are trimmed. May return an
/// empty string; callers wanting a guaranteed label use [`chapter_label`].
pub fn sanitize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_LABEL_LEN));
    let mut pending_gap = false;
    for ch in raw.chars() {
        if ch.is_control() || ILLEGAL.contains(&ch) {
            continue;
        }
        if ch.is_whitespace() {
            pending_gap = !out.is_empty();
            continue;
        }
        if pending_gap {
            out.push('_');
            pending_gap = false;
        }
        out.push(ch);
    }
    if out.chars().count() > MAX_LABEL_LEN {
        out = out.chars().take(MAX_LABEL_LEN).collect();
    }
    out.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// Label for chapter `index` (1-based): the sanitized title, or `chapter_<n>`
/// when the title sanitizes away to nothing.
pub fn chapter_label(raw_title: &str, index: usize) -> String {
    let label = sanitize_label(raw_title);
    if label.is_empty() {
        format!("chapter_{index}")
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_illegal_characters_and_collapses_whitespace() {
        let label = sanitize_label("Ch. 12: A/B?");
        assert_eq!(label, "Ch._12_AB");
        assert!(!label.contains(|c| ILLEGAL.contains(&c)));
        assert!(!label.contains("__"));
        assert!(!label.contains(char::is_whitespace));
    }

    #[test]
    fn test_whitespace_runs_become_one_underscore() {
        assert_eq!(sanitize_label("a \t  b\n\nc"), "a_b_c");
    }

    #[test]
    fn test_leading_and_trailing_junk_is_trimmed() {
        assert_eq!(sanitize_label("  hello  "), "hello");
        assert_eq!(sanitize_label("...hidden..."), "hidden");
    }

    #[test]
    fn test_truncates_to_max_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_label(&long).chars().count(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_empty_result_falls_back_to_positional_label() {
        assert_eq!(chapter_label("???", 7), "chapter_7");
        assert_eq!(chapter_label("", 1), "chapter_1");
        assert_eq!(chapter_label("  \t ", 12), "chapter_12");
    }

    #[test]
    fn test_non_empty_title_wins_over_fallback() {
        assert_eq!(chapter_label("Volume 2", 9), "Volume_2");
    }
}
