//! Utility functions useful throughout the codebase.

/// Counts the number of lines that `text` occupies when rendered.
///
/// Any non-empty text occupies at least one line; each embedded newline adds
/// one more. This matches how downstream renderers lay out code sections, so
/// budget accounting and rendering agree.
#[must_use]
pub fn line_count(text: &str) -> usize {
    text.bytes().filter(|byte| *byte == b'\n').count() + 1
}

/// Checks whether `character` can form part of a Solidity identifier.
#[must_use]
pub fn is_ident_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '_' || character == '$'
}

/// Checks whether `character` can start a Solidity identifier.
#[must_use]
pub fn is_ident_start(character: char) -> bool {
    character.is_ascii_alphabetic() || character == '_' || character == '$'
}

/// Checks whether `word` occurs in `haystack` as a whole identifier, rather
/// than as a fragment of a longer identifier.
///
/// Used when matching constant names against collected code, where a
/// substring match on a short name such as `FEE` would spuriously hit
/// `FEE_DENOMINATOR`.
#[must_use]
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }

    let bytes = haystack.as_bytes();
    let mut search_from = 0;
    while let Some(found) = haystack[search_from..].find(word) {
        let start = search_from + found;
        let end = start + word.len();

        let boundary_before =
            start == 0 || !is_ident_char(haystack[..start].chars().next_back().unwrap_or(' '));
        let boundary_after = end == bytes.len()
            || !is_ident_char(haystack[end..].chars().next().unwrap_or(' '));

        if boundary_before && boundary_after {
            return true;
        }

        search_from = start + 1;
    }

    false
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counts_lines_including_the_last() {
        assert_eq!(line_count("one"), 1);
        assert_eq!(line_count("one\ntwo"), 2);
        assert_eq!(line_count("one\ntwo\nthree"), 3);
    }

    #[test]
    fn matches_words_only_at_identifier_boundaries() {
        assert!(contains_word("x = FEE + 1;", "FEE"));
        assert!(contains_word("FEE", "FEE"));
        assert!(!contains_word("FEE_DENOMINATOR", "FEE"));
        assert!(!contains_word("BASEFEE", "FEE"));
        assert!(contains_word("a.FEE(b)", "FEE"));
    }

    #[test]
    fn rejects_empty_words() {
        assert!(!contains_word("anything", ""));
    }
}
