//! Low-level text scanning primitives shared by the structural parser and the
//! dependency collector.
//!
//! Everything in this module operates on plain text with explicit
//! brace/parenthesis balancing. There is deliberately no grammar here: the
//! parser's contract is to extract named declarations and their balanced
//! bodies from untrusted, possibly-flattened source text, and a minimal
//! hand-written scanner is sufficient for that.

use crate::{
    constant::{CALL_KEYWORD_BLOCKLIST, MODIFIER_KEYWORD_BLOCKLIST},
    utility::{is_ident_char, is_ident_start},
};

/// Produces a scan copy of `source` in which comments and quoted string
/// literals are blanked out with spaces.
///
/// The copy has exactly the same length and the same newline positions as the
/// input, so byte offsets found while scanning the copy can be used to slice
/// the original text directly. Newlines inside block comments are preserved
/// to keep line numbering intact.
#[must_use]
pub fn scrub(source: &str) -> String {
    #[derive(Copy, Clone, Eq, PartialEq)]
    enum Mode {
        Code,
        LineComment,
        BlockComment,
        Quoted(char),
    }

    let mut output = String::with_capacity(source.len());
    let mut mode = Mode::Code;
    let mut chars = source.chars().peekable();

    // Blanked characters are replaced with as many spaces as they occupy in
    // UTF-8, so byte offsets in the output match the input exactly.
    fn blank(output: &mut String, character: char) {
        if character == '\n' {
            output.push('\n');
        } else {
            for _ in 0..character.len_utf8() {
                output.push(' ');
            }
        }
    }

    while let Some(current) = chars.next() {
        match mode {
            Mode::Code => match current {
                '/' if chars.peek() == Some(&'/') => {
                    mode = Mode::LineComment;
                    output.push(' ');
                }
                '/' if chars.peek() == Some(&'*') => {
                    mode = Mode::BlockComment;
                    output.push(' ');
                }
                '"' | '\'' => {
                    mode = Mode::Quoted(current);
                    output.push(' ');
                }
                _ => output.push(current),
            },
            Mode::LineComment => {
                if current == '\n' {
                    mode = Mode::Code;
                    output.push('\n');
                } else {
                    blank(&mut output, current);
                }
            }
            Mode::BlockComment => {
                if current == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    mode = Mode::Code;
                    output.push_str("  ");
                } else {
                    blank(&mut output, current);
                }
            }
            Mode::Quoted(quote) => {
                if current == '\\' {
                    // The escaped character can never terminate the literal.
                    output.push(' ');
                    if let Some(escaped) = chars.next() {
                        blank(&mut output, escaped);
                    }
                } else if current == quote {
                    mode = Mode::Code;
                    output.push(' ');
                } else {
                    blank(&mut output, current);
                }
            }
        }
    }

    output
}

/// Finds the byte offset of the delimiter that closes the block opened at
/// `open`, counting nested pairs.
///
/// The byte at `open` must be the opening delimiter. Returns [`None`] if the
/// block is never closed before the end of the text.
#[must_use]
pub fn matching_delimiter(text: &str, open: usize, opening: u8, closing: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes.get(open), Some(&opening));

    let mut depth = 0usize;
    for (position, byte) in bytes.iter().enumerate().skip(open) {
        if *byte == opening {
            depth += 1;
        } else if *byte == closing {
            depth -= 1;
            if depth == 0 {
                return Some(position);
            }
        }
    }

    None
}

/// Finds the brace that closes the block opened by the `{` at `open`.
#[must_use]
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
    matching_delimiter(text, open, b'{', b'}')
}

/// Finds the parenthesis that closes the group opened by the `(` at `open`.
#[must_use]
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    matching_delimiter(text, open, b'(', b')')
}

/// Converts a byte `offset` into `text` to a 1-based line number.
#[must_use]
pub fn line_number(text: &str, offset: usize) -> u32 {
    let clamped = offset.min(text.len());
    let newlines = text.as_bytes()[..clamped].iter().filter(|b| **b == b'\n').count();
    u32::try_from(newlines).unwrap_or(u32::MAX).saturating_add(1)
}

/// Finds every occurrence of `keyword` in `text` where it stands alone as an
/// identifier, returning the byte offset of each occurrence.
#[must_use]
pub fn keyword_occurrences(text: &str, keyword: &str) -> Vec<usize> {
    let mut occurrences = Vec::new();
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(keyword) {
        let start = search_from + found;
        let end = start + keyword.len();

        let boundary_before =
            start == 0 || !is_ident_char(text[..start].chars().next_back().unwrap_or(' '));
        let boundary_after =
            end == text.len() || !is_ident_char(text[end..].chars().next().unwrap_or(' '));

        if boundary_before && boundary_after {
            occurrences.push(start);
        }

        search_from = start + 1;
    }

    occurrences
}

/// Advances `offset` past any ASCII whitespace in `text`.
#[must_use]
pub fn skip_whitespace(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let mut position = offset;
    while position < bytes.len() && bytes[position].is_ascii_whitespace() {
        position += 1;
    }
    position
}

/// Reads the identifier that starts at `offset` (after skipping whitespace),
/// returning it together with the offset one past its end.
#[must_use]
pub fn read_identifier(text: &str, offset: usize) -> Option<(String, usize)> {
    let start = skip_whitespace(text, offset);
    let mut chars = text[start..].char_indices();

    match chars.next() {
        Some((_, first)) if is_ident_start(first) => (),
        _ => return None,
    }

    let mut end = text.len();
    for (position, character) in chars {
        if !is_ident_char(character) {
            end = start + position;
            break;
        }
    }

    Some((text[start..end].to_string(), end))
}

/// Finds the names of functions invoked within `body`.
///
/// An invocation is an identifier directly followed by `(`. Language keywords
/// and built-ins are excluded, as are `super.` members (those are handled by
/// [`super_call_sites`]). Member accesses such as `LibAsset.isNativeAsset(`
/// contribute their member name, which lets calls attached via `using`
/// statements resolve through the normal function search.
///
/// The returned names are deduplicated, preserving first-seen order.
#[must_use]
pub fn call_sites(body: &str) -> Vec<String> {
    let mut found = Vec::new();

    for (name, start) in identifiers_before_paren(body) {
        if CALL_KEYWORD_BLOCKLIST.contains(&name.as_str()) {
            continue;
        }
        if preceding_member_of(body, start) == Some("super".to_string()) {
            continue;
        }
        if !found.contains(&name) {
            found.push(name);
        }
    }

    found
}

/// Finds qualified `Library.function(` call sites within `body`, returning
/// `(library, function)` pairs.
///
/// Only capitalized qualifiers are considered, matching the Solidity
/// convention for library and contract names.
#[must_use]
pub fn library_call_sites(body: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();

    for (name, start) in identifiers_before_paren(body) {
        let Some(qualifier) = preceding_member_of(body, start) else {
            continue;
        };
        if !qualifier.chars().next().is_some_and(char::is_uppercase) {
            continue;
        }

        let pair = (qualifier, name);
        if !found.contains(&pair) {
            found.push(pair);
        }
    }

    found
}

/// Finds the names of functions invoked via `super.<name>(` within `body`.
#[must_use]
pub fn super_call_sites(body: &str) -> Vec<String> {
    let mut found = Vec::new();

    for (name, start) in identifiers_before_paren(body) {
        if preceding_member_of(body, start) != Some("super".to_string()) {
            continue;
        }
        if !found.contains(&name) {
            found.push(name);
        }
    }

    found
}

/// Finds the modifier names invoked in a function's header block (the text
/// between the parameter list and the body).
///
/// Any `returns (...)` clause is removed first so that return-parameter names
/// are not mistaken for modifiers; the remaining lower-case identifiers that
/// are not visibility or mutability keywords are modifier invocations.
#[must_use]
pub fn modifier_invocations(header: &str) -> Vec<String> {
    let stripped = strip_returns_clause(header);
    let mut found = Vec::new();

    let mut offset = 0;
    while offset < stripped.len() {
        let Some((name, end)) = read_identifier(&stripped, offset) else {
            offset += stripped[offset..].chars().next().map_or(1, char::len_utf8);
            continue;
        };

        offset = end;

        // Skip over the modifier's argument list if one is present.
        let after = skip_whitespace(&stripped, end);
        if stripped.as_bytes().get(after) == Some(&b'(') {
            if let Some(close) = matching_paren(&stripped, after) {
                offset = close + 1;
            }
        }

        if MODIFIER_KEYWORD_BLOCKLIST.contains(&name.as_str()) {
            continue;
        }
        if !name.chars().next().is_some_and(|c| c.is_lowercase() || c == '_') {
            continue;
        }
        if !found.contains(&name) {
            found.push(name);
        }
    }

    found
}

/// Extracts the NatSpec comment that immediately precedes `offset` in the
/// original (unscrubbed) source text, if any.
#[must_use]
pub fn doc_comment_before(source: &str, offset: usize) -> Option<String> {
    let before = &source[..offset.min(source.len())];
    let mut collected: Vec<&str> = Vec::new();
    let mut inside_block = false;
    let mut inside_slashes = false;

    for line in before.lines().rev() {
        let stripped = line.trim();

        if inside_block {
            collected.insert(0, line);
            if stripped.starts_with("/**") {
                break;
            }
        } else if inside_slashes {
            if stripped.starts_with("///") {
                collected.insert(0, line);
            } else {
                break;
            }
        } else if stripped.ends_with("*/") {
            inside_block = true;
            collected.insert(0, line);
            if stripped.starts_with("/**") {
                break;
            }
        } else if stripped.starts_with("///") {
            inside_slashes = true;
            collected.insert(0, line);
        } else if !stripped.is_empty() {
            // Non-comment code between the comment and the declaration.
            break;
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n").trim().to_string())
    }
}

/// Yields `(identifier, start_offset)` for each identifier in `body` that is
/// directly followed (modulo whitespace) by an opening parenthesis.
fn identifiers_before_paren(body: &str) -> Vec<(String, usize)> {
    let mut results = Vec::new();
    let mut offset = 0;

    while offset < body.len() {
        let Some(relative) = body[offset..].find(|c: char| is_ident_start(c)) else {
            break;
        };
        let start = offset + relative;

        let Some((name, end)) = read_identifier(body, start) else {
            offset = start + 1;
            continue;
        };

        let after = skip_whitespace(body, end);
        if body.as_bytes().get(after) == Some(&b'(') {
            results.push((name, start));
        }

        offset = end;
    }

    results
}

/// If the identifier starting at `start` is a member access (`owner.name`),
/// returns the identifier of the owner.
fn preceding_member_of(body: &str, start: usize) -> Option<String> {
    let before = &body[..start];
    let trimmed = before.trim_end();
    if !trimmed.ends_with('.') {
        return None;
    }

    let without_dot = &trimmed[..trimmed.len() - 1];
    let owner_end = without_dot.len();
    let owner_start = without_dot
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(position, _)| position)?;

    let owner = &without_dot[owner_start..owner_end];
    if owner.is_empty() {
        None
    } else {
        Some(owner.to_string())
    }
}

/// Removes any `returns (...)` clause from a function header.
fn strip_returns_clause(header: &str) -> String {
    for start in keyword_occurrences(header, "returns") {
        let after = skip_whitespace(header, start + "returns".len());
        if header.as_bytes().get(after) == Some(&b'(') {
            if let Some(close) = matching_paren(header, after) {
                let mut stripped = header[..start].to_string();
                stripped.push_str(&header[close + 1..]);
                return stripped;
            }
            return header[..start].to_string();
        }
    }

    header.to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scrub_preserves_offsets_and_newlines() {
        let source = "a /* gone\nstill gone */ b // tail\nc \"{ brace }\" d";
        let scrubbed = scrub(source);

        assert_eq!(scrubbed.len(), source.len());
        assert_eq!(
            scrubbed.matches('\n').count(),
            source.matches('\n').count()
        );
        assert!(!scrubbed.contains("gone"));
        assert!(!scrubbed.contains('{'));
        assert!(scrubbed.contains('a'));
        assert!(scrubbed.contains('b'));
        assert!(scrubbed.contains('c'));
        assert!(scrubbed.contains('d'));
    }

    #[test]
    fn balances_nested_braces() {
        let text = "{ a { b } c { d { e } } }";
        assert_eq!(matching_brace(text, 0), Some(text.len() - 1));
    }

    #[test]
    fn unbalanced_braces_are_detected() {
        assert_eq!(matching_brace("{ { }", 0), None);
    }

    #[test]
    fn finds_keywords_only_at_identifier_boundaries() {
        let text = "restructure struct S { } mystruct";
        assert_eq!(keyword_occurrences(text, "struct"), vec![12]);
    }

    #[test]
    fn finds_call_sites_in_first_seen_order() {
        let body = "function f() { helper(1); other(); helper(2); if (x) { guard(); } }";
        assert_eq!(call_sites(body), vec!["f", "helper", "other", "guard"]);
    }

    #[test]
    fn member_calls_contribute_member_names() {
        let body = "{ LibAsset.isNativeAsset(token); amount.add(fee); }";
        assert_eq!(call_sites(body), vec!["isNativeAsset", "add"]);
        assert_eq!(
            library_call_sites(body),
            vec![("LibAsset".to_string(), "isNativeAsset".to_string())]
        );
    }

    #[test]
    fn super_calls_are_kept_separate() {
        let body = "{ super.deposit(amount); helper(); }";
        assert_eq!(super_call_sites(body), vec!["deposit"]);
        assert_eq!(call_sites(body), vec!["helper"]);
    }

    #[test]
    fn modifier_invocations_skip_keywords_and_return_params() {
        let header = "external payable ensure(deadline) nonReentrant returns (uint256 amountOut)";
        assert_eq!(modifier_invocations(header), vec!["ensure", "nonReentrant"]);
    }

    #[test]
    fn extracts_block_doc_comments() {
        let source = "contract C {\n    /**\n     * @notice Does a thing.\n     */\n    function f() public {}\n}";
        let offset = source.find("function").unwrap();
        let doc = doc_comment_before(source, offset).unwrap();
        assert!(doc.contains("@notice Does a thing."));
    }

    #[test]
    fn extracts_triple_slash_doc_comments() {
        let source = "/// @dev One.\n/// @dev Two.\nfunction f() public {}";
        let offset = source.find("function").unwrap();
        let doc = doc_comment_before(source, offset).unwrap();
        assert!(doc.contains("One."));
        assert!(doc.contains("Two."));
    }

    #[test]
    fn code_between_comment_and_declaration_discards_the_comment() {
        let source = "/** doc */\nuint256 x;\nfunction f() public {}";
        let offset = source.find("function").unwrap();
        assert!(doc_comment_before(source, offset).is_none());
    }
}
