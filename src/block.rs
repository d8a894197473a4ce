//! # Block Editor
//!
//! Locates and removes brace-delimited constructs such as
//! `wrapper { ... }` or `gradle.allprojects { ... }` in Gradle scripts.
//!
//! A block is matched when the start pattern appears as a whole token
//! (not glued to a preceding or following identifier character) and the next
//! non-whitespace character is `{`. The closing brace is found by counting
//! nesting depth.
//!
//! ## Known limitation
//!
//! Braces inside string literals and comments are counted like any other
//! brace. This is a heuristic, not a lexer, and the rewriters built on top
//! of it rely on exactly this behavior. An opening brace with no matching
//! close before end-of-text is reported as "no match" and nothing is removed.

/// Half-open byte range `[start, end)` of a block, including its start
/// pattern and the closing brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start: usize,
    pub end: usize,
    /// Byte index of the opening brace.
    pub open: usize,
}

impl BlockSpan {
    /// Range of the text strictly between the braces.
    pub fn body(&self) -> std::ops::Range<usize> {
        self.open + 1..self.end - 1
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Result of a removal pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub text: String,
    pub count: usize,
    pub bytes_removed: usize,
}

/// Finds the first block introduced by `start_pattern`.
///
/// Returns `(start, end)` as a half-open byte range covering the pattern and
/// the whole braced body.
pub fn find_block(text: &str, start_pattern: &str) -> Option<(usize, usize)> {
    find_block_span(text, start_pattern, 0).map(|span| (span.start, span.end))
}

/// Same as [`find_block`] but starts searching at byte offset `from` and
/// returns the full [`BlockSpan`].
pub fn find_block_span(text: &str, start_pattern: &str, from: usize) -> Option<BlockSpan> {
    if start_pattern.is_empty() || from > text.len() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut cursor = from;

    while let Some(rel) = text.get(cursor..).and_then(|rest| rest.find(start_pattern)) {
        let start = cursor + rel;
        let after = start + start_pattern.len();
        cursor = start + 1;
        while cursor < text.len() && !text.is_char_boundary(cursor) {
            cursor += 1;
        }

        if !is_token_boundary(text, start, after) {
            continue;
        }

        let open = match skip_whitespace(bytes, after) {
            Some(i) if bytes[i] == b'{' => i,
            _ => continue,
        };

        // An unterminated block ends the search: nothing after it can be
        // trusted.
        let end = matching_close(bytes, open)?;
        return Some(BlockSpan { start, end, open });
    }

    None
}

/// Removes every block introduced by `start_pattern`.
///
/// Content inside the blocks is never inspected. A block that sits alone on
/// its lines is removed together with its indentation and trailing newline.
pub fn remove_all_blocks(text: &str, start_pattern: &str) -> Removal {
    let mut current = text.to_string();
    let mut count = 0;
    let mut bytes_removed = 0;

    // Rescan from the top: a removal can join text into a new match.
    while let Some(span) = find_block_span(&current, start_pattern, 0) {
        let (cut_start, cut_end) = line_aware_range(&current, span);
        current.replace_range(cut_start..cut_end, "");
        bytes_removed += cut_end - cut_start;
        count += 1;
    }

    Removal {
        text: current,
        count,
        bytes_removed,
    }
}

/// Removes only the first block named `block_name`.
pub fn remove_first_matching_named_block(text: &str, block_name: &str) -> Removal {
    match find_block_span(text, block_name, 0) {
        Some(span) => {
            let (cut_start, cut_end) = line_aware_range(text, span);
            let mut new_text = String::with_capacity(text.len());
            new_text.push_str(&text[..cut_start]);
            new_text.push_str(&text[cut_end..]);
            Removal {
                text: new_text,
                count: 1,
                bytes_removed: cut_end - cut_start,
            }
        }
        None => Removal {
            text: text.to_string(),
            count: 0,
            bytes_removed: 0,
        },
    }
}

/// Replaces the first block introduced by `start_pattern` with
/// `replacement`. Returns `None` when there is no match.
pub fn replace_block(text: &str, start_pattern: &str, replacement: &str) -> Option<String> {
    let span = find_block_span(text, start_pattern, 0)?;
    let mut out = String::with_capacity(text.len() - span.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement);
    out.push_str(&text[span.end..]);
    Some(out)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
}

fn is_token_boundary(text: &str, start: usize, after: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !is_ident_char(c));
    let after_ok = text[after..].chars().next().is_none_or(|c| !is_ident_char(c));
    before_ok && after_ok
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        if !bytes[i].is_ascii_whitespace() {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Widens a span to whole lines when nothing else shares them.
fn line_aware_range(text: &str, span: BlockSpan) -> (usize, usize) {
    let line_start = text[..span.start].rfind('\n').map_or(0, |i| i + 1);
    let leading_blank = text[line_start..span.start].trim().is_empty();

    let rest = &text[span.end..];
    let line_end = rest.find('\n').map_or(text.len(), |i| span.end + i + 1);
    let trailing_blank = text[span.end..line_end].trim().is_empty();

    if leading_blank && trailing_blank {
        (line_start, line_end)
    } else {
        (span.start, span.end)
    }
}
