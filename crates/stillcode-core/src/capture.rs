//! Code capture around a tracked offset.
//!
//! Produces the hypothetical prompt (prefix and suffix) a suggestion would be
//! requested with today, plus the code that currently sits where the
//! suggestion went, cut at the end of its indentation block.

use crate::document::DocumentSnapshot;
use crate::text;

/// Lines starting with one of these close the block they are indented under.
const CLOSERS: [char; 3] = ['}', ')', ']'];

/// Code captured from a document at one horizon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCode {
    /// Up to `prefix_chars` characters before the tracked offset.
    pub prefix: String,
    /// Up to `prefix_chars` characters after the tracked end offset.
    pub suffix: String,
    /// Text after the tracked offset, cut at the block end or the margin.
    pub code: String,
    /// Character offset inside `code` where the indentation block ended, when
    /// the block ended before the margin.
    pub termination_offset: Option<usize>,
}

/// Capture code at `offset` in `snapshot`.
///
/// `suffix_offset` is where the hypothetical prompt suffix starts; for an
/// accepted suggestion this is the tracked end of the inserted text.
pub fn capture_code(
    snapshot: &DocumentSnapshot,
    offset: usize,
    suffix_offset: usize,
    code_margin: usize,
    prefix_chars: usize,
) -> CapturedCode {
    let len = snapshot.char_len();
    let offset = offset.min(len);
    let suffix_offset = suffix_offset.clamp(offset, len);

    let prefix = snapshot.slice(offset.saturating_sub(prefix_chars), offset);
    let suffix = snapshot.slice(suffix_offset, suffix_offset.saturating_add(prefix_chars));

    let before = snapshot.slice(0, offset);
    let after = snapshot.slice(offset, len);
    let termination = block_end(before, after).filter(|&end| end < code_margin);
    let code_len = termination.unwrap_or(code_margin);

    CapturedCode {
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
        code: text::char_slice(after, 0, code_len).to_string(),
        termination_offset: termination,
    }
}

/// Find where the indentation block starting at the split point ends.
///
/// `before` is the document up to the split and `after` the rest. The base
/// indentation is that of the line holding the split, or of the nearest
/// non-blank line above it when that line is blank. The block runs over
/// following lines indented deeper than the base and ends at the end of the
/// last such line. A line at exactly the base indentation that starts with a
/// closing bracket after an indented body is included.
///
/// Returns a character offset into `after`, or `None` when the block runs to
/// the end of the document.
pub fn block_end(before: &str, after: &str) -> Option<usize> {
    let (head, split_line_start) = match before.rfind('\n') {
        Some(i) => (&before[..i], &before[i + 1..]),
        None => ("", before),
    };

    let mut lines = after.split('\n');
    let first = lines.next().unwrap_or_default();
    let current = format!("{split_line_start}{first}");

    let base = if is_blank(&current) {
        head.lines()
            .rev()
            .find(|line| !is_blank(line))
            .map(text::indentation)
            .unwrap_or(0)
    } else {
        text::indentation(&current)
    };

    let mut line_end = text::char_len(first);
    let mut last_content_end = line_end;
    let mut seen_body = false;

    for line in lines {
        let line_start = line_end + 1;
        line_end = line_start + text::char_len(line);
        if is_blank(line) {
            continue;
        }
        let indent = text::indentation(line);
        if indent > base {
            seen_body = true;
            last_content_end = line_end;
            continue;
        }
        if indent == base && seen_body && line.trim_start().starts_with(CLOSERS) {
            return Some(line_end);
        }
        return Some(last_content_end);
    }
    None
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
