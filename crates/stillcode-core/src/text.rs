//! Character-offset helpers.
//!
//! Every offset in this crate counts Unicode scalar values, not UTF-8 bytes.
//! These helpers convert at the seams where `str` slicing needs bytes.

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the character at `char_offset`, clamped to `s.len()`.
pub fn byte_offset(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

/// Slice `s` by character offsets. Out-of-range offsets are clamped and an
/// inverted range yields an empty slice.
pub fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let begin = byte_offset(s, start);
    let rest = &s[begin..];
    let len = byte_offset(rest, end.saturating_sub(start));
    &rest[..len]
}

/// Leading indentation width of a line (spaces and tabs each count one).
pub fn indentation(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}
