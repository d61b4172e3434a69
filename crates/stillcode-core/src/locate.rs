//! Windowed locator: is a piece of inserted text still near its anchor?
//!
//! [`find`] cuts a bounded window around an anchor offset, aligns the needle
//! against it at lexeme granularity, refines the distance at character
//! granularity, and turns the relative lexeme distance into the
//! still-in-code verdict.

use serde::Serialize;

use crate::align;
use crate::lex_align;
use crate::text;

/// Relative lexeme edit distance at or below which text counts as present.
pub const DEFAULT_STILL_IN_CODE_THRESHOLD: f64 = 0.5;

/// Outcome of a windowed search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult {
    /// `relative_lex_edit_distance <= threshold`.
    #[serde(rename = "stillInCodeHeuristic")]
    pub still_in_code: bool,
    /// Absolute character offset of the best match in the document.
    pub found_offset: usize,
    pub relative_lex_edit_distance: f64,
    pub lex_edit_distance: usize,
    /// Character edit distance between the needle and the lexeme-aligned span.
    pub char_edit_distance: usize,
    #[serde(rename = "completionLexLength")]
    pub completion_lex_len: usize,
}

/// Search for `needle` around `anchor` with the default threshold.
pub fn find(document: &str, anchor: usize, margin: usize, needle: &str) -> FindResult {
    find_with_threshold(
        document,
        anchor,
        margin,
        needle,
        DEFAULT_STILL_IN_CODE_THRESHOLD,
    )
}

/// Search for `needle` inside
/// `document[anchor - margin .. anchor + len(needle) + margin]`
/// (clamped to the document), judging presence against `threshold`.
pub fn find_with_threshold(
    document: &str,
    anchor: usize,
    margin: usize,
    needle: &str,
    threshold: f64,
) -> FindResult {
    let document_len = text::char_len(document);
    let window_end = document_len.min(
        anchor
            .saturating_add(text::char_len(needle))
            .saturating_add(margin),
    );
    let window_start = anchor.saturating_sub(margin).min(window_end);
    let window = text::char_slice(document, window_start, window_end);

    let lex = lex_align::lex_align(window, needle);
    let relative = if lex.needle_lex_len == 0 {
        0.0
    } else {
        lex.lex_distance as f64 / lex.needle_lex_len as f64
    };
    let char_edit_distance = align::align(lex.matched(window), needle).distance;

    FindResult {
        still_in_code: relative <= threshold,
        found_offset: window_start + lex.start,
        relative_lex_edit_distance: relative,
        lex_edit_distance: lex.lex_distance,
        char_edit_distance,
        completion_lex_len: lex.needle_lex_len,
    }
}
