//! Fuzz target for the aligners and the windowed locator.
//!
//! Run with: cargo +nightly fuzz run fuzz_align
//!
//! Input layout: two bytes of anchor, one byte of margin, then haystack and
//! needle separated by the first NUL.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stillcode_core::{align, find, lex_align, text};

fuzz_target!(|data: &[u8]| {
    let [a, b, margin, rest @ ..] = data else {
        return;
    };
    let Ok(s) = std::str::from_utf8(rest) else {
        return;
    };
    let (haystack, needle) = s.split_once('\0').unwrap_or((s, ""));
    let haystack_len = text::char_len(haystack);
    let needle_len = text::char_len(needle);

    let alignment = align(haystack, needle);
    assert!(alignment.start <= alignment.end && alignment.end <= haystack_len);
    assert!(alignment.distance <= needle_len);

    let lex = lex_align(haystack, needle);
    assert!(lex.start <= lex.end && lex.end <= haystack_len);
    assert!(lex.lex_distance <= lex.needle_lex_len);

    let anchor = usize::from(u16::from_le_bytes([*a, *b]));
    let result = find(haystack, anchor, usize::from(*margin), needle);
    assert!(result.found_offset <= haystack_len);
    assert!(result.relative_lex_edit_distance >= 0.0);
});
