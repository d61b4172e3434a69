//! Lexeme-level alignment.
//!
//! Runs the same semi-global alignment as [`crate::align`], but each edit
//! unit is a lexeme id from [`crate::lexer`]. A haystack lexeme that is
//! exactly one plain space may be skipped inside the match at no cost, so
//! incidental `a b` vs `ab` formatting does not inflate the distance, while
//! space runs, tabs and newlines still count as one edit each.

use serde::Serialize;

use crate::align::{self, EditOp};
use crate::lexer::{LexemeId, Lexer};
use crate::text;

/// Result of a lexeme alignment.
///
/// `start..end` are character offsets into the original haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LexAlignment {
    /// Edit distance counted in lexemes.
    pub lex_distance: usize,
    pub start: usize,
    pub end: usize,
    /// Number of lexemes in the needle.
    pub needle_lex_len: usize,
    /// Number of lexemes in the haystack.
    pub haystack_lex_len: usize,
}

impl LexAlignment {
    /// The matched span of `haystack`.
    pub fn matched<'a>(&self, haystack: &'a str) -> &'a str {
        text::char_slice(haystack, self.start, self.end)
    }
}

/// Align `needle` against the best-matching lexeme span of `haystack`.
pub fn lex_align(haystack: &str, needle: &str) -> LexAlignment {
    lex_align_with(&mut Lexer::new(), haystack, needle).0
}

/// Align with a caller-provided lexer, so its dictionary can be reused
/// across calls. Also returns the lexeme edit script.
pub fn lex_align_with(
    lexer: &mut Lexer,
    haystack: &str,
    needle: &str,
) -> (LexAlignment, Vec<EditOp>) {
    let haystack_lexemes = lexer.tokenize(haystack);
    let needle_lexemes = lexer.tokenize(needle);

    let haystack_ids: Vec<LexemeId> = haystack_lexemes.iter().map(|l| l.id).collect();
    let needle_ids: Vec<LexemeId> = needle_lexemes.iter().map(|l| l.id).collect();

    let unit = align::align_units(&haystack_ids, &needle_ids, |j| {
        usize::from(!haystack_lexemes[j].is_single_space())
    });

    let (start, end) = if unit.start == unit.end {
        (0, 0)
    } else {
        (
            haystack_lexemes[unit.start].start,
            haystack_lexemes[unit.end - 1].end(),
        )
    };

    (
        LexAlignment {
            lex_distance: unit.distance,
            start,
            end,
            needle_lex_len: needle_lexemes.len(),
            haystack_lex_len: haystack_lexemes.len(),
        },
        unit.script,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_spaces_are_free() {
        let haystack = "( ) { ";
        let result = lex_align(haystack, "(){");
        assert_eq!(result.lex_distance, 0);
        assert_eq!(result.matched(haystack), "( ) {");
        assert_eq!(result.needle_lex_len, 3);
        assert_eq!(result.haystack_lex_len, 6);
    }

    #[test]
    fn test_structural_whitespace_counts() {
        let result = lex_align("def fun (  )\n   {z}", "def fun (){z}");
        assert_eq!(result.lex_distance, 3);
    }

    #[test]
    fn test_exact_match_offsets_are_characters() {
        let haystack = "let é = 1;\nconsole.log('hi');";
        let result = lex_align(haystack, "console.log('hi')");
        assert_eq!(result.lex_distance, 0);
        assert_eq!(result.start, 11);
        assert_eq!(result.matched(haystack), "console.log('hi')");
    }

    #[test]
    fn test_word_edit_counts_once() {
        let result = lex_align("return fooBar(1);", "return foobar(1);");
        assert_eq!(result.lex_distance, 1);
        assert_eq!(result.start, 0);
    }

    #[test]
    fn test_empty_needle() {
        let result = lex_align("anything here", "");
        assert_eq!(result.lex_distance, 0);
        assert_eq!((result.start, result.end), (0, 0));
        assert_eq!(result.needle_lex_len, 0);
    }

    #[test]
    fn test_empty_haystack() {
        let result = lex_align("", "a + b");
        assert_eq!(result.lex_distance, 5);
        assert_eq!((result.start, result.end), (0, 0));
    }

    #[test]
    fn test_needle_space_is_not_free() {
        // Only haystack spaces may be skipped; a missing needle space costs one.
        let result = lex_align("a+b", "a +b");
        assert_eq!(result.lex_distance, 1);
    }

    #[test]
    fn test_script_skips_space_without_cost() {
        let (result, script) = lex_align_with(&mut Lexer::new(), "( )", "()");
        assert_eq!(result.lex_distance, 0);
        assert_eq!(script, vec![EditOp::Match, EditOp::Insert, EditOp::Match]);
    }
}
