//! Character-level semi-global alignment.
//!
//! [`align`] finds the substring of a haystack with the minimum edit distance
//! to a needle. Unlike classic Levenshtein, the unmatched haystack prefix and
//! suffix are free: row zero of the table is all zeros and the answer is the
//! minimum of the last row.
//!
//! Ties are resolved by a fixed precedence so results are reproducible:
//!
//! 1. In the last row the leftmost minimum wins, so the earliest end is
//!    chosen. Dropping a trailing needle character therefore beats
//!    substituting it at the boundary (`align("abcS", "abcd")` matches `abc`).
//! 2. While backtracking, a diagonal move (match or substitution) beats a
//!    deletion of a needle unit, which beats an insertion of a haystack unit.
//!    A substitution therefore beats "insert, then match" of equal cost
//!    (`align("aXbc", "abc")` matches `Xbc`).
//!
//! The table is generic over the compared unit so the lexeme aligner in
//! [`crate::lex_align`] shares it.

use serde::Serialize;

use crate::text;

/// Best-matching span of a haystack and its edit distance to the needle.
///
/// `start..end` is a half-open range of character offsets into the haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Alignment {
    pub distance: usize,
    pub start: usize,
    pub end: usize,
}

impl Alignment {
    /// Length of the matched span in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the matched span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The matched span of `haystack`.
    pub fn matched<'a>(&self, haystack: &'a str) -> &'a str {
        text::char_slice(haystack, self.start, self.end)
    }
}

/// One step of an edit script turning the matched span into the needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    /// Haystack and needle unit are equal.
    Match,
    /// Haystack unit replaced by the needle unit.
    Substitute,
    /// Haystack unit with no needle counterpart.
    Insert,
    /// Needle unit with no haystack counterpart.
    Delete,
}

/// Alignment in unit indices plus the backtracked edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UnitAlignment {
    pub distance: usize,
    pub start: usize,
    pub end: usize,
    pub script: Vec<EditOp>,
}

/// Semi-global alignment of `needle` against `haystack`.
///
/// `insert_cost(j)` is the cost of skipping haystack unit `j` inside the
/// match; substitutions and needle deletions always cost one.
pub(crate) fn align_units<T, F>(haystack: &[T], needle: &[T], insert_cost: F) -> UnitAlignment
where
    T: PartialEq,
    F: Fn(usize) -> usize,
{
    let width = haystack.len() + 1;
    let rows = needle.len() + 1;
    let mut table = vec![0usize; width * rows];
    let at = |i: usize, j: usize| i * width + j;

    for i in 1..rows {
        table[at(i, 0)] = i;
        for j in 1..width {
            let mismatch = usize::from(haystack[j - 1] != needle[i - 1]);
            let substitution = table[at(i - 1, j - 1)] + mismatch;
            let deletion = table[at(i - 1, j)] + 1;
            let insertion = table[at(i, j - 1)] + insert_cost(j - 1);
            table[at(i, j)] = substitution.min(deletion).min(insertion);
        }
    }

    let last = rows - 1;
    let mut end = 0;
    for j in 1..width {
        if table[at(last, j)] < table[at(last, end)] {
            end = j;
        }
    }
    let distance = table[at(last, end)];

    let mut script = Vec::with_capacity(needle.len());
    let (mut i, mut j) = (last, end);
    while i > 0 {
        let value = table[at(i, j)];
        if j > 0 {
            let equal = haystack[j - 1] == needle[i - 1];
            if table[at(i - 1, j - 1)] + usize::from(!equal) == value {
                script.push(if equal { EditOp::Match } else { EditOp::Substitute });
                i -= 1;
                j -= 1;
                continue;
            }
        }
        if table[at(i - 1, j)] + 1 == value {
            script.push(EditOp::Delete);
            i -= 1;
            continue;
        }
        // Only an insertion can remain; j > 0 because column zero is reached
        // exclusively through deletions.
        script.push(EditOp::Insert);
        j -= 1;
    }
    script.reverse();

    UnitAlignment {
        distance,
        start: j,
        end,
        script,
    }
}

/// Align `needle` against the best-matching substring of `haystack`.
///
/// An empty needle yields distance 0 and the empty span at offset 0. When no
/// useful alignment exists (including an empty haystack) the result is the
/// empty span at offset 0 with distance equal to the needle length.
pub fn align(haystack: &str, needle: &str) -> Alignment {
    align_with_script(haystack, needle).0
}

/// Like [`align`], additionally returning the edit script that turns the
/// matched span into the needle.
pub fn align_with_script(haystack: &str, needle: &str) -> (Alignment, Vec<EditOp>) {
    let haystack: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    let unit = align_units(&haystack, &needle, |_| 1);
    (
        Alignment {
            distance: unit.distance,
            start: unit.start,
            end: unit.end,
        },
        unit.script,
    )
}
