//! Lexeme tokenizer.
//!
//! Splits text into a sequence of classified lexemes and interns each distinct
//! lexeme text into a [`LexDictionary`], so that alignment can compare small
//! integer ids instead of strings.
//!
//! Classification rules:
//!
//! - Word characters (alphanumerics of any script, plus `_`) merge into one
//!   lexeme, so `12abc` is a single word. A run splits where it crosses between
//!   Basic-Multilingual-Plane and astral-plane word characters.
//! - A run of plain spaces merges into one lexeme.
//! - Every tab, newline and carriage return is its own lexeme, even when the
//!   neighbour is identical.
//! - Every other character (punctuation, operators, emoji, exotic whitespace)
//!   is its own lexeme. `==` and `::` are two lexemes each.

use std::collections::HashMap;

use serde::Serialize;

/// Interned lexeme identifier, scoped to one [`LexDictionary`].
pub type LexemeId = u32;

/// Classification of a lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LexemeKind {
    Word,
    Space,
    Tab,
    Newline,
    CarriageReturn,
    Symbol,
}

impl std::fmt::Display for LexemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexemeKind::Word => write!(f, "word"),
            LexemeKind::Space => write!(f, "space"),
            LexemeKind::Tab => write!(f, "tab"),
            LexemeKind::Newline => write!(f, "newline"),
            LexemeKind::CarriageReturn => write!(f, "carriage_return"),
            LexemeKind::Symbol => write!(f, "symbol"),
        }
    }
}

/// A classified token borrowed from the tokenized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lexeme<'a> {
    /// Interned id of `text`.
    pub id: LexemeId,
    pub kind: LexemeKind,
    /// The originating substring.
    pub text: &'a str,
    /// Character offset of the lexeme in the tokenized text.
    pub start: usize,
    /// Length in characters.
    pub len: usize,
}

impl Lexeme<'_> {
    /// Character offset one past the end of the lexeme.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether this lexeme is exactly one plain space.
    pub fn is_single_space(&self) -> bool {
        self.text == " "
    }
}

/// Bidirectional map between lexeme text and interned ids.
#[derive(Debug, Default, Clone)]
pub struct LexDictionary {
    ids: HashMap<String, LexemeId>,
    texts: Vec<String>,
}

impl LexDictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `text`, allocating a new one if it is unseen.
    pub fn intern(&mut self, text: &str) -> LexemeId {
        if let Some(id) = self.ids.get(text) {
            return *id;
        }
        let id = self.texts.len() as LexemeId;
        self.texts.push(text.to_string());
        self.ids.insert(text.to_string(), id);
        id
    }

    /// Look up the id of `text` without interning it.
    pub fn id_of(&self, text: &str) -> Option<LexemeId> {
        self.ids.get(text).copied()
    }

    /// Recover the text of an id.
    pub fn text_of(&self, id: LexemeId) -> Option<&str> {
        self.texts.get(id as usize).map(|s| s.as_str())
    }

    /// Number of distinct lexemes interned.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Character class driving the merge decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word { astral: bool },
    Space,
    Tab,
    Newline,
    CarriageReturn,
    Symbol,
}

impl CharClass {
    fn of(c: char) -> Self {
        match c {
            ' ' => CharClass::Space,
            '\t' => CharClass::Tab,
            '\n' => CharClass::Newline,
            '\r' => CharClass::CarriageReturn,
            c if c == '_' || c.is_alphanumeric() => CharClass::Word {
                astral: u32::from(c) > 0xFFFF,
            },
            _ => CharClass::Symbol,
        }
    }

    fn merges(self) -> bool {
        matches!(self, CharClass::Word { .. } | CharClass::Space)
    }

    fn kind(self) -> LexemeKind {
        match self {
            CharClass::Word { .. } => LexemeKind::Word,
            CharClass::Space => LexemeKind::Space,
            CharClass::Tab => LexemeKind::Tab,
            CharClass::Newline => LexemeKind::Newline,
            CharClass::CarriageReturn => LexemeKind::CarriageReturn,
            CharClass::Symbol => LexemeKind::Symbol,
        }
    }
}

/// Tokenizer that owns the dictionary its lexemes are interned into.
///
/// Reusing one lexer across several texts guarantees that equal lexeme text
/// receives the same id in all of them.
#[derive(Debug, Default)]
pub struct Lexer {
    dictionary: LexDictionary,
}

impl Lexer {
    /// Create a lexer with an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lexer continuing from an existing dictionary.
    pub fn with_dictionary(dictionary: LexDictionary) -> Self {
        Self { dictionary }
    }

    /// The dictionary accumulated so far.
    pub fn dictionary(&self) -> &LexDictionary {
        &self.dictionary
    }

    /// Consume the lexer, returning its dictionary.
    pub fn into_dictionary(self) -> LexDictionary {
        self.dictionary
    }

    /// Split `text` into lexemes.
    pub fn tokenize<'a>(&mut self, text: &'a str) -> Vec<Lexeme<'a>> {
        let mut lexemes = Vec::new();
        // (class, start byte, start char) of the run being accumulated
        let mut run: Option<(CharClass, usize, usize)> = None;
        let mut char_pos = 0;

        for (byte_pos, c) in text.char_indices() {
            let class = CharClass::of(c);
            if let Some((run_class, run_byte, run_char)) = run {
                if run_class == class && class.merges() {
                    char_pos += 1;
                    continue;
                }
                lexemes.push(self.lexeme(
                    run_class,
                    &text[run_byte..byte_pos],
                    run_char,
                    char_pos - run_char,
                ));
            }
            run = Some((class, byte_pos, char_pos));
            char_pos += 1;
        }

        if let Some((run_class, run_byte, run_char)) = run {
            lexemes.push(self.lexeme(
                run_class,
                &text[run_byte..],
                run_char,
                char_pos - run_char,
            ));
        }

        lexemes
    }

    fn lexeme<'a>(
        &mut self,
        class: CharClass,
        text: &'a str,
        start: usize,
        len: usize,
    ) -> Lexeme<'a> {
        Lexeme {
            id: self.dictionary.intern(text),
            kind: class.kind(),
            text,
            start,
            len,
        }
    }
}

/// Tokenize a single text with a fresh dictionary.
pub fn tokenize(text: &str) -> (Vec<Lexeme<'_>>, LexDictionary) {
    let mut lexer = Lexer::new();
    let lexemes = lexer.tokenize(text);
    (lexemes, lexer.into_dictionary())
}
