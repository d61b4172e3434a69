#![deny(unsafe_code)]

//! Stillcode core: approximate text alignment and suggestion survival tracking.
//!
//! The alignment layer ([`lexer`], [`align`], [`lex_align`], [`locate`]) is
//! pure and synchronous. The tracking layer ([`tracker`]) runs one tokio task
//! per accepted or rejected suggestion and reports through the
//! [`telemetry::TelemetrySink`] and [`citation::CitationSink`] traits.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send` boxed future, for trait methods that must stay
/// object-safe (`Arc<dyn DocumentSource>`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Character-level semi-global edit distance.
pub mod align;
/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Code capture and the indentation-block heuristic.
pub mod capture;
/// Code citations of accepted suggestions.
pub mod citation;
/// Document source trait and an in-memory implementation.
pub mod document;
/// Lexeme-level alignment.
pub mod lex_align;
/// Code-oriented tokenizer with an interning dictionary.
pub mod lexer;
/// Windowed search for inserted text near an anchor.
pub mod locate;
/// Telemetry reports and sinks.
pub mod telemetry;
/// Character-offset helpers over UTF-8 strings.
pub mod text;
/// Survival sessions for accepted and rejected suggestions.
pub mod tracker;
/// Offsets that follow document edits.
pub mod tracking;

pub use align::{Alignment, EditOp, align};
pub use citation::{CitationRecord, CitationSink, CodeCitation, TracingCitations};
pub use document::{DocumentError, DocumentSource, DocumentSnapshot, InMemoryDocuments};
pub use lex_align::{LexAlignment, lex_align};
pub use lexer::{LexDictionary, Lexeme, LexemeKind, Lexer, tokenize};
pub use locate::{FindResult, find};
pub use telemetry::{InsertionCategory, TelemetryEvent, TelemetrySink, TracingTelemetry};
pub use tracker::{Acceptance, Rejection, SessionHandle, SurvivalTracker};
pub use tracking::OffsetTracker;
