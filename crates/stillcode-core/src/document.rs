//! Document source: the host's view of live, editable documents.
//!
//! The tracker only reads documents: it takes [`DocumentSnapshot`]s and
//! listens to [`DocumentEvent`]s. Hosts implement [`DocumentSource`] over
//! their own document model; [`InMemoryDocuments`] is a complete in-process
//! implementation used by the CLI and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::BoxFuture;
use crate::text;

/// Capacity of each per-document event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Errors from document lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document not open: {0}")]
    NotFound(String),

    #[error("document source unavailable: {0}")]
    Unavailable(String),
}

/// Zero-based line/character position. `character` counts Unicode scalar
/// values from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// One replacement inside a document, in character offsets of the document
/// as it was before this replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    pub range_offset: usize,
    pub range_length: usize,
    pub text: String,
}

impl ContentChange {
    pub fn new(range_offset: usize, range_length: usize, text: impl Into<String>) -> Self {
        Self {
            range_offset,
            range_length,
            text: text.into(),
        }
    }

    /// Character offset one past the replaced range.
    pub fn range_end(&self) -> usize {
        self.range_offset + self.range_length
    }
}

/// A versioned batch of content changes. Changes apply in order, each
/// relative to the result of the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub uri: String,
    /// Document version after all changes are applied.
    pub version: u64,
    pub changes: Vec<ContentChange>,
}

/// Events published for a subscribed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    Changed(DocumentChange),
    Closed { uri: String },
}

/// Immutable view of a document at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub uri: String,
    pub version: u64,
    pub text: String,
}

impl DocumentSnapshot {
    /// Document length in characters.
    pub fn char_len(&self) -> usize {
        text::char_len(&self.text)
    }

    /// Text between two character offsets (clamped).
    pub fn slice(&self, start: usize, end: usize) -> &str {
        text::char_slice(&self.text, start, end)
    }

    /// Line/character position of a character offset (clamped to the end).
    pub fn position_at(&self, offset: usize) -> Position {
        let mut line = 0u32;
        let mut character = 0u32;
        for c in self.text.chars().take(offset) {
            if c == '\n' {
                line += 1;
                character = 0;
            } else {
                character += 1;
            }
        }
        Position { line, character }
    }
}

/// Source of live documents.
///
/// Implementations must publish [`DocumentEvent::Changed`] in version order,
/// and must make a change visible to [`DocumentSource::snapshot`] no earlier
/// than its event is published.
pub trait DocumentSource: Send + Sync {
    /// Read the current text and version of a document.
    fn snapshot(&self, uri: &str) -> BoxFuture<'_, Result<DocumentSnapshot, DocumentError>>;

    /// Subscribe to change/close events of a document.
    fn subscribe(&self, uri: &str) -> Result<broadcast::Receiver<DocumentEvent>, DocumentError>;
}

struct OpenDocument {
    text: String,
    version: u64,
    events: broadcast::Sender<DocumentEvent>,
}

/// Thread-safe in-memory document store.
#[derive(Default)]
pub struct InMemoryDocuments {
    documents: Mutex<HashMap<String, OpenDocument>>,
}

impl InMemoryDocuments {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) a document at version 1.
    pub fn open(&self, uri: &str, text: &str) {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let document = OpenDocument {
            text: text.to_string(),
            version: 1,
            events,
        };
        if let Ok(mut documents) = self.documents.lock()
            && let Some(previous) = documents.insert(uri.to_string(), document)
        {
            let _ = previous.events.send(DocumentEvent::Closed {
                uri: uri.to_string(),
            });
        }
        debug!(uri, "Document opened");
    }

    /// Replace `range_length` characters at `range_offset` with `text`.
    /// The range is clamped to the document. Returns the new version.
    pub fn edit(
        &self,
        uri: &str,
        range_offset: usize,
        range_length: usize,
        text: &str,
    ) -> Result<u64, DocumentError> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| DocumentError::Unavailable("document store poisoned".to_string()))?;
        let document = documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::NotFound(uri.to_string()))?;

        let len = text::char_len(&document.text);
        let start = range_offset.min(len);
        let end = start.saturating_add(range_length).min(len);
        let start_byte = text::byte_offset(&document.text, start);
        let end_byte = text::byte_offset(&document.text, end);
        document.text.replace_range(start_byte..end_byte, text);
        document.version += 1;

        // Published under the lock so events leave in version order.
        let _ = document.events.send(DocumentEvent::Changed(DocumentChange {
            uri: uri.to_string(),
            version: document.version,
            changes: vec![ContentChange::new(start, end - start, text)],
        }));
        Ok(document.version)
    }

    /// Insert `text` at `offset`.
    pub fn insert(&self, uri: &str, offset: usize, text: &str) -> Result<u64, DocumentError> {
        self.edit(uri, offset, 0, text)
    }

    /// Delete `length` characters at `offset`.
    pub fn delete(&self, uri: &str, offset: usize, length: usize) -> Result<u64, DocumentError> {
        self.edit(uri, offset, length, "")
    }

    /// Replace the whole text of a document.
    pub fn replace(&self, uri: &str, text: &str) -> Result<u64, DocumentError> {
        self.edit(uri, 0, usize::MAX, text)
    }

    /// Close a document, notifying subscribers.
    pub fn close(&self, uri: &str) {
        let removed = self
            .documents
            .lock()
            .ok()
            .and_then(|mut documents| documents.remove(uri));
        if let Some(document) = removed {
            let _ = document.events.send(DocumentEvent::Closed {
                uri: uri.to_string(),
            });
            debug!(uri, "Document closed");
        }
    }

    /// Current text of a document, if open.
    pub fn text(&self, uri: &str) -> Option<String> {
        self.documents
            .lock()
            .ok()
            .and_then(|documents| documents.get(uri).map(|d| d.text.clone()))
    }

    fn current(&self, uri: &str) -> Result<DocumentSnapshot, DocumentError> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| DocumentError::Unavailable("document store poisoned".to_string()))?;
        documents
            .get(uri)
            .map(|d| DocumentSnapshot {
                uri: uri.to_string(),
                version: d.version,
                text: d.text.clone(),
            })
            .ok_or_else(|| DocumentError::NotFound(uri.to_string()))
    }
}

impl DocumentSource for InMemoryDocuments {
    fn snapshot(&self, uri: &str) -> BoxFuture<'_, Result<DocumentSnapshot, DocumentError>> {
        let result = self.current(uri);
        Box::pin(async move { result })
    }

    fn subscribe(&self, uri: &str) -> Result<broadcast::Receiver<DocumentEvent>, DocumentError> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| DocumentError::Unavailable("document store poisoned".to_string()))?;
        documents
            .get(uri)
            .map(|d| d.events.subscribe())
            .ok_or_else(|| DocumentError::NotFound(uri.to_string()))
    }
}
