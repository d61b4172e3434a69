//! Offset tracker, a cursor that stays valid while its document is edited.

use crate::document::DocumentChange;

/// A character offset into a document, kept current by applying the
/// document's change events.
///
/// Rules per content change:
///
/// - a change whose replaced range ends at or before the offset shifts the
///   offset by the change's length delta (an insertion exactly at the offset
///   pushes it right);
/// - a change whose replaced range strictly contains the offset moves it to
///   the start of that range;
/// - changes after the offset leave it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTracker {
    offset: usize,
    version: Option<u64>,
}

impl OffsetTracker {
    /// Track `offset`, applying every change event received from now on.
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            version: None,
        }
    }

    /// Track `offset` in a document known to be at `version`; events at or
    /// below that version are ignored.
    pub fn at_version(offset: usize, version: u64) -> Self {
        Self {
            offset,
            version: Some(version),
        }
    }

    /// The current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Version of the last change applied, if any.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Whether the tracker reflects the document at `version` or later.
    pub fn is_current(&self, version: u64) -> bool {
        self.version.is_some_and(|v| v >= version)
    }

    /// Apply a change event. Stale or duplicate versions are ignored.
    pub fn apply(&mut self, change: &DocumentChange) {
        if self.version.is_some_and(|v| change.version <= v) {
            return;
        }
        for content in &change.changes {
            if content.range_end() <= self.offset {
                let inserted = content.text.chars().count();
                self.offset = (self.offset + inserted).saturating_sub(content.range_length);
            } else if content.range_offset < self.offset {
                self.offset = content.range_offset;
            }
        }
        self.version = Some(change.version);
    }
}
