//! Code citations attached to accepted suggestions.
//!
//! A suggestion may carry citations: spans of the suggestion (in suggestion
//! character offsets) that match licensed public code. Once the suggestion is
//! inserted, each span is clipped to what was actually inserted and mapped to
//! live document coordinates.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{DocumentSnapshot, Position};
use crate::locate;
use crate::text;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseDetail {
    pub license: String,
    pub url: String,
}

/// A cited span `[start_offset, stop_offset)` of the suggestion text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCitation {
    pub start_offset: usize,
    pub stop_offset: usize,
    pub details: Vec<LicenseDetail>,
}

impl CodeCitation {
    pub fn new(start_offset: usize, stop_offset: usize) -> Self {
        Self {
            start_offset,
            stop_offset,
            details: Vec::new(),
        }
    }

    pub fn with_license(mut self, license: impl Into<String>, url: impl Into<String>) -> Self {
        self.details.push(LicenseDetail {
            license: license.into(),
            url: url.into(),
        });
        self
    }
}

/// A citation resolved against the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRecord {
    pub document_uri: String,
    pub offset_start: usize,
    pub offset_end: usize,
    pub start: Position,
    pub end: Position,
    pub version: u64,
    pub matching_text: String,
    pub license_details: Vec<LicenseDetail>,
}

/// Receiver of resolved citations.
pub trait CitationSink: Send + Sync {
    fn handle_citation(&self, record: CitationRecord);
}

/// Sink that logs every citation via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCitations;

impl CitationSink for TracingCitations {
    fn handle_citation(&self, record: CitationRecord) {
        let licenses: Vec<&str> = record
            .license_details
            .iter()
            .map(|d| d.license.as_str())
            .collect();
        info!(
            uri = %record.document_uri,
            start = record.offset_start,
            end = record.offset_end,
            version = record.version,
            licenses = ?licenses,
            "Code citation"
        );
    }
}

/// Clip a cited span `[start, stop)` to the `inserted_len` characters
/// actually inserted.
///
/// Returns `None` when nothing of the span was inserted.
pub fn clip_citation(inserted_len: usize, start: usize, stop: usize) -> Option<(usize, usize)> {
    let stop = stop.min(inserted_len);
    (start < stop).then_some((start, stop))
}

/// Resolve `citations` of a suggestion inserted at `offset` against the
/// document as it is now.
///
/// The insertion offset is re-derived by searching for `inserted_text` within
/// `margin` characters; when it is no longer found the original offset is
/// kept.
pub fn resolve_citations(
    snapshot: &DocumentSnapshot,
    offset: usize,
    inserted_text: &str,
    completion_len: usize,
    citations: &[CodeCitation],
    margin: usize,
) -> Vec<CitationRecord> {
    let inserted_len = text::char_len(inserted_text);
    let found = locate::find(&snapshot.text, offset, margin, inserted_text);
    let live_offset = if found.still_in_code {
        found.found_offset
    } else {
        offset
    };

    citations
        .iter()
        .filter_map(|citation| {
            let Some((start, stop)) =
                clip_citation(inserted_len, citation.start_offset, citation.stop_offset)
            else {
                debug!(
                    uri = %snapshot.uri,
                    start = citation.start_offset,
                    stop = citation.stop_offset,
                    inserted_len,
                    partial = inserted_len < completion_len,
                    "Citation outside inserted text, skipped"
                );
                return None;
            };

            let offset_start = live_offset + start;
            let offset_end = live_offset + stop;
            Some(CitationRecord {
                document_uri: snapshot.uri.clone(),
                offset_start,
                offset_end,
                start: snapshot.position_at(offset_start),
                end: snapshot.position_at(offset_end),
                version: snapshot.version,
                matching_text: text::char_slice(inserted_text, start, stop).to_string(),
                license_details: citation.details.clone(),
            })
        })
        .collect()
}
