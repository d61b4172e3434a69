//! A survival tracker wired to an in-memory document store and recording
//! sinks.

use std::sync::Arc;

use stillcode_config::TrackerConfig;
use stillcode_core::document::InMemoryDocuments;
use stillcode_core::tracker::SurvivalTracker;
use tracing::debug;

use crate::sinks::{RecordingCitations, RecordingTelemetry};

pub struct TrackerHarness {
    pub documents: Arc<InMemoryDocuments>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub citations: Arc<RecordingCitations>,
    pub tracker: SurvivalTracker,
}

impl TrackerHarness {
    /// # Panics
    ///
    /// Panics when `config` fails validation.
    pub fn new(config: TrackerConfig) -> Self {
        let documents = Arc::new(InMemoryDocuments::new());
        let telemetry = Arc::new(RecordingTelemetry::new());
        let citations = Arc::new(RecordingCitations::new());
        let tracker = SurvivalTracker::new(
            config,
            documents.clone(),
            telemetry.clone(),
            citations.clone(),
        )
        .expect("invalid tracker config");
        debug!(timeouts = tracker.config().timeouts.len(), "Tracker harness ready");
        Self {
            documents,
            telemetry,
            citations,
            tracker,
        }
    }

    /// Harness with one document already open.
    pub fn with_document(config: TrackerConfig, uri: &str, text: &str) -> Self {
        let harness = Self::new(config);
        harness.documents.open(uri, text);
        harness
    }

    pub fn text(&self, uri: &str) -> String {
        self.documents.text(uri).unwrap_or_default()
    }
}
