//! Recording sinks: collect every report so tests can assert on them.

use std::sync::Mutex;

use stillcode_core::citation::{CitationRecord, CitationSink};
use stillcode_core::telemetry::{
    CaptureReport, InsertionReport, SurvivalReport, TelemetryEvent, TelemetrySink,
};

/// One report received by [`RecordingTelemetry`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Accepted(InsertionReport),
    Rejected(InsertionReport),
    StillInCode(SurvivalReport),
    CapturedAfterAccepted(CaptureReport),
    CapturedAfterRejected(CaptureReport),
}

impl Recorded {
    /// The generic event this report converts to.
    pub fn event(&self) -> TelemetryEvent {
        match self {
            Recorded::Accepted(r) => r.to_event("accepted"),
            Recorded::Rejected(r) => r.to_event("rejected"),
            Recorded::StillInCode(r) => r.to_event(),
            Recorded::CapturedAfterAccepted(r) => r.to_event("capturedAfterAccepted"),
            Recorded::CapturedAfterRejected(r) => r.to_event("capturedAfterRejected"),
        }
    }
}

/// Telemetry sink that keeps every report in arrival order.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    reports: Mutex<Vec<Recorded>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, report: Recorded) {
        self.reports.lock().expect("recorder poisoned").push(report);
    }

    pub fn reports(&self) -> Vec<Recorded> {
        self.reports.lock().expect("recorder poisoned").clone()
    }

    /// Event names in arrival order, e.g. `ghostText.stillInCode`.
    pub fn event_names(&self) -> Vec<String> {
        self.reports().iter().map(|r| r.event().event_name).collect()
    }

    pub fn survival(&self) -> Vec<SurvivalReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::StillInCode(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn captures(&self) -> Vec<CaptureReport> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::CapturedAfterAccepted(report)
                | Recorded::CapturedAfterRejected(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn accepted(&self, report: &InsertionReport) {
        self.push(Recorded::Accepted(report.clone()));
    }

    fn rejected(&self, report: &InsertionReport) {
        self.push(Recorded::Rejected(report.clone()));
    }

    fn still_in_code(&self, report: &SurvivalReport) {
        self.push(Recorded::StillInCode(report.clone()));
    }

    fn captured_after_accepted(&self, report: &CaptureReport) {
        self.push(Recorded::CapturedAfterAccepted(report.clone()));
    }

    fn captured_after_rejected(&self, report: &CaptureReport) {
        self.push(Recorded::CapturedAfterRejected(report.clone()));
    }
}

/// Citation sink that keeps every record.
#[derive(Debug, Default)]
pub struct RecordingCitations {
    records: Mutex<Vec<CitationRecord>>,
}

impl RecordingCitations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<CitationRecord> {
        self.records.lock().expect("recorder poisoned").clone()
    }
}

impl CitationSink for RecordingCitations {
    fn handle_citation(&self, record: CitationRecord) {
        self.records.lock().expect("recorder poisoned").push(record);
    }
}
