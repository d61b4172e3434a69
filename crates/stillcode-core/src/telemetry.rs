//! Telemetry reports and the sink they are delivered to.
//!
//! Each report kind has its own [`TelemetrySink`] method. Every report also
//! converts into a transport-agnostic [`TelemetryEvent`] named
//! `<category>.<kind>`, e.g. `ghostText.stillInCode`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::capture::CapturedCode;
use crate::locate::FindResult;

/// Which UI surface produced the suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertionCategory {
    /// Inline ghost-text completion.
    GhostText,
    /// Completion picked from the solutions panel.
    Solution,
}

impl InsertionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertionCategory::GhostText => "ghostText",
            InsertionCategory::Solution => "solution",
        }
    }
}

impl std::fmt::Display for InsertionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-supplied properties copied into every event of a suggestion.
pub type Properties = BTreeMap<String, String>;

/// Generic structured telemetry event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event_name: String,
    pub properties: BTreeMap<String, String>,
    pub measurements: BTreeMap<String, f64>,
}

impl TelemetryEvent {
    fn new(category: InsertionCategory, kind: &str, properties: &Properties) -> Self {
        Self {
            event_name: format!("{category}.{kind}"),
            properties: properties.clone(),
            measurements: BTreeMap::new(),
        }
    }

    fn property(mut self, key: &str, value: impl ToString) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }

    fn measurement(mut self, key: &str, value: f64) -> Self {
        self.measurements.insert(key.to_string(), value);
        self
    }
}

/// A suggestion was accepted or rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionReport {
    pub category: InsertionCategory,
    pub uri: String,
    pub insertion_offset: usize,
    /// Length of the full suggestion, in characters.
    pub completion_len: usize,
    /// Length of the text actually inserted (zero for rejections).
    pub inserted_len: usize,
    pub properties: Properties,
}

impl InsertionReport {
    pub fn to_event(&self, kind: &str) -> TelemetryEvent {
        TelemetryEvent::new(self.category, kind, &self.properties)
            .property("uri", &self.uri)
            .measurement("insertionOffset", self.insertion_offset as f64)
            .measurement("compCharLen", self.completion_len as f64)
            .measurement("insertedCharLen", self.inserted_len as f64)
    }
}

/// Outcome of one survival check at a horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalReport {
    pub category: InsertionCategory,
    pub uri: String,
    pub timeout_secs: u64,
    pub insertion_offset: usize,
    pub tracked_offset: usize,
    /// Whether the verdict came from the wide retry.
    pub far_search: bool,
    pub result: FindResult,
    pub properties: Properties,
}

impl SurvivalReport {
    pub fn to_event(&self) -> TelemetryEvent {
        let result = &self.result;
        TelemetryEvent::new(self.category, "stillInCode", &self.properties)
            .property("uri", &self.uri)
            .property("stillInCode", result.still_in_code)
            .property("searchMargin", if self.far_search { "far" } else { "near" })
            .measurement("timeoutSeconds", self.timeout_secs as f64)
            .measurement("insertionOffset", self.insertion_offset as f64)
            .measurement("trackedOffset", self.tracked_offset as f64)
            .measurement("foundOffset", result.found_offset as f64)
            .measurement("stillInCodeHeuristic", f64::from(u8::from(result.still_in_code)))
            .measurement("relativeLexEditDistance", result.relative_lex_edit_distance)
            .measurement("lexEditDistance", result.lex_edit_distance as f64)
            .measurement("charEditDistance", result.char_edit_distance as f64)
            .measurement("completionLexLength", result.completion_lex_len as f64)
    }
}

/// Code captured around a tracked offset at a horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReport {
    pub category: InsertionCategory,
    pub uri: String,
    pub timeout_secs: u64,
    pub insertion_offset: usize,
    pub tracked_offset: usize,
    pub capture: CapturedCode,
    pub properties: Properties,
}

impl CaptureReport {
    pub fn to_event(&self, kind: &str) -> TelemetryEvent {
        let mut event = TelemetryEvent::new(self.category, kind, &self.properties)
            .property("uri", &self.uri)
            .property("hypotheticalPromptPrefix", &self.capture.prefix)
            .property("hypotheticalPromptSuffix", &self.capture.suffix)
            .property("capturedCode", &self.capture.code)
            .measurement("timeoutSeconds", self.timeout_secs as f64)
            .measurement("insertionOffset", self.insertion_offset as f64)
            .measurement("trackedOffset", self.tracked_offset as f64);
        if let Some(termination) = self.capture.termination_offset {
            event = event.measurement("terminationOffsetInCapturedCode", termination as f64);
        }
        event
    }
}

/// Receiver of tracker telemetry.
///
/// Methods are synchronous and must not block; sinks that ship events
/// elsewhere should hand them to their own queue.
pub trait TelemetrySink: Send + Sync {
    fn accepted(&self, report: &InsertionReport);

    fn rejected(&self, report: &InsertionReport);

    fn still_in_code(&self, report: &SurvivalReport);

    fn captured_after_accepted(&self, report: &CaptureReport);

    fn captured_after_rejected(&self, report: &CaptureReport);
}

/// Sink that writes every event to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    fn emit(event: &TelemetryEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        info!(event = %event.event_name, %payload, "Telemetry event");
    }
}

impl TelemetrySink for TracingTelemetry {
    fn accepted(&self, report: &InsertionReport) {
        Self::emit(&report.to_event("accepted"));
    }

    fn rejected(&self, report: &InsertionReport) {
        Self::emit(&report.to_event("rejected"));
    }

    fn still_in_code(&self, report: &SurvivalReport) {
        Self::emit(&report.to_event());
    }

    fn captured_after_accepted(&self, report: &CaptureReport) {
        Self::emit(&report.to_event("capturedAfterAccepted"));
    }

    fn captured_after_rejected(&self, report: &CaptureReport) {
        Self::emit(&report.to_event("capturedAfterRejected"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn find_result(still_in_code: bool) -> FindResult {
        FindResult {
            still_in_code,
            found_offset: 12,
            relative_lex_edit_distance: 0.25,
            lex_edit_distance: 2,
            char_edit_distance: 5,
            completion_lex_len: 8,
        }
    }

    #[test]
    fn test_category_names() {
        assert_eq!(InsertionCategory::GhostText.to_string(), "ghostText");
        assert_eq!(InsertionCategory::Solution.as_str(), "solution");
    }

    #[test]
    fn test_survival_event() {
        let mut properties = Properties::new();
        properties.insert("headerRequestId".to_string(), "req-1".to_string());
        let report = SurvivalReport {
            category: InsertionCategory::GhostText,
            uri: "file:///a.py".to_string(),
            timeout_secs: 30,
            insertion_offset: 10,
            tracked_offset: 12,
            far_search: true,
            result: find_result(true),
            properties,
        };

        let event = report.to_event();
        assert_eq!(event.event_name, "ghostText.stillInCode");
        assert_eq!(event.properties["headerRequestId"], "req-1");
        assert_eq!(event.properties["stillInCode"], "true");
        assert_eq!(event.properties["searchMargin"], "far");
        assert_eq!(event.measurements["timeoutSeconds"], 30.0);
        assert_eq!(event.measurements["trackedOffset"], 12.0);
        assert_eq!(event.measurements["stillInCodeHeuristic"], 1.0);
        assert_eq!(event.measurements["relativeLexEditDistance"], 0.25);
    }

    #[test]
    fn test_insertion_event() {
        let report = InsertionReport {
            category: InsertionCategory::Solution,
            uri: "file:///a.py".to_string(),
            insertion_offset: 4,
            completion_len: 30,
            inserted_len: 12,
            properties: Properties::new(),
        };
        let event = report.to_event("accepted");
        assert_eq!(event.event_name, "solution.accepted");
        assert_eq!(event.measurements["compCharLen"], 30.0);
        assert_eq!(event.measurements["insertedCharLen"], 12.0);
    }

    #[test]
    fn test_capture_event_without_termination() {
        let report = CaptureReport {
            category: InsertionCategory::GhostText,
            uri: "file:///a.py".to_string(),
            timeout_secs: 30,
            insertion_offset: 0,
            tracked_offset: 0,
            capture: CapturedCode {
                prefix: String::new(),
                suffix: String::new(),
                code: "pass".to_string(),
                termination_offset: None,
            },
            properties: Properties::new(),
        };
        let event = report.to_event("capturedAfterRejected");
        assert_eq!(event.event_name, "ghostText.capturedAfterRejected");
        assert_eq!(event.properties["capturedCode"], "pass");
        assert!(!event.measurements.contains_key("terminationOffsetInCapturedCode"));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event =
            TelemetryEvent::new(InsertionCategory::GhostText, "accepted", &Properties::new());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventName"], "ghostText.accepted");
        assert!(json["measurements"].as_object().unwrap().is_empty());
    }
}
