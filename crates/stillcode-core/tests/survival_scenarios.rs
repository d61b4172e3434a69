//! End-to-end survival tracking scenarios against an in-memory document
//! store, with time paused so horizons fire deterministically.

use std::time::Duration;

use pretty_assertions::assert_eq;

use stillcode_core::citation::CodeCitation;
use stillcode_core::document::Position;
use stillcode_core::telemetry::{InsertionCategory, Properties};
use stillcode_core::tracker::{Acceptance, Rejection};
use stillcode_config::AppConfig;
use stillcode_test_utils::config::{TestConfigBuilder, TestConfigFile};
use stillcode_test_utils::harness::TrackerHarness;
use stillcode_test_utils::sinks::Recorded;
use stillcode_test_utils::tracing_setup::init_test_tracing;

const URI: &str = "file:///workspace/app.js";
const COMPLETION: &str = "console.log('hi')";

fn document() -> String {
    format!("let a = 1\n{COMPLETION}\nlet b = 2\n")
}

// ── Accepted suggestions ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_completion_survives_then_is_deleted() {
    init_test_tracing();
    let config = TestConfigBuilder::new()
        .timeout(15, false, false)
        .timeout(30, true, true)
        .build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));

    tokio::time::sleep(Duration::from_secs(16)).await;
    let survival = harness.telemetry.survival();
    assert_eq!(survival.len(), 1);
    assert_eq!(survival[0].timeout_secs, 15);
    assert!(survival[0].result.still_in_code);
    assert_eq!(survival[0].result.found_offset, 10);
    assert_eq!(survival[0].result.lex_edit_distance, 0);

    harness.documents.delete(URI, 10, 17).unwrap();
    assert_eq!(harness.text(URI), "let a = 1\n\nlet b = 2\n");

    tokio::time::sleep(Duration::from_secs(15)).await;
    let survival = harness.telemetry.survival();
    assert_eq!(survival.len(), 2);
    assert_eq!(survival[1].timeout_secs, 30);
    assert!(!survival[1].result.still_in_code);
    assert!(survival[1].far_search);

    handle.finished().await;
    assert_eq!(
        harness.telemetry.event_names(),
        vec![
            "ghostText.accepted",
            "ghostText.stillInCode",
            "ghostText.stillInCode",
            "ghostText.capturedAfterAccepted",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_edits_above_move_the_tracked_offset() {
    let config = TestConfigBuilder::new().timeout(15, false, false).build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));
    harness.documents.insert(URI, 0, "// comment\n").unwrap();
    harness.documents.insert(URI, 0, "'use strict';\n").unwrap();
    handle.finished().await;

    let survival = harness.telemetry.survival();
    assert_eq!(survival[0].insertion_offset, 10);
    assert_eq!(survival[0].tracked_offset, 35);
    assert_eq!(survival[0].result.found_offset, 35);
    assert!(survival[0].result.still_in_code);
}

#[tokio::test(start_paused = true)]
async fn test_small_edits_inside_still_count() {
    let config = TestConfigBuilder::new().timeout(15, false, false).build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));
    // 'hi' -> 'hello'
    harness.documents.edit(URI, 23, 2, "hello").unwrap();
    handle.finished().await;

    let result = harness.telemetry.survival()[0].result;
    assert!(result.still_in_code);
    assert_eq!(result.lex_edit_distance, 1);
    assert_eq!(result.char_edit_distance, 3);
}

#[tokio::test(start_paused = true)]
async fn test_moved_completion_found_by_far_search() {
    let config = TestConfigBuilder::new()
        .near_margin(20)
        .far_margin(500)
        .timeout(15, false, false)
        .build_tracker();
    let text = format!("{COMPLETION}\n{}", "\n".repeat(200));
    let harness = TrackerHarness::with_document(config, URI, &text);

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 0, COMPLETION));
    // Cut from the top and pasted far below.
    harness.documents.delete(URI, 0, 17).unwrap();
    harness.documents.insert(URI, 150, COMPLETION).unwrap();
    handle.finished().await;

    let survival = harness.telemetry.survival();
    assert_eq!(survival[0].tracked_offset, 0);
    assert!(survival[0].far_search);
    assert!(survival[0].result.still_in_code);
    assert_eq!(survival[0].result.found_offset, 150);
}

#[tokio::test(start_paused = true)]
async fn test_capture_after_accepted() {
    let text = "import os\n\ndef f():\n    return os.getcwd()\n\nprint(f())\n";
    let config = TestConfigBuilder::new().timeout(30, true, false).build_tracker();
    let harness = TrackerHarness::with_document(config, "file:///m.py", text);

    let handle = harness.tracker.accepted(Acceptance::new(
        "file:///m.py",
        InsertionCategory::Solution,
        11,
        "def f():\n    return os.getcwd()",
    ));
    handle.finished().await;

    let captures = harness.telemetry.captures();
    assert_eq!(captures.len(), 1);
    let capture = &captures[0].capture;
    assert_eq!(capture.prefix, "import os\n\n");
    assert_eq!(capture.code, "def f():\n    return os.getcwd()");
    assert_eq!(capture.termination_offset, Some(31));
    assert_eq!(capture.suffix, "\n\nprint(f())\n");
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_properties_flow_into_events() {
    let config = TestConfigBuilder::new().timeout(15, false, false).build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness.tracker.accepted(
        Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION)
            .with_property("choiceIndex", "2"),
    );
    handle.finished().await;

    for report in harness.telemetry.reports() {
        assert_eq!(report.event().properties["choiceIndex"], "2");
    }
}

#[tokio::test(start_paused = true)]
async fn test_schedule_from_config_file() {
    let file = TestConfigFile::with_toml(
        r#"
[tracker]
near_margin = 20

[[tracker.timeouts]]
delay_secs = 5
capture_code = false
capture_rejection = false

[[tracker.timeouts]]
delay_secs = 45
capture_code = true
capture_rejection = false
"#,
    )
    .await;
    let config = AppConfig::load(file.path()).await.unwrap();
    let harness = TrackerHarness::with_document(config.tracker, URI, &document());

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));
    handle.finished().await;

    let timeouts: Vec<u64> = harness.telemetry.survival().iter().map(|r| r.timeout_secs).collect();
    assert_eq!(timeouts, vec![5, 45]);
    assert_eq!(harness.telemetry.captures().len(), 1);
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_dispose_between_horizons() {
    let config = TestConfigBuilder::new()
        .timeout(15, false, false)
        .timeout(30, false, false)
        .build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));
    tokio::time::sleep(Duration::from_secs(20)).await;
    handle.dispose();
    handle.finished().await;

    assert_eq!(harness.telemetry.survival().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_document_close_stops_session() {
    let config = TestConfigBuilder::new()
        .timeout(15, false, false)
        .timeout(30, false, false)
        .build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));
    tokio::time::sleep(Duration::from_secs(20)).await;
    harness.documents.close(URI);
    handle.finished().await;

    assert_eq!(harness.telemetry.survival().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_are_independent() {
    let config = TestConfigBuilder::new().timeout(15, false, false).build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());
    harness.documents.open("file:///other.js", "let b = 2\n");

    let first = harness
        .tracker
        .accepted(Acceptance::new(URI, InsertionCategory::GhostText, 10, COMPLETION));
    let second = harness.tracker.accepted(Acceptance::new(
        "file:///other.js",
        InsertionCategory::GhostText,
        0,
        "let b = 2",
    ));
    assert_ne!(first.id(), second.id());
    first.dispose();
    first.finished().await;
    second.finished().await;

    let survival = harness.telemetry.survival();
    assert_eq!(survival.len(), 1);
    assert_eq!(survival[0].uri, "file:///other.js");
}

// ── Rejected suggestions ─────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_rejection_captures_what_was_typed_instead() {
    let config = TestConfigBuilder::new()
        .timeout(15, false, false)
        .timeout(30, true, true)
        .build_tracker();
    let harness = TrackerHarness::with_document(config, "file:///r.py", "x = 1\n");

    let mut properties = Properties::new();
    properties.insert("choiceIndex".to_string(), "0".to_string());
    let handle = harness
        .tracker
        .rejected(
            Rejection::new("file:///r.py", InsertionCategory::GhostText, 6)
                .with_completion("y = 2", properties)
                .with_completion("y = 3", Properties::new()),
        )
        .expect("capture timeout configured");

    harness.documents.insert("file:///r.py", 6, "z = 3\n").unwrap();
    harness.documents.insert("file:///r.py", 0, "# c\n").unwrap();
    handle.finished().await;

    assert_eq!(
        harness.telemetry.event_names(),
        vec![
            "ghostText.rejected",
            "ghostText.rejected",
            "ghostText.capturedAfterRejected",
            "ghostText.capturedAfterRejected",
        ]
    );
    let captures = harness.telemetry.captures();
    assert_eq!(captures[0].tracked_offset, 10);
    assert_eq!(captures[0].timeout_secs, 30);
    assert_eq!(captures[0].capture.prefix, "# c\nx = 1\n");
    assert_eq!(captures[0].capture.code, "z = 3\n");
    assert_eq!(captures[0].properties["choiceIndex"], "0");
    assert!(captures[1].properties.is_empty());
    assert!(harness.telemetry.survival().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejection_reports_completion_length() {
    let config = TestConfigBuilder::new().timeout(15, false, false).build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &document());

    let handle = harness.tracker.rejected(
        Rejection::new(URI, InsertionCategory::Solution, 10)
            .with_completion("é = 1", Properties::new()),
    );
    assert!(handle.is_none());

    match &harness.telemetry.reports()[0] {
        Recorded::Rejected(report) => {
            assert_eq!(report.completion_len, 5);
            assert_eq!(report.inserted_len, 0);
        }
        other => panic!("unexpected report: {other:?}"),
    }
}

// ── Citations ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_citation_clipped_to_partial_acceptance() {
    let completion = "abcdefghijklmnopqrstuvwxyz0123";
    let inserted = "abcdefghijkl";
    let config = TestConfigBuilder::new().timeout(1, false, false).build_tracker();
    let harness = TrackerHarness::with_document(config, URI, &format!("// top\n{inserted}\n"));

    let handle = harness.tracker.accepted(
        Acceptance::new(URI, InsertionCategory::GhostText, 7, completion)
            .partial(inserted)
            .with_citation(CodeCitation::new(5, 20).with_license("MIT", "https://example.com/a"))
            .with_citation(
                CodeCitation::new(15, 25).with_license("GPL-3.0", "https://example.com/b"),
            ),
    );
    handle.finished().await;

    let records = harness.citations.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document_uri, URI);
    assert_eq!((records[0].offset_start, records[0].offset_end), (12, 19));
    assert_eq!(records[0].start, Position { line: 1, character: 5 });
    assert_eq!(records[0].end, Position { line: 1, character: 12 });
    assert_eq!(records[0].matching_text, "fghijkl");
    assert_eq!(records[0].license_details[0].license, "MIT");
}

#[tokio::test(start_paused = true)]
async fn test_no_citations_for_closed_document() {
    let config = TestConfigBuilder::new().timeout(1, false, false).build_tracker();
    let harness = TrackerHarness::new(config);

    let handle = harness.tracker.accepted(
        Acceptance::new(URI, InsertionCategory::GhostText, 0, COMPLETION)
            .with_citation(CodeCitation::new(0, 5)),
    );
    handle.finished().await;

    assert!(harness.citations.records().is_empty());
    assert_eq!(harness.telemetry.event_names(), vec!["ghostText.accepted"]);
}
