//! Integration tests for run orchestration.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use planscope::model::{Jurisdiction, LocationKey, SpecTier};
use planscope::pipeline::{ChannelProgress, JsonDirSink, NoopProgress, RunResult, Stage};
use planscope::{DiagnosticKind, Pipeline, RunRequest, SourceDocument};

const DOOR_CSV: &str = "DOOR SCHEDULE\nMARK,TYPE,QTY,UOM\nD1,SOLID CORE,3,EA\nD2,BIFOLD,2,EA\n";
const FLOOR_PLAN: &str = "A-101 FLOOR PLAN\nD1 AT ENTRY, D2 AT CLOSETS\n";

fn request() -> RunRequest {
    RunRequest::new(vec![
        SourceDocument::new("A-101.txt", FLOOR_PLAN),
        SourceDocument::new("A-601.csv", DOOR_CSV),
    ])
    .with_jurisdiction(Jurisdiction::default())
    .with_location(LocationKey::zip("30303"))
    .with_spec_tier(SpecTier::Premium)
}

#[tokio::test]
async fn test_full_run_under_default_jurisdiction() {
    let outcome = Pipeline::new()
        .with_progress(Arc::new(NoopProgress))
        .run(request(), CancellationToken::new())
        .await;

    assert!(outcome.is_complete());
    assert!(outcome.error.is_none());
    let result = outcome.result.unwrap();
    assert_eq!(result.run_id, outcome.run_id);
    assert_eq!(result.compliance.activated_packs, vec!["IRC", "IECC", "NEC", "GA"]);
    assert_eq!(result.plan_graph.quantities.len(), 2);
    assert_eq!(result.estimate.spec_tier, SpecTier::Premium);
    assert_eq!(result.estimate.regional_factor.region, "Atlanta_GA");
    assert!(result.estimate.diagnostics.is_empty());
    assert!(result.reliability.failed_documents.is_empty());
    assert!(!result.reliability.neutral_regional_fallback);
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let (progress, rx) = ChannelProgress::unbounded();
    let outcome = Pipeline::new()
        .with_progress(Arc::new(progress))
        .run(request(), CancellationToken::new())
        .await;
    assert!(outcome.is_complete());

    let events: Vec<_> = rx.try_iter().collect();
    assert!(events.iter().all(|e| e.run_id == outcome.run_id));
    assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
    let stages: Vec<Stage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            Stage::Queued,
            Stage::Parsing,
            Stage::ExtractingQuantities,
            Stage::ComplianceChecking,
            Stage::Pricing,
            Stage::GeneratingOutputs,
            Stage::Complete,
        ]
    );
    assert_eq!(events.last().unwrap().percent, 100);
}

#[tokio::test]
async fn test_result_written_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = Pipeline::new()
        .with_progress(Arc::new(NoopProgress))
        .with_result_sink(Arc::new(JsonDirSink::new(dir.path().join("runs"))))
        .run(request(), CancellationToken::new())
        .await;
    assert!(outcome.is_complete());

    let path = dir.path().join("runs").join(format!("{}.json", outcome.run_id));
    let written: RunResult = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let result = outcome.result.unwrap();
    assert_eq!(written.run_id, result.run_id);
    assert_eq!(written.completed_at, result.completed_at);
    assert_eq!(written.plan_graph.quantities.len(), 2);
    assert_eq!(written.compliance.findings.len(), result.compliance.findings.len());
    assert!((written.estimate.summary.grand_total - result.estimate.summary.grand_total).abs() < 0.005);
}

#[tokio::test]
async fn test_degraded_inputs_are_reported() {
    let request = RunRequest::new(vec![
        SourceDocument::new("A-601.csv", DOOR_CSV),
        SourceDocument::new("S-201.json", "[{\"page\": 1, \"text\": "),
    ])
    .with_location(LocationKey::zip("99999"));

    let outcome = Pipeline::new()
        .with_progress(Arc::new(NoopProgress))
        .run(request, CancellationToken::new())
        .await;
    assert!(outcome.is_complete());

    assert_eq!(outcome.reliability.failed_documents, vec!["S-201.json"]);
    assert!(outcome.reliability.neutral_regional_fallback);
    assert!(!outcome.reliability.is_clean());

    let kinds: Vec<DiagnosticKind> = outcome.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds[0], DiagnosticKind::DocumentParse);
    assert!(kinds.contains(&DiagnosticKind::RegionalLookupMiss));
}

#[tokio::test]
async fn test_cancelled_spawned_run() {
    let handle = Pipeline::new()
        .with_progress(Arc::new(NoopProgress))
        .spawn(request());
    handle.cancel();
    let outcome = handle.wait().await;

    // The run may finish before the cancel lands; it must never do both.
    if outcome.is_cancelled() {
        assert!(outcome.result.is_none());
        assert_eq!(outcome.error.as_deref(), Some("Run cancelled"));
    } else {
        assert!(outcome.is_complete());
        assert!(outcome.result.is_some());
    }
}
