mod common;

use std::sync::Arc;

use brand_replica_core::fakes::{on_brand_draft, Scripted, ScriptedGenerator, StallingAdvisor};
use brand_replica_core::{
    markup, read_run_report, write_run_report, ErrorKind, IssueKind, PhaseModule, PhaseState,
    PipelineError,
};
use tokio_util::sync::CancellationToken;

use common::{pipeline, request};

#[tokio::test]
async fn full_run_threads_outputs_through_every_phase() {
    let (pipeline, capture) = pipeline(Arc::new(ScriptedGenerator::new()), None);

    let run = pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .expect("run");

    assert!(run.completed);
    assert!(!run.cancelled);
    let phases: Vec<&str> = run.phases.iter().map(|p| p.phase.as_str()).collect();
    assert_eq!(phases, vec!["discovery", "codegen", "intelligence", "validation"]);
    assert!(run
        .phases
        .iter()
        .all(|p| p.error.is_none() && p.status.status.is_terminal()));
    assert_eq!(capture.requests().len(), 1);

    let codegen = run.codegen.as_ref().expect("codegen output");
    assert_eq!(codegen.components.len(), 5);
    let html = run.rendered_html.as_ref().expect("rendered");
    let stamped = markup::component_ids(html);
    let mapped = run.intelligence.as_ref().expect("intelligence").mapped_sections;
    assert!(mapped > 0);
    assert_eq!(stamped.len(), mapped);
    assert!(stamped
        .iter()
        .all(|id| codegen.components.iter().any(|c| &c.id == id)));

    let validation = run.validation.as_ref().expect("validation output");
    assert!(pipeline.validation().validate_output(validation).valid);
    assert!(run.success(), "suggestions: {:?}", validation.suggestions);
}

#[tokio::test]
async fn cancellation_during_intelligence_stops_before_validation() {
    let advisor = Arc::new(StallingAdvisor::new());
    let (pipeline, _) = pipeline(Arc::new(ScriptedGenerator::new()), Some(advisor.clone()));
    let token = CancellationToken::new();
    let request = request();

    let (run, ()) = tokio::join!(pipeline.run(&request, &token), async {
        advisor.entered().await;
        token.cancel();
    });
    let run = run.expect("run");

    assert!(run.cancelled);
    assert!(!run.completed);
    assert_eq!(run.phases.len(), 3);
    assert_eq!(run.phases[0].status.status, PhaseState::Success);
    assert_eq!(run.phases[1].status.status, PhaseState::Success);

    let intelligence = run.report("intelligence").expect("intelligence report");
    assert!(intelligence.cancelled);
    assert_eq!(intelligence.error_kind, Some(ErrorKind::Cancellation));
    assert_eq!(intelligence.status.status, PhaseState::Failed);
    assert_eq!(intelligence.status.message.as_deref(), Some("cancelled by caller"));
    assert_eq!(run.halted_at().map(|r| r.phase.as_str()), Some("intelligence"));
    assert!(run
        .errors
        .iter()
        .any(|e| e.phase == "intelligence" && e.kind == IssueKind::Cancelled));
    assert!(run.errors.iter().all(|e| e.kind != IssueKind::Failed));

    assert!(run.validation.is_none());
    assert!(run.rendered_html.is_none());
    assert_eq!(pipeline.validation().status().status, PhaseState::Pending);
}

#[tokio::test]
async fn cancelled_before_start_invokes_nothing() {
    let (pipeline, capture) = pipeline(Arc::new(ScriptedGenerator::new()), None);
    let token = CancellationToken::new();
    token.cancel();

    let run = pipeline.run(&request(), &token).await.expect("run");

    assert!(run.cancelled);
    assert!(run.phases.is_empty());
    assert!(capture.requests().is_empty());
    assert_eq!(pipeline.discovery().status().status, PhaseState::Pending);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_any_collaborator_call() {
    let (pipeline, capture) = pipeline(Arc::new(ScriptedGenerator::new()), None);
    let mut request = request();
    request.article.sections.clear();

    let err = pipeline
        .run(&request, &CancellationToken::new())
        .await
        .expect_err("rejected");

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(capture.requests().is_empty());
}

#[tokio::test]
async fn phase_failure_halts_and_aggregates_errors() {
    let mut generator = ScriptedGenerator::new();
    for candidate in common::candidates() {
        generator = generator.script(
            &candidate.id,
            vec![Scripted::Fail("quota exceeded".to_string())],
        );
    }
    let (pipeline, _) = pipeline(Arc::new(generator), None);

    let run = pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .expect("run");

    assert!(!run.completed);
    assert!(!run.cancelled);
    let codegen = run.halted_at().expect("halted");
    assert_eq!(codegen.phase, "codegen");
    assert_eq!(codegen.error_kind, Some(ErrorKind::PhaseFailure));
    assert!(run.discovery.is_some());
    assert!(run.codegen.is_none());
    assert!(run.errors.iter().any(|e| e.message.contains("quota exceeded")));
    assert_eq!(pipeline.intelligence().status().status, PhaseState::Pending);
}

#[tokio::test]
async fn malformed_output_is_not_forwarded() {
    let hero = &common::candidates()[0];
    let mut draft = on_brand_draft(&hero.id, &common::dna());
    draft.html_template.clear();
    draft.preview_html.clear();
    let generator = ScriptedGenerator::new().script(&hero.id, vec![Scripted::Draft(draft)]);
    let (pipeline, _) = pipeline(Arc::new(generator), None);

    let run = pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .expect("run");

    assert!(!run.completed);
    let codegen = run.halted_at().expect("halted");
    assert_eq!(codegen.phase, "codegen");
    assert_eq!(codegen.status.status, PhaseState::Success);
    assert_eq!(codegen.error_kind, Some(ErrorKind::PhaseFailure));
    let reason = codegen.error.as_deref().expect("reason");
    assert!(reason.contains("malformed") && reason.contains("no htmlTemplate"), "{reason}");
    assert!(run.codegen.is_none());
    assert!(run
        .errors
        .iter()
        .any(|e| e.phase == "codegen" && e.kind == IssueKind::Failed));
    assert_eq!(pipeline.intelligence().status().status, PhaseState::Pending);
}

#[tokio::test]
async fn run_report_round_trips_and_detects_tampering() {
    let (pipeline, _) = pipeline(Arc::new(ScriptedGenerator::new()), None);
    let run = pipeline
        .run(&request(), &CancellationToken::new())
        .await
        .expect("run");
    let dir = tempfile::tempdir().expect("tempdir");

    let path = write_run_report(dir.path(), &run).expect("write");
    assert!(path.ends_with(format!("{}/pipeline.json", run.run_id)));

    let restored = read_run_report(dir.path(), &run.run_id).expect("read");
    assert_eq!(restored, run);

    let mut bytes = std::fs::read(&path).expect("read bytes");
    bytes.extend_from_slice(b"\n");
    std::fs::write(&path, bytes).expect("tamper");
    let err = read_run_report(dir.path(), &run.run_id).expect_err("tampered");
    assert!(matches!(err, PipelineError::DigestMismatch { .. }));
}
