//! Structured observability hooks for pipeline runs.
//!
//! - `pipeline_span` tags a run's future with its run and brand ids
//! - `emit_*` functions log lifecycle events with stable `event` names
//!
//! Set `RUST_LOG=brand_replica_core=debug` for unit-level detail.

use tracing::{info, warn};

use crate::domain::Outcome;

/// Run-scoped span, attached with `Instrument` so the run future stays `Send`.
pub fn pipeline_span(run_id: &str, brand_id: &str) -> tracing::Span {
    tracing::info_span!("brand.pipeline", run_id = %run_id, brand_id = %brand_id)
}

pub fn emit_run_started(run_id: &str, brand_id: &str, article_id: &str) {
    info!(
        event = "pipeline.started",
        run_id = %run_id,
        brand_id = %brand_id,
        article_id = %article_id,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, completed_phases: usize, success: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        completed_phases = completed_phases,
        success = success,
    );
}

pub fn emit_phase_started(phase: &str) {
    info!(event = "phase.started", phase = %phase);
}

pub fn emit_phase_finished(phase: &str, outcome: Outcome, duration_ms: u64) {
    info!(
        event = "phase.finished",
        phase = %phase,
        outcome = ?outcome,
        duration_ms = duration_ms,
    );
}

/// A single component, section or candidate failed (warning level).
pub fn emit_unit_failed(phase: &str, unit: &str, error: &dyn std::fmt::Display) {
    warn!(event = "phase.unit_failed", phase = %phase, unit = %unit, error = %error);
}

pub fn emit_gate_evaluated(overall: f64, passes_threshold: bool, failed_required: usize) {
    info!(
        event = "validation.gate_evaluated",
        overall = overall,
        passes_threshold = passes_threshold,
        failed_required = failed_required,
    );
}
