//! Structured observability hooks for critique run lifecycle events.
//!
//! This module provides:
//! - Run-scoped tracing spans via `RunSpan` RAII guard and [`run_span`]
//! - Emission functions for key lifecycle events: start, stage entry,
//!   critique completion, evaluator failure, refinement decision, finish
//!
//! Events are emitted at `info!` level (configurable via `ADCRITIQUE_LOG`).

use tracing::{info, warn};

use crate::domain::{Dimension, RefinementAction, TerminalOutcome, WorkflowStage};

/// RAII guard that enters a run-scoped tracing span.
///
/// The guard is `!Send`; async code should instrument its futures with
/// [`run_span`] instead.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("run-12345");
/// // Now all tracing calls are associated with run_id = "run-12345"
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// Span tagged with the run_id, for `Instrument::instrument`.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("adcritique.run", run_id = %run_id)
}

/// Emit event: run started.
///
/// # Example
///
/// ```ignore
/// emit_run_started("run-123", 3);
/// // logs: event=run.started run_id=run-123 max_attempts=3
/// ```
pub fn emit_run_started(run_id: &str, max_attempts: u32) {
    info!(event = "run.started", run_id = %run_id, max_attempts = max_attempts);
}

/// Emit event: the run moved to a new stage.
pub fn emit_stage_entered(run_id: &str, stage: WorkflowStage, retry_count: u32) {
    info!(
        event = "run.stage_entered",
        run_id = %run_id,
        stage = %stage,
        progress = stage.progress(),
        retry_count = retry_count,
    );
}

/// Emit event: one critique attempt finished and was ranked.
pub fn emit_critique_completed(
    run_id: &str,
    attempt: u32,
    total: usize,
    passed: usize,
    best_score: Option<f32>,
) {
    info!(
        event = "critique.completed",
        run_id = %run_id,
        attempt = attempt,
        total = total,
        passed = passed,
        best_score = best_score.unwrap_or(0.0),
    );
}

/// Emit event: an evaluator could not score its dimension (warning level).
pub fn emit_evaluator_failed(variation_id: &str, dimension: Dimension, error: &dyn std::fmt::Display) {
    warn!(
        event = "evaluator.failed",
        variation_id = %variation_id,
        dimension = %dimension,
        error = %error,
    );
}

/// Emit event: refinement decision taken for the best variation.
pub fn emit_refinement_decided(run_id: &str, action: RefinementAction, rationale: &str) {
    info!(
        event = "refinement.decided",
        run_id = %run_id,
        action = %action,
        rationale = %rationale,
    );
}

/// Emit event: run reached a terminal stage.
pub fn emit_run_finished(
    run_id: &str,
    outcome: TerminalOutcome,
    retry_count: u32,
    duration_ms: u64,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        outcome = %outcome,
        retry_count = retry_count,
        duration_ms = duration_ms,
    );
}

/// Emit event: a finished run left the registry.
pub fn emit_registry_evicted(run_id: &str, reason: &str) {
    info!(event = "registry.evicted", run_id = %run_id, reason = %reason);
}
