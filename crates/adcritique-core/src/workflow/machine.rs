//! Pure transition function of the refinement workflow.
//!
//! ```text
//! BrandKit -> Generation -> Critique -> RefinementDecisionPoint
//!     RefinementDecisionPoint -> Enhance -> Critique
//!     RefinementDecisionPoint -> Regenerate -> Generation
//!     RefinementDecisionPoint -> Approved | Rejected
//! ```
//!
//! Stage failures and cancellation reach `Rejected` from any live stage.
//! Terminal states accept no further events.

use chrono::{DateTime, Utc};

use crate::domain::{
    CritiqueReport, RefinementAction, RefinementDecision, RejectReason, StageError,
    TerminalOutcome, WorkflowError, WorkflowResult, WorkflowStage, WorkflowState, CANCELLED,
};

/// Input that moves a run from one stage to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    BrandKitReady,
    VariationsGenerated { count: usize },
    CritiqueCompleted(Box<CritiqueReport>),
    Decided(RefinementDecision),
    EnhancementApplied,
    RegenerationPrepared,
    StageFailed(StageError),
    Cancelled,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BrandKitReady => "brand_kit_ready",
            Self::VariationsGenerated { .. } => "variations_generated",
            Self::CritiqueCompleted(_) => "critique_completed",
            Self::Decided(_) => "decided",
            Self::EnhancementApplied => "enhancement_applied",
            Self::RegenerationPrepared => "regeneration_prepared",
            Self::StageFailed(_) => "stage_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

pub const ENHANCEMENT_BUDGET_EXHAUSTED: &str = "enhancement budget exhausted";

/// Apply `event` to `state`, stamping the result with the current time.
pub fn transition(state: &WorkflowState, event: WorkflowEvent) -> WorkflowResult<WorkflowState> {
    transition_at(state, event, Utc::now())
}

/// Apply `event` to `state` at `now`.
///
/// # Errors
///
/// Returns `WorkflowError::Terminated` for any event on a finished run and
/// `WorkflowError::InvalidTransition` when the event does not belong to the
/// current stage.
pub fn transition_at(
    state: &WorkflowState,
    event: WorkflowEvent,
    now: DateTime<Utc>,
) -> WorkflowResult<WorkflowState> {
    if state.is_terminal() {
        return Err(WorkflowError::Terminated(state.run_id.to_string()));
    }

    let mut next = state.clone();
    next.updated_at = now;

    match (state.stage, event) {
        (_, WorkflowEvent::Cancelled) => {
            finish(&mut next, TerminalOutcome::Rejected, CANCELLED.to_string());
        }
        (stage, WorkflowEvent::StageFailed(err)) => {
            finish(
                &mut next,
                TerminalOutcome::Rejected,
                format!("stage failure at {stage}: {err}"),
            );
        }
        (WorkflowStage::BrandKit, WorkflowEvent::BrandKitReady) => {
            next.stage = WorkflowStage::Generation;
        }
        (WorkflowStage::Generation, WorkflowEvent::VariationsGenerated { count: 0 }) => {
            finish(
                &mut next,
                TerminalOutcome::Rejected,
                format!(
                    "stage failure at {}: {}",
                    WorkflowStage::Generation,
                    StageError::EmptyGeneration
                ),
            );
        }
        (WorkflowStage::Generation, WorkflowEvent::VariationsGenerated { .. }) => {
            next.stage = WorkflowStage::Critique;
        }
        (WorkflowStage::Critique, WorkflowEvent::CritiqueCompleted(report)) => {
            next.critique_attempts += 1;
            next.last_report = Some(*report);
            next.stage = WorkflowStage::RefinementDecisionPoint;
        }
        (WorkflowStage::RefinementDecisionPoint, WorkflowEvent::Decided(decision)) => {
            apply_decision(&mut next, decision);
        }
        (WorkflowStage::Enhance, WorkflowEvent::EnhancementApplied) => {
            next.stage = WorkflowStage::Critique;
        }
        (WorkflowStage::Regenerate, WorkflowEvent::RegenerationPrepared) => {
            next.stage = WorkflowStage::Generation;
        }
        (from, event) => {
            return Err(WorkflowError::InvalidTransition {
                from,
                event: event.name().to_string(),
            });
        }
    }

    Ok(next)
}

fn finish(state: &mut WorkflowState, outcome: TerminalOutcome, rationale: String) {
    state.stage = match outcome {
        TerminalOutcome::Approved => WorkflowStage::Approved,
        TerminalOutcome::Rejected | TerminalOutcome::Exhausted => WorkflowStage::Rejected,
    };
    state.outcome = Some(outcome);
    state.rationale = Some(rationale);
}

fn apply_decision(state: &mut WorkflowState, decision: RefinementDecision) {
    match decision.action {
        RefinementAction::Approve => {
            finish(state, TerminalOutcome::Approved, decision.rationale.clone());
            state.last_decision = Some(decision);
        }
        RefinementAction::Reject => {
            let outcome = match decision.reject_reason {
                Some(RejectReason::RetryBudgetExhausted)
                | Some(RejectReason::EnhancementBudgetExhausted) => TerminalOutcome::Exhausted,
                _ => TerminalOutcome::Rejected,
            };
            finish(state, outcome, decision.rationale.clone());
            state.last_decision = Some(decision);
        }
        RefinementAction::Enhance if state.enhancement_count >= state.max_enhancements => {
            let redirected = RefinementDecision::reject(
                decision.target,
                RejectReason::EnhancementBudgetExhausted,
                ENHANCEMENT_BUDGET_EXHAUSTED,
            );
            finish(
                state,
                TerminalOutcome::Exhausted,
                ENHANCEMENT_BUDGET_EXHAUSTED.to_string(),
            );
            state.last_decision = Some(redirected);
        }
        RefinementAction::Enhance => {
            state.enhancement_count += 1;
            state.stage = WorkflowStage::Enhance;
            state.last_decision = Some(decision);
        }
        // retry_count never passes max_attempts; a late Regenerate ends the run
        RefinementAction::Regenerate if state.retry_count >= state.max_attempts => {
            let redirected = RefinementDecision::exhausted(decision.target);
            finish(state, TerminalOutcome::Exhausted, redirected.rationale.clone());
            state.last_decision = Some(redirected);
        }
        RefinementAction::Regenerate => {
            state.retry_count += 1;
            state.stage = WorkflowStage::Regenerate;
            state.last_decision = Some(decision);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EnhancementPlan, VariationId, RETRY_BUDGET_EXHAUSTED};
    use adcritique_state::RunId;

    fn fresh() -> WorkflowState {
        WorkflowState::new(RunId::from("run-1"), 3, 2)
    }

    fn report(attempt: u32) -> WorkflowEvent {
        WorkflowEvent::CritiqueCompleted(Box::new(CritiqueReport::from_ranked(
            RunId::from("run-1"),
            attempt,
            Vec::new(),
        )))
    }

    fn regenerate() -> WorkflowEvent {
        WorkflowEvent::Decided(RefinementDecision::regenerate(
            VariationId::from("var_1"),
            "below approve floor",
            vec!["Message unclear".into()],
        ))
    }

    fn step(state: WorkflowState, event: WorkflowEvent) -> WorkflowState {
        transition(&state, event).unwrap()
    }

    fn to_decision_point() -> WorkflowState {
        let s = step(fresh(), WorkflowEvent::BrandKitReady);
        let s = step(s, WorkflowEvent::VariationsGenerated { count: 3 });
        step(s, report(1))
    }

    #[test]
    fn test_happy_path_to_approved() {
        let s = to_decision_point();
        assert_eq!(s.stage, WorkflowStage::RefinementDecisionPoint);
        assert_eq!(s.critique_attempts, 1);
        assert!(s.last_report.is_some());

        let s = step(
            s,
            WorkflowEvent::Decided(RefinementDecision::approve(
                VariationId::from("var_1"),
                "good",
            )),
        );
        assert_eq!(s.stage, WorkflowStage::Approved);
        assert_eq!(s.outcome, Some(TerminalOutcome::Approved));
        assert_eq!(s.rationale.as_deref(), Some("good"));
        assert!(s.last_decision.is_some());
    }

    #[test]
    fn test_regenerate_loops_back_and_counts() {
        let s = step(to_decision_point(), regenerate());
        assert_eq!(s.stage, WorkflowStage::Regenerate);
        assert_eq!(s.retry_count, 1);
        let s = step(s, WorkflowEvent::RegenerationPrepared);
        assert_eq!(s.stage, WorkflowStage::Generation);
    }

    #[test]
    fn test_fourth_regenerate_is_redirected_to_rejected() {
        let mut s = to_decision_point();
        for attempt in 2..=4 {
            s = step(s, regenerate());
            s = step(s, WorkflowEvent::RegenerationPrepared);
            s = step(s, WorkflowEvent::VariationsGenerated { count: 3 });
            s = step(s, report(attempt));
        }
        assert_eq!(s.retry_count, 3);

        let s = step(s, regenerate());
        assert_eq!(s.stage, WorkflowStage::Rejected);
        assert_eq!(s.retry_count, 3);
        assert_eq!(s.outcome, Some(TerminalOutcome::Exhausted));
        assert_eq!(s.rationale.as_deref(), Some(RETRY_BUDGET_EXHAUSTED));
        assert_eq!(
            s.last_decision.unwrap().reject_reason,
            Some(RejectReason::RetryBudgetExhausted)
        );
    }

    #[test]
    fn test_enhance_does_not_consume_retry() {
        let enhance = || {
            WorkflowEvent::Decided(RefinementDecision::enhance(
                VariationId::from("var_1"),
                "blurry",
                vec!["Image is blurry".into()],
                EnhancementPlan {
                    sharpen: true,
                    ..EnhancementPlan::default()
                },
            ))
        };
        let s = step(to_decision_point(), enhance());
        assert_eq!(s.stage, WorkflowStage::Enhance);
        assert_eq!(s.enhancement_count, 1);
        assert_eq!(s.retry_count, 0);

        let s = step(s, WorkflowEvent::EnhancementApplied);
        assert_eq!(s.stage, WorkflowStage::Critique);
        let s = step(s, report(2));
        let s = step(s, enhance());
        let s = step(s, WorkflowEvent::EnhancementApplied);
        let s = step(s, report(3));

        let s = step(s, enhance());
        assert_eq!(s.stage, WorkflowStage::Rejected);
        assert_eq!(s.rationale.as_deref(), Some(ENHANCEMENT_BUDGET_EXHAUSTED));
    }

    #[test]
    fn test_stage_failure_rejects_with_rationale() {
        let s = step(fresh(), WorkflowEvent::BrandKitReady);
        let s = step(
            s,
            WorkflowEvent::StageFailed(StageError::Generation("quota exceeded".into())),
        );
        assert_eq!(s.stage, WorkflowStage::Rejected);
        assert_eq!(s.outcome, Some(TerminalOutcome::Rejected));
        assert_eq!(
            s.rationale.as_deref(),
            Some("stage failure at generation: generation failed: quota exceeded")
        );
    }

    #[test]
    fn test_empty_generation_rejects() {
        let s = step(fresh(), WorkflowEvent::BrandKitReady);
        let s = step(s, WorkflowEvent::VariationsGenerated { count: 0 });
        assert_eq!(s.stage, WorkflowStage::Rejected);
        assert!(s.rationale.unwrap().contains("no variations"));
    }

    #[test]
    fn test_cancel_from_any_live_stage() {
        let s = step(to_decision_point(), WorkflowEvent::Cancelled);
        assert_eq!(s.stage, WorkflowStage::Rejected);
        assert_eq!(s.rationale.as_deref(), Some(CANCELLED));
    }

    #[test]
    fn test_terminal_state_accepts_nothing() {
        let s = step(fresh(), WorkflowEvent::Cancelled);
        let err = transition(&s, WorkflowEvent::BrandKitReady).unwrap_err();
        assert!(matches!(err, WorkflowError::Terminated(_)));
    }

    #[test]
    fn test_out_of_order_event_is_invalid() {
        let err = transition(&fresh(), report(1)).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                from: WorkflowStage::BrandKit,
                event: "critique_completed".into(),
            }
        );
    }

    #[test]
    fn test_transition_is_pure() {
        let s = fresh();
        let now = Utc::now();
        let a = transition_at(&s, WorkflowEvent::BrandKitReady, now).unwrap();
        let b = transition_at(&s, WorkflowEvent::BrandKitReady, now).unwrap();
        assert_eq!(a, b);
        assert_eq!(s.stage, WorkflowStage::BrandKit);
        assert_eq!(a.updated_at, now);
    }
}
