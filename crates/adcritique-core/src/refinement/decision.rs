//! Refinement decision table.
//!
//! Rules, first match wins:
//! 1. safety override, a high-confidence safety finding, or overall below
//!    the reject floor: reject
//! 2. overall at or above the approve floor, passed, and no blocking issue:
//!    approve
//! 3. only simple issues on an image, enhancement budget left: enhance
//! 4. regeneration budget left: regenerate
//! 5. otherwise reject with "retry budget exhausted"

use serde::{Deserialize, Serialize};

use super::enhance::plan_enhancements;
use super::issues::IssueProfile;
use crate::config::RefinementPolicy;
use crate::domain::{
    Confidence, CritiqueResult, Dimension, MediaKind, RefinementDecision, RejectReason,
};

/// Run counters the decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Regenerations already taken.
    pub attempt_count: u32,
    pub max_attempts: u32,
    /// Enhance rounds already taken.
    pub enhancements_used: u32,
}

/// Reasons `result` may not be approved even with a high overall score.
pub fn approval_blockers(result: &CritiqueResult) -> Vec<String> {
    let mut blockers = Vec::new();
    if !result.passed {
        blockers.push("did not pass the scoring thresholds".to_string());
    }
    if result.dimension_score(Dimension::SafetyEthics).is_none() {
        blockers.push("safety could not be verified".to_string());
    }
    for outcome in result.scorecard.outcomes() {
        let Some(score) = outcome.as_scored() else {
            continue;
        };
        if let Some(confidence) = score.issue_confidence.filter(|c| c.is_blocking()) {
            for issue in &score.issues {
                blockers.push(format!("{issue} [{confidence}]"));
            }
        }
    }
    blockers
}

fn high_confidence_safety(result: &CritiqueResult) -> bool {
    result
        .scorecard
        .outcome(Dimension::SafetyEthics)
        .and_then(|o| o.as_scored())
        .and_then(|s| s.issue_confidence)
        == Some(Confidence::High)
}

fn safety_issues(result: &CritiqueResult) -> Vec<String> {
    result
        .scorecard
        .outcome(Dimension::SafetyEthics)
        .and_then(|o| o.as_scored())
        .map(|s| s.issues.clone())
        .unwrap_or_default()
}

/// Decide what to do with the best result of a critique.
pub fn decide(
    best: &CritiqueResult,
    input: DecisionInput,
    policy: &RefinementPolicy,
) -> RefinementDecision {
    let target = best.variation.id.clone();
    let overall = best.overall_score;

    if best.safety_override || high_confidence_safety(best) {
        let issues = safety_issues(best);
        let detail = if issues.is_empty() {
            "safety score 0.00".to_string()
        } else {
            issues.join("; ")
        };
        let mut decision = RefinementDecision::reject(
            Some(target),
            RejectReason::SafetyOverride,
            format!("safety override: {detail}"),
        );
        decision.issues = issues;
        return decision;
    }
    if overall < policy.reject_floor {
        return RefinementDecision::reject(
            Some(target),
            RejectReason::BelowRejectFloor,
            format!(
                "overall score {overall:.2} is below the reject floor {:.2}",
                policy.reject_floor
            ),
        );
    }

    let blockers = approval_blockers(best);
    if overall >= policy.approve_floor && blockers.is_empty() {
        return RefinementDecision::approve(
            target,
            format!(
                "overall score {overall:.2} meets the approve floor {:.2}",
                policy.approve_floor
            ),
        );
    }

    let profile = IssueProfile::of(best);
    if profile.is_simple_only()
        && best.variation.kind == MediaKind::Image
        && input.enhancements_used < policy.max_enhancements
    {
        let plan = plan_enhancements(&profile.simple);
        if !plan.is_empty() {
            return RefinementDecision::enhance(
                target,
                format!(
                    "overall score {overall:.2} with correctable issues: {}",
                    plan.operations().join(", ")
                ),
                profile.simple,
                plan,
            );
        }
    }

    if input.attempt_count < input.max_attempts {
        let mut issues = profile.all();
        for blocker in blockers {
            if !issues.contains(&blocker) {
                issues.push(blocker);
            }
        }
        let rationale = if overall >= policy.approve_floor {
            format!("overall score {overall:.2} but approval is blocked")
        } else {
            format!(
                "overall score {overall:.2} is below the approve floor {:.2}",
                policy.approve_floor
            )
        };
        return RefinementDecision::regenerate(target, rationale, issues);
    }

    RefinementDecision::exhausted(Some(target))
}
