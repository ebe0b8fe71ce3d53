//! Refinement decisions produced after each critique.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::variation::VariationId;

/// Rationale recorded when the regeneration budget runs out.
pub const RETRY_BUDGET_EXHAUSTED: &str = "retry budget exhausted";

/// Rationale recorded when a run is cancelled.
pub const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementAction {
    Approve,
    Regenerate,
    Enhance,
    Reject,
}

impl RefinementAction {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approve | Self::Reject)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Regenerate => "regenerate",
            Self::Enhance => "enhance",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for RefinementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reject decision was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    SafetyOverride,
    BelowRejectFloor,
    RetryBudgetExhausted,
    EnhancementBudgetExhausted,
}

/// In-place corrections to apply to an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementPlan {
    pub sharpen: bool,
    pub denoise: bool,
    pub contrast: bool,
    pub brightness: bool,
}

impl EnhancementPlan {
    pub fn is_empty(&self) -> bool {
        !(self.sharpen || self.denoise || self.contrast || self.brightness)
    }

    /// Names of the enabled operations, in application order.
    pub fn operations(&self) -> Vec<&'static str> {
        [
            (self.denoise, "denoise"),
            (self.sharpen, "sharpen"),
            (self.contrast, "contrast"),
            (self.brightness, "brightness"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// Action derived from a critique result. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementDecision {
    pub action: RefinementAction,
    pub rationale: String,
    /// Variation the action applies to, when there is one.
    pub target: Option<VariationId>,
    /// Issues that motivated a refinement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<RejectReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<EnhancementPlan>,
}

impl RefinementDecision {
    pub fn approve(target: VariationId, rationale: impl Into<String>) -> Self {
        Self {
            action: RefinementAction::Approve,
            rationale: rationale.into(),
            target: Some(target),
            issues: Vec::new(),
            reject_reason: None,
            enhancement: None,
        }
    }

    pub fn reject(
        target: Option<VariationId>,
        reason: RejectReason,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            action: RefinementAction::Reject,
            rationale: rationale.into(),
            target,
            issues: Vec::new(),
            reject_reason: Some(reason),
            enhancement: None,
        }
    }

    pub fn regenerate(target: VariationId, rationale: impl Into<String>, issues: Vec<String>) -> Self {
        Self {
            action: RefinementAction::Regenerate,
            rationale: rationale.into(),
            target: Some(target),
            issues,
            reject_reason: None,
            enhancement: None,
        }
    }

    pub fn enhance(
        target: VariationId,
        rationale: impl Into<String>,
        issues: Vec<String>,
        plan: EnhancementPlan,
    ) -> Self {
        Self {
            action: RefinementAction::Enhance,
            rationale: rationale.into(),
            target: Some(target),
            issues,
            reject_reason: None,
            enhancement: Some(plan),
        }
    }

    /// Terminal reject once the regeneration budget is spent.
    pub fn exhausted(target: Option<VariationId>) -> Self {
        Self::reject(target, RejectReason::RetryBudgetExhausted, RETRY_BUDGET_EXHAUSTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_operations_order() {
        let plan = EnhancementPlan {
            sharpen: true,
            denoise: true,
            ..Default::default()
        };
        assert_eq!(plan.operations(), vec!["denoise", "sharpen"]);
        assert!(EnhancementPlan::default().is_empty());
    }

    #[test]
    fn test_exhausted_decision() {
        let d = RefinementDecision::exhausted(Some(VariationId::from("var_2")));
        assert_eq!(d.action, RefinementAction::Reject);
        assert_eq!(d.rationale, "retry budget exhausted");
        assert_eq!(d.reject_reason, Some(RejectReason::RetryBudgetExhausted));
        assert!(d.action.is_terminal());
    }

    #[test]
    fn test_decision_serializes_snake_case() {
        let d = RefinementDecision::regenerate(
            VariationId::from("var_1"),
            "semantic issues",
            vec!["Tone mismatch".to_string()],
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["action"], "regenerate");
        assert_eq!(json["target"], "var_1");
        assert!(json.get("enhancement").is_none());
    }
}
