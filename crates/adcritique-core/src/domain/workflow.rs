//! Run control state owned by the workflow machine.

use std::fmt;

use adcritique_state::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::RefinementDecision;
use super::report::CritiqueReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    BrandKit,
    Generation,
    Critique,
    RefinementDecisionPoint,
    Enhance,
    Regenerate,
    Approved,
    Rejected,
}

impl WorkflowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Progress percentage reported to pollers while in this stage.
    pub fn progress(&self) -> u8 {
        match self {
            Self::BrandKit => 10,
            Self::Generation => 35,
            Self::Critique => 60,
            Self::RefinementDecisionPoint => 80,
            Self::Enhance | Self::Regenerate => 85,
            Self::Approved | Self::Rejected => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandKit => "brand_kit",
            Self::Generation => "generation",
            Self::Critique => "critique",
            Self::RefinementDecisionPoint => "refinement_decision_point",
            Self::Enhance => "enhance",
            Self::Regenerate => "regenerate",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run ended. `Exhausted` runs sit in the `Rejected` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalOutcome {
    Approved,
    Rejected,
    Exhausted,
}

impl TerminalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for TerminalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable control state of one run.
///
/// Only the workflow machine produces new values of this type; everyone else
/// reads snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub run_id: RunId,
    pub stage: WorkflowStage,
    /// Regenerate transitions taken so far. Never exceeds `max_attempts`.
    pub retry_count: u32,
    pub max_attempts: u32,
    pub enhancement_count: u32,
    pub max_enhancements: u32,
    /// Completed critique attempts; the next report is numbered one higher.
    pub critique_attempts: u32,
    pub last_report: Option<CritiqueReport>,
    pub last_decision: Option<RefinementDecision>,
    pub outcome: Option<TerminalOutcome>,
    pub rationale: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    pub fn new(run_id: RunId, max_attempts: u32, max_enhancements: u32) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            stage: WorkflowStage::BrandKit,
            retry_count: 0,
            max_attempts,
            enhancement_count: 0,
            max_enhancements,
            critique_attempts: 0,
            last_report: None,
            last_decision: None,
            outcome: None,
            rationale: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            run_id: self.run_id.clone(),
            stage: self.stage,
            progress: self.stage.progress(),
            retry_count: self.retry_count,
            max_attempts: self.max_attempts,
            enhancement_count: self.enhancement_count,
            outcome: self.outcome,
            rationale: self.rationale.clone(),
            best_score: self
                .last_report
                .as_ref()
                .and_then(|r| r.best())
                .map(|b| b.overall_score),
            updated_at: self.updated_at,
        }
    }
}

/// Lightweight view of a run for status polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub run_id: RunId,
    pub stage: WorkflowStage,
    pub progress: u8,
    pub retry_count: u32,
    pub max_attempts: u32,
    pub enhancement_count: u32,
    pub outcome: Option<TerminalOutcome>,
    pub rationale: Option<String>,
    pub best_score: Option<f32>,
    pub updated_at: DateTime<Utc>,
}
