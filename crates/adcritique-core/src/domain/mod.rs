//! Domain models for the critique engine.
//!
//! Canonical definitions for the core entities:
//! - `Variation`: one generated ad candidate
//! - `Scorecard`: per-dimension outcomes for one variation
//! - `CritiqueReport`: ranked results of one critique attempt
//! - `RefinementDecision`: what to do after a critique
//! - `WorkflowState`: control state of a run

pub mod decision;
pub mod error;
pub mod report;
pub mod score;
pub mod variation;
pub mod workflow;

pub use decision::{
    EnhancementPlan, RefinementAction, RefinementDecision, RejectReason, CANCELLED,
    RETRY_BUDGET_EXHAUSTED,
};
pub use error::{
    AdCritiqueError, AnalyzerError, EvaluationError, Result, StageError, WorkflowError,
    WorkflowResult,
};
pub use report::{CritiqueReport, CritiqueResult, REPORT_SCHEMA_VERSION};
pub use score::{clamp_unit, Confidence, Dimension, DimensionOutcome, DimensionScore, Scorecard};
pub use variation::{
    first_duplicate_id, MediaKind, MediaRef, ReferenceBundle, ReferenceContext, Rgb, Variation,
    VariationId,
};
pub use workflow::{TerminalOutcome, WorkflowSnapshot, WorkflowStage, WorkflowState};
