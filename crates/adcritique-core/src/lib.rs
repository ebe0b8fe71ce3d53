//! Ad critique engine
//!
//! Scores generated ad variations on four dimensions, ranks them, and drives
//! the refinement workflow that approves, enhances, regenerates or rejects.
//!
//! ## Key Components
//!
//! - `evaluators`: brand, quality, clarity and safety scoring over injected
//!   analyzers
//! - `EvaluationCoordinator`: concurrent fan-out of the four evaluators
//! - `scorer` / `ranker`: aggregation, pass verdict and deterministic order
//! - `refinement`: decision table, enhancement planning, prompt refinement
//! - `workflow`: state machine, run registry and runner

pub mod analyzers;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod evaluators;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod ranker;
pub mod refinement;
pub mod reporting;
pub mod scorer;
pub mod telemetry;
pub mod workflow;

/// Crate version, stamped into CLI output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use analyzers::{
    AnalyzerSuite, FallbackVisionAnalyzer, ImageInspector, ImageStats, SimilarityAnalyzer,
    SimilarityMatch, VisionAnalyzer, VisionContext, VisionReport,
};
pub use config::{
    BrandSettings, CoordinatorConfig, DimensionWeights, EngineConfig, QualitySettings,
    RefinementPolicy, ScoringPolicy, WorkflowConfig,
};
pub use coordinator::EvaluationCoordinator;
pub use domain::{
    AdCritiqueError, Confidence, CritiqueReport, CritiqueResult, Dimension, DimensionOutcome,
    DimensionScore, EnhancementPlan, MediaKind, MediaRef, ReferenceBundle, ReferenceContext,
    RefinementAction, RefinementDecision, Result, Scorecard, TerminalOutcome, Variation,
    VariationId, WorkflowSnapshot, WorkflowStage, WorkflowState,
};
pub use evaluators::{Evaluator, EvaluatorSet};
pub use ranker::{rank, ComparisonSummary, DimensionComparison};
pub use refinement::{decide, DecisionInput, PromptRefiner, RefinedPrompt};
pub use reporting::{persist_report, render_report_md, write_report_json};
pub use scorer::{score, Aggregate};
pub use workflow::{
    BrandKitProvider, Collaborators, MediaEnhancer, RunRegistry, RunRequest, VariationGenerator,
    WorkflowEvent, WorkflowRunner,
};
