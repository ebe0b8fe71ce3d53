//! Domain-level error taxonomy for the critique engine.

use adcritique_state::StorageError;

use super::score::Dimension;
use super::workflow::WorkflowStage;

/// Failures reported by an injected analyzer capability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalyzerError {
    #[error("media {media} could not be read: {reason}")]
    UnreadableMedia { media: String, reason: String },

    #[error("analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("analyzer returned malformed output: {0}")]
    MalformedOutput(String),
}

/// One evaluator could not produce a score for its dimension.
///
/// Never escapes the evaluation coordinator; it becomes a failure marker in
/// the scorecard instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("{dimension}: media {media} is unreadable: {reason}")]
    UnreadableMedia {
        dimension: Dimension,
        media: String,
        reason: String,
    },

    #[error("{dimension}: contract violation: {detail}")]
    ContractViolation { dimension: Dimension, detail: String },

    #[error("{dimension}: analyzer failed: {source}")]
    Analyzer {
        dimension: Dimension,
        #[source]
        source: AnalyzerError,
    },

    #[error("{dimension}: evaluator task aborted: {detail}")]
    Aborted { dimension: Dimension, detail: String },
}

impl EvaluationError {
    /// Lift an analyzer failure into the evaluator's dimension.
    pub fn from_analyzer(dimension: Dimension, err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::UnreadableMedia { media, reason } => Self::UnreadableMedia {
                dimension,
                media,
                reason,
            },
            other => Self::Analyzer {
                dimension,
                source: other,
            },
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Self::UnreadableMedia { dimension, .. }
            | Self::ContractViolation { dimension, .. }
            | Self::Analyzer { dimension, .. }
            | Self::Aborted { dimension, .. } => *dimension,
        }
    }
}

/// An external collaborator failed between stages.
///
/// Routes the run to `Rejected`; never retried automatically.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error("brand kit extraction failed: {0}")]
    BrandKit(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("generation produced no variations")]
    EmptyGeneration,

    #[error("enhancement failed: {0}")]
    Enhancement(String),

    #[error("report persistence failed: {0}")]
    Persistence(String),
}

impl StageError {
    /// Stage whose collaborator produced this failure.
    pub fn stage(&self) -> WorkflowStage {
        match self {
            Self::BrandKit(_) => WorkflowStage::BrandKit,
            Self::Generation(_) | Self::EmptyGeneration => WorkflowStage::Generation,
            Self::Enhancement(_) => WorkflowStage::Enhance,
            Self::Persistence(_) => WorkflowStage::Critique,
        }
    }
}

/// Illegal use of the workflow machine or run registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid transition from {from} on {event}")]
    InvalidTransition { from: WorkflowStage, event: String },

    #[error("run {0} has already terminated")]
    Terminated(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("run already registered: {0}")]
    DuplicateRun(String),
}

/// Top-level error for the critique engine.
#[derive(Debug, thiserror::Error)]
pub enum AdCritiqueError {
    #[error("invalid scorecard: {0}")]
    InvalidScorecard(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for critique engine operations.
pub type Result<T> = std::result::Result<T, AdCritiqueError>;

/// Result type for workflow machine operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
