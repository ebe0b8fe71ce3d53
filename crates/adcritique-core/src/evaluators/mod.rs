//! The four dimension evaluators behind one capability trait.
//!
//! Each evaluator combines three sub-signals into a single [`DimensionScore`].
//! Missing reference material is a "no signal" condition and yields a neutral
//! score with feedback; only unreadable media or analyzer outages surface as
//! [`EvaluationError`].

pub mod brand;
pub mod clarity;
pub mod quality;
pub mod safety;

use std::sync::Arc;

use async_trait::async_trait;

use crate::analyzers::{AnalyzerSuite, VisionContext};
use crate::config::EngineConfig;
use crate::domain::{
    AdCritiqueError, Dimension, DimensionScore, EvaluationError, ReferenceContext, Result,
    Variation,
};

pub use brand::BrandAlignmentEvaluator;
pub use clarity::MessageClarityEvaluator;
pub use quality::VisualQualityEvaluator;
pub use safety::SafetyEthicsEvaluator;

/// Scores one variation along a single dimension.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn dimension(&self) -> Dimension;

    async fn evaluate(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> std::result::Result<DimensionScore, EvaluationError>;
}

/// Exactly one evaluator per dimension.
#[derive(Clone)]
pub struct EvaluatorSet {
    brand: Arc<dyn Evaluator>,
    quality: Arc<dyn Evaluator>,
    clarity: Arc<dyn Evaluator>,
    safety: Arc<dyn Evaluator>,
}

impl EvaluatorSet {
    /// Assemble a set, checking each evaluator sits in its own slot.
    pub fn new(
        brand: Arc<dyn Evaluator>,
        quality: Arc<dyn Evaluator>,
        clarity: Arc<dyn Evaluator>,
        safety: Arc<dyn Evaluator>,
    ) -> Result<Self> {
        let set = Self {
            brand,
            quality,
            clarity,
            safety,
        };
        for (expected, evaluator) in Dimension::ALL.iter().zip(set.iter()) {
            if evaluator.dimension() != *expected {
                return Err(AdCritiqueError::InvalidInput(format!(
                    "evaluator for {} placed in the {expected} slot",
                    evaluator.dimension()
                )));
            }
        }
        Ok(set)
    }

    /// The production evaluators wired to `analyzers`.
    pub fn standard(analyzers: &AnalyzerSuite, config: &EngineConfig) -> Self {
        Self {
            brand: Arc::new(BrandAlignmentEvaluator::new(analyzers.clone(), config.brand)),
            quality: Arc::new(VisualQualityEvaluator::new(
                Arc::clone(&analyzers.inspector),
                config.quality,
            )),
            clarity: Arc::new(MessageClarityEvaluator::new(
                Arc::clone(&analyzers.similarity),
                Arc::clone(&analyzers.vision),
            )),
            safety: Arc::new(SafetyEthicsEvaluator::new(Arc::clone(&analyzers.vision))),
        }
    }

    /// Evaluators in [`Dimension::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Evaluator>> {
        [&self.brand, &self.quality, &self.clarity, &self.safety].into_iter()
    }
}

/// A single sub-signal feeding a dimension score.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Signal {
    pub score: f32,
    pub feedback: String,
    pub issue: Option<String>,
    pub suggestion: Option<String>,
    /// Neutral stand-in for a signal that could not be measured.
    pub estimated: bool,
}

impl Signal {
    pub fn new(score: f32, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
            issue: None,
            suggestion: None,
            estimated: false,
        }
    }

    pub fn estimated(mut self) -> Self {
        self.estimated = true;
        self
    }

    pub fn issue(mut self, issue: impl Into<String>) -> Self {
        self.issue = Some(issue.into());
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Mean of the signals, with their feedback joined and issues collected.
pub(crate) fn combine(dimension: Dimension, signals: Vec<Signal>) -> DimensionScore {
    let count = signals.len().max(1) as f32;
    let mean = signals.iter().map(|s| s.score).sum::<f32>() / count;
    let feedback = signals
        .iter()
        .map(|s| s.feedback.as_str())
        .collect::<Vec<_>>()
        .join(". ");
    let unmeasured: Vec<String> = signals
        .iter()
        .filter(|s| s.estimated)
        .map(|s| s.feedback.clone())
        .collect();
    let (issues, suggestions): (Vec<_>, Vec<_>) = signals
        .into_iter()
        .map(|s| (s.issue, s.suggestion))
        .unzip();
    DimensionScore::new(dimension, mean, feedback)
        .with_issues(issues.into_iter().flatten())
        .with_suggestions(suggestions.into_iter().flatten())
        .with_unmeasured(unmeasured)
}

/// Reject variations a caller should never have handed over.
pub(crate) fn ensure_media(
    dimension: Dimension,
    variation: &Variation,
) -> std::result::Result<(), EvaluationError> {
    if variation.media.as_str().trim().is_empty() {
        return Err(EvaluationError::ContractViolation {
            dimension,
            detail: format!("variation {} has an empty media reference", variation.id),
        });
    }
    Ok(())
}

pub(crate) fn vision_context(context: &ReferenceContext) -> VisionContext {
    VisionContext {
        user_prompt: context.user_prompt.clone(),
        brand_name: context.bundle.brand_name.clone(),
        brand_colors: context.bundle.brand_colors.clone(),
    }
}
