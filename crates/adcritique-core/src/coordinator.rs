//! Concurrent fan-out of the four evaluators for each variation.
//!
//! Every evaluator is always attempted. A failing evaluator leaves a failure
//! marker in the scorecard and never disturbs the other three. Retry policy
//! lives in the workflow, not here.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::config::CoordinatorConfig;
use crate::domain::{
    Dimension, DimensionOutcome, EvaluationError, ReferenceContext, Scorecard, Variation,
};
use crate::evaluators::EvaluatorSet;
use crate::metrics::METRICS;
use crate::obs;

pub struct EvaluationCoordinator {
    evaluators: EvaluatorSet,
    /// Caps evaluator calls in flight across every variation sharing this
    /// coordinator.
    permits: Arc<Semaphore>,
}

impl EvaluationCoordinator {
    pub fn new(evaluators: EvaluatorSet, config: &CoordinatorConfig) -> Self {
        Self {
            evaluators,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        }
    }

    /// Run all four evaluators concurrently and collect a complete scorecard.
    ///
    /// Each evaluator runs in its own task, so a cancelled caller lets
    /// already-dispatched calls finish in the background.
    #[instrument(skip_all, fields(variation = %variation.id))]
    pub async fn evaluate_variation(
        &self,
        variation: &Variation,
        context: &Arc<ReferenceContext>,
    ) -> Scorecard {
        let mut tasks = Vec::with_capacity(Dimension::ALL.len());
        for evaluator in self.evaluators.iter() {
            let evaluator = Arc::clone(evaluator);
            let permits = Arc::clone(&self.permits);
            let variation = variation.clone();
            let context = Arc::clone(context);
            let dimension = evaluator.dimension();

            let task = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                evaluator.evaluate(&variation, &context).await
            });
            tasks.push((dimension, task));
        }

        let (dimensions, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let joined = join_all(handles).await;

        let mut outcomes = Vec::with_capacity(dimensions.len());
        for (dimension, joined) in dimensions.into_iter().zip(joined) {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(EvaluationError::Aborted {
                    dimension,
                    detail: join_err.to_string(),
                }),
            };
            outcomes.push(match result {
                Ok(score) if score.dimension == dimension => DimensionOutcome::Scored(score),
                Ok(score) => {
                    let err = EvaluationError::ContractViolation {
                        dimension,
                        detail: format!("evaluator returned a {} score", score.dimension),
                    };
                    failed(variation, dimension, &err)
                }
                Err(err) => failed(variation, dimension, &err),
            });
        }

        let scorecard = Scorecard::assemble(outcomes);
        let failures = scorecard.failed_dimensions();
        if failures.len() > 1 {
            warn!(
                variation = %variation.id,
                failed = failures.len(),
                "scorecard degraded: multiple dimensions unscored"
            );
        }
        METRICS.inc_variations_evaluated();
        scorecard
    }

    /// Evaluate every variation in order.
    pub async fn evaluate_all(
        &self,
        variations: &[Variation],
        context: &Arc<ReferenceContext>,
    ) -> Vec<(Variation, Scorecard)> {
        let mut scored = Vec::with_capacity(variations.len());
        for variation in variations {
            let scorecard = self.evaluate_variation(variation, context).await;
            scored.push((variation.clone(), scorecard));
        }
        scored
    }
}

fn failed(variation: &Variation, dimension: Dimension, err: &EvaluationError) -> DimensionOutcome {
    obs::emit_evaluator_failed(variation.id.as_str(), dimension, err);
    METRICS.inc_evaluator_failures();
    DimensionOutcome::failed(dimension, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DimensionScore, MediaKind, MediaRef};
    use crate::fakes::{fixed_set, scripted_set, ScriptedEvaluator};
    use std::time::Duration;

    fn variation() -> Variation {
        Variation::new("var_1", MediaRef::new("blob://a"), MediaKind::Image, "p")
    }

    fn context() -> Arc<ReferenceContext> {
        Arc::new(ReferenceContext::default())
    }

    #[tokio::test]
    async fn test_all_dimensions_scored() {
        let coordinator =
            EvaluationCoordinator::new(fixed_set(0.9, 0.85, 0.8, 1.0).unwrap(), &Default::default());
        let card = coordinator.evaluate_variation(&variation(), &context()).await;
        assert!(!card.is_degraded());
        assert_eq!(card.score(Dimension::VisualQuality), Some(0.85));
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_others() {
        let set = scripted_set([
            ScriptedEvaluator::fixed(Dimension::BrandAlignment, 0.9),
            ScriptedEvaluator::failing(Dimension::VisualQuality, "inspector down"),
            ScriptedEvaluator::fixed(Dimension::MessageClarity, 0.8),
            ScriptedEvaluator::fixed(Dimension::SafetyEthics, 1.0),
        ])
        .unwrap();
        let coordinator = EvaluationCoordinator::new(set, &Default::default());
        let card = coordinator.evaluate_variation(&variation(), &context()).await;

        assert_eq!(card.failed_dimensions(), vec![Dimension::VisualQuality]);
        assert_eq!(card.present_scores().count(), 3);
        match card.outcome(Dimension::VisualQuality).unwrap() {
            DimensionOutcome::Failed { reason, .. } => assert!(reason.contains("inspector down")),
            other => panic!("expected failure marker, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mislabelled_score_is_contract_violation() {
        let set = scripted_set([
            ScriptedEvaluator::new(Dimension::BrandAlignment, |_| {
                Ok(DimensionScore::new(Dimension::SafetyEthics, 1.0, "wrong slot"))
            }),
            ScriptedEvaluator::fixed(Dimension::VisualQuality, 0.5),
            ScriptedEvaluator::fixed(Dimension::MessageClarity, 0.5),
            ScriptedEvaluator::fixed(Dimension::SafetyEthics, 0.5),
        ])
        .unwrap();
        let coordinator = EvaluationCoordinator::new(set, &Default::default());
        let card = coordinator.evaluate_variation(&variation(), &context()).await;
        assert_eq!(card.failed_dimensions(), vec![Dimension::BrandAlignment]);
        assert_eq!(card.score(Dimension::SafetyEthics), Some(0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluators_run_concurrently() {
        let delay = Duration::from_millis(100);
        let set = scripted_set([
            ScriptedEvaluator::fixed(Dimension::BrandAlignment, 0.7).with_delay(delay),
            ScriptedEvaluator::fixed(Dimension::VisualQuality, 0.7).with_delay(delay),
            ScriptedEvaluator::fixed(Dimension::MessageClarity, 0.7).with_delay(delay),
            ScriptedEvaluator::fixed(Dimension::SafetyEthics, 0.7).with_delay(delay),
        ])
        .unwrap();
        let coordinator = EvaluationCoordinator::new(set, &Default::default());

        let start = tokio::time::Instant::now();
        coordinator.evaluate_variation(&variation(), &context()).await;
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_width_one_serialises_evaluators() {
        let delay = Duration::from_millis(100);
        let set = scripted_set([
            ScriptedEvaluator::fixed(Dimension::BrandAlignment, 0.7).with_delay(delay),
            ScriptedEvaluator::fixed(Dimension::VisualQuality, 0.7).with_delay(delay),
            ScriptedEvaluator::fixed(Dimension::MessageClarity, 0.7).with_delay(delay),
            ScriptedEvaluator::fixed(Dimension::SafetyEthics, 0.7).with_delay(delay),
        ])
        .unwrap();
        let coordinator =
            EvaluationCoordinator::new(set, &CoordinatorConfig { max_concurrent: 1 });

        let start = tokio::time::Instant::now();
        coordinator.evaluate_variation(&variation(), &context()).await;
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_evaluate_all_keeps_order() {
        let coordinator =
            EvaluationCoordinator::new(fixed_set(0.5, 0.5, 0.5, 0.5).unwrap(), &Default::default());
        let variations = vec![
            variation(),
            Variation::new("var_2", MediaRef::new("blob://b"), MediaKind::Image, "p"),
        ];
        let scored = coordinator.evaluate_all(&variations, &context()).await;
        let ids: Vec<_> = scored.iter().map(|(v, _)| v.id.as_str()).collect();
        assert_eq!(ids, vec!["var_1", "var_2"]);
    }
}
