//! Standard evaluators over fake analyzers, through coordinator, scorer,
//! ranker and decision table.

use std::sync::Arc;

use adcritique_core::analyzers::{
    AnalyzerSuite, MessageClarity, ProductVisibility, SafetyFinding, TextLegibility,
    VisionAnalyzer,
};
use adcritique_core::domain::{Confidence, MediaRef, RejectReason, Rgb, Variation};
use adcritique_core::fakes::{analyzer_suite, sample_stats, FailingAnalyzer};
use adcritique_core::refinement::{decide, DecisionInput};
use adcritique_core::{
    ranker, scorer, Dimension, EngineConfig, EvaluationCoordinator, EvaluatorSet, MediaKind,
    ReferenceBundle, ReferenceContext, RefinementAction, SimilarityMatch, VisionReport,
};

fn context() -> Arc<ReferenceContext> {
    Arc::new(ReferenceContext::new(
        ReferenceBundle {
            brand_colors: vec![Rgb::new(220, 30, 30), Rgb::new(250, 250, 250)],
            logo: Some(MediaRef::new("blob://logo")),
            product: Some(MediaRef::new("blob://product")),
            brand_name: Some("Acme".into()),
        },
        "Summer sale on sneakers",
    ))
}

fn clean_report() -> VisionReport {
    VisionReport {
        tone_alignment: Some(0.9),
        product_visibility: ProductVisibility::Clear,
        text: TextLegibility::Readable,
        message: MessageClarity::Clear,
        ..VisionReport::default()
    }
}

fn coordinator(analyzers: &AnalyzerSuite) -> EvaluationCoordinator {
    let config = EngineConfig::default();
    EvaluationCoordinator::new(EvaluatorSet::standard(analyzers, &config), &config.coordinator)
}

fn variation(id: &str) -> Variation {
    Variation::new(id, MediaRef::new(format!("blob://{id}")), MediaKind::Image, "p")
}

fn first_attempt() -> DecisionInput {
    DecisionInput {
        attempt_count: 0,
        max_attempts: 3,
        enhancements_used: 0,
    }
}

#[tokio::test]
async fn clean_ad_scores_high_and_is_approved() {
    let analyzers = analyzer_suite(
        SimilarityMatch {
            score: 0.8,
            detected: true,
        },
        sample_stats(),
        clean_report(),
    );
    let config = EngineConfig::default();
    let card = coordinator(&analyzers)
        .evaluate_variation(&variation("var_1"), &context())
        .await;

    assert!(!card.is_degraded());
    assert_eq!(card.score(Dimension::SafetyEthics), Some(1.0));
    for (_, score) in card.present_scores() {
        assert!((0.0..=1.0).contains(&score));
    }

    let result = scorer::critique(variation("var_1"), card, &config.scoring);
    assert!(result.passed);
    assert!(result.overall_score >= 0.8, "{}", result.overall_score);

    let decision = decide(&result, first_attempt(), &config.refinement);
    assert_eq!(decision.action, RefinementAction::Approve);
}

#[tokio::test]
async fn high_confidence_harm_vetoes_everything() {
    let report = VisionReport {
        harmful_content: Some(SafetyFinding::new(Confidence::High, "weapon shown")),
        ..clean_report()
    };
    let analyzers = analyzer_suite(
        SimilarityMatch {
            score: 0.8,
            detected: true,
        },
        sample_stats(),
        report,
    );
    let config = EngineConfig::default();
    let card = coordinator(&analyzers)
        .evaluate_variation(&variation("var_1"), &context())
        .await;
    assert_eq!(card.score(Dimension::SafetyEthics), Some(0.0));

    let result = scorer::critique(variation("var_1"), card, &config.scoring);
    assert!(result.safety_override);
    assert!(!result.passed);

    let decision = decide(&result, first_attempt(), &config.refinement);
    assert_eq!(decision.action, RefinementAction::Reject);
    assert_eq!(decision.reject_reason, Some(RejectReason::SafetyOverride));
    assert!(decision.rationale.contains("weapon shown"));
}

#[tokio::test]
async fn vision_outage_degrades_but_does_not_abort() {
    let vision: Arc<dyn VisionAnalyzer> =
        Arc::new(FailingAnalyzer::unavailable("model quota exhausted"));
    let analyzers = AnalyzerSuite {
        vision,
        ..analyzer_suite(
            SimilarityMatch {
                score: 0.8,
                detected: true,
            },
            sample_stats(),
            VisionReport::default(),
        )
    };
    let config = EngineConfig::default();
    let card = coordinator(&analyzers)
        .evaluate_variation(&variation("var_1"), &context())
        .await;

    assert!(card.is_degraded());
    assert!(card.score(Dimension::VisualQuality).is_some());
    assert!(card.score(Dimension::SafetyEthics).is_none());
    assert_eq!(card.outcomes().count(), 4);

    let result = scorer::critique(variation("var_1"), card, &config.scoring);
    assert!(result.low_confidence);
    assert!(result.overall_score.is_finite());

    let decision = decide(&result, first_attempt(), &config.refinement);
    assert_ne!(decision.action, RefinementAction::Approve);
}

#[tokio::test]
async fn blurry_low_contrast_image_gets_simple_issues() {
    let mut stats = sample_stats();
    stats.sharpness = 40.0;
    stats.contrast = 10.0;
    let analyzers = analyzer_suite(
        SimilarityMatch {
            score: 0.8,
            detected: true,
        },
        stats,
        clean_report(),
    );
    let card = coordinator(&analyzers)
        .evaluate_variation(&variation("var_1"), &context())
        .await;
    let issues: Vec<&str> = card
        .issues()
        .filter(|(d, _)| *d == Dimension::VisualQuality)
        .map(|(_, i)| i)
        .collect();
    assert!(issues.iter().any(|i| i.contains("blurry")), "{issues:?}");
    assert!(issues.contains(&"Low contrast"), "{issues:?}");
}

#[tokio::test]
async fn ranking_over_a_batch_is_deterministic() {
    let analyzers = analyzer_suite(
        SimilarityMatch {
            score: 0.8,
            detected: true,
        },
        sample_stats(),
        clean_report(),
    );
    let config = EngineConfig::default();
    let coordinator = coordinator(&analyzers);
    let batch = vec![variation("var_3"), variation("var_1"), variation("var_2")];
    let scored = coordinator.evaluate_all(&batch, &context()).await;

    let results: Vec<_> = scored
        .into_iter()
        .map(|(v, card)| scorer::critique(v, card, &config.scoring))
        .collect();
    let ranked = ranker::rank(results);
    let ids: Vec<&str> = ranked.iter().map(|r| r.variation.id.as_str()).collect();
    assert_eq!(ids, vec!["var_1", "var_2", "var_3"]);
    assert_eq!(ranked[2].rank, Some(3));
}
