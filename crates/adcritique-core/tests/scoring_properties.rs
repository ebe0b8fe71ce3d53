//! Properties of the scorer and ranker that hold for any scorecard.

use adcritique_core::domain::{DimensionOutcome, DimensionScore, MediaRef, Variation};
use adcritique_core::refinement::{decide, DecisionInput};
use adcritique_core::{
    rank, score, scorer, Dimension, DimensionWeights, MediaKind, RefinementAction,
    RefinementPolicy, Scorecard, ScoringPolicy,
};

const GRID: [f32; 6] = [0.0, 0.2, 0.4, 0.6, 0.85, 1.0];

fn card(brand: f32, quality: f32, clarity: f32, safety: f32) -> Scorecard {
    Scorecard::from_scores([
        (Dimension::BrandAlignment, brand),
        (Dimension::VisualQuality, quality),
        (Dimension::MessageClarity, clarity),
        (Dimension::SafetyEthics, safety),
    ])
    .unwrap()
}

fn variation(id: &str) -> Variation {
    Variation::new(id, MediaRef::new(format!("blob://{id}")), MediaKind::Image, "p")
}

fn every_card() -> impl Iterator<Item = Scorecard> {
    GRID.into_iter().flat_map(|b| {
        GRID.into_iter().flat_map(move |q| {
            GRID.into_iter()
                .flat_map(move |c| GRID.into_iter().map(move |s| card(b, q, c, s)))
        })
    })
}

#[test]
fn overall_score_stays_in_unit_range_and_is_repeatable() {
    let policy = ScoringPolicy::default();
    for card in every_card() {
        let first = score(&card, &policy);
        assert!((0.0..=1.0).contains(&first.overall_score));
        assert_eq!(first, score(&card, &policy));
    }
}

#[test]
fn safety_zero_never_passes() {
    let policy = ScoringPolicy::default();
    for card in every_card() {
        let agg = score(&card, &policy);
        if card.score(Dimension::SafetyEthics) == Some(0.0) {
            assert!(!agg.passed);
            assert!(agg.safety_override);
        }
    }
}

#[test]
fn safety_zero_vetoes_even_a_high_overall() {
    let policy = ScoringPolicy {
        weights: DimensionWeights {
            brand_alignment: 0.35,
            visual_quality: 0.3,
            message_clarity: 0.3,
            safety_ethics: 0.05,
        },
        ..ScoringPolicy::default()
    };
    let agg = score(&card(1.0, 1.0, 1.0, 0.0), &policy);
    assert!((agg.overall_score - 0.95).abs() < 1e-5);
    assert!(!agg.passed);
}

#[test]
fn degraded_card_never_divides_by_zero() {
    let policy = ScoringPolicy::default();
    let all_failed = Scorecard::from_outcomes(
        Dimension::ALL
            .iter()
            .map(|d| DimensionOutcome::failed(*d, "analyzer offline")),
    )
    .unwrap();
    let agg = score(&all_failed, &policy);
    assert_eq!(agg.overall_score, 0.0);
    assert!(!agg.passed);
    assert!(agg.low_confidence);

    let quality_failed = Scorecard::from_outcomes([
        DimensionOutcome::Scored(DimensionScore::new(Dimension::BrandAlignment, 0.9, "ok")),
        DimensionOutcome::failed(Dimension::VisualQuality, "inspector offline"),
        DimensionOutcome::Scored(DimensionScore::new(Dimension::MessageClarity, 0.6, "ok")),
        DimensionOutcome::Scored(DimensionScore::new(Dimension::SafetyEthics, 0.9, "ok")),
    ])
    .unwrap();
    let agg = score(&quality_failed, &policy);
    assert!((agg.overall_score - 0.8).abs() < 1e-5);
    assert!(agg.low_confidence);
    assert!(agg.passed);
    assert_eq!(agg.dimensions_scored, 3);
}

#[test]
fn brand_breaks_a_tie_on_overall_and_safety() {
    let policy = ScoringPolicy {
        weights: DimensionWeights {
            brand_alignment: 0.0,
            visual_quality: 1.0,
            message_clarity: 1.0,
            safety_ethics: 1.0,
        },
        ..ScoringPolicy::default()
    };
    let lower = scorer::critique(variation("var_a"), card(0.7, 0.85, 0.85, 1.0), &policy);
    let higher = scorer::critique(variation("var_b"), card(0.8, 0.85, 0.85, 1.0), &policy);
    assert_eq!(lower.overall_score, higher.overall_score);

    let ranked = rank(vec![lower, higher]);
    assert_eq!(ranked[0].variation.id.as_str(), "var_b");
    assert_eq!(ranked[0].rank, Some(1));
    assert_eq!(ranked[1].rank, Some(2));
}

#[test]
fn ranking_ignores_input_order() {
    let policy = ScoringPolicy::default();
    let build = |ids: &[&str]| {
        let results = ids
            .iter()
            .map(|id| scorer::critique(variation(id), card(0.8, 0.8, 0.8, 1.0), &policy))
            .collect();
        rank(results)
            .into_iter()
            .map(|r| r.variation.id.as_str().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(build(&["c", "a", "b"]), build(&["b", "c", "a"]));
    assert_eq!(build(&["c", "a", "b"]), vec!["a", "b", "c"]);
}

#[test]
fn strong_scorecard_is_approved() {
    let result = scorer::critique(
        variation("var_1"),
        card(0.9, 0.85, 0.8, 1.0),
        &ScoringPolicy::default(),
    );
    assert!((result.overall_score - 0.8875).abs() < 1e-5);
    assert!(result.passed);
    let decision = decide(
        &result,
        DecisionInput {
            attempt_count: 0,
            max_attempts: 3,
            enhancements_used: 0,
        },
        &RefinementPolicy::default(),
    );
    assert_eq!(decision.action, RefinementAction::Approve);
}
