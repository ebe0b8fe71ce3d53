//! Scorecard aggregation and pass/fail verdict.
//!
//! Pure functions over a [`Scorecard`] and a [`ScoringPolicy`]. Failed
//! dimensions are left out and the remaining weights renormalized, so an
//! incomplete scorecard still gets a verdict, flagged low-confidence.

use serde::{Deserialize, Serialize};

use crate::config::ScoringPolicy;
use crate::domain::{clamp_unit, CritiqueResult, Dimension, Scorecard, Variation};

/// Derived verdict for one scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub overall_score: f32,
    pub passed: bool,
    /// At least one dimension could not be scored.
    pub low_confidence: bool,
    /// Safety scored 0.0 and vetoed the pass.
    pub safety_override: bool,
    pub dimensions_scored: usize,
}

/// Aggregate a scorecard under `policy`.
///
/// With no scored dimension at all the overall score is 0.0 and the verdict
/// fails. If every present dimension carries zero weight the present scores
/// are averaged equally.
pub fn score(scorecard: &Scorecard, policy: &ScoringPolicy) -> Aggregate {
    let present: Vec<(Dimension, f32)> = scorecard.present_scores().collect();
    let low_confidence = scorecard.is_degraded();
    if present.is_empty() {
        return Aggregate {
            overall_score: 0.0,
            passed: false,
            low_confidence: true,
            safety_override: false,
            dimensions_scored: 0,
        };
    }

    let weight_sum: f32 = present
        .iter()
        .map(|(d, _)| policy.weights.weight(*d).max(0.0))
        .sum();
    let overall = if weight_sum > 0.0 {
        present
            .iter()
            .map(|(d, s)| policy.weights.weight(*d).max(0.0) * s)
            .sum::<f32>()
            / weight_sum
    } else {
        present.iter().map(|(_, s)| s).sum::<f32>() / present.len() as f32
    };
    let overall_score = clamp_unit(overall);

    let safety_override = scorecard
        .score(Dimension::SafetyEthics)
        .is_some_and(|s| s <= 0.0);
    let passed = !safety_override
        && overall_score >= policy.overall_threshold
        && present
            .iter()
            .all(|(_, s)| *s >= policy.per_dimension_threshold);

    Aggregate {
        overall_score,
        passed,
        low_confidence,
        safety_override,
        dimensions_scored: present.len(),
    }
}

/// Score a variation into an unranked [`CritiqueResult`].
pub fn critique(variation: Variation, scorecard: Scorecard, policy: &ScoringPolicy) -> CritiqueResult {
    let aggregate = score(&scorecard, policy);
    CritiqueResult {
        variation,
        scorecard,
        overall_score: aggregate.overall_score,
        passed: aggregate.passed,
        safety_override: aggregate.safety_override,
        low_confidence: aggregate.low_confidence,
        rank: None,
    }
}
