//! Deterministic ranking and comparison of critique results.
//!
//! Sort keys, all descending except the last: overall score, safety score,
//! brand alignment score, then variation id ascending. A dimension that
//! could not be scored ranks below any present score. Ids are unique within
//! a run, so the order is total.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{CritiqueResult, Dimension, VariationId};

fn desc_present_first(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `Less` when `a` ranks ahead of `b`.
pub fn compare(a: &CritiqueResult, b: &CritiqueResult) -> Ordering {
    b.overall_score
        .total_cmp(&a.overall_score)
        .then_with(|| {
            desc_present_first(
                a.dimension_score(Dimension::SafetyEthics),
                b.dimension_score(Dimension::SafetyEthics),
            )
        })
        .then_with(|| {
            desc_present_first(
                a.dimension_score(Dimension::BrandAlignment),
                b.dimension_score(Dimension::BrandAlignment),
            )
        })
        .then_with(|| a.variation.id.cmp(&b.variation.id))
}

/// Order results best first and stamp 1-based ranks.
pub fn rank(mut results: Vec<CritiqueResult>) -> Vec<CritiqueResult> {
    results.sort_by(compare);
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = Some(i as u32 + 1);
    }
    results
}

/// The best `n` results.
pub fn top_n(results: &[CritiqueResult], n: usize) -> Vec<&CritiqueResult> {
    let mut sorted: Vec<&CritiqueResult> = results.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));
    sorted.truncate(n);
    sorted
}

/// Passing results in rank order.
pub fn passed_only(results: &[CritiqueResult]) -> Vec<&CritiqueResult> {
    let mut passed: Vec<&CritiqueResult> = results.iter().filter(|r| r.passed).collect();
    passed.sort_by(|a, b| compare(a, b));
    passed
}

/// Spread of overall scores across a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub passed: usize,
    pub best: Option<VariationId>,
    pub worst: Option<VariationId>,
    pub mean_score: f32,
    pub min_score: f32,
    pub max_score: f32,
}

pub fn summarize(results: &[CritiqueResult]) -> ComparisonSummary {
    let mut sorted: Vec<&CritiqueResult> = results.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));
    let scores = || results.iter().map(|r| r.overall_score);
    let mean_score = if results.is_empty() {
        0.0
    } else {
        scores().sum::<f32>() / results.len() as f32
    };
    ComparisonSummary {
        total: results.len(),
        passed: results.iter().filter(|r| r.passed).count(),
        best: sorted.first().map(|r| r.variation.id.clone()),
        worst: sorted.last().map(|r| r.variation.id.clone()),
        mean_score,
        min_score: scores().reduce(f32::min).unwrap_or(0.0),
        max_score: scores().reduce(f32::max).unwrap_or(0.0),
    }
}

/// How every variation fared on one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionComparison {
    pub dimension: Dimension,
    /// Scored variations, highest first; ties by id.
    pub scores: Vec<(VariationId, f32)>,
    /// Variations whose evaluator failed on this dimension.
    pub unscored: Vec<VariationId>,
    pub mean_score: Option<f32>,
}

impl DimensionComparison {
    pub fn best(&self) -> Option<&VariationId> {
        self.scores.first().map(|(id, _)| id)
    }
}

pub fn compare_dimension(results: &[CritiqueResult], dimension: Dimension) -> DimensionComparison {
    let mut scores = Vec::new();
    let mut unscored = Vec::new();
    for result in results {
        match result.dimension_score(dimension) {
            Some(s) => scores.push((result.variation.id.clone(), s)),
            None => unscored.push(result.variation.id.clone()),
        }
    }
    scores.sort_by(|(ia, a), (ib, b)| b.total_cmp(a).then_with(|| ia.cmp(ib)));
    unscored.sort();
    let mean_score = (!scores.is_empty())
        .then(|| scores.iter().map(|(_, s)| s).sum::<f32>() / scores.len() as f32);
    DimensionComparison {
        dimension,
        scores,
        unscored,
        mean_score,
    }
}

/// Per-dimension comparison for all four dimensions.
pub fn compare_dimensions(results: &[CritiqueResult]) -> Vec<DimensionComparison> {
    Dimension::ALL
        .iter()
        .map(|d| compare_dimension(results, *d))
        .collect()
}
