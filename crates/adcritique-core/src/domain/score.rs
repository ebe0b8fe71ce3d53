//! Dimension scores and the per-variation scorecard.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{AdCritiqueError, Result};

/// One of the four evaluation axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    BrandAlignment,
    VisualQuality,
    MessageClarity,
    SafetyEthics,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::BrandAlignment,
        Dimension::VisualQuality,
        Dimension::MessageClarity,
        Dimension::SafetyEthics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandAlignment => "brand_alignment",
            Self::VisualQuality => "visual_quality",
            Self::MessageClarity => "message_clarity",
            Self::SafetyEthics => "safety_ethics",
        }
    }

    /// Human-facing label used in prompts and markdown reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BrandAlignment => "Brand alignment",
            Self::VisualQuality => "Visual quality",
            Self::MessageClarity => "Message clarity",
            Self::SafetyEthics => "Safety & ethics",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence attached to a confirmed issue. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Highest safety score still allowed once an issue of this confidence
    /// is confirmed.
    pub fn safety_cap(self) -> f32 {
        match self {
            Self::High => 0.0,
            Self::Medium => 0.2,
            Self::Low => 0.4,
        }
    }

    /// Medium and high confidence issues block approval.
    pub fn is_blocking(self) -> bool {
        self >= Self::Medium
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one evaluator on one variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    /// Always within `[0.0, 1.0]`.
    pub score: f32,
    pub feedback: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Strongest confidence among the confirmed issues, when the evaluator
    /// grades its findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_confidence: Option<Confidence>,
    /// Sub-signals that had nothing to measure and fell back to a neutral
    /// value. Non-empty means the score is an estimate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmeasured: Vec<String>,
}

/// Clamp into `[0, 1]`; NaN collapses to 0.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl DimensionScore {
    pub fn new(dimension: Dimension, score: f32, feedback: impl Into<String>) -> Self {
        Self {
            dimension,
            score: clamp_unit(score),
            feedback: feedback.into(),
            issues: Vec::new(),
            suggestions: Vec::new(),
            issue_confidence: None,
            unmeasured: Vec::new(),
        }
    }

    pub fn with_issues<I, S>(mut self, issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issues.extend(issues.into_iter().map(Into::into));
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn with_unmeasured<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unmeasured.extend(signals.into_iter().map(Into::into));
        self
    }

    /// True when at least one sub-signal was a neutral fallback.
    pub fn is_estimate(&self) -> bool {
        !self.unmeasured.is_empty()
    }

    pub fn with_issue_confidence(mut self, confidence: Confidence) -> Self {
        self.issue_confidence = Some(confidence);
        self
    }
}

/// A scored dimension or an explicit failure marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DimensionOutcome {
    Scored(DimensionScore),
    Failed { dimension: Dimension, reason: String },
}

impl DimensionOutcome {
    pub fn failed(dimension: Dimension, reason: impl Into<String>) -> Self {
        Self::Failed {
            dimension,
            reason: reason.into(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Scored(s) => s.dimension,
            Self::Failed { dimension, .. } => *dimension,
        }
    }

    pub fn score(&self) -> Option<f32> {
        self.as_scored().map(|s| s.score)
    }

    pub fn as_scored(&self) -> Option<&DimensionScore> {
        match self {
            Self::Scored(s) => Some(s),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-variation map of dimension to outcome.
///
/// # Invariants
///
/// Holds exactly one entry per [`Dimension`], and every present score lies
/// in `[0.0, 1.0]`. Both constructors and deserialization enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Dimension, DimensionOutcome>",
    into = "BTreeMap<Dimension, DimensionOutcome>"
)]
pub struct Scorecard {
    entries: BTreeMap<Dimension, DimensionOutcome>,
}

impl Scorecard {
    /// Strict constructor for externally supplied outcomes.
    ///
    /// Rejects duplicates, missing dimensions and out-of-range scores.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = DimensionOutcome>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for outcome in outcomes {
            let dimension = outcome.dimension();
            if let Some(score) = outcome.score() {
                if !(0.0..=1.0).contains(&score) {
                    return Err(AdCritiqueError::InvalidScorecard(format!(
                        "{dimension} score {score} outside [0, 1]"
                    )));
                }
            }
            if entries.insert(dimension, outcome).is_some() {
                return Err(AdCritiqueError::InvalidScorecard(format!(
                    "duplicate entry for {dimension}"
                )));
            }
        }
        let missing: Vec<&str> = Dimension::ALL
            .iter()
            .filter(|d| !entries.contains_key(d))
            .map(|d| d.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AdCritiqueError::InvalidScorecard(format!(
                "missing dimensions: {}",
                missing.join(", ")
            )));
        }
        Ok(Self { entries })
    }

    /// Lenient constructor used by the coordinator.
    ///
    /// Any dimension without an outcome is recorded as failed, scores are
    /// clamped, and a later outcome for the same dimension replaces an
    /// earlier one.
    pub fn assemble(outcomes: impl IntoIterator<Item = DimensionOutcome>) -> Self {
        let mut entries: BTreeMap<Dimension, DimensionOutcome> = outcomes
            .into_iter()
            .map(|outcome| {
                let outcome = match outcome {
                    DimensionOutcome::Scored(mut s) => {
                        s.score = clamp_unit(s.score);
                        DimensionOutcome::Scored(s)
                    }
                    failed => failed,
                };
                (outcome.dimension(), outcome)
            })
            .collect();
        for dimension in Dimension::ALL {
            entries
                .entry(dimension)
                .or_insert_with(|| DimensionOutcome::failed(dimension, "no evaluator result"));
        }
        Self { entries }
    }

    /// Scorecard with every dimension scored, for tests and offline tooling.
    pub fn from_scores(scores: [(Dimension, f32); 4]) -> Result<Self> {
        Self::from_outcomes(scores.into_iter().map(|(d, s)| {
            DimensionOutcome::Scored(DimensionScore::new(d, s, String::new()))
        }))
    }

    pub fn outcome(&self, dimension: Dimension) -> Option<&DimensionOutcome> {
        self.entries.get(&dimension)
    }

    pub fn score(&self, dimension: Dimension) -> Option<f32> {
        self.outcome(dimension).and_then(DimensionOutcome::score)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &DimensionOutcome> {
        self.entries.values()
    }

    /// `(dimension, score)` for every dimension that produced a value.
    pub fn present_scores(&self) -> impl Iterator<Item = (Dimension, f32)> + '_ {
        self.entries
            .values()
            .filter_map(|o| o.score().map(|s| (o.dimension(), s)))
    }

    pub fn failed_dimensions(&self) -> Vec<Dimension> {
        self.entries
            .values()
            .filter(|o| o.is_failed())
            .map(DimensionOutcome::dimension)
            .collect()
    }

    /// True when at least one dimension could not be scored.
    pub fn is_degraded(&self) -> bool {
        self.entries.values().any(DimensionOutcome::is_failed)
    }

    /// Issue tags across all scored dimensions, in dimension order.
    pub fn issues(&self) -> impl Iterator<Item = (Dimension, &str)> {
        self.entries
            .values()
            .filter_map(DimensionOutcome::as_scored)
            .flat_map(|s| s.issues.iter().map(move |i| (s.dimension, i.as_str())))
    }
}

impl TryFrom<BTreeMap<Dimension, DimensionOutcome>> for Scorecard {
    type Error = AdCritiqueError;

    fn try_from(map: BTreeMap<Dimension, DimensionOutcome>) -> Result<Self> {
        for (key, outcome) in &map {
            if *key != outcome.dimension() {
                return Err(AdCritiqueError::InvalidScorecard(format!(
                    "entry {key} holds an outcome for {}",
                    outcome.dimension()
                )));
            }
        }
        Self::from_outcomes(map.into_values())
    }
}

impl From<Scorecard> for BTreeMap<Dimension, DimensionOutcome> {
    fn from(card: Scorecard) -> Self {
        card.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Vec<DimensionOutcome> {
        Dimension::ALL
            .iter()
            .map(|d| DimensionOutcome::Scored(DimensionScore::new(*d, 0.7, "ok")))
            .collect()
    }

    #[test]
    fn test_dimension_score_is_clamped() {
        assert_eq!(DimensionScore::new(Dimension::BrandAlignment, 1.4, "").score, 1.0);
        assert_eq!(DimensionScore::new(Dimension::BrandAlignment, -0.2, "").score, 0.0);
        assert_eq!(DimensionScore::new(Dimension::BrandAlignment, f32::NAN, "").score, 0.0);
    }

    #[test]
    fn test_confidence_caps_and_order() {
        assert_eq!(Confidence::High.safety_cap(), 0.0);
        assert_eq!(Confidence::Medium.safety_cap(), 0.2);
        assert_eq!(Confidence::Low.safety_cap(), 0.4);
        assert!(Confidence::High > Confidence::Low);
        assert!(Confidence::Medium.is_blocking());
        assert!(!Confidence::Low.is_blocking());
    }

    #[test]
    fn test_from_outcomes_requires_every_dimension() {
        let mut outcomes = full();
        outcomes.pop();
        let err = Scorecard::from_outcomes(outcomes).unwrap_err();
        assert!(err.to_string().contains("missing dimensions: safety_ethics"));
    }

    #[test]
    fn test_from_outcomes_rejects_duplicates() {
        let mut outcomes = full();
        outcomes.push(DimensionOutcome::failed(Dimension::VisualQuality, "again"));
        let err = Scorecard::from_outcomes(outcomes).unwrap_err();
        assert!(err.to_string().contains("duplicate entry for visual_quality"));
    }

    #[test]
    fn test_assemble_fills_missing_with_failure() {
        let card = Scorecard::assemble(vec![DimensionOutcome::Scored(DimensionScore::new(
            Dimension::SafetyEthics,
            1.0,
            "clean",
        ))]);
        assert_eq!(card.outcomes().count(), 4);
        assert_eq!(card.failed_dimensions().len(), 3);
        assert!(card.is_degraded());
        assert_eq!(card.score(Dimension::SafetyEthics), Some(1.0));
    }

    #[test]
    fn test_scorecard_json_shape_round_trips() {
        let mut outcomes = full();
        outcomes[1] = DimensionOutcome::failed(Dimension::VisualQuality, "inspector down");
        let card = Scorecard::from_outcomes(outcomes).unwrap();

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["visual_quality"]["status"], "failed");
        assert_eq!(json["brand_alignment"]["status"], "scored");
        assert!((json["brand_alignment"]["score"].as_f64().unwrap() - 0.7).abs() < 1e-6);

        let back: Scorecard = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_score() {
        let mut json = serde_json::to_value(Scorecard::from_outcomes(full()).unwrap()).unwrap();
        json["message_clarity"]["score"] = serde_json::json!(1.5);
        assert!(serde_json::from_value::<Scorecard>(json).is_err());
    }
}
