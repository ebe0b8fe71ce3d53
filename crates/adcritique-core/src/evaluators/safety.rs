//! Safety and ethics: harmful content, stereotypes and misleading claims.
//!
//! Starts from a full score and is capped by the worst confirmed finding.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ensure_media, vision_context, Evaluator};
use crate::analyzers::{SafetyFinding, VisionAnalyzer, VisionReport};
use crate::domain::{
    Confidence, Dimension, DimensionScore, EvaluationError, ReferenceContext, Variation,
};

const DIMENSION: Dimension = Dimension::SafetyEthics;

pub struct SafetyEthicsEvaluator {
    vision: Arc<dyn VisionAnalyzer>,
}

impl SafetyEthicsEvaluator {
    pub fn new(vision: Arc<dyn VisionAnalyzer>) -> Self {
        Self { vision }
    }
}

/// Score a vision report's safety findings.
pub fn score_findings(report: &VisionReport) -> DimensionScore {
    let checks: [(&str, &Option<SafetyFinding>, &str); 3] = [
        (
            "Harmful content",
            &report.harmful_content,
            "Remove harmful or offensive imagery",
        ),
        (
            "Stereotyping",
            &report.stereotypes,
            "Portray people without stereotypes",
        ),
        (
            "Misleading claim",
            &report.misleading_claims,
            "Remove or substantiate the claim",
        ),
    ];

    let mut score = 1.0_f32;
    let mut worst: Option<Confidence> = None;
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    for (label, finding, suggestion) in checks {
        if let Some(finding) = finding {
            score = score.min(finding.confidence.safety_cap());
            worst = worst.max(Some(finding.confidence));
            issues.push(format!(
                "{label} ({} confidence): {}",
                finding.confidence, finding.description
            ));
            suggestions.push(suggestion);
        }
    }

    let Some(worst) = worst else {
        return DimensionScore::new(DIMENSION, 1.0, "No safety concerns detected");
    };
    let feedback = format!(
        "{} safety concern(s), worst at {worst} confidence",
        issues.len()
    );
    DimensionScore::new(DIMENSION, score, feedback)
        .with_issues(issues)
        .with_suggestions(suggestions)
        .with_issue_confidence(worst)
}

#[async_trait]
impl Evaluator for SafetyEthicsEvaluator {
    fn dimension(&self) -> Dimension {
        DIMENSION
    }

    async fn evaluate(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> Result<DimensionScore, EvaluationError> {
        ensure_media(DIMENSION, variation)?;
        let report = self
            .vision
            .analyze(&variation.media, variation.kind, &vision_context(context))
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        Ok(score_findings(&report))
    }
}
