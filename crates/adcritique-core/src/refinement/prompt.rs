//! Deterministic prompt refinement for the Regenerate path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{CritiqueResult, Dimension, RefinementDecision, ReferenceBundle};

/// Prompt handed to generation on Regenerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinedPrompt {
    pub prompt: String,
    pub addressed_issues: Vec<String>,
    pub low_scores: BTreeMap<Dimension, f32>,
    pub rationale: String,
}

fn directive(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::BrandAlignment => "Feature the brand logo clearly and use the brand colors",
        Dimension::VisualQuality => "Render sharp, high-resolution imagery with balanced contrast",
        Dimension::MessageClarity => "Make the product the focal point and keep the message simple",
        Dimension::SafetyEthics => "Avoid harmful content, stereotypes and unverifiable claims",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptRefiner {
    /// Dimensions scoring below this get an explicit directive.
    pub low_score_threshold: f32,
    pub brand_colors_kept: usize,
}

impl Default for PromptRefiner {
    fn default() -> Self {
        Self {
            low_score_threshold: 0.7,
            brand_colors_kept: 3,
        }
    }
}

impl PromptRefiner {
    pub fn new(low_score_threshold: f32) -> Self {
        Self {
            low_score_threshold,
            ..Self::default()
        }
    }

    /// Build the next prompt from the original one and the critique of the
    /// best variation. The same inputs always give the same prompt.
    pub fn refine(
        &self,
        original: &str,
        best: &CritiqueResult,
        decision: &RefinementDecision,
        bundle: &ReferenceBundle,
    ) -> RefinedPrompt {
        let mut addressed_issues: Vec<String> = Vec::new();
        for issue in decision
            .issues
            .iter()
            .map(String::as_str)
            .chain(best.scorecard.issues().map(|(_, issue)| issue))
        {
            if !addressed_issues.iter().any(|i| i == issue) {
                addressed_issues.push(issue.to_string());
            }
        }

        let low_scores: BTreeMap<Dimension, f32> = best
            .scorecard
            .present_scores()
            .filter(|(_, s)| *s < self.low_score_threshold)
            .collect();

        let mut suggestions: Vec<&str> = Vec::new();
        for outcome in best.scorecard.outcomes() {
            if let Some(score) = outcome.as_scored() {
                for s in &score.suggestions {
                    if !suggestions.contains(&s.as_str()) {
                        suggestions.push(s);
                    }
                }
            }
        }

        let mut notes: Vec<String> = Vec::new();
        notes.extend(addressed_issues.iter().map(|i| format!("- Fix: {i}")));
        notes.extend(
            low_scores
                .iter()
                .map(|(d, s)| format!("- {} ({s:.2}): {}", d.label(), directive(*d))),
        );
        notes.extend(suggestions.iter().map(|s| format!("- {s}")));
        if !bundle.brand_colors.is_empty() {
            let colors: Vec<String> = bundle
                .brand_colors
                .iter()
                .take(self.brand_colors_kept)
                .map(|c| c.to_hex())
                .collect();
            notes.push(format!("- Keep brand colors: {}", colors.join(", ")));
        }

        let prompt = if notes.is_empty() {
            original.trim().to_string()
        } else {
            format!("{}\n\nRefinement notes:\n{}", original.trim(), notes.join("\n"))
        };

        RefinedPrompt {
            prompt,
            addressed_issues,
            low_scores,
            rationale: decision.rationale.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringPolicy;
    use crate::domain::{
        DimensionOutcome, DimensionScore, MediaKind, MediaRef, Rgb, Scorecard, Variation,
    };
    use crate::scorer;

    fn best() -> CritiqueResult {
        let card = Scorecard::from_outcomes(vec![
            DimensionOutcome::Scored(
                DimensionScore::new(Dimension::BrandAlignment, 0.5, "")
                    .with_issues(["Tone mismatch with brand"])
                    .with_suggestions(["Use a warmer tone"]),
            ),
            DimensionOutcome::Scored(DimensionScore::new(Dimension::VisualQuality, 0.9, "")),
            DimensionOutcome::Scored(
                DimensionScore::new(Dimension::MessageClarity, 0.6, "")
                    .with_issues(["Message unclear"]),
            ),
            DimensionOutcome::Scored(DimensionScore::new(Dimension::SafetyEthics, 1.0, "")),
        ])
        .unwrap();
        let v = Variation::new("var_1", MediaRef::new("blob://a"), MediaKind::Image, "p");
        scorer::critique(v, card, &ScoringPolicy::default())
    }

    fn bundle() -> ReferenceBundle {
        ReferenceBundle {
            brand_colors: vec![
                Rgb::new(255, 0, 0),
                Rgb::new(0, 255, 0),
                Rgb::new(0, 0, 255),
                Rgb::new(9, 9, 9),
            ],
            ..ReferenceBundle::default()
        }
    }

    #[test]
    fn test_refined_prompt_lists_issues_and_low_dimensions() {
        let best = best();
        let decision = RefinementDecision::regenerate(
            best.variation.id.clone(),
            "below approve floor",
            vec!["Message unclear".to_string()],
        );
        let refined = PromptRefiner::default().refine("Summer sale  ", &best, &decision, &bundle());

        assert!(refined.prompt.starts_with("Summer sale\n\nRefinement notes:"));
        assert_eq!(
            refined.addressed_issues,
            vec!["Message unclear", "Tone mismatch with brand"]
        );
        assert_eq!(refined.low_scores.len(), 2);
        assert!(refined.low_scores.contains_key(&Dimension::BrandAlignment));
        assert!(refined.prompt.contains("Use a warmer tone"));
        assert!(refined
            .prompt
            .contains("Keep brand colors: #ff0000, #00ff00, #0000ff"));
        assert!(!refined.prompt.contains("#090909"));
        assert_eq!(refined.rationale, "below approve floor");
    }

    #[test]
    fn test_refinement_is_deterministic() {
        let best = best();
        let decision = RefinementDecision::regenerate(best.variation.id.clone(), "r", Vec::new());
        let refiner = PromptRefiner::default();
        let a = refiner.refine("p", &best, &decision, &bundle());
        let b = refiner.refine("p", &best, &decision, &bundle());
        assert_eq!(a, b);
    }

    #[test]
    fn test_clean_result_keeps_prompt() {
        let card = Scorecard::from_scores([
            (Dimension::BrandAlignment, 0.9),
            (Dimension::VisualQuality, 0.9),
            (Dimension::MessageClarity, 0.9),
            (Dimension::SafetyEthics, 1.0),
        ])
        .unwrap();
        let v = Variation::new("var_1", MediaRef::new("blob://a"), MediaKind::Image, "p");
        let best = scorer::critique(v, card, &ScoringPolicy::default());
        let decision = RefinementDecision::regenerate(best.variation.id.clone(), "r", Vec::new());
        let refined =
            PromptRefiner::default().refine("Original", &best, &decision, &ReferenceBundle::default());
        assert_eq!(refined.prompt, "Original");
        assert!(refined.low_scores.is_empty());
    }
}
