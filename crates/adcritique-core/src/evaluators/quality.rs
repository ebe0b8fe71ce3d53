//! Visual quality: sharpness, artifacts/contrast and composition.

use std::sync::Arc;

use async_trait::async_trait;

use super::{combine, ensure_media, Evaluator, Signal};
use crate::analyzers::{ImageInspector, ImageStats};
use crate::config::QualitySettings;
use crate::domain::{
    clamp_unit, Dimension, DimensionScore, EvaluationError, ReferenceContext, Variation,
};

const DIMENSION: Dimension = Dimension::VisualQuality;

pub struct VisualQualityEvaluator {
    inspector: Arc<dyn ImageInspector>,
    settings: QualitySettings,
}

impl VisualQualityEvaluator {
    pub fn new(inspector: Arc<dyn ImageInspector>, settings: QualitySettings) -> Self {
        Self {
            inspector,
            settings,
        }
    }
}

pub(crate) fn sharpness_signal(stats: &ImageStats, settings: &QualitySettings) -> Signal {
    let score = clamp_unit(stats.sharpness / settings.sharpness_threshold);
    if score >= 0.8 {
        Signal::new(score, "Image is sharp")
    } else if score >= 0.5 {
        Signal::new(score, "Minor blur detected")
            .issue("Image is slightly blurry")
            .suggest("Sharpen fine detail")
    } else if score >= 0.3 {
        Signal::new(score, "Moderate blur detected")
            .issue("Image is blurry")
            .suggest("Regenerate or sharpen the image")
    } else {
        Signal::new(score, "Significant blur detected")
            .issue("Image is very blurry")
            .suggest("Regenerate at higher fidelity")
    }
}

/// An inspector that reports NaN or infinite metrics measured nothing.
fn ensure_finite_metrics(stats: &ImageStats) -> Result<(), EvaluationError> {
    for (name, value) in [("sharpness", stats.sharpness), ("contrast", stats.contrast)] {
        if !value.is_finite() {
            return Err(EvaluationError::ContractViolation {
                dimension: DIMENSION,
                detail: format!("inspector reported non-finite {name} ({value})"),
            });
        }
    }
    Ok(())
}

pub(crate) fn artifact_signal(stats: &ImageStats, settings: &QualitySettings) -> Signal {
    if stats.has_artifacts {
        Signal::new(0.3, "Compression or generation artifacts visible")
            .issue("Visual artifacts present")
            .suggest("Denoise the image")
    } else if stats.contrast < settings.low_contrast {
        Signal::new(0.6, "Contrast is low")
            .issue("Low contrast")
            .suggest("Increase contrast")
    } else {
        Signal::new(1.0, "No artifacts, healthy contrast")
    }
}

pub(crate) fn composition_signal(stats: &ImageStats, settings: &QualitySettings) -> Signal {
    let aspect = stats.aspect_ratio();
    if stats.width.min(stats.height) < settings.min_resolution {
        Signal::new(
            0.4,
            format!("Resolution {}x{} is too low", stats.width, stats.height),
        )
        .issue("Resolution too low")
        .suggest(format!(
            "Generate at least {0}x{0} pixels",
            settings.min_resolution
        ))
    } else if (settings.min_aspect_ratio..=settings.max_aspect_ratio).contains(&aspect) {
        Signal::new(0.8, "Composition within standard bounds")
    } else {
        Signal::new(0.6, format!("Unusual aspect ratio {aspect:.2}"))
            .issue("Aspect ratio outside standard ad formats")
            .suggest("Use a standard ad aspect ratio")
    }
}

#[async_trait]
impl Evaluator for VisualQualityEvaluator {
    fn dimension(&self) -> Dimension {
        DIMENSION
    }

    async fn evaluate(
        &self,
        variation: &Variation,
        _context: &ReferenceContext,
    ) -> Result<DimensionScore, EvaluationError> {
        ensure_media(DIMENSION, variation)?;
        let stats = self
            .inspector
            .inspect(&variation.media, variation.kind)
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        ensure_finite_metrics(&stats)?;
        let signals = vec![
            sharpness_signal(&stats, &self.settings),
            artifact_signal(&stats, &self.settings),
            composition_signal(&stats, &self.settings),
        ];
        Ok(combine(DIMENSION, signals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MediaKind, MediaRef};
    use crate::fakes::{sample_stats, FailingAnalyzer, FixedInspector};

    fn settings() -> QualitySettings {
        QualitySettings::default()
    }

    #[test]
    fn test_sharpness_tiers() {
        let mut stats = sample_stats();
        stats.sharpness = 250.0;
        assert_eq!(sharpness_signal(&stats, &settings()).score, 1.0);

        stats.sharpness = 60.0;
        let s = sharpness_signal(&stats, &settings());
        assert!((s.score - 0.6).abs() < 1e-6);
        assert_eq!(s.feedback, "Minor blur detected");

        stats.sharpness = 10.0;
        assert_eq!(
            sharpness_signal(&stats, &settings()).issue.as_deref(),
            Some("Image is very blurry")
        );
    }

    #[test]
    fn test_artifacts_outrank_low_contrast() {
        let mut stats = sample_stats();
        stats.has_artifacts = true;
        stats.contrast = 5.0;
        assert_eq!(artifact_signal(&stats, &settings()).score, 0.3);

        stats.has_artifacts = false;
        assert_eq!(artifact_signal(&stats, &settings()).score, 0.6);

        stats.contrast = 45.0;
        assert_eq!(artifact_signal(&stats, &settings()).score, 1.0);
    }

    #[test]
    fn test_composition_bounds() {
        let mut stats = sample_stats();
        stats.width = 1024;
        stats.height = 1024;
        assert_eq!(composition_signal(&stats, &settings()).score, 0.8);

        stats.width = 3000;
        assert_eq!(composition_signal(&stats, &settings()).score, 0.6);

        stats.height = 300;
        assert_eq!(composition_signal(&stats, &settings()).score, 0.4);
    }

    #[tokio::test]
    async fn test_evaluate_sharp_clean_square() {
        let evaluator =
            VisualQualityEvaluator::new(Arc::new(FixedInspector::new(sample_stats())), settings());
        let v = Variation::new("var_1", MediaRef::new("blob://a"), MediaKind::Image, "p");
        let score = evaluator
            .evaluate(&v, &ReferenceContext::default())
            .await
            .unwrap();
        // 1.0, 1.0, 0.8
        assert!((score.score - 0.9333333).abs() < 1e-5);
        assert!(score.issues.is_empty());
    }

    #[test]
    fn test_nan_sharpness_is_not_sharp() {
        let mut stats = sample_stats();
        stats.sharpness = f32::NAN;
        let s = sharpness_signal(&stats, &settings());
        assert_eq!(s.score, 0.0);
        assert_ne!(s.feedback, "Image is sharp");
    }

    #[tokio::test]
    async fn test_non_finite_metrics_fail_the_dimension() {
        for (sharpness, contrast) in [(f32::NAN, 40.0), (f32::INFINITY, 40.0), (150.0, f32::NAN)] {
            let mut stats = sample_stats();
            stats.sharpness = sharpness;
            stats.contrast = contrast;
            let evaluator =
                VisualQualityEvaluator::new(Arc::new(FixedInspector::new(stats)), settings());
            let v = Variation::new("var_1", MediaRef::new("blob://a"), MediaKind::Image, "p");
            let err = evaluator
                .evaluate(&v, &ReferenceContext::default())
                .await
                .unwrap_err();
            assert!(
                matches!(err, EvaluationError::ContractViolation { dimension: DIMENSION, .. }),
                "{err}"
            );
        }
    }

    #[tokio::test]
    async fn test_unreadable_media_fails_hard() {
        let evaluator = VisualQualityEvaluator::new(
            Arc::new(FailingAnalyzer::unreadable("not an image")),
            settings(),
        );
        let v = Variation::new("var_1", MediaRef::new("blob://a"), MediaKind::Image, "p");
        let err = evaluator
            .evaluate(&v, &ReferenceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::UnreadableMedia { .. }));
    }
}
