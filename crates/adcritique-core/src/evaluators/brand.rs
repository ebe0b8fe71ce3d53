//! Brand alignment: logo presence, palette consistency and tone.

use async_trait::async_trait;

use super::{combine, ensure_media, vision_context, Evaluator, Signal};
use crate::analyzers::AnalyzerSuite;
use crate::config::BrandSettings;
use crate::domain::{
    Dimension, DimensionScore, EvaluationError, MediaKind, ReferenceContext, Rgb, Variation,
};

const DIMENSION: Dimension = Dimension::BrandAlignment;

pub struct BrandAlignmentEvaluator {
    analyzers: AnalyzerSuite,
    settings: BrandSettings,
}

impl BrandAlignmentEvaluator {
    pub fn new(analyzers: AnalyzerSuite, settings: BrandSettings) -> Self {
        Self {
            analyzers,
            settings,
        }
    }

    async fn logo_signal(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> Result<Signal, EvaluationError> {
        let Some(logo) = &context.bundle.logo else {
            return Ok(Signal::new(0.5, "Logo reference not available")
                .suggest("Provide a logo reference to verify brand presence")
                .estimated());
        };
        if variation.kind == MediaKind::Video {
            return Ok(Signal::new(0.7, "Logo check is approximate for video").estimated());
        }

        let found = self
            .analyzers
            .similarity
            .similarity(&variation.media, logo)
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        if found.detected {
            Ok(Signal::new(
                (found.score * 1.2).min(1.0),
                format!("Logo detected (similarity {:.2})", found.score),
            ))
        } else {
            Ok(Signal::new(found.score * 0.5, "Logo not detected")
                .issue("Logo missing or not clearly visible")
                .suggest("Place the brand logo prominently"))
        }
    }

    async fn color_signal(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> Result<Signal, EvaluationError> {
        let palette = &context.bundle.brand_colors;
        if palette.is_empty() {
            return Ok(Signal::new(0.5, "No brand palette to compare against").estimated());
        }

        let stats = self
            .analyzers
            .inspector
            .inspect(&variation.media, variation.kind)
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        let (matched, considered) = color_matches(palette, &stats.dominant_colors, &self.settings);
        let score = matched as f32 / considered as f32;

        let signal = Signal::new(score, format!("{matched} of {considered} brand colors present"));
        if score < 0.5 {
            let hexes: Vec<String> = palette
                .iter()
                .take(considered)
                .map(Rgb::to_hex)
                .collect();
            Ok(signal
                .issue("Brand colors not well represented")
                .suggest(format!("Use the brand palette: {}", hexes.join(", "))))
        } else {
            Ok(signal)
        }
    }

    async fn tone_signal(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> Result<Signal, EvaluationError> {
        let report = self
            .analyzers
            .vision
            .analyze(&variation.media, variation.kind, &vision_context(context))
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        Ok(match report.tone_alignment {
            None => Signal::new(0.7, "Tone assessment inconclusive").estimated(),
            Some(t) if t >= 0.7 => Signal::new(t, "Tone matches the brand"),
            Some(t) if t >= 0.5 => Signal::new(t, "Tone partly matches the brand"),
            Some(t) => Signal::new(t, "Tone diverges from the brand")
                .issue("Tone mismatch with brand")
                .suggest("Align mood and styling with the brand voice"),
        })
    }
}

/// How many of the leading palette colours appear among the leading ad
/// colours, and how many palette colours were considered.
pub fn color_matches(palette: &[Rgb], ad_colors: &[Rgb], settings: &BrandSettings) -> (usize, usize) {
    let considered: Vec<&Rgb> = palette.iter().take(settings.palette_colors_considered).collect();
    let ad: Vec<&Rgb> = ad_colors.iter().take(settings.ad_colors_considered).collect();
    let matched = considered
        .iter()
        .filter(|p| ad.iter().any(|a| p.distance(a) < settings.color_tolerance))
        .count();
    (matched, considered.len().max(1))
}

#[async_trait]
impl Evaluator for BrandAlignmentEvaluator {
    fn dimension(&self) -> Dimension {
        DIMENSION
    }

    async fn evaluate(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> Result<DimensionScore, EvaluationError> {
        ensure_media(DIMENSION, variation)?;
        let signals = vec![
            self.logo_signal(variation, context).await?,
            self.color_signal(variation, context).await?,
            self.tone_signal(variation, context).await?,
        ];
        Ok(combine(DIMENSION, signals))
    }
}
