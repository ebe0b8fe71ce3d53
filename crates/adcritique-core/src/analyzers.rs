//! Injected media-analysis capabilities.
//!
//! The engine never inspects pixels itself. Similarity matching, image
//! statistics and vision-model analysis arrive through these traits and are
//! consumed as typed values.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{AnalyzerError, Confidence, MediaKind, MediaRef, Rgb};

/// Outcome of matching a reference (logo, product) inside a variation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Similarity in `[0, 1]`.
    pub score: f32,
    /// The analyzer's own verdict on whether the reference is present.
    pub detected: bool,
}

/// Low-level statistics for an image, or a video's first frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Laplacian-variance style sharpness metric; higher is sharper.
    pub sharpness: f32,
    /// Luminance standard deviation.
    pub contrast: f32,
    pub has_artifacts: bool,
    pub width: u32,
    pub height: u32,
    /// Dominant colours, most prominent first.
    #[serde(default)]
    pub dominant_colors: Vec<Rgb>,
}

impl ImageStats {
    /// Width over height; zero for a degenerate frame.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// What the vision analyzer is told about the ad.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionContext {
    pub user_prompt: String,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub brand_colors: Vec<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductVisibility {
    Clear,
    Partial,
    NotVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLegibility {
    NoText,
    Readable,
    MostlyReadable,
    Illegible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageClarity {
    Clear,
    MostlyClear,
    Confusing,
    Inconclusive,
}

/// A confirmed safety concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyFinding {
    pub confidence: Confidence,
    pub description: String,
}

impl SafetyFinding {
    pub fn new(confidence: Confidence, description: impl Into<String>) -> Self {
        Self {
            confidence,
            description: description.into(),
        }
    }
}

/// Structured semantic and safety analysis of one piece of media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionReport {
    /// How well the tone matches the brief; `None` when inconclusive.
    #[serde(default)]
    pub tone_alignment: Option<f32>,
    pub product_visibility: ProductVisibility,
    pub text: TextLegibility,
    pub message: MessageClarity,
    #[serde(default)]
    pub harmful_content: Option<SafetyFinding>,
    #[serde(default)]
    pub stereotypes: Option<SafetyFinding>,
    #[serde(default)]
    pub misleading_claims: Option<SafetyFinding>,
}

impl Default for VisionReport {
    fn default() -> Self {
        Self {
            tone_alignment: None,
            product_visibility: ProductVisibility::Clear,
            text: TextLegibility::NoText,
            message: MessageClarity::Inconclusive,
            harmful_content: None,
            stereotypes: None,
            misleading_claims: None,
        }
    }
}

#[async_trait]
pub trait SimilarityAnalyzer: Send + Sync {
    /// Look for `reference` inside `subject`.
    async fn similarity(
        &self,
        subject: &MediaRef,
        reference: &MediaRef,
    ) -> Result<SimilarityMatch, AnalyzerError>;
}

#[async_trait]
pub trait ImageInspector: Send + Sync {
    async fn inspect(&self, media: &MediaRef, kind: MediaKind)
        -> Result<ImageStats, AnalyzerError>;
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Backend name, used in logs and aggregated errors.
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        media: &MediaRef,
        kind: MediaKind,
        context: &VisionContext,
    ) -> Result<VisionReport, AnalyzerError>;
}

/// Tries vision backends in order and returns the first success.
///
/// Unreadable media stops the chain at once since no other backend will read
/// it either.
pub struct FallbackVisionAnalyzer {
    chain: Vec<Arc<dyn VisionAnalyzer>>,
}

impl FallbackVisionAnalyzer {
    pub fn new(chain: Vec<Arc<dyn VisionAnalyzer>>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl VisionAnalyzer for FallbackVisionAnalyzer {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn analyze(
        &self,
        media: &MediaRef,
        kind: MediaKind,
        context: &VisionContext,
    ) -> Result<VisionReport, AnalyzerError> {
        let mut failures = Vec::with_capacity(self.chain.len());
        for backend in &self.chain {
            match backend.analyze(media, kind, context).await {
                Ok(report) => return Ok(report),
                Err(err @ AnalyzerError::UnreadableMedia { .. }) => return Err(err),
                Err(err) => {
                    warn!(backend = backend.name(), media = %media, error = %err, "vision backend failed, trying next");
                    failures.push(format!("{}: {}", backend.name(), err));
                }
            }
        }
        if failures.is_empty() {
            return Err(AnalyzerError::Unavailable(
                "no vision backends configured".to_string(),
            ));
        }
        Err(AnalyzerError::Unavailable(failures.join("; ")))
    }
}

/// The three capabilities evaluators draw on.
#[derive(Clone)]
pub struct AnalyzerSuite {
    pub similarity: Arc<dyn SimilarityAnalyzer>,
    pub inspector: Arc<dyn ImageInspector>,
    pub vision: Arc<dyn VisionAnalyzer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FailingAnalyzer, FixedVision};

    fn media() -> MediaRef {
        MediaRef::new("blob://ad")
    }

    #[tokio::test]
    async fn test_fallback_returns_first_success() {
        let primary: Arc<dyn VisionAnalyzer> = Arc::new(FailingAnalyzer::unavailable("quota"));
        let secondary: Arc<dyn VisionAnalyzer> = Arc::new(FixedVision::new(VisionReport {
            tone_alignment: Some(0.9),
            ..VisionReport::default()
        }));
        let fallback = FallbackVisionAnalyzer::new(vec![primary, secondary]);

        let report = fallback
            .analyze(&media(), MediaKind::Image, &VisionContext::default())
            .await
            .unwrap();
        assert_eq!(report.tone_alignment, Some(0.9));
    }

    #[tokio::test]
    async fn test_fallback_collects_every_failure() {
        let fallback = FallbackVisionAnalyzer::new(vec![
            Arc::new(FailingAnalyzer::unavailable("quota")),
            Arc::new(FailingAnalyzer::unavailable("timeout")),
        ]);
        let err = fallback
            .analyze(&media(), MediaKind::Image, &VisionContext::default())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("quota"));
        assert!(msg.contains("timeout"));
    }

    #[tokio::test]
    async fn test_fallback_stops_on_unreadable_media() {
        let fallback = FallbackVisionAnalyzer::new(vec![
            Arc::new(FailingAnalyzer::unreadable("corrupt header")),
            Arc::new(FixedVision::new(VisionReport::default())),
        ]);
        let err = fallback
            .analyze(&media(), MediaKind::Image, &VisionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::UnreadableMedia { .. }));
    }

    #[test]
    fn test_aspect_ratio_handles_zero_height() {
        let stats = ImageStats {
            sharpness: 0.0,
            contrast: 0.0,
            has_artifacts: false,
            width: 100,
            height: 0,
            dominant_colors: vec![],
        };
        assert_eq!(stats.aspect_ratio(), 0.0);
    }
}
