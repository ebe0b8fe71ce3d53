//! Engine configuration.
//!
//! Loaded from TOML. Every section and field is optional; omitted values take
//! the defaults below.
//!
//! # Sections
//!
//! - **scoring**: dimension weights and pass thresholds
//! - **refinement**: reject/approve floors and the enhancement budget
//! - **workflow**: regeneration budget and registry TTL
//! - **coordinator**: evaluator fan-out width
//! - **quality**: visual quality evaluator thresholds
//! - **brand**: brand alignment evaluator colour matching

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{AdCritiqueError, Dimension, Result};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringPolicy,
    pub refinement: RefinementPolicy,
    pub workflow: WorkflowConfig,
    pub coordinator: CoordinatorConfig,
    pub quality: QualitySettings,
    pub brand: BrandSettings,
}

/// Per-dimension weights for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeights {
    #[serde(default = "default_weight")]
    pub brand_alignment: f32,
    #[serde(default = "default_weight")]
    pub visual_quality: f32,
    #[serde(default = "default_weight")]
    pub message_clarity: f32,
    #[serde(default = "default_weight")]
    pub safety_ethics: f32,
}

impl DimensionWeights {
    pub fn weight(&self, dimension: Dimension) -> f32 {
        match dimension {
            Dimension::BrandAlignment => self.brand_alignment,
            Dimension::VisualQuality => self.visual_quality,
            Dimension::MessageClarity => self.message_clarity,
            Dimension::SafetyEthics => self.safety_ethics,
        }
    }

    pub fn total(&self) -> f32 {
        Dimension::ALL.iter().map(|d| self.weight(*d)).sum()
    }
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            brand_alignment: default_weight(),
            visual_quality: default_weight(),
            message_clarity: default_weight(),
            safety_ethics: default_weight(),
        }
    }
}

/// Pass/fail policy applied by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    #[serde(default)]
    pub weights: DimensionWeights,

    /// Minimum overall score for a pass.
    #[serde(default = "default_overall_threshold")]
    pub overall_threshold: f32,

    /// Minimum score every present dimension must reach for a pass.
    #[serde(default = "default_per_dimension_threshold")]
    pub per_dimension_threshold: f32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: DimensionWeights::default(),
            overall_threshold: default_overall_threshold(),
            per_dimension_threshold: default_per_dimension_threshold(),
        }
    }
}

/// Thresholds used by the refinement decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinementPolicy {
    /// Below this overall score a result is rejected without refinement.
    #[serde(default = "default_reject_floor")]
    pub reject_floor: f32,

    /// At or above this overall score a clean result is approved.
    #[serde(default = "default_approve_floor")]
    pub approve_floor: f32,

    /// Enhance rounds allowed per run.
    #[serde(default = "default_max_enhancements")]
    pub max_enhancements: u32,
}

impl Default for RefinementPolicy {
    fn default() -> Self {
        Self {
            reject_floor: default_reject_floor(),
            approve_floor: default_approve_floor(),
            max_enhancements: default_max_enhancements(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Regenerate transitions allowed per run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds a finished run stays in the registry before eviction.
    #[serde(default = "default_registry_ttl_secs")]
    pub registry_ttl_secs: u64,
}

impl WorkflowConfig {
    pub fn registry_ttl(&self) -> Duration {
        Duration::from_secs(self.registry_ttl_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            registry_ttl_secs: default_registry_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Evaluator calls in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Visual quality evaluator thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Sharpness metric at which an image counts as fully sharp.
    #[serde(default = "default_sharpness_threshold")]
    pub sharpness_threshold: f32,

    /// Minimum width and height in pixels.
    #[serde(default = "default_min_resolution")]
    pub min_resolution: u32,

    #[serde(default = "default_min_aspect_ratio")]
    pub min_aspect_ratio: f32,

    #[serde(default = "default_max_aspect_ratio")]
    pub max_aspect_ratio: f32,

    /// Contrast (luminance std-dev) below which an image reads as flat.
    #[serde(default = "default_low_contrast")]
    pub low_contrast: f32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            sharpness_threshold: default_sharpness_threshold(),
            min_resolution: default_min_resolution(),
            min_aspect_ratio: default_min_aspect_ratio(),
            max_aspect_ratio: default_max_aspect_ratio(),
            low_contrast: default_low_contrast(),
        }
    }
}

/// Brand alignment colour matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrandSettings {
    /// Euclidean RGB distance within which two colours match.
    #[serde(default = "default_color_tolerance")]
    pub color_tolerance: f32,

    /// Leading palette colours that must be found in the ad.
    #[serde(default = "default_palette_colors_considered")]
    pub palette_colors_considered: usize,

    /// Leading ad colours searched for palette matches.
    #[serde(default = "default_ad_colors_considered")]
    pub ad_colors_considered: usize,
}

impl Default for BrandSettings {
    fn default() -> Self {
        Self {
            color_tolerance: default_color_tolerance(),
            palette_colors_considered: default_palette_colors_considered(),
            ad_colors_considered: default_ad_colors_considered(),
        }
    }
}

// Default value functions
fn default_weight() -> f32 {
    0.25
}
fn default_overall_threshold() -> f32 {
    0.6
}
fn default_per_dimension_threshold() -> f32 {
    0.4
}
fn default_reject_floor() -> f32 {
    0.6
}
fn default_approve_floor() -> f32 {
    0.8
}
fn default_max_enhancements() -> u32 {
    2
}
fn default_max_attempts() -> u32 {
    3
}
fn default_registry_ttl_secs() -> u64 {
    3600
}
fn default_max_concurrent() -> usize {
    4
}
fn default_sharpness_threshold() -> f32 {
    100.0
}
fn default_min_resolution() -> u32 {
    512
}
fn default_min_aspect_ratio() -> f32 {
    0.5
}
fn default_max_aspect_ratio() -> f32 {
    2.0
}
fn default_low_contrast() -> f32 {
    20.0
}
fn default_color_tolerance() -> f32 {
    30.0
}
fn default_palette_colors_considered() -> usize {
    3
}
fn default_ad_colors_considered() -> usize {
    5
}

fn unit_interval(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AdCritiqueError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Load from `path` when given, else use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AdCritiqueError::InvalidConfig(format!("cannot render config: {e}")))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let weights = &self.scoring.weights;
        for dimension in Dimension::ALL {
            let w = weights.weight(dimension);
            if !w.is_finite() || w < 0.0 {
                return Err(AdCritiqueError::InvalidConfig(format!(
                    "weight for {dimension} must be finite and non-negative, got {w}"
                )));
            }
        }
        if weights.total() <= 0.0 {
            return Err(AdCritiqueError::InvalidConfig(
                "dimension weights must not all be zero".to_string(),
            ));
        }

        unit_interval("scoring.overall_threshold", self.scoring.overall_threshold)?;
        unit_interval(
            "scoring.per_dimension_threshold",
            self.scoring.per_dimension_threshold,
        )?;
        unit_interval("refinement.reject_floor", self.refinement.reject_floor)?;
        unit_interval("refinement.approve_floor", self.refinement.approve_floor)?;
        if self.refinement.approve_floor < self.refinement.reject_floor {
            return Err(AdCritiqueError::InvalidConfig(format!(
                "refinement.approve_floor ({}) is below reject_floor ({})",
                self.refinement.approve_floor, self.refinement.reject_floor
            )));
        }

        if self.coordinator.max_concurrent == 0 {
            return Err(AdCritiqueError::InvalidConfig(
                "coordinator.max_concurrent must be at least 1".to_string(),
            ));
        }

        let q = &self.quality;
        if !(q.sharpness_threshold.is_finite() && q.sharpness_threshold > 0.0) {
            return Err(AdCritiqueError::InvalidConfig(
                "quality.sharpness_threshold must be positive".to_string(),
            ));
        }
        if !(q.min_aspect_ratio > 0.0 && q.min_aspect_ratio <= q.max_aspect_ratio) {
            return Err(AdCritiqueError::InvalidConfig(format!(
                "quality aspect bounds are inverted: [{}, {}]",
                q.min_aspect_ratio, q.max_aspect_ratio
            )));
        }

        if !(self.brand.color_tolerance.is_finite() && self.brand.color_tolerance >= 0.0) {
            return Err(AdCritiqueError::InvalidConfig(
                "brand.color_tolerance must be non-negative".to_string(),
            ));
        }
        if self.brand.palette_colors_considered == 0 || self.brand.ad_colors_considered == 0 {
            return Err(AdCritiqueError::InvalidConfig(
                "brand colour counts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.scoring.weights.weight(Dimension::SafetyEthics), 0.25);
        assert_eq!(config.scoring.overall_threshold, 0.6);
        assert_eq!(config.scoring.per_dimension_threshold, 0.4);
        assert_eq!(config.refinement.reject_floor, 0.6);
        assert_eq!(config.refinement.approve_floor, 0.8);
        assert_eq!(config.refinement.max_enhancements, 2);
        assert_eq!(config.workflow.max_attempts, 3);
        assert_eq!(config.workflow.registry_ttl(), Duration::from_secs(3600));
        assert_eq!(config.coordinator.max_concurrent, 4);
        assert_eq!(config.quality.min_resolution, 512);
        assert_eq!(config.brand.color_tolerance, 30.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [scoring.weights]
            safety_ethics = 0.4

            [refinement]
            reject_floor = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.scoring.weights.safety_ethics, 0.4);
        assert_eq!(config.scoring.weights.brand_alignment, 0.25);
        assert_eq!(config.refinement.reject_floor, 0.5);
        assert_eq!(config.refinement.approve_floor, 0.8);
    }

    #[test]
    fn test_validate_rejects_inverted_floors() {
        let err = EngineConfig::from_toml_str(
            r#"
            [refinement]
            reject_floor = 0.9
            approve_floor = 0.7
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("approve_floor"));
    }

    #[test]
    fn test_validate_rejects_zero_weights() {
        let mut config = EngineConfig::default();
        config.scoring.weights = DimensionWeights {
            brand_alignment: 0.0,
            visual_quality: 0.0,
            message_clarity: 0.0,
            safety_ethics: 0.0,
        };
        assert!(config.validate().is_err());

        config.scoring.weights.brand_alignment = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = EngineConfig::default();
        config.coordinator.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("[scoring]"));
        assert_eq!(EngineConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "[workflow]\nmax_attempts = 5\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.workflow.max_attempts, 5);
    }
}
