//! External collaborators the workflow calls between stages.

use adcritique_state::RunId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{EnhancementPlan, MediaKind, MediaRef, ReferenceBundle, StageError, Variation};
use crate::refinement::RefinedPrompt;

/// What a caller asks the workflow to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub run_id: RunId,
    pub prompt: String,
    pub media_kind: MediaKind,
    #[serde(default)]
    pub brand_website: Option<String>,
    #[serde(default)]
    pub logo: Option<MediaRef>,
    #[serde(default)]
    pub product: Option<MediaRef>,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>, media_kind: MediaKind) -> Self {
        Self {
            run_id: RunId::new(),
            prompt: prompt.into(),
            media_kind,
            brand_website: None,
            logo: None,
            product: None,
        }
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_logo(mut self, logo: MediaRef) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_product(mut self, product: MediaRef) -> Self {
        self.product = Some(product);
        self
    }

    pub fn with_brand_website(mut self, url: impl Into<String>) -> Self {
        self.brand_website = Some(url.into());
        self
    }
}

/// One call to the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub run_id: RunId,
    /// 1 for the first generation, incremented on every regeneration.
    pub attempt: u32,
    /// Prompt to generate from; the refined prompt when regenerating.
    pub prompt: String,
    pub media_kind: MediaKind,
    pub references: ReferenceBundle,
    /// Why this is a regeneration, absent on the first attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinedPrompt>,
}

/// Extracts brand colors and reference media for a run.
#[async_trait]
pub trait BrandKitProvider: Send + Sync {
    async fn extract(&self, request: &RunRequest) -> Result<ReferenceBundle, StageError>;
}

/// Produces ad variations.
#[async_trait]
pub trait VariationGenerator: Send + Sync {
    /// Ordered variations; an empty list ends the run.
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Variation>, StageError>;
}

/// Applies in-place corrections to an image.
#[async_trait]
pub trait MediaEnhancer: Send + Sync {
    /// Returns the handle of the corrected media.
    async fn enhance(
        &self,
        variation: &Variation,
        plan: &EnhancementPlan,
    ) -> Result<MediaRef, StageError>;
}
