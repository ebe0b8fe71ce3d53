//! Critique results and the per-attempt report.

use adcritique_state::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::score::{Dimension, Scorecard};
use super::variation::{Variation, VariationId};

/// Version tag written into every persisted report body.
pub const REPORT_SCHEMA_VERSION: &str = "1";

/// One variation with its scorecard and the aggregate derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueResult {
    pub variation: Variation,
    pub scorecard: Scorecard,
    /// Weighted mean over the dimensions that produced a value.
    pub overall_score: f32,
    pub passed: bool,
    /// Safety scored 0.0 and forced the verdict to fail.
    pub safety_override: bool,
    /// Aggregated over fewer than four dimensions.
    pub low_confidence: bool,
    /// 1-based position after ranking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl CritiqueResult {
    pub fn id(&self) -> &VariationId {
        &self.variation.id
    }

    pub fn dimension_score(&self, dimension: Dimension) -> Option<f32> {
        self.scorecard.score(dimension)
    }
}

/// Full outcome of one critique attempt. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueReport {
    pub schema_version: String,
    pub run_id: RunId,
    /// 1-based critique attempt within the run.
    pub attempt: u32,
    pub total_variations: usize,
    pub passed_variations: usize,
    pub failed_variations: usize,
    pub best_variation: Option<VariationId>,
    /// Ranked, best first.
    pub results: Vec<CritiqueResult>,
    pub generated_at: DateTime<Utc>,
}

impl CritiqueReport {
    /// Build a report from results that are already ranked.
    pub fn from_ranked(run_id: RunId, attempt: u32, results: Vec<CritiqueResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id,
            attempt,
            total_variations: results.len(),
            passed_variations: passed,
            failed_variations: results.len() - passed,
            best_variation: results.first().map(|r| r.variation.id.clone()),
            results,
            generated_at: Utc::now(),
        }
    }

    pub fn best(&self) -> Option<&CritiqueResult> {
        self.results.first()
    }

    pub fn result(&self, id: &VariationId) -> Option<&CritiqueResult> {
        self.results.iter().find(|r| &r.variation.id == id)
    }
}
