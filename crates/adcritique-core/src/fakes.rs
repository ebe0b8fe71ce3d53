//! Deterministic fakes for analyzers, evaluators and stage collaborators
//! (testing only).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::analyzers::{
    AnalyzerSuite, ImageInspector, ImageStats, SimilarityAnalyzer, SimilarityMatch,
    VisionAnalyzer, VisionContext, VisionReport,
};
use crate::domain::{
    AnalyzerError, Dimension, DimensionScore, EnhancementPlan, EvaluationError, MediaKind,
    MediaRef, ReferenceBundle, ReferenceContext, Rgb, StageError, Variation, VariationId,
};
use crate::evaluators::{Evaluator, EvaluatorSet};
use crate::workflow::{
    BrandKitProvider, GenerationRequest, MediaEnhancer, RunRequest, VariationGenerator,
};

// ---------------------------------------------------------------------------
// Analyzers
// ---------------------------------------------------------------------------

/// Sharp, clean, square 1024px frame with a red/white palette.
pub fn sample_stats() -> ImageStats {
    ImageStats {
        sharpness: 150.0,
        contrast: 45.0,
        has_artifacts: false,
        width: 1024,
        height: 1024,
        dominant_colors: vec![Rgb::new(220, 30, 30), Rgb::new(250, 250, 250)],
    }
}

pub struct FixedSimilarity(SimilarityMatch);

impl FixedSimilarity {
    pub fn new(found: SimilarityMatch) -> Self {
        Self(found)
    }
}

#[async_trait]
impl SimilarityAnalyzer for FixedSimilarity {
    async fn similarity(
        &self,
        _subject: &MediaRef,
        _reference: &MediaRef,
    ) -> Result<SimilarityMatch, AnalyzerError> {
        Ok(self.0)
    }
}

pub struct FixedInspector(ImageStats);

impl FixedInspector {
    pub fn new(stats: ImageStats) -> Self {
        Self(stats)
    }
}

#[async_trait]
impl ImageInspector for FixedInspector {
    async fn inspect(
        &self,
        _media: &MediaRef,
        _kind: MediaKind,
    ) -> Result<ImageStats, AnalyzerError> {
        Ok(self.0.clone())
    }
}

pub struct FixedVision(VisionReport);

impl FixedVision {
    pub fn new(report: VisionReport) -> Self {
        Self(report)
    }
}

#[async_trait]
impl VisionAnalyzer for FixedVision {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn analyze(
        &self,
        _media: &MediaRef,
        _kind: MediaKind,
        _context: &VisionContext,
    ) -> Result<VisionReport, AnalyzerError> {
        Ok(self.0.clone())
    }
}

/// Every capability call fails with the configured error.
pub struct FailingAnalyzer(AnalyzerError);

impl FailingAnalyzer {
    pub fn unavailable(reason: &str) -> Self {
        Self(AnalyzerError::Unavailable(reason.to_string()))
    }

    pub fn unreadable(reason: &str) -> Self {
        Self(AnalyzerError::UnreadableMedia {
            media: "fake".to_string(),
            reason: reason.to_string(),
        })
    }
}

#[async_trait]
impl SimilarityAnalyzer for FailingAnalyzer {
    async fn similarity(
        &self,
        _subject: &MediaRef,
        _reference: &MediaRef,
    ) -> Result<SimilarityMatch, AnalyzerError> {
        Err(self.0.clone())
    }
}

#[async_trait]
impl ImageInspector for FailingAnalyzer {
    async fn inspect(
        &self,
        _media: &MediaRef,
        _kind: MediaKind,
    ) -> Result<ImageStats, AnalyzerError> {
        Err(self.0.clone())
    }
}

#[async_trait]
impl VisionAnalyzer for FailingAnalyzer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn analyze(
        &self,
        _media: &MediaRef,
        _kind: MediaKind,
        _context: &VisionContext,
    ) -> Result<VisionReport, AnalyzerError> {
        Err(self.0.clone())
    }
}

/// A suite of fixed analyzers.
pub fn analyzer_suite(
    found: SimilarityMatch,
    stats: ImageStats,
    report: VisionReport,
) -> AnalyzerSuite {
    AnalyzerSuite {
        similarity: Arc::new(FixedSimilarity::new(found)),
        inspector: Arc::new(FixedInspector::new(stats)),
        vision: Arc::new(FixedVision::new(report)),
    }
}

// ---------------------------------------------------------------------------
// Evaluators
// ---------------------------------------------------------------------------

type Script =
    dyn Fn(&Variation) -> Result<DimensionScore, EvaluationError> + Send + Sync + 'static;

/// Evaluator whose output is computed by a closure over the variation.
pub struct ScriptedEvaluator {
    dimension: Dimension,
    script: Box<Script>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    pub fn new<F>(dimension: Dimension, script: F) -> Self
    where
        F: Fn(&Variation) -> Result<DimensionScore, EvaluationError> + Send + Sync + 'static,
    {
        Self {
            dimension,
            script: Box::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Same score for every variation.
    pub fn fixed(dimension: Dimension, score: f32) -> Self {
        Self::new(dimension, move |_| {
            Ok(DimensionScore::new(dimension, score, "scripted"))
        })
    }

    /// Fixed score carrying the given issue tags.
    pub fn with_issues(dimension: Dimension, score: f32, issues: &[&str]) -> Self {
        let issues: Vec<String> = issues.iter().map(|s| s.to_string()).collect();
        Self::new(dimension, move |_| {
            Ok(DimensionScore::new(dimension, score, "scripted").with_issues(issues.clone()))
        })
    }

    /// Always fails with an analyzer outage.
    pub fn failing(dimension: Dimension, reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(dimension, move |_| {
            Err(EvaluationError::Analyzer {
                dimension,
                source: AnalyzerError::Unavailable(reason.clone()),
            })
        })
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    fn dimension(&self) -> Dimension {
        self.dimension
    }

    async fn evaluate(
        &self,
        variation: &Variation,
        _context: &ReferenceContext,
    ) -> Result<DimensionScore, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(variation)
    }
}

/// Evaluator set built from four scripted evaluators in dimension order.
pub fn scripted_set(evaluators: [ScriptedEvaluator; 4]) -> crate::domain::Result<EvaluatorSet> {
    let [brand, quality, clarity, safety] = evaluators;
    EvaluatorSet::new(
        Arc::new(brand),
        Arc::new(quality),
        Arc::new(clarity),
        Arc::new(safety),
    )
}

/// Evaluator set giving every variation the same four scores.
pub fn fixed_set(brand: f32, quality: f32, clarity: f32, safety: f32) -> crate::domain::Result<EvaluatorSet> {
    scripted_set([
        ScriptedEvaluator::fixed(Dimension::BrandAlignment, brand),
        ScriptedEvaluator::fixed(Dimension::VisualQuality, quality),
        ScriptedEvaluator::fixed(Dimension::MessageClarity, clarity),
        ScriptedEvaluator::fixed(Dimension::SafetyEthics, safety),
    ])
}

// ---------------------------------------------------------------------------
// Stage collaborators
// ---------------------------------------------------------------------------

/// Returns the same reference bundle for every run, or a fixed failure.
pub struct StaticBrandKit {
    outcome: Result<ReferenceBundle, StageError>,
}

impl StaticBrandKit {
    pub fn new(bundle: ReferenceBundle) -> Self {
        Self {
            outcome: Ok(bundle),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(StageError::BrandKit(reason.to_string())),
        }
    }
}

#[async_trait]
impl BrandKitProvider for StaticBrandKit {
    async fn extract(&self, _request: &RunRequest) -> Result<ReferenceBundle, StageError> {
        self.outcome.clone()
    }
}

/// Produces `per_call` image variations per call and records every request.
///
/// Ids are `g<call>-var_<n>`, so each generation round is distinguishable.
pub struct ScriptedGenerator {
    per_call: usize,
    kind: MediaKind,
    fail_on_call: Option<usize>,
    reuse_ids: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(per_call: usize) -> Self {
        Self {
            per_call,
            kind: MediaKind::Image,
            fail_on_call: None,
            reuse_ids: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Fail the `call`-th invocation (1-based).
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Give every variation of a batch the same id.
    pub fn reusing_ids(mut self) -> Self {
        self.reuse_ids = true;
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VariationGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Variation>, StageError> {
        let call = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| StageError::Generation("generator lock poisoned".to_string()))?;
            requests.push(request.clone());
            requests.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(StageError::Generation(format!("scripted failure on call {call}")));
        }
        Ok((0..self.per_call)
            .map(|i| {
                let n = if self.reuse_ids { 0 } else { i };
                let id = VariationId(format!("g{call}-{}", VariationId::positional(n)));
                let media = MediaRef(format!("blob://{id}"));
                Variation::new(id, media, self.kind, request.prompt.clone())
            })
            .collect())
    }
}

/// Appends `+enhanced` to the media handle and records each plan.
#[derive(Default)]
pub struct RecordingEnhancer {
    fail_with: Option<String>,
    plans: Mutex<Vec<(VariationId, EnhancementPlan)>>,
}

impl RecordingEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            plans: Mutex::new(Vec::new()),
        }
    }

    pub fn plans(&self) -> Vec<(VariationId, EnhancementPlan)> {
        self.plans.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaEnhancer for RecordingEnhancer {
    async fn enhance(
        &self,
        variation: &Variation,
        plan: &EnhancementPlan,
    ) -> Result<MediaRef, StageError> {
        if let Some(reason) = &self.fail_with {
            return Err(StageError::Enhancement(reason.clone()));
        }
        if let Ok(mut plans) = self.plans.lock() {
            plans.push((variation.id.clone(), *plan));
        }
        Ok(MediaRef(format!("{}+enhanced", variation.media)))
    }
}
