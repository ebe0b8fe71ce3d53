//! Drives one run through the workflow machine.
//!
//! The runner owns no run state between calls: each run gets its own working
//! context, and the registry is the only structure shared between runs. The
//! registry is written before and after every stage, never while a
//! collaborator call is in flight. Cancellation is checked at each stage
//! boundary and after each variation's fan-out; results of an interrupted
//! critique are discarded.

use std::sync::Arc;
use std::time::Instant;

use adcritique_state::{ReportStore, RunId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use super::machine::{transition, WorkflowEvent};
use super::registry::RunRegistry;
use super::stages::{
    BrandKitProvider, GenerationRequest, MediaEnhancer, RunRequest, VariationGenerator,
};
use crate::config::EngineConfig;
use crate::coordinator::EvaluationCoordinator;
use crate::domain::{
    self, CritiqueReport, CritiqueResult, ReferenceBundle, ReferenceContext, RefinementDecision,
    RejectReason, Result, StageError, TerminalOutcome, Variation, WorkflowStage, WorkflowState,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::ranker;
use crate::refinement::{self, DecisionInput, PromptRefiner, RefinedPrompt};
use crate::reporting;
use crate::scorer;

/// External services a run calls between stages.
#[derive(Clone)]
pub struct Collaborators {
    pub brand_kit: Arc<dyn BrandKitProvider>,
    pub generator: Arc<dyn VariationGenerator>,
    pub enhancer: Arc<dyn MediaEnhancer>,
}

/// Working data of one run. Never shared with another run.
struct RunContext {
    request: RunRequest,
    bundle: ReferenceBundle,
    reference: Arc<ReferenceContext>,
    /// Ranked results of the latest critique, minus anything being replaced.
    results: Vec<CritiqueResult>,
    /// Variations the next critique must evaluate.
    pending: Vec<Variation>,
    refinement: Option<RefinedPrompt>,
    cancelled: watch::Receiver<bool>,
}

impl RunContext {
    fn new(request: RunRequest, cancelled: watch::Receiver<bool>) -> Self {
        let reference = Arc::new(ReferenceContext::new(
            ReferenceBundle::default(),
            request.prompt.clone(),
        ));
        Self {
            request,
            bundle: ReferenceBundle::default(),
            reference,
            results: Vec::new(),
            pending: Vec::new(),
            refinement: None,
            cancelled,
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

pub struct WorkflowRunner {
    collaborators: Collaborators,
    coordinator: Arc<EvaluationCoordinator>,
    store: Arc<dyn ReportStore>,
    registry: Arc<RunRegistry>,
    config: EngineConfig,
    refiner: PromptRefiner,
}

impl WorkflowRunner {
    pub fn new(
        collaborators: Collaborators,
        coordinator: Arc<EvaluationCoordinator>,
        store: Arc<dyn ReportStore>,
        registry: Arc<RunRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            collaborators,
            coordinator,
            store,
            registry,
            config,
            refiner: PromptRefiner::default(),
        }
    }

    pub fn with_refiner(mut self, refiner: PromptRefiner) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// Run to completion. Every run ends Approved or Rejected.
    ///
    /// # Errors
    ///
    /// Only registry misuse (a duplicate run id, or a run evicted while
    /// still executing) is an error; collaborator failures end the run as
    /// Rejected instead.
    pub async fn run(&self, request: RunRequest) -> Result<WorkflowState> {
        let (state, cancelled) = self.register(&request).await?;
        let span = obs::run_span(request.run_id.as_str());
        self.drive(state, RunContext::new(request, cancelled))
            .instrument(span)
            .await
    }

    /// Register the run, then execute it on its own task.
    ///
    /// The run is visible in the registry, and cancellable, as soon as this
    /// returns.
    pub async fn start(
        self: &Arc<Self>,
        request: RunRequest,
    ) -> Result<(RunId, JoinHandle<Result<WorkflowState>>)> {
        let (state, cancelled) = self.register(&request).await?;
        let run_id = request.run_id.clone();
        let span = obs::run_span(run_id.as_str());
        let runner = Arc::clone(self);
        let handle = tokio::spawn(
            async move {
                runner
                    .drive(state, RunContext::new(request, cancelled))
                    .await
            }
            .instrument(span),
        );
        Ok((run_id, handle))
    }

    async fn register(
        &self,
        request: &RunRequest,
    ) -> Result<(WorkflowState, watch::Receiver<bool>)> {
        let state = WorkflowState::new(
            request.run_id.clone(),
            self.config.workflow.max_attempts,
            self.config.refinement.max_enhancements,
        );
        let cancelled = self.registry.register(state.clone()).await?;
        Ok((state, cancelled))
    }

    async fn drive(&self, mut state: WorkflowState, mut ctx: RunContext) -> Result<WorkflowState> {
        let started = Instant::now();
        let run_id = state.run_id.clone();
        obs::emit_run_started(run_id.as_str(), state.max_attempts);
        obs::emit_stage_entered(run_id.as_str(), state.stage, state.retry_count);

        while !state.is_terminal() {
            let event = if ctx.is_cancelled() {
                WorkflowEvent::Cancelled
            } else {
                match state.stage {
                    WorkflowStage::BrandKit => self.extract_brand_kit(&mut ctx).await,
                    WorkflowStage::Generation => self.generate(&state, &mut ctx).await,
                    WorkflowStage::Critique => self.critique(&state, &mut ctx).await,
                    WorkflowStage::RefinementDecisionPoint => self.decide(&state),
                    WorkflowStage::Enhance => self.enhance(&state, &mut ctx).await,
                    WorkflowStage::Regenerate => self.prepare_regeneration(&state, &mut ctx),
                    WorkflowStage::Approved | WorkflowStage::Rejected => break,
                }
            };
            state = self.advance(&state, event).await?;
        }

        self.finish(&state, started);
        Ok(state)
    }

    async fn advance(&self, state: &WorkflowState, event: WorkflowEvent) -> Result<WorkflowState> {
        debug!(stage = %state.stage, event = event.name(), "applying workflow event");
        let next = transition(state, event)?;
        self.registry.update(&next).await?;
        obs::emit_stage_entered(next.run_id.as_str(), next.stage, next.retry_count);
        Ok(next)
    }

    fn finish(&self, state: &WorkflowState, started: Instant) {
        let outcome = state.outcome.unwrap_or(TerminalOutcome::Rejected);
        match outcome {
            TerminalOutcome::Approved => METRICS.inc_runs_approved(),
            TerminalOutcome::Rejected | TerminalOutcome::Exhausted => METRICS.inc_runs_rejected(),
        }
        obs::emit_run_finished(
            state.run_id.as_str(),
            outcome,
            state.retry_count,
            started.elapsed().as_millis() as u64,
        );
        METRICS.flush();
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    async fn extract_brand_kit(&self, ctx: &mut RunContext) -> WorkflowEvent {
        match self.collaborators.brand_kit.extract(&ctx.request).await {
            Ok(bundle) => {
                ctx.reference = Arc::new(ReferenceContext::new(
                    bundle.clone(),
                    ctx.request.prompt.clone(),
                ));
                ctx.bundle = bundle;
                WorkflowEvent::BrandKitReady
            }
            Err(err) => WorkflowEvent::StageFailed(err),
        }
    }

    async fn generate(&self, state: &WorkflowState, ctx: &mut RunContext) -> WorkflowEvent {
        let prompt = ctx
            .refinement
            .as_ref()
            .map(|r| r.prompt.clone())
            .unwrap_or_else(|| ctx.request.prompt.clone());
        let request = GenerationRequest {
            run_id: state.run_id.clone(),
            attempt: state.retry_count + 1,
            prompt,
            media_kind: ctx.request.media_kind,
            references: ctx.bundle.clone(),
            refinement: ctx.refinement.clone(),
        };
        match self.collaborators.generator.generate(&request).await {
            Ok(variations) => {
                if let Some(id) = domain::first_duplicate_id(variations.iter().map(|v| &v.id)) {
                    return WorkflowEvent::StageFailed(StageError::Generation(format!(
                        "duplicate variation id {id} in generation batch"
                    )));
                }
                let count = variations.len();
                ctx.results.clear();
                ctx.pending = variations;
                WorkflowEvent::VariationsGenerated { count }
            }
            Err(err) => WorkflowEvent::StageFailed(err),
        }
    }

    async fn critique(&self, state: &WorkflowState, ctx: &mut RunContext) -> WorkflowEvent {
        let pending = std::mem::take(&mut ctx.pending);
        let mut results = std::mem::take(&mut ctx.results);
        for variation in pending {
            let scorecard = self
                .coordinator
                .evaluate_variation(&variation, &ctx.reference)
                .await;
            if ctx.is_cancelled() {
                return WorkflowEvent::Cancelled;
            }
            results.push(scorer::critique(variation, scorecard, &self.config.scoring));
        }

        let attempt = state.critique_attempts + 1;
        let report = CritiqueReport::from_ranked(state.run_id.clone(), attempt, ranker::rank(results));
        if let Err(err) = reporting::persist_report(self.store.as_ref(), &report).await {
            return WorkflowEvent::StageFailed(StageError::Persistence(err.to_string()));
        }
        obs::emit_critique_completed(
            state.run_id.as_str(),
            attempt,
            report.total_variations,
            report.passed_variations,
            report.best().map(|b| b.overall_score),
        );
        ctx.results = report.results.clone();
        WorkflowEvent::CritiqueCompleted(Box::new(report))
    }

    fn decide(&self, state: &WorkflowState) -> WorkflowEvent {
        let best = state.last_report.as_ref().and_then(CritiqueReport::best);
        let decision = match best {
            Some(best) => refinement::decide(
                best,
                DecisionInput {
                    attempt_count: state.retry_count,
                    max_attempts: state.max_attempts,
                    enhancements_used: state.enhancement_count,
                },
                &self.config.refinement,
            ),
            None => RefinementDecision::reject(
                None,
                RejectReason::BelowRejectFloor,
                "no variations were critiqued",
            ),
        };
        obs::emit_refinement_decided(state.run_id.as_str(), decision.action, &decision.rationale);
        WorkflowEvent::Decided(decision)
    }

    async fn enhance(&self, state: &WorkflowState, ctx: &mut RunContext) -> WorkflowEvent {
        let Some(decision) = state.last_decision.as_ref() else {
            return stage_failed("no enhancement decision recorded");
        };
        let (Some(target), Some(plan)) = (decision.target.as_ref(), decision.enhancement) else {
            return stage_failed("enhancement decision has no target or plan");
        };
        let Some(position) = ctx.results.iter().position(|r| &r.variation.id == target) else {
            return stage_failed(&format!("variation {target} is not in the last critique"));
        };

        let original = ctx.results[position].variation.clone();
        match self.collaborators.enhancer.enhance(&original, &plan).await {
            Ok(media) => {
                ctx.results.remove(position);
                ctx.pending = vec![original.enhanced(media, state.enhancement_count)];
                METRICS.inc_enhancements();
                WorkflowEvent::EnhancementApplied
            }
            Err(err) => WorkflowEvent::StageFailed(err),
        }
    }

    fn prepare_regeneration(&self, state: &WorkflowState, ctx: &mut RunContext) -> WorkflowEvent {
        let best = state.last_report.as_ref().and_then(CritiqueReport::best);
        if let (Some(best), Some(decision)) = (best, state.last_decision.as_ref()) {
            ctx.refinement = Some(self.refiner.refine(
                &ctx.request.prompt,
                best,
                decision,
                &ctx.bundle,
            ));
        }
        METRICS.inc_regenerations();
        WorkflowEvent::RegenerationPrepared
    }
}

fn stage_failed(detail: &str) -> WorkflowEvent {
    WorkflowEvent::StageFailed(StageError::Enhancement(detail.to_string()))
}
