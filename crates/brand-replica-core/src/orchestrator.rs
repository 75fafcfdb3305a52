//! Pipeline orchestrator: Discovery → CodeGen → Intelligence → render →
//! Validation for one brand and one article.
//!
//! Phases run strictly in sequence. Each phase output is threaded into the
//! next phase's input; a phase that errors, is cancelled, or reports a
//! `failed` output halts the run and nothing further is invoked. Unit issues
//! from every phase are aggregated into [`PipelineRun::errors`].
//!
//! A [`BrandPipeline`] owns its modules and therefore their status. Run
//! independent pipelines concurrently by building one pipeline per run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::codegen::{CodeGenInput, CodeGenModule, CodeGenOutput, ComponentGenerator};
use crate::discovery::{BrandCapture, DiscoveryInput, DiscoveryModule, DiscoveryOutput};
use crate::domain::{
    Article, BrandComponent, ErrorKind, IssueKind, ModuleStatus, PhaseIssue, PipelineConfig,
    PipelineError, Result,
};
use crate::intelligence::{
    IntelligenceInput, IntelligenceModule, IntelligenceOutput, SectionAdvisor,
};
use crate::obs;
use crate::phase::{PhaseModule, PhaseOutput};
use crate::render;
use crate::validation::{ValidationInput, ValidationModule, ValidationOutput, VisualComparator};

/// One run's inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub brand_id: String,
    pub target_url: String,
    pub article: Article,
    /// Library from an earlier run of the same brand.
    #[serde(default)]
    pub existing_components: Vec<BrandComponent>,
}

impl PipelineRequest {
    /// Checks that need no collaborator, so a bad request costs nothing.
    pub fn validate(&self) -> Result<()> {
        if self.brand_id.trim().is_empty() {
            return Err(PipelineError::invalid_input("pipeline", "brandId is empty"));
        }
        if self.article.id.trim().is_empty() {
            return Err(PipelineError::invalid_input("pipeline", "article id is empty"));
        }
        if self.article.sections.is_empty() {
            return Err(PipelineError::invalid_input(
                "pipeline",
                format!("article '{}' has no sections", self.article.id),
            ));
        }
        Ok(())
    }
}

/// External collaborators the phases delegate to.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn BrandCapture>,
    pub generator: Arc<dyn ComponentGenerator>,
    /// Defaults to the built-in keyword advisor.
    pub advisor: Option<Arc<dyn SectionAdvisor>>,
    pub comparator: Option<Arc<dyn VisualComparator>>,
}

/// What happened to one invoked phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
    pub phase: String,
    pub status: ModuleStatus,
    pub cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub run_id: String,
    pub brand_id: String,
    pub article_id: String,
    /// Invoked phases, in order.
    pub phases: Vec<PhaseReport>,
    pub discovery: Option<DiscoveryOutput>,
    pub codegen: Option<CodeGenOutput>,
    pub intelligence: Option<IntelligenceOutput>,
    pub rendered_html: Option<String>,
    pub validation: Option<ValidationOutput>,
    /// Issues from every phase, plus one entry per phase error.
    pub errors: Vec<PhaseIssue>,
    pub cancelled: bool,
    /// Every phase produced a forwardable output.
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    fn new(request: &PipelineRequest) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            brand_id: request.brand_id.clone(),
            article_id: request.article.id.clone(),
            phases: Vec::new(),
            discovery: None,
            codegen: None,
            intelligence: None,
            rendered_html: None,
            validation: None,
            errors: Vec::new(),
            cancelled: false,
            completed: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Completed and the rendered article passed Validation's gate.
    pub fn success(&self) -> bool {
        self.completed
            && self
                .validation
                .as_ref()
                .map_or(false, |v| v.passes_threshold)
    }

    pub fn report(&self, phase: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|r| r.phase == phase)
    }

    /// The phase that stopped the run, if any.
    pub fn halted_at(&self) -> Option<&PhaseReport> {
        if self.completed {
            return None;
        }
        self.phases.last()
    }
}

/// The four phase modules wired together.
pub struct BrandPipeline {
    discovery: DiscoveryModule,
    codegen: CodeGenModule,
    intelligence: IntelligenceModule,
    validation: ValidationModule,
}

impl BrandPipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let Collaborators {
            capture,
            generator,
            advisor,
            comparator,
        } = collaborators;

        let intelligence = match advisor {
            Some(advisor) => IntelligenceModule::new(config.intelligence, advisor)?,
            None => IntelligenceModule::with_keyword_advisor(config.intelligence)?,
        };
        let mut validation = ValidationModule::new(config.validation)?;
        if let Some(comparator) = comparator {
            validation = validation.with_comparator(comparator);
        }
        Ok(Self {
            discovery: DiscoveryModule::new(config.discovery, capture)?,
            codegen: CodeGenModule::new(config.codegen, generator)?,
            intelligence,
            validation,
        })
    }

    pub fn discovery(&self) -> &DiscoveryModule {
        &self.discovery
    }

    pub fn codegen(&self) -> &CodeGenModule {
        &self.codegen
    }

    pub fn intelligence(&self) -> &IntelligenceModule {
        &self.intelligence
    }

    pub fn validation(&self) -> &ValidationModule {
        &self.validation
    }

    /// Execute one run.
    ///
    /// Returns `Err` only for a request rejected before any phase starts.
    /// Phase failures and cancellation are reported inside the
    /// [`PipelineRun`].
    pub async fn run(
        &self,
        request: &PipelineRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineRun> {
        request.validate()?;
        let mut run = PipelineRun::new(request);
        let span = obs::pipeline_span(&run.run_id, &run.brand_id);
        let started = Instant::now();

        async {
            obs::emit_run_started(&run.run_id, &run.brand_id, &run.article_id);
            self.run_phases(request, cancel, &mut run).await;
            run.finished_at = Some(Utc::now());
            obs::emit_run_finished(
                &run.run_id,
                started.elapsed().as_millis() as u64,
                run.phases.iter().filter(|r| r.error.is_none()).count(),
                run.success(),
            );
        }
        .instrument(span)
        .await;

        Ok(run)
    }

    async fn run_phases(
        &self,
        request: &PipelineRequest,
        cancel: &CancellationToken,
        run: &mut PipelineRun,
    ) {
        let discovery_input = DiscoveryInput {
            brand_id: request.brand_id.clone(),
            target_url: request.target_url.clone(),
        };
        let Some(discovery) = step(&self.discovery, &discovery_input, cancel, run).await else {
            return;
        };
        let codegen_input =
            CodeGenInput::from_discovery(&discovery, request.existing_components.clone());
        let design_dna = discovery.design_dna.clone();
        let reference_screenshots = discovery.screenshots.clone();
        run.discovery = Some(discovery);

        let Some(codegen) = step(&self.codegen, &codegen_input, cancel, run).await else {
            return;
        };
        let intelligence_input = IntelligenceInput::from_codegen(request.article.clone(), &codegen);
        let components = codegen.components.clone();
        run.codegen = Some(codegen);

        let Some(intelligence) = step(&self.intelligence, &intelligence_input, cancel, run).await
        else {
            return;
        };
        let rendered_html = render::render_article(
            &request.article,
            &intelligence.decisions,
            &components,
            &design_dna,
        );
        info!(
            event = "pipeline.rendered",
            bytes = rendered_html.len(),
            mapped_sections = intelligence.mapped_sections,
        );
        let validation_input = ValidationInput {
            rendered_html: rendered_html.clone(),
            decisions: intelligence.decisions.clone(),
            components,
            design_dna,
            reference_screenshots,
        };
        run.intelligence = Some(intelligence);
        run.rendered_html = Some(rendered_html);

        if let Some(validation) = step(&self.validation, &validation_input, cancel, run).await {
            run.validation = Some(validation);
            run.completed = true;
        }
    }
}

/// Run one phase and record its report.
///
/// Returns the output only when it may be forwarded. A `failed` output is
/// still reported and its issues aggregated, but the run halts.
async fn step<M>(
    module: &M,
    input: &M::Input,
    cancel: &CancellationToken,
    run: &mut PipelineRun,
) -> Option<M::Output>
where
    M: PhaseModule,
    M::Output: PhaseOutput,
{
    let phase = module.phase_name();
    if cancel.is_cancelled() {
        run.cancelled = true;
        info!(event = "pipeline.cancelled", before = %phase);
        return None;
    }

    match module.execute(input, cancel).await {
        Ok(output) => {
            run.errors.extend(output.issues().iter().cloned());
            let failure = if !output.is_forwardable() {
                Some(format!("{phase} output has status failed"))
            } else {
                let check = module.validate_output(&output);
                (!check.valid)
                    .then(|| format!("{phase} output is malformed: {}", check.errors.join("; ")))
            };
            if let Some(reason) = &failure {
                run.errors.push(PhaseIssue::new(phase, phase, IssueKind::Failed, reason.clone()));
            }
            run.phases.push(PhaseReport {
                phase: phase.to_string(),
                status: module.status(),
                cancelled: false,
                error_kind: failure.is_some().then_some(ErrorKind::PhaseFailure),
                error: failure.clone(),
            });
            match failure {
                None => Some(output),
                Some(reason) => {
                    warn!(
                        event = "pipeline.halted",
                        phase = %phase,
                        reason = %reason,
                        "output not forwarded"
                    );
                    None
                }
            }
        }
        Err(e) => {
            let cancelled = e.is_cancellation();
            run.cancelled |= cancelled;
            let kind = if cancelled {
                IssueKind::Cancelled
            } else {
                IssueKind::Failed
            };
            run.errors.push(PhaseIssue::new(phase, phase, kind, e.to_string()));
            run.phases.push(PhaseReport {
                phase: phase.to_string(),
                status: module.status(),
                cancelled,
                error_kind: Some(e.kind()),
                error: Some(e.to_string()),
            });
            if cancelled {
                info!(event = "pipeline.cancelled", during = %phase);
            } else {
                warn!(event = "pipeline.halted", phase = %phase, error = %e);
            }
            None
        }
    }
}
