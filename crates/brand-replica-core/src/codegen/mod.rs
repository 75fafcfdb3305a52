//! CodeGen phase: turn discovered components into a scored brand component
//! library.
//!
//! # Module layout
//!
//! - [`scoring`]: pure match scoring of draft CSS against the design DNA
//!
//! Components are generated concurrently (bounded by `concurrency`) and
//! aggregated in input order. Each component gets up to `max_iterations`
//! generator attempts; the best-scoring draft is kept and shortfalls are
//! recorded as unit issues.

pub mod postprocess;
pub mod scoring;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::css;
use crate::discovery::DiscoveryOutput;
use crate::domain::{
    AiProvider, BrandComponent, CodeGenConfig, ComponentVariant, CssStandards, DesignDna,
    DiscoveredComponent, IssueKind, ModuleConfig, Outcome, PhaseIssue, PhaseState, PipelineError,
    Result,
};
use crate::obs;
use crate::phase::{
    call_external, drive, ModuleCore, OutputValidation, PhaseModule, PhaseOutput, PhaseRun,
};

pub use self::postprocess::{post_process, PostProcessed, NEUTRAL_SCALE, SPACING_SCALE};
pub use self::scoring::{score_css, DimensionScores, MatchReport};

pub const PHASE: &str = "codegen";

/// One generator call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub brand_id: String,
    pub component: DiscoveredComponent,
    pub design_dna: DesignDna,
    /// 1-based.
    pub attempt: u32,
    /// Hints from scoring the previous best draft.
    pub feedback: Vec<String>,
    /// Component being refined, when regenerating an existing library.
    pub previous: Option<BrandComponent>,
    pub ai_provider: AiProvider,
    pub model: Option<String>,
    pub custom_prompt: Option<String>,
}

/// Draft returned by the generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedComponent {
    pub name: String,
    pub purpose: String,
    pub usage_context: String,
    pub css: String,
    pub html_template: String,
    pub preview_html: String,
    pub variants: Vec<ComponentVariant>,
}

/// Generative collaborator producing component drafts.
#[async_trait]
pub trait ComponentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedComponent>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeGenInput {
    pub brand_id: String,
    pub discovered_components: Vec<DiscoveredComponent>,
    pub design_dna: DesignDna,
    /// Library from an earlier run, refined instead of replaced.
    #[serde(default)]
    pub existing_components: Vec<BrandComponent>,
}

impl CodeGenInput {
    pub fn from_discovery(output: &DiscoveryOutput, existing_components: Vec<BrandComponent>) -> Self {
        Self {
            brand_id: output.brand_id.clone(),
            discovered_components: output.components.clone(),
            design_dna: output.design_dna.clone(),
            existing_components,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeGenOutput {
    pub brand_id: String,
    pub components: Vec<BrandComponent>,
    /// Design tokens followed by every component's CSS.
    pub compiled_css: String,
    pub average_match_score: f64,
    #[serde(default)]
    pub errors: Vec<PhaseIssue>,
    pub status: PhaseState,
    pub timestamp: DateTime<Utc>,
}

/// Per-component result.
enum UnitOutcome {
    Built {
        component: BrandComponent,
        issue: Option<PhaseIssue>,
    },
    Failed(PhaseIssue),
}

/// Best draft seen for a component so far.
struct Candidate {
    draft: GeneratedComponent,
    report: MatchReport,
}

/// The CodeGen phase module.
pub struct CodeGenModule {
    core: ModuleCore,
    min_match_score: u8,
    max_iterations: u32,
    concurrency: usize,
    css_standards: CssStandards,
    generator: Arc<dyn ComponentGenerator>,
}

impl CodeGenModule {
    pub fn new(config: CodeGenConfig, generator: Arc<dyn ComponentGenerator>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(PHASE, config.module),
            min_match_score: config.min_match_score,
            max_iterations: config.max_iterations,
            concurrency: config.concurrency,
            css_standards: config.css_standards,
            generator,
        })
    }

    fn check_input(input: &CodeGenInput) -> Result<()> {
        if input.brand_id.trim().is_empty() {
            return Err(PipelineError::invalid_input(PHASE, "brandId is empty"));
        }
        if input.discovered_components.is_empty() {
            return Err(PipelineError::invalid_input(
                PHASE,
                "no discovered components to generate from",
            ));
        }
        let mut ids = HashSet::new();
        for component in &input.discovered_components {
            if !ids.insert(component.id.as_str()) {
                return Err(PipelineError::invalid_input(
                    PHASE,
                    format!("duplicate discovered component id '{}'", component.id),
                ));
            }
        }
        let problems = input.design_dna.problems();
        if !problems.is_empty() {
            return Err(PipelineError::invalid_input(
                PHASE,
                format!("design DNA unusable: {}", problems.join("; ")),
            ));
        }
        Ok(())
    }

    fn score(&self, css_text: &str, dna: &DesignDna) -> MatchReport {
        score_css(css_text, dna, &self.css_standards, self.min_match_score)
    }

    async fn generate_all(
        &self,
        input: &CodeGenInput,
        cancel: &CancellationToken,
    ) -> Result<PhaseRun<CodeGenOutput>> {
        Self::check_input(input)?;
        let config = self.core.config();
        let total = input.discovered_components.len();
        let done = AtomicUsize::new(0);

        // Boxed up front so the buffered stream is plainly `Send`.
        let units: Vec<BoxFuture<'_, Result<UnitOutcome>>> = input
            .discovered_components
            .iter()
            .map(|discovered| {
                self.build_counted(discovered, input, &config, cancel, &done, total)
                    .boxed()
            })
            .collect();
        let outcomes: Vec<UnitOutcome> = stream::iter(units)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut components = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Built { component, issue } => {
                    components.push(component);
                    errors.extend(issue);
                }
                UnitOutcome::Failed(issue) => errors.push(issue),
            }
        }

        if components.is_empty() {
            let causes = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PipelineError::phase_failed(
                PHASE,
                format!("no component could be generated: {causes}"),
            ));
        }

        let average_match_score = components
            .iter()
            .map(|c| f64::from(c.match_score))
            .sum::<f64>()
            / components.len() as f64;
        let outcome = if errors.iter().any(PhaseIssue::is_degrading) {
            Outcome::Partial
        } else {
            Outcome::Success
        };
        let summary = format!(
            "{} of {total} components generated, average match {average_match_score:.1}",
            components.len()
        );
        let compiled = compile_library(&input.design_dna, &components);
        debug!(
            merged_roots = compiled.merged_roots,
            renamed = compiled.renamed.len(),
            unresolved = compiled.unresolved.len(),
            "library css compiled"
        );
        errors.extend(repair_issues(&compiled));

        Ok(PhaseRun {
            output: CodeGenOutput {
                brand_id: input.brand_id.clone(),
                compiled_css: compiled.css,
                components,
                average_match_score,
                errors,
                status: outcome.into(),
                timestamp: Utc::now(),
            },
            outcome,
            summary,
        })
    }

    async fn build_counted(
        &self,
        discovered: &DiscoveredComponent,
        input: &CodeGenInput,
        config: &ModuleConfig,
        cancel: &CancellationToken,
        done: &AtomicUsize,
        total: usize,
    ) -> Result<UnitOutcome> {
        let outcome = self.build_component(discovered, input, config, cancel).await?;
        let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
        self.core.progress(
            finished as f64 / total as f64,
            format!("{finished}/{total} components"),
        );
        Ok(outcome)
    }

    /// Generate, score and refine one component.
    ///
    /// Only cancellation escapes as `Err`; every other failure becomes a unit
    /// issue.
    async fn build_component(
        &self,
        discovered: &DiscoveredComponent,
        input: &CodeGenInput,
        config: &ModuleConfig,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome> {
        let unit = discovered.name.clone();
        let existing = input
            .existing_components
            .iter()
            .find(|c| c.source_component_id == discovered.id);

        if let Some(existing) = existing {
            let report = self.score(&existing.css, &input.design_dna);
            if report.meets(self.min_match_score) {
                debug!(component = %unit, score = report.score, "reusing existing component");
                let mut reused = existing.clone();
                reused.match_score = report.score;
                return Ok(UnitOutcome::Built {
                    component: reused,
                    issue: None,
                });
            }
        }

        let mut best: Option<Candidate> = None;
        let mut last_error: Option<PipelineError> = None;
        let mut attempts = 0;
        for attempt in 1..=self.max_iterations {
            attempts = attempt;
            let request = GenerationRequest {
                brand_id: input.brand_id.clone(),
                component: discovered.clone(),
                design_dna: input.design_dna.clone(),
                attempt,
                feedback: best
                    .as_ref()
                    .map(|b| b.report.feedback.clone())
                    .unwrap_or_default(),
                previous: existing.cloned(),
                ai_provider: config.ai_provider,
                model: config.model.clone(),
                custom_prompt: config.custom_prompt.clone(),
            };
            let call = call_external(
                PHASE,
                &format!("generate {unit}"),
                config.timeout_ms,
                cancel,
                self.generator.generate(&request),
            )
            .await;

            match call {
                Ok(draft) => {
                    let report = self.score(&draft.css, &input.design_dna);
                    debug!(component = %unit, attempt, score = report.score, "draft scored");
                    let improves = best
                        .as_ref()
                        .map_or(true, |b| report.score > b.report.score);
                    if improves {
                        best = Some(Candidate { draft, report });
                    }
                    if best
                        .as_ref()
                        .is_some_and(|b| b.report.meets(self.min_match_score))
                    {
                        break;
                    }
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    obs::emit_unit_failed(PHASE, &unit, &e);
                    last_error = Some(e);
                }
            }
        }

        let Some(best) = best else {
            let kind = match last_error {
                Some(PipelineError::Timeout { .. }) => IssueKind::TimedOut,
                _ => IssueKind::Failed,
            };
            let message = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "generator produced no draft".to_string());
            return Ok(UnitOutcome::Failed(PhaseIssue::new(PHASE, unit, kind, message)));
        };

        // An existing component that still outscores every new draft wins.
        if let Some(existing) = existing {
            let old = self.score(&existing.css, &input.design_dna);
            if old.score >= best.report.score {
                let mut kept = existing.clone();
                kept.match_score = old.score;
                let issue = self.shortfall(&unit, &old, attempts);
                return Ok(UnitOutcome::Built {
                    component: kept,
                    issue,
                });
            }
        }

        let issue = self.shortfall(&unit, &best.report, attempts);
        let component = into_component(&input.brand_id, discovered, existing, best.draft, best.report.score);
        Ok(UnitOutcome::Built { component, issue })
    }

    fn shortfall(&self, unit: &str, report: &MatchReport, attempts: u32) -> Option<PhaseIssue> {
        if report.meets(self.min_match_score) {
            return None;
        }
        let mut message = format!(
            "match score {} below minimum {} after {} attempt(s)",
            report.score, self.min_match_score, attempts
        );
        if !report.violations.is_empty() {
            message.push_str(&format!(": {}", report.violations.join(", ")));
        }
        Some(PhaseIssue::new(
            PHASE,
            unit,
            IssueKind::BelowThreshold,
            message,
        ))
    }
}

fn into_component(
    brand_id: &str,
    discovered: &DiscoveredComponent,
    existing: Option<&BrandComponent>,
    draft: GeneratedComponent,
    match_score: u8,
) -> BrandComponent {
    let id = existing
        .map(|c| c.id.clone())
        .unwrap_or_else(BrandComponent::new_id);
    let variants = draft
        .variants
        .into_iter()
        .enumerate()
        .map(|(i, mut v)| {
            if v.id.trim().is_empty() {
                v.id = format!("{id}-v{}", i + 1);
            }
            v
        })
        .collect();
    let non_empty = |value: String, fallback: &str| {
        if value.trim().is_empty() {
            fallback.to_string()
        } else {
            value
        }
    };
    BrandComponent {
        name: non_empty(draft.name, &discovered.name),
        purpose: draft.purpose,
        usage_context: draft.usage_context,
        css: draft.css,
        preview_html: non_empty(draft.preview_html, &draft.html_template),
        html_template: draft.html_template,
        source_component_id: discovered.id.clone(),
        brand_id: brand_id.to_string(),
        match_score,
        variants,
        created_at: existing.map_or_else(Utc::now, |c| c.created_at),
        id,
    }
}

/// Design tokens as `(custom property, value)` pairs.
///
/// Neutrals are spread over the named [`NEUTRAL_SCALE`] and spacing gets the
/// named [`SPACING_SCALE`] steps next to the base `--brand-space` unit.
pub fn token_declarations(dna: &DesignDna) -> Vec<(String, String)> {
    let color = |raw: &str| css::normalize_color(raw).unwrap_or_else(|| raw.trim().to_string());
    let mut vars = vec![("--brand-primary".to_string(), color(&dna.colors.primary))];
    if let Some(secondary) = &dna.colors.secondary {
        vars.push(("--brand-secondary".to_string(), color(secondary)));
    }
    if let Some(accent) = &dna.colors.accent {
        vars.push(("--brand-accent".to_string(), color(accent)));
    }
    let neutrals = &dna.colors.neutrals;
    let last = NEUTRAL_SCALE.len() - 1;
    for (i, neutral) in neutrals.iter().enumerate() {
        let step = match neutrals.len() {
            1 => 2,
            n => (i * last + (n - 1) / 2) / (n - 1),
        };
        let name = format!("--brand-neutral-{}", NEUTRAL_SCALE[step.min(last)]);
        if !vars.iter().any(|(n, _)| *n == name) {
            vars.push((name, color(neutral)));
        }
    }
    for (name, font) in [
        ("--brand-font-heading", &dna.typography.heading_font),
        ("--brand-font-body", &dna.typography.body_font),
    ] {
        if !font.trim().is_empty() {
            vars.push((name.to_string(), font.trim().to_string()));
        }
    }
    if let Some(size) = dna.typography.base_size_px {
        vars.push(("--brand-font-size".to_string(), format!("{size}px")));
    }
    let unit = dna.spacing.base_unit_px;
    vars.push(("--brand-space".to_string(), format!("{unit}px")));
    for (step, factor) in SPACING_SCALE {
        vars.push((format!("--brand-space-{step}"), format!("{}px", unit * factor)));
    }
    if let Some(radius) = dna.shape.border_radius_px {
        vars.push(("--brand-radius".to_string(), format!("{radius}px")));
    }
    if let Some(ms) = dna.motion.transition_ms {
        let easing = dna.motion.easing.as_deref().unwrap_or("ease");
        vars.push(("--brand-transition".to_string(), format!("{ms}ms {easing}")));
    }
    vars
}

/// `:root` block holding the design tokens as custom properties.
pub fn design_tokens(dna: &DesignDna) -> String {
    let body = token_declarations(dna)
        .iter()
        .map(|(name, value)| format!("  {name}: {value};"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(":root {{\n{body}\n}}")
}

/// Design tokens followed by each component's CSS, in library order, with
/// the [`post_process`] repairs applied.
pub fn compile_library(dna: &DesignDna, components: &[BrandComponent]) -> PostProcessed {
    let mut body = String::new();
    for component in components {
        body.push_str(&format!(
            "\n\n/* {} ({}) */\n{}",
            component.name,
            component.id,
            component.css.trim()
        ));
        for variant in &component.variants {
            if !variant.css_override.trim().is_empty() {
                body.push_str(&format!(
                    "\n/* variant {} */\n{}",
                    variant.id,
                    variant.css_override.trim()
                ));
            }
        }
    }
    post_process(&token_declarations(dna), &body)
}

/// The stylesheet of [`compile_library`].
pub fn compile_css(dna: &DesignDna, components: &[BrandComponent]) -> String {
    compile_library(dna, components).css
}

/// Warnings describing what the repair pass had to change.
fn repair_issues(repaired: &PostProcessed) -> Vec<PhaseIssue> {
    let mut issues = Vec::new();
    if !repaired.protected.is_empty() {
        issues.push(PhaseIssue::new(
            PHASE,
            "compiled css",
            IssueKind::Warning,
            format!(
                "drafts redefined brand tokens, design DNA values kept: {}",
                repaired.protected.join(", ")
            ),
        ));
    }
    if !repaired.unresolved.is_empty() {
        issues.push(PhaseIssue::new(
            PHASE,
            "compiled css",
            IssueKind::Warning,
            format!(
                "undefined custom properties: {}",
                repaired.unresolved.join(", ")
            ),
        ));
    }
    issues
}

impl PhaseOutput for CodeGenOutput {
    fn status(&self) -> PhaseState {
        self.status
    }

    fn issues(&self) -> &[PhaseIssue] {
        &self.errors
    }
}

#[async_trait]
impl PhaseModule for CodeGenModule {
    type Input = CodeGenInput;
    type Output = CodeGenOutput;

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    #[instrument(skip_all, fields(brand_id = %input.brand_id, components = input.discovered_components.len()))]
    async fn invoke(
        &self,
        input: &CodeGenInput,
        cancel: &CancellationToken,
    ) -> Result<CodeGenOutput> {
        drive(&self.core, self.generate_all(input, cancel)).await
    }

    fn validate_output(&self, output: &CodeGenOutput) -> OutputValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if output.brand_id.trim().is_empty() {
            errors.push("brandId is empty".to_string());
        }
        if output.status == PhaseState::Failed {
            errors.push("output status is failed".to_string());
        }
        if output.components.is_empty() {
            errors.push("no components".to_string());
        }
        if !(0.0..=100.0).contains(&output.average_match_score) {
            errors.push(format!(
                "averageMatchScore {} outside 0..=100",
                output.average_match_score
            ));
        }

        let mut ids = HashSet::new();
        for component in &output.components {
            if !ids.insert(component.id.as_str()) {
                errors.push(format!("duplicate component id '{}'", component.id));
            }
            if component.match_score > 100 {
                errors.push(format!(
                    "component '{}' matchScore {} exceeds 100",
                    component.id, component.match_score
                ));
            }
            if component.html_template.trim().is_empty() {
                errors.push(format!("component '{}' has no htmlTemplate", component.id));
            }
            if component.css.trim().is_empty() {
                errors.push(format!("component '{}' has no CSS", component.id));
            }
            if component.brand_id != output.brand_id {
                errors.push(format!(
                    "component '{}' belongs to brand '{}'",
                    component.id, component.brand_id
                ));
            }
            let mut variant_ids = HashSet::new();
            for variant in &component.variants {
                if !variant_ids.insert(variant.id.as_str()) {
                    errors.push(format!(
                        "component '{}' has duplicate variant '{}'",
                        component.id, variant.id
                    ));
                }
            }
            if component.match_score < self.min_match_score {
                warnings.push(format!(
                    "component '{}' scored {} (minimum {})",
                    component.id, component.match_score, self.min_match_score
                ));
            }
        }
        if css::root_block_count(&output.compiled_css) != 1 {
            warnings.push("compiledCss should contain exactly one :root block".to_string());
        }
        OutputValidation::from_findings(errors, warnings)
    }
}
