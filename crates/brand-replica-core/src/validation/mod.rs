//! Validation phase: score a rendered article against its source brand.
//!
//! # Module layout
//!
//! - [`rubric`]: brand match, design quality and user experience rubrics
//! - [`checklist`]: wow-factor checklist evaluation
//! - [`gate`]: weighted overall score and pass/fail decision
//!
//! An optional [`VisualComparator`] contributes a screenshot similarity to
//! the brand-match score. Its failure is recorded as a warning and scoring
//! continues without it.

pub mod checklist;
pub mod gate;
pub mod rubric;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::domain::{
    BrandComponent, CategoryWeights, DesignDna, IssueKind, Outcome, PhaseIssue, PhaseState,
    PipelineError, Result, ScoreBreakdown, Screenshot, SectionDesignDecision, Thresholds,
    ValidationConfig, WowFactorCheck, WowFactorItem,
};
use crate::markup;
use crate::obs;
use crate::phase::{
    call_external, drive, ModuleCore, OutputValidation, PhaseModule, PhaseOutput, PhaseRun,
};

pub use self::checklist::Document;
pub use self::gate::{failing_categories, passes_threshold, weighted_overall, CategoryScores};

pub const PHASE: &str = "validation";

/// Screenshot-similarity collaborator.
#[async_trait]
pub trait VisualComparator: Send + Sync {
    /// Similarity of the rendered document to the references, `0..=100`.
    async fn similarity(&self, rendered_html: &str, references: &[Screenshot]) -> Result<f64>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationInput {
    pub rendered_html: String,
    #[serde(default)]
    pub decisions: Vec<SectionDesignDecision>,
    #[serde(default)]
    pub components: Vec<BrandComponent>,
    pub design_dna: DesignDna,
    #[serde(default)]
    pub reference_screenshots: Vec<Screenshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutput {
    pub brand_match: ScoreBreakdown,
    pub design_quality: ScoreBreakdown,
    pub user_experience: ScoreBreakdown,
    pub overall: f64,
    pub wow_factor_checklist: Vec<WowFactorItem>,
    pub passes_threshold: bool,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub errors: Vec<PhaseIssue>,
    pub status: PhaseState,
    pub timestamp: DateTime<Utc>,
}

impl ValidationOutput {
    pub fn category_scores(&self) -> CategoryScores {
        CategoryScores {
            brand_match: self.brand_match.percentage(),
            design_quality: self.design_quality.percentage(),
            user_experience: self.user_experience.percentage(),
        }
    }
}

/// The Validation phase module.
pub struct ValidationModule {
    core: ModuleCore,
    thresholds: Thresholds,
    weights: CategoryWeights,
    checklist: Vec<WowFactorCheck>,
    comparator: Option<Arc<dyn VisualComparator>>,
}

impl ValidationModule {
    pub fn new(config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(PHASE, config.module),
            thresholds: config.thresholds,
            weights: config.weights,
            checklist: config.wow_factor_checklist,
            comparator: None,
        })
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn VisualComparator>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    async fn score(
        &self,
        input: &ValidationInput,
        cancel: &CancellationToken,
    ) -> Result<PhaseRun<ValidationOutput>> {
        let problems = input.design_dna.problems();
        if !problems.is_empty() {
            return Err(PipelineError::invalid_input(
                PHASE,
                format!("design DNA unusable: {}", problems.join("; ")),
            ));
        }
        markup::ensure_parseable(&input.rendered_html)?;

        let html = input.rendered_html.as_str();
        let stylesheet = markup::stylesheet(html);
        let mut errors = Vec::new();

        let mut brand_match = rubric::brand_match(
            html,
            &stylesheet,
            &input.design_dna,
            &input.decisions,
            &input.components,
        )?;
        if let Some(comparator) = &self.comparator {
            if input.reference_screenshots.is_empty() {
                debug!("no reference screenshots; skipping visual comparison");
            } else {
                let config = self.core.config();
                let compared = call_external(
                    PHASE,
                    "visual comparison",
                    config.timeout_ms,
                    cancel,
                    comparator.similarity(html, &input.reference_screenshots),
                )
                .await;
                match compared {
                    Ok(similarity) => brand_match = rubric::blend_visual(&brand_match, similarity)?,
                    Err(e) if e.is_cancellation() => return Err(e),
                    Err(e) => {
                        obs::emit_unit_failed(PHASE, "visual comparison", &e);
                        errors.push(PhaseIssue::new(
                            PHASE,
                            "visual comparison",
                            IssueKind::Warning,
                            e.to_string(),
                        ));
                    }
                }
            }
        }
        self.core.progress(0.4, "brand match scored");

        let design_quality = rubric::design_quality(html, &stylesheet, &input.design_dna)?;
        let user_experience = rubric::user_experience(html, &stylesheet)?;
        self.core.progress(0.7, "rubrics scored");

        let doc = Document {
            html,
            stylesheet: &stylesheet,
            dna: &input.design_dna,
        };
        let wow_factor_checklist = checklist::evaluate(&self.checklist, &doc);

        let scores = CategoryScores {
            brand_match: brand_match.percentage(),
            design_quality: design_quality.percentage(),
            user_experience: user_experience.percentage(),
        };
        let overall = weighted_overall(&scores, &self.weights)?;
        let passes = passes_threshold(&scores, overall, &wow_factor_checklist, &self.thresholds);

        for category in failing_categories(&scores, &self.thresholds) {
            errors.push(PhaseIssue::new(
                PHASE,
                category,
                IssueKind::BelowThreshold,
                format!("{category} below threshold"),
            ));
        }
        let failed_required: Vec<&WowFactorItem> = wow_factor_checklist
            .iter()
            .filter(|item| item.required && !item.passed)
            .collect();
        for item in &failed_required {
            errors.push(PhaseIssue::new(
                PHASE,
                item.id.clone(),
                IssueKind::BelowThreshold,
                format!("required check failed: {}", item.label),
            ));
        }
        if let Some(min) = self.thresholds.overall {
            if overall < min {
                errors.push(PhaseIssue::new(
                    PHASE,
                    "overall",
                    IssueKind::BelowThreshold,
                    format!("overall {overall:.2} below {min}"),
                ));
            }
        }
        obs::emit_gate_evaluated(overall, passes, failed_required.len());

        let suggestions = consolidate_suggestions(
            [&brand_match, &design_quality, &user_experience],
            &wow_factor_checklist,
        );
        let outcome = if passes {
            Outcome::Success
        } else {
            Outcome::Partial
        };
        let summary = format!(
            "overall {overall:.2}, {}",
            if passes { "passes" } else { "below thresholds" }
        );

        Ok(PhaseRun {
            output: ValidationOutput {
                brand_match,
                design_quality,
                user_experience,
                overall,
                wow_factor_checklist,
                passes_threshold: passes,
                suggestions,
                errors,
                status: outcome.into(),
                timestamp: Utc::now(),
            },
            outcome,
            summary,
        })
    }
}

/// Rubric suggestions followed by failed checklist labels, deduplicated in
/// first-seen order.
fn consolidate_suggestions(
    breakdowns: [&ScoreBreakdown; 3],
    checklist: &[WowFactorItem],
) -> Vec<String> {
    let mut seen = HashSet::new();
    breakdowns
        .iter()
        .flat_map(|b| b.suggestions().iter().cloned())
        .chain(
            checklist
                .iter()
                .filter(|item| !item.passed)
                .map(|item| format!("Checklist: {}", item.label)),
        )
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

impl PhaseOutput for ValidationOutput {
    fn status(&self) -> PhaseState {
        self.status
    }

    fn issues(&self) -> &[PhaseIssue] {
        &self.errors
    }
}

#[async_trait]
impl PhaseModule for ValidationModule {
    type Input = ValidationInput;
    type Output = ValidationOutput;

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    #[instrument(skip_all, fields(html_bytes = input.rendered_html.len()))]
    async fn invoke(
        &self,
        input: &ValidationInput,
        cancel: &CancellationToken,
    ) -> Result<ValidationOutput> {
        drive(&self.core, self.score(input, cancel)).await
    }

    fn validate_output(&self, output: &ValidationOutput) -> OutputValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if output.status == PhaseState::Failed {
            errors.push("output status is failed".to_string());
        }
        if !(0.0..=100.0).contains(&output.overall) {
            errors.push(format!("overall {} outside 0..=100", output.overall));
        }
        let scores = output.category_scores();
        match weighted_overall(&scores, &self.weights) {
            Ok(expected) if (expected - output.overall).abs() > 0.01 => errors.push(format!(
                "overall {} does not match weighted categories ({expected})",
                output.overall
            )),
            Ok(_) => {}
            Err(e) => errors.push(e.to_string()),
        }
        let expected_pass = passes_threshold(
            &scores,
            output.overall,
            &output.wow_factor_checklist,
            &self.thresholds,
        );
        if expected_pass != output.passes_threshold {
            errors.push(format!(
                "passesThreshold is {} but the gate evaluates to {expected_pass}",
                output.passes_threshold
            ));
        }
        if output.passes_threshold && output.status != PhaseState::Success {
            errors.push("passing output must have status success".to_string());
        }

        let mut ids = HashSet::new();
        for item in &output.wow_factor_checklist {
            if !ids.insert(item.id.as_str()) {
                errors.push(format!("duplicate checklist item '{}'", item.id));
            }
        }
        for check in &self.checklist {
            if !ids.contains(check.id.as_str()) {
                warnings.push(format!("checklist item '{}' not evaluated", check.id));
            }
        }
        OutputValidation::from_findings(errors, warnings)
    }
}
