//! Intelligence phase: map article sections onto the component library.
//!
//! # Module layout
//!
//! - [`advisor`]: the `SectionAdvisor` seam and the built-in `KeywordAdvisor`
//! - [`content`]: semantic role classification and content mapping
//! - [`layout`]: position-aware layout derivation and configured overrides
//!
//! Each section is ranked independently. The best candidate's confidence
//! blends the advisor's fit (80%) with the component's match score (20%);
//! sections whose best confidence falls below `minConfidence` are recorded
//! as skipped rather than forced onto a poor component.

pub mod advisor;
pub mod content;
pub mod layout;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::codegen::CodeGenOutput;
use crate::domain::{
    Article, ArticleSection, BrandComponent, ContextConfig, IntelligenceConfig, IssueKind,
    LayoutOverride, Outcome, PhaseIssue, PhaseState, PipelineError, PositionContext, Result,
    SectionDesignDecision, SectionPosition, SemanticRole, SkippedSection,
};
use crate::obs;
use crate::phase::{
    call_external, drive, ModuleCore, OutputValidation, PhaseModule, PhaseOutput, PhaseRun,
};

pub use self::advisor::{CandidateFit, KeywordAdvisor, RankingRequest, SectionAdvisor};
pub use self::content::{classify_role, map_content};
pub use self::layout::{derive_layout, merge_layout};

pub const PHASE: &str = "intelligence";

const FIT_WEIGHT: f64 = 0.8;

/// Confidence of mapping onto a component with the given advisor fit.
pub fn confidence(fit: f64, match_score: u8) -> f64 {
    let fit = if fit.is_finite() { fit.clamp(0.0, 1.0) } else { 0.0 };
    let quality = f64::from(match_score.min(100)) / 100.0;
    (FIT_WEIGHT * fit + (1.0 - FIT_WEIGHT) * quality).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceInput {
    pub article: Article,
    pub components: Vec<BrandComponent>,
}

impl IntelligenceInput {
    pub fn from_codegen(article: Article, output: &CodeGenOutput) -> Self {
        Self {
            article,
            components: output.components.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceOutput {
    pub article_id: String,
    pub decisions: Vec<SectionDesignDecision>,
    #[serde(default)]
    pub skipped: Vec<SkippedSection>,
    pub overall_strategy: String,
    /// Every input section, skipped ones included.
    pub total_sections: usize,
    pub mapped_sections: usize,
    #[serde(default)]
    pub errors: Vec<PhaseIssue>,
    pub status: PhaseState,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of ranking one section.
enum SectionResult {
    Mapped(SectionDesignDecision),
    Skipped(SkippedSection),
}

/// The Intelligence phase module.
pub struct IntelligenceModule {
    core: ModuleCore,
    context: ContextConfig,
    overrides: BTreeMap<String, LayoutOverride>,
    advisor: Arc<dyn SectionAdvisor>,
}

impl IntelligenceModule {
    pub fn new(config: IntelligenceConfig, advisor: Arc<dyn SectionAdvisor>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(PHASE, config.module),
            context: config.context_config,
            overrides: config.layout_overrides,
            advisor,
        })
    }

    /// Module backed by the built-in [`KeywordAdvisor`].
    pub fn with_keyword_advisor(config: IntelligenceConfig) -> Result<Self> {
        Self::new(config, Arc::new(KeywordAdvisor))
    }

    fn check_input(input: &IntelligenceInput) -> Result<()> {
        let article = &input.article;
        if article.id.trim().is_empty() {
            return Err(PipelineError::invalid_input(PHASE, "article id is empty"));
        }
        if article.sections.is_empty() {
            return Err(PipelineError::invalid_input(PHASE, "article has no sections"));
        }
        let mut ids = HashSet::new();
        for section in &article.sections {
            if section.id.trim().is_empty() {
                return Err(PipelineError::invalid_input(PHASE, "section with empty id"));
            }
            if !ids.insert(section.id.as_str()) {
                return Err(PipelineError::invalid_input(
                    PHASE,
                    format!("duplicate section id '{}'", section.id),
                ));
            }
        }
        Ok(())
    }

    async fn plan(
        &self,
        input: &IntelligenceInput,
        cancel: &CancellationToken,
    ) -> Result<PhaseRun<IntelligenceOutput>> {
        Self::check_input(input)?;
        let sections = &input.article.sections;
        let total = sections.len();

        if input.components.is_empty() {
            let skipped: Vec<SkippedSection> = sections
                .iter()
                .map(|s| SkippedSection {
                    section_id: s.id.clone(),
                    section_heading: s.heading.clone(),
                    reason: "component library is empty".to_string(),
                    best_confidence: None,
                })
                .collect();
            let strategy = format!(
                "No brand components are available, so none of the {total} sections can be \
                 mapped; regenerate the component library before styling this article."
            );
            return Ok(PhaseRun {
                output: IntelligenceOutput {
                    article_id: input.article.id.clone(),
                    decisions: Vec::new(),
                    skipped,
                    overall_strategy: strategy,
                    total_sections: total,
                    mapped_sections: 0,
                    errors: vec![PhaseIssue::new(
                        PHASE,
                        "library",
                        IssueKind::Failed,
                        "component library is empty",
                    )],
                    status: PhaseState::Failed,
                    timestamp: Utc::now(),
                },
                outcome: Outcome::Failed,
                summary: "component library is empty".to_string(),
            });
        }

        let config = self.core.config();
        let library: HashMap<&str, &BrandComponent> = input
            .components
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();

        let mut decisions = Vec::new();
        let mut skipped = Vec::new();
        let mut errors = Vec::new();
        let mut failed_units = 0;

        for (index, section) in sections.iter().enumerate() {
            let context = PositionContext::for_index(sections, index);
            let role = classify_role(section, &context);
            let request = RankingRequest {
                section,
                role,
                context: &context,
                components: &input.components,
                custom_prompt: config.custom_prompt.as_deref(),
            };
            let ranked = call_external(
                PHASE,
                &format!("rank section {}", section.id),
                config.timeout_ms,
                cancel,
                self.advisor.rank(&request),
            )
            .await;

            let ranked = match ranked {
                Ok(ranked) => ranked,
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    obs::emit_unit_failed(PHASE, &section.id, &e);
                    let kind = if matches!(e, PipelineError::Timeout { .. }) {
                        IssueKind::TimedOut
                    } else {
                        IssueKind::Failed
                    };
                    errors.push(PhaseIssue::new(PHASE, section.id.clone(), kind, e.to_string()));
                    skipped.push(SkippedSection {
                        section_id: section.id.clone(),
                        section_heading: section.heading.clone(),
                        reason: format!("ranking failed: {e}"),
                        best_confidence: None,
                    });
                    failed_units += 1;
                    continue;
                }
            };

            match self.decide(section, role, &context, ranked, &library, &mut errors) {
                SectionResult::Mapped(decision) => decisions.push(decision),
                SectionResult::Skipped(skip) => skipped.push(skip),
            }
            self.core.progress(
                (index + 1) as f64 / total as f64,
                format!("{}/{total} sections", index + 1),
            );
        }

        if failed_units == total {
            let causes = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PipelineError::phase_failed(
                PHASE,
                format!("no section could be ranked: {causes}"),
            ));
        }

        let outcome = if skipped.is_empty() && !errors.iter().any(PhaseIssue::is_degrading) {
            Outcome::Success
        } else {
            Outcome::Partial
        };
        let overall_strategy = describe_strategy(&decisions, &skipped, &input.components);
        let summary = format!("{} of {total} sections mapped", decisions.len());

        Ok(PhaseRun {
            output: IntelligenceOutput {
                article_id: input.article.id.clone(),
                mapped_sections: decisions.len(),
                decisions,
                skipped,
                overall_strategy,
                total_sections: total,
                errors,
                status: outcome.into(),
                timestamp: Utc::now(),
            },
            outcome,
            summary,
        })
    }

    /// Turn an advisor ranking into a decision or an explicit skip.
    fn decide(
        &self,
        section: &ArticleSection,
        role: SemanticRole,
        context: &PositionContext,
        ranked: Vec<CandidateFit>,
        library: &HashMap<&str, &BrandComponent>,
        errors: &mut Vec<PhaseIssue>,
    ) -> SectionResult {
        let mut best: Option<(CandidateFit, &BrandComponent, f64)> = None;
        for candidate in ranked {
            let Some(component) = library.get(candidate.component_id.as_str()).copied() else {
                errors.push(PhaseIssue::new(
                    PHASE,
                    section.id.clone(),
                    IssueKind::Warning,
                    format!("advisor proposed unknown component '{}'", candidate.component_id),
                ));
                continue;
            };
            let score = confidence(candidate.fit, component.match_score);
            if best.as_ref().map_or(true, |(_, _, b)| score > *b) {
                best = Some((candidate, component, score));
            }
        }

        let Some((candidate, component, score)) = best else {
            return SectionResult::Skipped(SkippedSection {
                section_id: section.id.clone(),
                section_heading: section.heading.clone(),
                reason: "no candidate component".to_string(),
                best_confidence: None,
            });
        };
        if score < self.context.min_confidence {
            debug!(section = %section.id, confidence = score, "below confidence floor");
            return SectionResult::Skipped(SkippedSection {
                section_id: section.id.clone(),
                section_heading: section.heading.clone(),
                reason: format!(
                    "best confidence {score:.2} below minimum {:.2}",
                    self.context.min_confidence
                ),
                best_confidence: Some(score),
            });
        }

        let variant_id = match candidate.variant_id {
            Some(id) if component.variant(&id).is_some() => Some(id),
            Some(id) => {
                errors.push(PhaseIssue::new(
                    PHASE,
                    section.id.clone(),
                    IssueKind::Warning,
                    format!("component '{}' has no variant '{id}'", component.id),
                ));
                None
            }
            None => None,
        };

        let content_mapping = map_content(section, role);
        let base = derive_layout(role, content_mapping.items.len(), context, &self.context);
        let layout = merge_layout(base, role, &self.overrides);

        SectionResult::Mapped(SectionDesignDecision {
            section_id: section.id.clone(),
            section_heading: section.heading.clone(),
            component_id: component.id.clone(),
            variant_id,
            layout,
            reasoning: format!(
                "{}; {role} section at {} {}/{}",
                candidate.reasoning,
                match context.position {
                    SectionPosition::Intro => "opening",
                    SectionPosition::Body => "body",
                    SectionPosition::Conclusion => "closing",
                },
                context.index + 1,
                context.total
            ),
            semantic_role: role,
            content_mapping,
            confidence: score,
        })
    }
}

fn describe_strategy(
    decisions: &[SectionDesignDecision],
    skipped: &[SkippedSection],
    components: &[BrandComponent],
) -> String {
    let total = decisions.len() + skipped.len();
    let distinct: BTreeSet<&str> = decisions.iter().map(|d| d.component_id.as_str()).collect();
    let mut strategy = format!(
        "Mapped {} of {total} sections onto {} distinct brand components.",
        decisions.len(),
        distinct.len()
    );
    if let Some(first) = decisions.first() {
        let name = components
            .iter()
            .find(|c| c.id == first.component_id)
            .map_or(first.component_id.as_str(), |c| c.name.as_str());
        strategy.push_str(&format!(
            " Opens with '{name}' at {} emphasis.",
            first.layout.emphasis.as_str()
        ));
    }
    if !skipped.is_empty() {
        strategy.push_str(&format!(
            " {} sections fall back to plain styling.",
            skipped.len()
        ));
    }
    strategy
}

impl PhaseOutput for IntelligenceOutput {
    fn status(&self) -> PhaseState {
        self.status
    }

    fn issues(&self) -> &[PhaseIssue] {
        &self.errors
    }
}

#[async_trait]
impl PhaseModule for IntelligenceModule {
    type Input = IntelligenceInput;
    type Output = IntelligenceOutput;

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    #[instrument(skip_all, fields(article_id = %input.article.id, sections = input.article.sections.len()))]
    async fn invoke(
        &self,
        input: &IntelligenceInput,
        cancel: &CancellationToken,
    ) -> Result<IntelligenceOutput> {
        drive(&self.core, self.plan(input, cancel)).await
    }

    fn validate_output(&self, output: &IntelligenceOutput) -> OutputValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if output.article_id.trim().is_empty() {
            errors.push("articleId is empty".to_string());
        }
        if output.status == PhaseState::Failed {
            errors.push("output status is failed".to_string());
        }
        if output.overall_strategy.trim().is_empty() {
            errors.push("overallStrategy is empty".to_string());
        }
        if output.mapped_sections != output.decisions.len() {
            errors.push(format!(
                "mappedSections {} does not match {} decisions",
                output.mapped_sections,
                output.decisions.len()
            ));
        }
        if output.total_sections != output.decisions.len() + output.skipped.len() {
            errors.push(format!(
                "totalSections {} does not equal decisions plus skipped ({})",
                output.total_sections,
                output.decisions.len() + output.skipped.len()
            ));
        }

        let mut seen = HashSet::new();
        for decision in &output.decisions {
            if !seen.insert(decision.section_id.as_str()) {
                errors.push(format!("section '{}' decided twice", decision.section_id));
            }
            if !(0.0..=1.0).contains(&decision.confidence) {
                errors.push(format!(
                    "section '{}' confidence {} outside 0..=1",
                    decision.section_id, decision.confidence
                ));
            }
            if !(1..=4).contains(&decision.layout.columns) {
                errors.push(format!(
                    "section '{}' has {} columns",
                    decision.section_id, decision.layout.columns
                ));
            }
            if decision.component_id.trim().is_empty() {
                errors.push(format!("section '{}' has no component", decision.section_id));
            }
        }
        for skip in &output.skipped {
            if !seen.insert(skip.section_id.as_str()) {
                errors.push(format!("section '{}' both decided and skipped", skip.section_id));
            }
            warnings.push(format!("section '{}' skipped: {}", skip.section_id, skip.reason));
        }
        OutputValidation::from_findings(errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_blend() {
        assert!((confidence(1.0, 100) - 1.0).abs() < 1e-9);
        assert!((confidence(0.5, 50) - 0.5).abs() < 1e-9);
        assert!((confidence(0.2, 80) - 0.32).abs() < 1e-9);
        assert_eq!(confidence(f64::NAN, 0), 0.0);
        assert_eq!(confidence(3.0, 255), 1.0);
    }

    #[test]
    fn test_describe_strategy_mentions_skips() {
        let skipped = vec![SkippedSection {
            section_id: "s1".to_string(),
            section_heading: "Odd".to_string(),
            reason: "low".to_string(),
            best_confidence: Some(0.2),
        }];
        let strategy = describe_strategy(&[], &skipped, &[]);
        assert!(strategy.starts_with("Mapped 0 of 1 sections"));
        assert!(strategy.contains("1 sections fall back"));
    }
}
