//! Discovery phase: harvest component candidates and design DNA from a
//! reference site.
//!
//! Capturing (screenshots, DOM scraping, DNA extraction) is delegated to a
//! [`BrandCapture`] collaborator. This module bounds that call, normalizes
//! what comes back, and decides whether enough survived to continue.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::domain::{
    AiProvider, DesignDna, DiscoveredComponent, DiscoveryConfig, IssueKind, Outcome, PhaseIssue,
    PhaseState, PipelineError, Result, Screenshot,
};
use crate::obs;
use crate::phase::{
    call_external, drive, ModuleCore, OutputValidation, PhaseModule, PhaseOutput, PhaseRun,
};

pub const PHASE: &str = "discovery";

/// What the capture collaborator is asked for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub brand_id: String,
    pub target_url: String,
    pub ai_provider: AiProvider,
    pub model: Option<String>,
    pub custom_prompt: Option<String>,
}

/// Raw material returned by the capture collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCapture {
    pub candidates: Vec<DiscoveredComponent>,
    pub design_dna: DesignDna,
    pub screenshots: Vec<Screenshot>,
}

/// Screenshot/DOM-scraping collaborator.
#[async_trait]
pub trait BrandCapture: Send + Sync {
    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryInput {
    pub brand_id: String,
    pub target_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryOutput {
    pub brand_id: String,
    pub source_url: String,
    pub components: Vec<DiscoveredComponent>,
    pub design_dna: DesignDna,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
    #[serde(default)]
    pub errors: Vec<PhaseIssue>,
    pub status: PhaseState,
    pub timestamp: DateTime<Utc>,
}

/// The Discovery phase module.
pub struct DiscoveryModule {
    core: ModuleCore,
    max_components: usize,
    capture: Arc<dyn BrandCapture>,
}

impl DiscoveryModule {
    pub fn new(config: DiscoveryConfig, capture: Arc<dyn BrandCapture>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: ModuleCore::new(PHASE, config.module),
            max_components: config.max_components,
            capture,
        })
    }

    fn check_input(input: &DiscoveryInput) -> Result<()> {
        if input.brand_id.trim().is_empty() {
            return Err(PipelineError::invalid_input(PHASE, "brandId is empty"));
        }
        let url = input.target_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(PipelineError::invalid_input(
                PHASE,
                format!("targetUrl '{url}' is not an http(s) URL"),
            ));
        }
        Ok(())
    }

    async fn discover(
        &self,
        input: &DiscoveryInput,
        cancel: &CancellationToken,
    ) -> Result<PhaseRun<DiscoveryOutput>> {
        Self::check_input(input)?;
        let config = self.core.config();
        let request = CaptureRequest {
            brand_id: input.brand_id.clone(),
            target_url: input.target_url.trim().to_string(),
            ai_provider: config.ai_provider,
            model: config.model.clone(),
            custom_prompt: config.custom_prompt.clone(),
        };

        let raw = call_external(
            PHASE,
            &format!("capture {}", request.target_url),
            config.timeout_ms,
            cancel,
            self.capture.capture(&request),
        )
        .await?;
        self.core.progress(0.6, "capture received");

        let problems = raw.design_dna.problems();
        if !problems.is_empty() {
            return Err(PipelineError::phase_failed(
                PHASE,
                format!("design DNA unusable: {}", problems.join("; ")),
            ));
        }

        let (components, errors) = normalize_candidates(raw.candidates, self.max_components);
        if components.is_empty() {
            return Err(PipelineError::phase_failed(
                PHASE,
                "no valid component candidates were discovered",
            ));
        }

        let outcome = if errors.iter().any(PhaseIssue::is_degrading) {
            Outcome::Partial
        } else {
            Outcome::Success
        };
        let summary = format!(
            "{} components discovered, {} issues",
            components.len(),
            errors.len()
        );

        Ok(PhaseRun {
            output: DiscoveryOutput {
                brand_id: input.brand_id.clone(),
                source_url: request.target_url,
                components,
                design_dna: raw.design_dna,
                screenshots: raw.screenshots,
                errors,
                status: outcome.into(),
                timestamp: Utc::now(),
            },
            outcome,
            summary,
        })
    }
}

/// Trim, drop markup-less candidates, dedupe by selector, fill missing ids,
/// and cap the list at `max`.
fn normalize_candidates(
    candidates: Vec<DiscoveredComponent>,
    max: usize,
) -> (Vec<DiscoveredComponent>, Vec<PhaseIssue>) {
    let mut kept: Vec<DiscoveredComponent> = Vec::new();
    let mut errors = Vec::new();
    let mut selectors = HashSet::new();
    let mut ids = HashSet::new();

    for (index, mut candidate) in candidates.into_iter().enumerate() {
        candidate.name = candidate.name.trim().to_string();
        candidate.selector = candidate.selector.trim().to_string();
        if candidate.name.is_empty() {
            candidate.name = format!("component {}", index + 1);
        }
        let unit = candidate.name.clone();

        if candidate.html.trim().is_empty() {
            obs::emit_unit_failed(PHASE, &unit, &"candidate has no markup");
            errors.push(PhaseIssue::new(
                PHASE,
                unit,
                IssueKind::Skipped,
                "candidate has no markup",
            ));
            continue;
        }
        if !candidate.selector.is_empty() && !selectors.insert(candidate.selector.clone()) {
            debug!(selector = %candidate.selector, "dropping duplicate candidate");
            errors.push(PhaseIssue::new(
                PHASE,
                unit,
                IssueKind::Warning,
                format!("duplicate selector '{}'", candidate.selector),
            ));
            continue;
        }
        if candidate.id.trim().is_empty() || ids.contains(&candidate.id) {
            candidate.id = format!("discovered-{}", index + 1);
        }
        ids.insert(candidate.id.clone());
        kept.push(candidate);
    }

    if kept.len() > max {
        errors.push(PhaseIssue::new(
            PHASE,
            "candidates",
            IssueKind::Warning,
            format!("kept the first {max} of {} candidates", kept.len()),
        ));
        kept.truncate(max);
    }
    (kept, errors)
}

impl PhaseOutput for DiscoveryOutput {
    fn status(&self) -> PhaseState {
        self.status
    }

    fn issues(&self) -> &[PhaseIssue] {
        &self.errors
    }
}

#[async_trait]
impl PhaseModule for DiscoveryModule {
    type Input = DiscoveryInput;
    type Output = DiscoveryOutput;

    fn core(&self) -> &ModuleCore {
        &self.core
    }

    #[instrument(skip_all, fields(brand_id = %input.brand_id))]
    async fn invoke(
        &self,
        input: &DiscoveryInput,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryOutput> {
        drive(&self.core, self.discover(input, cancel)).await
    }

    fn validate_output(&self, output: &DiscoveryOutput) -> OutputValidation {
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
        let mut ids = HashSet::new();
        for component in &output.components {
            if !ids.insert(component.id.as_str()) {
                errors.push(format!("duplicate component id '{}'", component.id));
            }
            if component.html.trim().is_empty() {
                errors.push(format!("component '{}' has no markup", component.id));
            }
            if component.css.trim().is_empty() {
                warnings.push(format!("component '{}' has no CSS", component.id));
            }
        }
        errors.extend(
            output
                .design_dna
                .problems()
                .into_iter()
                .map(|p| format!("design DNA: {p}")),
        );
        if output.screenshots.is_empty() {
            warnings.push("no reference screenshots captured".to_string());
        }
        OutputValidation::from_findings(errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, selector: &str, html: &str) -> DiscoveredComponent {
        DiscoveredComponent {
            id: id.to_string(),
            name: format!(" {id} "),
            selector: selector.to_string(),
            html: html.to_string(),
            ..DiscoveredComponent::default()
        }
    }

    #[test]
    fn test_normalize_drops_empty_and_duplicates() {
        let (kept, errors) = normalize_candidates(
            vec![
                candidate("hero", ".hero", "<section/>"),
                candidate("empty", ".empty", "  "),
                candidate("hero-copy", ".hero", "<section/>"),
                candidate("", ".card", "<div/>"),
            ],
            10,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "hero");
        assert_eq!(kept[1].id, "discovered-4");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, IssueKind::Skipped);
        assert_eq!(errors[1].kind, IssueKind::Warning);
    }

    #[test]
    fn test_normalize_caps_candidates() {
        let many = (0..5)
            .map(|i| candidate(&format!("c{i}"), &format!(".c{i}"), "<div/>"))
            .collect();
        let (kept, errors) = normalize_candidates(many, 3);
        assert_eq!(kept.len(), 3);
        assert!(!errors[0].is_degrading());
    }

    #[test]
    fn test_check_input() {
        let ok = DiscoveryInput {
            brand_id: "acme".to_string(),
            target_url: "https://acme.test".to_string(),
        };
        assert!(DiscoveryModule::check_input(&ok).is_ok());
        let bad = DiscoveryInput {
            target_url: "acme.test".to_string(),
            ..ok
        };
        assert!(matches!(
            DiscoveryModule::check_input(&bad),
            Err(PipelineError::InvalidInput { .. })
        ));
    }
}
