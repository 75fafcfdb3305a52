//! In-memory collaborators (testing only)
//!
//! Provides `StaticCapture`, `ScriptedGenerator`, `StallingAdvisor`,
//! `FailingAdvisor` and `FixedComparator`, which satisfy the collaborator
//! traits deterministically and record what they were asked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::codegen::{ComponentGenerator, GeneratedComponent, GenerationRequest};
use crate::discovery::{BrandCapture, CaptureRequest, RawCapture};
use crate::domain::{ComponentVariant, DesignDna, PipelineError, Result, Screenshot};
use crate::intelligence::{CandidateFit, KeywordAdvisor, RankingRequest, SectionAdvisor};
use crate::validation::VisualComparator;

// ---------------------------------------------------------------------------
// StaticCapture
// ---------------------------------------------------------------------------

/// Capture collaborator returning the same [`RawCapture`] every time.
#[derive(Debug)]
pub struct StaticCapture {
    capture: RawCapture,
    requests: Mutex<Vec<CaptureRequest>>,
}

impl StaticCapture {
    pub fn new(capture: RawCapture) -> Self {
        Self {
            capture,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrandCapture for StaticCapture {
    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.capture.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// What a scripted generator does for one attempt.
#[derive(Debug, Clone)]
pub enum Scripted {
    Draft(GeneratedComponent),
    Fail(String),
    /// Never answers; the phase's timeout decides.
    Hang,
}

/// Generator whose drafts are scripted per discovered component id.
///
/// Attempt `n` uses the `n`-th scripted step, repeating the last one. Ids
/// without a script get [`on_brand_draft`].
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    scripts: HashMap<String, Vec<Scripted>>,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, component_id: &str, steps: Vec<Scripted>) -> Self {
        self.scripts.insert(component_id.to_string(), steps);
        self
    }

    /// Always return `css` (and the on-brand template) for `component_id`.
    pub fn with_css(self, component_id: &str, css: &str) -> Self {
        let draft = GeneratedComponent {
            name: component_id.to_string(),
            css: css.to_string(),
            html_template: format!("<div class=\"{component_id}\"><h2>{{{{title}}}}</h2>{{{{content}}}}</div>"),
            ..GeneratedComponent::default()
        };
        self.script(component_id, vec![Scripted::Draft(draft)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComponentGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedComponent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let step = self.scripts.get(&request.component.id).and_then(|steps| {
            let index = (request.attempt as usize).saturating_sub(1);
            steps.get(index).or_else(|| steps.last()).cloned()
        });
        match step {
            None => Ok(on_brand_draft(&request.component.id, &request.design_dna)),
            Some(Scripted::Draft(draft)) => Ok(draft),
            Some(Scripted::Fail(message)) => Err(PipelineError::Collaborator(message)),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PipelineError::Collaborator("hung generator woke up".to_string()))
            }
        }
    }
}

/// Kebab-case class name for a component id.
fn class_name(component_id: &str) -> String {
    let slug: String = component_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("c-{}", slug.trim_matches('-'))
}

/// A draft that uses the whole palette, both fonts, the brand radius and the
/// spacing scale, with hover, focus and transition states.
pub fn on_brand_draft(component_id: &str, dna: &DesignDna) -> GeneratedComponent {
    let class = class_name(component_id);
    let palette = dna.palette();
    let primary = palette.first().cloned().unwrap_or_else(|| "#000000".to_string());
    let secondary = palette.get(1).cloned().unwrap_or_else(|| primary.clone());
    let accent = palette.get(2).cloned().unwrap_or_else(|| secondary.clone());
    let unit = dna.spacing.base_unit_px;
    let radius = dna.shape.border_radius_px.unwrap_or(unit / 2.0);

    let css = format!(
        ".{class} {{ color: {secondary}; background-color: {primary}; border-color: {accent}; \
         font-family: {body}, sans-serif; border-radius: {radius}px; padding: {pad}px; \
         margin: {unit}px 0; transition: opacity 200ms ease; }}\n\
         .{class} h2 {{ font-family: {heading}, sans-serif; }}\n\
         .{class}:hover {{ opacity: 0.92; }}\n\
         .{class}:focus-within {{ outline: 2px solid {accent}; }}\n\
         @media (max-width: 768px) {{ .{class} {{ padding: {unit}px; }} }}",
        body = dna.typography.body_font,
        heading = dna.typography.heading_font,
        pad = unit * 2.0,
    );
    let html_template = format!(
        "<div class=\"{class}\"><h2>{{{{title}}}}</h2>{{{{content}}}}<ul>{{{{items}}}}</ul>\
         <a class=\"button\" href=\"{{{{ctaUrl}}}}\">{{{{ctaText}}}}</a></div>"
    );
    GeneratedComponent {
        name: component_id.to_string(),
        purpose: format!("{component_id} section"),
        usage_context: format!("{component_id} content"),
        css,
        preview_html: String::new(),
        variants: vec![ComponentVariant {
            id: String::new(),
            name: "Compact".to_string(),
            css_override: format!(".{class} {{ padding: {unit}px; }}"),
            html_template: None,
        }],
        html_template,
    }
}

// ---------------------------------------------------------------------------
// Advisors
// ---------------------------------------------------------------------------

/// Advisor that signals when it is first asked, then never answers.
#[derive(Debug, Default)]
pub struct StallingAdvisor {
    entered: Notify,
}

impl StallingAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once `rank` has been called.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl SectionAdvisor for StallingAdvisor {
    async fn rank(&self, _request: &RankingRequest<'_>) -> Result<Vec<CandidateFit>> {
        self.entered.notify_one();
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }
}

/// Advisor failing every ranking whose section id is listed.
#[derive(Debug, Default)]
pub struct FailingAdvisor {
    section_ids: Vec<String>,
}

impl FailingAdvisor {
    pub fn for_sections(section_ids: &[&str]) -> Self {
        Self {
            section_ids: section_ids.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SectionAdvisor for FailingAdvisor {
    async fn rank(&self, request: &RankingRequest<'_>) -> Result<Vec<CandidateFit>> {
        if self.section_ids.iter().any(|id| *id == request.section.id) {
            return Err(PipelineError::Collaborator(format!(
                "advisor unavailable for {}",
                request.section.id
            )));
        }
        KeywordAdvisor.rank(request).await
    }
}

// ---------------------------------------------------------------------------
// FixedComparator
// ---------------------------------------------------------------------------

/// Comparator returning a fixed similarity, or failing when none is set.
#[derive(Debug, Default)]
pub struct FixedComparator {
    similarity: Option<f64>,
    calls: AtomicUsize,
}

impl FixedComparator {
    pub fn new(similarity: f64) -> Self {
        Self {
            similarity: Some(similarity),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisualComparator for FixedComparator {
    async fn similarity(&self, _rendered_html: &str, _references: &[Screenshot]) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.similarity
            .ok_or_else(|| PipelineError::Collaborator("comparator offline".to_string()))
    }
}
