//! Phase configuration surface.
//!
//! Every phase config embeds a [`ModuleConfig`] (flattened on the wire) plus
//! its own knobs. Configs are instance-scoped: each module owns a copy, so
//! concurrent runs for different brands never observe each other's overrides.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::article::LayoutOverride;
use crate::domain::error::{PipelineError, Result};

/// Generative model provider used by collaborators.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Anthropic,
    Gemini,
}

/// Options shared by every phase.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleConfig {
    pub ai_provider: AiProvider,
    pub api_key: String,
    pub model: Option<String>,
    pub debug: bool,
    pub custom_prompt: Option<String>,
    /// Per external call.
    pub timeout_ms: u64,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            ai_provider: AiProvider::Anthropic,
            api_key: String::new(),
            model: None,
            debug: false,
            custom_prompt: None,
            timeout_ms: 30_000,
        }
    }
}

impl std::fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("ai_provider", &self.ai_provider)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("debug", &self.debug)
            .field("custom_prompt", &self.custom_prompt)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ModuleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "timeoutMs must be greater than zero".to_string(),
            ));
        }
        if matches!(&self.model, Some(m) if m.trim().is_empty()) {
            return Err(PipelineError::InvalidConfig(
                "model must not be blank when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Discovery knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    #[serde(flatten)]
    pub module: ModuleConfig,
    /// Upper bound on components forwarded to CodeGen.
    pub max_components: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            module: ModuleConfig::default(),
            max_components: 24,
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        self.module.validate()?;
        if self.max_components == 0 {
            return Err(PipelineError::InvalidConfig(
                "maxComponents must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Relative weights of the match-score dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DimensionWeights {
    pub color: f64,
    pub shape: f64,
    pub spacing: f64,
    pub typography: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            color: 0.35,
            shape: 0.2,
            spacing: 0.2,
            typography: 0.25,
        }
    }
}

impl DimensionWeights {
    pub fn total(&self) -> f64 {
        self.color + self.shape + self.spacing + self.typography
    }
}

/// CSS rules generated components must follow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CssStandards {
    pub require_hover_states: bool,
    pub require_focus_states: bool,
    pub require_transitions: bool,
    pub require_responsive: bool,
    pub require_css_variables: bool,
    pub weights: DimensionWeights,
}

impl Default for CssStandards {
    fn default() -> Self {
        Self {
            require_hover_states: true,
            require_focus_states: false,
            require_transitions: false,
            require_responsive: false,
            require_css_variables: false,
            weights: DimensionWeights::default(),
        }
    }
}

/// CodeGen knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeGenConfig {
    #[serde(flatten)]
    pub module: ModuleConfig,
    pub min_match_score: u8,
    pub max_iterations: u32,
    /// Components generated concurrently.
    pub concurrency: usize,
    pub css_standards: CssStandards,
}

impl Default for CodeGenConfig {
    fn default() -> Self {
        Self {
            module: ModuleConfig::default(),
            min_match_score: 70,
            max_iterations: 3,
            concurrency: 4,
            css_standards: CssStandards::default(),
        }
    }
}

impl CodeGenConfig {
    pub fn validate(&self) -> Result<()> {
        self.module.validate()?;
        if !(1..=100).contains(&self.min_match_score) {
            return Err(PipelineError::InvalidConfig(format!(
                "minMatchScore must be within 1..=100, got {}",
                self.min_match_score
            )));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig(
                "maxIterations must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        let w = &self.css_standards.weights;
        validate_weights(
            "cssStandards.weights",
            &[w.color, w.shape, w.spacing, w.typography],
        )
    }
}

/// Intelligence context knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    /// Sections whose best candidate falls below this are skipped.
    pub min_confidence: f64,
    /// Let position context promote the first section to hero emphasis.
    pub hero_first_section: bool,
    pub max_columns: u8,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.35,
            hero_first_section: true,
            max_columns: 4,
        }
    }
}

/// Intelligence knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IntelligenceConfig {
    #[serde(flatten)]
    pub module: ModuleConfig,
    pub context_config: ContextConfig,
    /// Semantic role label to partial layout.
    pub layout_overrides: BTreeMap<String, LayoutOverride>,
}

impl IntelligenceConfig {
    pub fn validate(&self) -> Result<()> {
        self.module.validate()?;
        let ctx = &self.context_config;
        if !(0.0..=1.0).contains(&ctx.min_confidence) {
            return Err(PipelineError::InvalidConfig(format!(
                "contextConfig.minConfidence must be within 0..=1, got {}",
                ctx.min_confidence
            )));
        }
        if !(1..=4).contains(&ctx.max_columns) {
            return Err(PipelineError::InvalidConfig(format!(
                "contextConfig.maxColumns must be within 1..=4, got {}",
                ctx.max_columns
            )));
        }
        for (role, layout) in &self.layout_overrides {
            if let Some(columns) = layout.columns {
                if !(1..=4).contains(&columns) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "layoutOverrides.{role}.columns must be within 1..=4, got {columns}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Minimum percentage per category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    pub brand_match: f64,
    pub design_quality: f64,
    pub user_experience: f64,
    /// Optional additional gate on the weighted overall score.
    pub overall: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            brand_match: 70.0,
            design_quality: 70.0,
            user_experience: 70.0,
            overall: None,
        }
    }
}

/// Category weights for the overall score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryWeights {
    pub brand_match: f64,
    pub design_quality: f64,
    pub user_experience: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            brand_match: 0.5,
            design_quality: 0.3,
            user_experience: 0.2,
        }
    }
}

/// Deterministic test a checklist item applies to the rendered HTML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WowCriterion {
    /// An element whose class mentions `hero`.
    HasHero,
    /// At least one button or CTA-classed link.
    HasCallToAction,
    /// At least `min_colors` palette colors appear in the stylesheet.
    #[serde(rename_all = "camelCase")]
    UsesBrandColors { min_colors: usize },
    /// Every brand font family appears in the stylesheet.
    UsesBrandFonts,
    HoverStates,
    Transitions,
    ResponsiveLayout,
    /// At least `min` distinct components are rendered.
    DistinctComponents { min: usize },
    /// The document matches a regular expression.
    MatchesPattern { pattern: String },
}

/// Configured checklist entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WowFactorCheck {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub criterion: WowCriterion,
}

impl WowFactorCheck {
    pub fn new(id: &str, label: &str, required: bool, criterion: WowCriterion) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            required,
            criterion,
        }
    }
}

/// The checklist used when none is configured.
pub fn default_wow_factor_checklist() -> Vec<WowFactorCheck> {
    vec![
        WowFactorCheck::new("hero", "Opens with a hero section", true, WowCriterion::HasHero),
        WowFactorCheck::new(
            "cta",
            "Contains a call to action",
            true,
            WowCriterion::HasCallToAction,
        ),
        WowFactorCheck::new(
            "brand-colors",
            "Uses the brand palette",
            true,
            WowCriterion::UsesBrandColors { min_colors: 2 },
        ),
        WowFactorCheck::new(
            "responsive",
            "Adapts to small screens",
            true,
            WowCriterion::ResponsiveLayout,
        ),
        WowFactorCheck::new(
            "hover",
            "Interactive hover states",
            false,
            WowCriterion::HoverStates,
        ),
        WowFactorCheck::new(
            "variety",
            "Visual variety across sections",
            false,
            WowCriterion::DistinctComponents { min: 3 },
        ),
    ]
}

/// Validation knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    #[serde(flatten)]
    pub module: ModuleConfig,
    pub thresholds: Thresholds,
    pub weights: CategoryWeights,
    pub wow_factor_checklist: Vec<WowFactorCheck>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            module: ModuleConfig::default(),
            thresholds: Thresholds::default(),
            weights: CategoryWeights::default(),
            wow_factor_checklist: default_wow_factor_checklist(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<()> {
        self.module.validate()?;
        let t = &self.thresholds;
        for (name, value) in [
            ("brandMatch", t.brand_match),
            ("designQuality", t.design_quality),
            ("userExperience", t.user_experience),
        ]
        .into_iter()
        .chain(t.overall.map(|o| ("overall", o)))
        {
            if !(0.0..=100.0).contains(&value) {
                return Err(PipelineError::InvalidConfig(format!(
                    "thresholds.{name} must be within 0..=100, got {value}"
                )));
            }
        }
        let w = &self.weights;
        validate_weights(
            "weights",
            &[w.brand_match, w.design_quality, w.user_experience],
        )?;

        let mut seen = HashSet::new();
        for check in &self.wow_factor_checklist {
            if !seen.insert(check.id.as_str()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate wowFactorChecklist id '{}'",
                    check.id
                )));
            }
            if let WowCriterion::MatchesPattern { pattern } = &check.criterion {
                regex::Regex::new(pattern).map_err(|e| {
                    PipelineError::InvalidConfig(format!(
                        "wowFactorChecklist '{}' pattern is invalid: {e}",
                        check.id
                    ))
                })?;
            }
        }
        Ok(())
    }
}

/// Negative or all-zero weights have no meaningful weighted average.
fn validate_weights(name: &str, weights: &[f64]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "{name} must be finite and non-negative"
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(PipelineError::InvalidConfig(format!(
            "{name} must not all be zero"
        )));
    }
    Ok(())
}

/// Configuration for a whole pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub discovery: DiscoveryConfig,
    pub codegen: CodeGenConfig,
    pub intelligence: IntelligenceConfig,
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    /// Load from a `.toml` or `.json` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&text)
                .map_err(|e| PipelineError::InvalidConfig(format!("{}: {e}", path.display())))?,
            _ => serde_json::from_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.discovery.validate()?;
        self.codegen.validate()?;
        self.intelligence.validate()?;
        self.validation.validate()
    }
}
