//! Domain models for the brand replication pipeline.
//!
//! - `brand`: design DNA, discovered and generated components
//! - `article`: article sections, layouts and section design decisions
//! - `score`: score breakdowns, checklist outcomes, unit issues
//! - `status`: module status values and their transitions
//! - `config`: per-phase configuration

pub mod article;
pub mod brand;
pub mod config;
pub mod error;
pub mod score;
pub mod status;

pub use article::{
    Article, ArticleSection, ContentMapping, Emphasis, Layout, LayoutOverride, PositionContext,
    SectionDesignDecision, SectionPosition, SemanticRole, SkippedSection, WidthClass,
};
pub use brand::{
    BrandComponent, ColorTokens, ComponentVariant, DesignDna, DiscoveredComponent, MotionTokens,
    Screenshot, ShapeTokens, SpacingTokens, TypographyTokens,
};
pub use config::{
    default_wow_factor_checklist, AiProvider, CategoryWeights, CodeGenConfig, ContextConfig,
    CssStandards, DimensionWeights, DiscoveryConfig, IntelligenceConfig, ModuleConfig,
    PipelineConfig, Thresholds, ValidationConfig, WowCriterion, WowFactorCheck,
};
pub use error::{ErrorKind, PipelineError, Result};
pub use score::{IssueKind, PhaseIssue, ScoreBreakdown, WowFactorItem};
pub use status::{ModuleStatus, Outcome, PhaseState, StatusEvent};
