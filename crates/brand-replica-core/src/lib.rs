//! Brand Replication Pipeline core library
//!
//! Discovery harvests a brand's components and design DNA, CodeGen turns
//! them into a scored component library, Intelligence maps article sections
//! onto that library, and Validation scores the rendered article against
//! the brand. [`BrandPipeline`] runs the four phases in sequence.

pub mod codegen;
pub mod css;
pub mod discovery;
pub mod domain;
pub mod fakes;
pub mod intelligence;
pub mod markup;
pub mod obs;
pub mod orchestrator;
pub mod phase;
pub mod render;
pub mod reporting;
pub mod telemetry;
pub mod validation;

pub use domain::{
    AiProvider, Article, ArticleSection, BrandComponent, CategoryWeights, CodeGenConfig,
    ComponentVariant, ContentMapping, CssStandards, DesignDna, DiscoveredComponent,
    DiscoveryConfig, ErrorKind, IntelligenceConfig, IssueKind, Layout, LayoutOverride,
    ModuleConfig, ModuleStatus, Outcome, PhaseIssue, PhaseState, PipelineConfig, PipelineError,
    Result, ScoreBreakdown, Screenshot, SectionDesignDecision, SemanticRole, SkippedSection,
    StatusEvent, Thresholds, ValidationConfig, WowCriterion, WowFactorCheck, WowFactorItem,
};

pub use phase::{OutputValidation, PhaseModule, PhaseOutput, PromptOverride};

pub use discovery::{
    BrandCapture, CaptureRequest, DiscoveryInput, DiscoveryModule, DiscoveryOutput, RawCapture,
};

pub use codegen::{
    compile_css, score_css, CodeGenInput, CodeGenModule, CodeGenOutput, ComponentGenerator,
    GeneratedComponent, GenerationRequest, MatchReport,
};

pub use intelligence::{
    CandidateFit, IntelligenceInput, IntelligenceModule, IntelligenceOutput, KeywordAdvisor,
    RankingRequest, SectionAdvisor,
};

pub use validation::{
    passes_threshold, weighted_overall, CategoryScores, ValidationInput, ValidationModule,
    ValidationOutput, VisualComparator,
};

pub use orchestrator::{BrandPipeline, Collaborators, PhaseReport, PipelineRequest, PipelineRun};

pub use render::render_article;

pub use reporting::{read_run_report, write_run_report};

pub use telemetry::init_tracing;

/// Crate version, reported by the tooling binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
