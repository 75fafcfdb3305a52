//! Brand Replica tooling
//!
//! The `brand-replica` command scores rendered articles and checks saved
//! phase outputs without contacting any AI collaborator.
//!
//! ## Commands
//!
//! - `score`: run Validation on a rendered HTML document
//! - `check`: run a phase's output validation on a saved output JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, Level};

use brand_replica_core::{
    BrandCapture, CaptureRequest, CodeGenModule, CodeGenOutput, ComponentGenerator, DesignDna,
    DiscoveryModule, DiscoveryOutput, GeneratedComponent, GenerationRequest, IntelligenceModule,
    IntelligenceOutput, OutputValidation, PhaseModule, PipelineConfig, PipelineError, RawCapture,
    ValidationInput, ValidationModule, ValidationOutput,
};

/// Exit status when a scored document misses its thresholds.
const EXIT_BELOW_THRESHOLD: i32 = 2;

#[derive(Parser)]
#[command(name = "brand-replica")]
#[command(version = brand_replica_core::VERSION)]
#[command(about = "Brand replication pipeline tooling", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a rendered article against a brand's design DNA
    Score {
        /// Rendered HTML document
        #[arg(long)]
        html: PathBuf,

        /// Design DNA (JSON)
        #[arg(long)]
        dna: PathBuf,

        /// Pipeline configuration (.toml or .json); defaults apply if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a saved phase output
    Check {
        /// Phase that produced the output
        #[arg(long, value_enum)]
        phase: Phase,

        /// Saved output (JSON)
        file: PathBuf,

        /// Pipeline configuration (.toml or .json); defaults apply if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Phase {
    Discovery,
    Codegen,
    Intelligence,
    Validation,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    brand_replica_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Score { html, dna, config } => {
            let passes = cmd_score(&html, &dna, config.as_deref()).await?;
            if !passes {
                std::process::exit(EXIT_BELOW_THRESHOLD);
            }
            Ok(())
        }
        Commands::Check {
            phase,
            file,
            config,
        } => cmd_check(phase, &file, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {what}: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{what} is not valid JSON: {}", path.display()))
}

async fn cmd_score(html: &Path, dna: &Path, config: Option<&Path>) -> Result<bool> {
    let config = load_config(config)?;
    let rendered_html = std::fs::read_to_string(html)
        .with_context(|| format!("Failed to read document: {}", html.display()))?;
    let design_dna: DesignDna = read_json(dna, "design DNA")?;

    let module = ValidationModule::new(config.validation).context("Invalid validation config")?;
    let input = ValidationInput {
        rendered_html,
        decisions: Vec::new(),
        components: Vec::new(),
        design_dna,
        reference_screenshots: Vec::new(),
    };
    let output = module
        .run(&input)
        .await
        .with_context(|| format!("Failed to score {}", html.display()))?;

    info!(
        event = "cli.scored",
        overall = output.overall,
        passes = output.passes_threshold,
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(output.passes_threshold)
}

fn cmd_check(phase: Phase, file: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    debug!(?phase, file = %file.display(), "checking saved output");

    let report = match phase {
        Phase::Discovery => {
            let output: DiscoveryOutput = read_json(file, "discovery output")?;
            DiscoveryModule::new(config.discovery, Arc::new(Offline))?.validate_output(&output)
        }
        Phase::Codegen => {
            let output: CodeGenOutput = read_json(file, "codegen output")?;
            CodeGenModule::new(config.codegen, Arc::new(Offline))?.validate_output(&output)
        }
        Phase::Intelligence => {
            let output: IntelligenceOutput = read_json(file, "intelligence output")?;
            IntelligenceModule::with_keyword_advisor(config.intelligence)?
                .validate_output(&output)
        }
        Phase::Validation => {
            let output: ValidationOutput = read_json(file, "validation output")?;
            ValidationModule::new(config.validation)?.validate_output(&output)
        }
    };

    print_findings(&report)?;
    if !report.valid {
        anyhow::bail!("{} error(s) in {}", report.errors.len(), file.display());
    }
    Ok(())
}

fn print_findings(report: &OutputValidation) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Collaborator used where a module is built only to check saved outputs.
struct Offline;

#[async_trait]
impl BrandCapture for Offline {
    async fn capture(&self, request: &CaptureRequest) -> brand_replica_core::Result<RawCapture> {
        Err(offline(&request.target_url))
    }
}

#[async_trait]
impl ComponentGenerator for Offline {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> brand_replica_core::Result<GeneratedComponent> {
        Err(offline(&request.component.id))
    }
}

fn offline(target: &str) -> PipelineError {
    PipelineError::Collaborator(format!("no collaborator configured for {target}"))
}
