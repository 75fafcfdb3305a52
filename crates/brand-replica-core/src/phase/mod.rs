//! The phase module contract shared by Discovery, CodeGen, Intelligence and
//! Validation.
//!
//! # Module layout
//!
//! - [`state`]: `ModuleCore`, the status/config state every module embeds, and
//!   the `PromptOverride` guard
//! - [`external`]: timeout- and cancellation-aware wrapper for collaborator calls

pub mod state;
pub mod external;

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::{ModuleStatus, Outcome, PhaseIssue, PhaseState, Result, StatusEvent};
use crate::obs;

pub use self::state::{ModuleCore, PromptOverride};
pub use self::external::{call_external, ensure_active};

/// Result of a structural output check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl OutputValidation {
    pub fn from_findings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Status and unit issues every phase output carries.
pub trait PhaseOutput {
    fn status(&self) -> PhaseState;
    fn issues(&self) -> &[PhaseIssue];

    /// Whether the output may be handed to the next phase.
    fn is_forwardable(&self) -> bool {
        self.status() != PhaseState::Failed
    }
}

/// What a module's work produced before status bookkeeping.
#[derive(Debug)]
pub struct PhaseRun<T> {
    pub output: T,
    pub outcome: Outcome,
    pub summary: String,
}

/// A unit of pipeline work with typed input and output.
///
/// Modules implement `invoke`; callers use `execute`, `run` or
/// `run_with_prompt`, which take the module's invocation turn first so
/// overlapping calls on one instance run one after another.
///
/// `execute` returns `Err` when no truthful output can be produced: invalid
/// input, total failure, or cancellation. Modules whose input was processed
/// but yielded nothing usable may instead return an output whose `status` is
/// `failed`; callers must treat that exactly like an error and never pass it
/// downstream.
#[async_trait]
pub trait PhaseModule: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    fn core(&self) -> &ModuleCore;

    /// Stable phase identifier.
    fn phase_name(&self) -> &'static str {
        self.core().phase()
    }

    /// Copy of the current status.
    fn status(&self) -> ModuleStatus {
        self.core().status()
    }

    /// The phase's work. Only called while holding the invocation turn.
    async fn invoke(&self, input: &Self::Input, cancel: &CancellationToken)
        -> Result<Self::Output>;

    /// Run the phase, honoring `cancel` at every external call.
    async fn execute(
        &self,
        input: &Self::Input,
        cancel: &CancellationToken,
    ) -> Result<Self::Output> {
        let _turn = self.core().begin_invocation().await;
        self.invoke(input, cancel).await
    }

    /// Pure structural check of an output, independent of `execute`.
    fn validate_output(&self, output: &Self::Output) -> OutputValidation;

    /// Run without a cancellation signal.
    async fn run(&self, input: &Self::Input) -> Result<Self::Output> {
        self.execute(input, &CancellationToken::new()).await
    }

    /// Run with `prompt` installed as the custom prompt for this call only.
    ///
    /// The override is installed after taking the invocation turn and
    /// reverted before releasing it.
    async fn run_with_prompt(&self, input: &Self::Input, prompt: &str) -> Result<Self::Output> {
        let _turn = self.core().begin_invocation().await;
        let _override = self.core().override_prompt(prompt);
        self.invoke(input, &CancellationToken::new()).await
    }
}

/// Wrap a module's work with the status lifecycle.
///
/// Records `Started`, awaits `work`, then records exactly one terminal
/// `Completed` event for both the `Ok` and `Err` paths. A rejected terminal
/// transition is logged; it never replaces the work's own result.
pub async fn drive<T, F>(core: &ModuleCore, work: F) -> Result<T>
where
    F: Future<Output = Result<PhaseRun<T>>>,
{
    core.record(StatusEvent::started())?;
    obs::emit_phase_started(core.phase());
    let started = Instant::now();

    match work.await {
        Ok(run) => {
            finish(core, StatusEvent::completed(run.outcome, run.summary));
            obs::emit_phase_finished(
                core.phase(),
                run.outcome,
                started.elapsed().as_millis() as u64,
            );
            Ok(run.output)
        }
        Err(e) => {
            let message = if e.is_cancellation() {
                "cancelled by caller".to_string()
            } else {
                e.to_string()
            };
            finish(core, StatusEvent::completed(Outcome::Failed, message));
            obs::emit_phase_finished(
                core.phase(),
                Outcome::Failed,
                started.elapsed().as_millis() as u64,
            );
            Err(e)
        }
    }
}

fn finish(core: &ModuleCore, event: StatusEvent) {
    if let Err(e) = core.record(event) {
        warn!(phase = core.phase(), error = %e, "terminal status rejected");
    }
}
