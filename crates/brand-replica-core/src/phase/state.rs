//! Shared state behind every phase module.

use std::sync::{Mutex, RwLock};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::warn;

use crate::domain::{ModuleConfig, ModuleStatus, Result, StatusEvent};

/// Status and configuration owned by one module instance.
///
/// Both live behind locks so modules can be driven through `&self`, which is
/// what lets [`PromptOverride`] restore configuration from `Drop`.
/// Invocations of one module are serialized by [`ModuleCore::begin_invocation`];
/// a status or prompt override therefore belongs to exactly one call.
#[derive(Debug)]
pub struct ModuleCore {
    phase: &'static str,
    config: RwLock<ModuleConfig>,
    status: Mutex<ModuleStatus>,
    invocation: AsyncMutex<()>,
}

impl ModuleCore {
    pub fn new(phase: &'static str, config: ModuleConfig) -> Self {
        Self {
            phase,
            config: RwLock::new(config),
            status: Mutex::new(ModuleStatus::pending(phase)),
            invocation: AsyncMutex::new(()),
        }
    }

    /// Wait for any in-flight invocation of this module, then hold the turn
    /// until the guard is dropped. Waiters are served in arrival order.
    pub async fn begin_invocation(&self) -> AsyncMutexGuard<'_, ()> {
        self.invocation.lock().await
    }

    pub fn phase(&self) -> &'static str {
        self.phase
    }

    /// Copy of the current status.
    pub fn status(&self) -> ModuleStatus {
        self.status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Copy of the current configuration.
    pub fn config(&self) -> ModuleConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Apply `event` and store the resulting status.
    pub fn record(&self, event: StatusEvent) -> Result<ModuleStatus> {
        let mut guard = self
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = guard.transition(event)?;
        *guard = next.clone();
        Ok(next)
    }

    /// Report progress; a rejected transition is logged and otherwise ignored.
    pub fn progress(&self, fraction: f64, message: impl Into<String>) {
        if let Err(e) = self.record(StatusEvent::progressed(fraction, message)) {
            warn!(phase = self.phase, error = %e, "progress update rejected");
        }
    }

    /// Install `prompt` as the custom prompt until the guard is dropped.
    pub fn override_prompt(&self, prompt: impl Into<String>) -> PromptOverride<'_> {
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = guard.custom_prompt.replace(prompt.into());
        PromptOverride {
            config: &self.config,
            previous: Some(previous),
        }
    }
}

/// Scoped custom-prompt override.
///
/// Restores the previous `custom_prompt` when dropped, which covers normal
/// return, `?` propagation, panics, and a dropped in-flight future alike.
#[must_use = "the override is reverted as soon as the guard is dropped"]
pub struct PromptOverride<'a> {
    config: &'a RwLock<ModuleConfig>,
    previous: Option<Option<String>>,
}

impl Drop for PromptOverride<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut guard = self
                .config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.custom_prompt = previous;
        }
    }
}
