//! Phase status values and their transitions.
//!
//! A [`ModuleStatus`] is never mutated in place. Each lifecycle step is an
//! explicit [`StatusEvent`] and [`ModuleStatus::transition`] returns the next
//! value, so the lifecycle rules can be tested without running any module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// Lifecycle state of a phase module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    Pending,
    Running,
    Success,
    Partial,
    Failed,
}

impl PhaseState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Partial | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Partial,
    Failed,
}

impl From<Outcome> for PhaseState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => PhaseState::Success,
            Outcome::Partial => PhaseState::Partial,
            Outcome::Failed => PhaseState::Failed,
        }
    }
}

/// Events that drive a [`ModuleStatus`] forward.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// A new invocation began.
    Started { at: DateTime<Utc> },
    /// Work advanced; `progress` is clamped into `0..=1`.
    Progressed {
        progress: f64,
        message: Option<String>,
    },
    /// The invocation finished.
    Completed {
        outcome: Outcome,
        message: Option<String>,
        at: DateTime<Utc>,
    },
}

impl StatusEvent {
    pub fn started() -> Self {
        Self::Started { at: Utc::now() }
    }

    pub fn progressed(progress: f64, message: impl Into<String>) -> Self {
        Self::Progressed {
            progress,
            message: Some(message.into()),
        }
    }

    pub fn completed(outcome: Outcome, message: impl Into<String>) -> Self {
        Self::Completed {
            outcome,
            message: Some(message.into()),
            at: Utc::now(),
        }
    }
}

/// Self-reported status of a phase module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub phase: String,
    pub status: PhaseState,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ModuleStatus {
    /// Initial `pending` status for a freshly constructed module.
    pub fn pending(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            status: PhaseState::Pending,
            progress: 0.0,
            message: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Compute the status that follows `event`.
    ///
    /// `Started` is accepted from any state and resets the invocation.
    /// `Progressed` and `Completed` are only accepted while running, which
    /// keeps terminal states from being overwritten or regressing.
    pub fn transition(&self, event: StatusEvent) -> Result<ModuleStatus> {
        match event {
            StatusEvent::Started { at } => Ok(ModuleStatus {
                phase: self.phase.clone(),
                status: PhaseState::Running,
                progress: 0.0,
                message: None,
                started_at: Some(at),
                completed_at: None,
            }),
            StatusEvent::Progressed { progress, message } => {
                self.require_running("progressed")?;
                Ok(ModuleStatus {
                    progress: progress.clamp(0.0, 1.0).max(self.progress),
                    message: message.or_else(|| self.message.clone()),
                    ..self.clone()
                })
            }
            StatusEvent::Completed {
                outcome,
                message,
                at,
            } => {
                self.require_running("completed")?;
                Ok(ModuleStatus {
                    status: outcome.into(),
                    progress: 1.0,
                    message,
                    completed_at: Some(at),
                    ..self.clone()
                })
            }
        }
    }

    fn require_running(&self, event: &str) -> Result<()> {
        if self.status == PhaseState::Running {
            Ok(())
        } else {
            Err(PipelineError::StatusTransition(format!(
                "{} cannot accept '{}' while {}",
                self.phase, event, self.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_running_to_success() {
        let status = ModuleStatus::pending("codegen");
        assert_eq!(status.status, PhaseState::Pending);

        let running = status.transition(StatusEvent::started()).expect("start");
        assert_eq!(running.status, PhaseState::Running);
        assert!(running.started_at.is_some());

        let halfway = running
            .transition(StatusEvent::progressed(0.5, "3 of 6 components"))
            .expect("progress");
        assert_eq!(halfway.progress, 0.5);

        let done = halfway
            .transition(StatusEvent::completed(Outcome::Success, "done"))
            .expect("complete");
        assert_eq!(done.status, PhaseState::Success);
        assert_eq!(done.progress, 1.0);
        assert!(done.completed_at.is_some());
    }

    #[test]
    fn test_terminal_state_cannot_be_completed_twice() {
        let done = ModuleStatus::pending("validation")
            .transition(StatusEvent::started())
            .and_then(|s| s.transition(StatusEvent::completed(Outcome::Partial, "below")))
            .expect("lifecycle");

        let again = done.transition(StatusEvent::completed(Outcome::Success, "retry"));
        assert!(matches!(again, Err(PipelineError::StatusTransition(_))));

        let progress = done.transition(StatusEvent::progressed(0.1, "late"));
        assert!(progress.is_err());
    }

    #[test]
    fn test_progress_is_clamped_and_monotonic() {
        let running = ModuleStatus::pending("intelligence")
            .transition(StatusEvent::started())
            .expect("start");
        let over = running
            .transition(StatusEvent::progressed(4.0, "overshoot"))
            .expect("progress");
        assert_eq!(over.progress, 1.0);

        let back = over
            .transition(StatusEvent::progressed(0.2, "regress"))
            .expect("progress");
        assert_eq!(back.progress, 1.0);
    }

    #[test]
    fn test_restart_after_terminal() {
        let failed = ModuleStatus::pending("discovery")
            .transition(StatusEvent::started())
            .and_then(|s| s.transition(StatusEvent::completed(Outcome::Failed, "boom")))
            .expect("lifecycle");
        let restarted = failed.transition(StatusEvent::started()).expect("restart");
        assert_eq!(restarted.status, PhaseState::Running);
        assert!(restarted.completed_at.is_none());
        assert!(restarted.message.is_none());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = ModuleStatus::pending("codegen")
            .transition(StatusEvent::started())
            .expect("start");
        let json = serde_json::to_value(&status).expect("serialize");
        assert_eq!(json["status"], "running");
        assert!(json.get("startedAt").is_some());
        assert!(json.get("completedAt").is_none());
    }
}
