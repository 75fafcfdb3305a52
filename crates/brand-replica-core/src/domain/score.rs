//! Scoring results and phase issue records.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// Immutable result of one scoring category.
///
/// `percentage` is `score / max_score` on a `0..=100` scale and is always
/// derived, never stored independently. Deserialization re-checks the
/// `max_score > 0` invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "RawScoreBreakdown")]
pub struct ScoreBreakdown {
    score: f64,
    max_score: f64,
    percentage: f64,
    details: Vec<String>,
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScoreBreakdown {
    score: f64,
    max_score: f64,
    #[serde(default)]
    details: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

impl TryFrom<RawScoreBreakdown> for ScoreBreakdown {
    type Error = PipelineError;

    fn try_from(raw: RawScoreBreakdown) -> Result<Self> {
        ScoreBreakdown::new(raw.score, raw.max_score, raw.details, raw.suggestions)
    }
}

impl ScoreBreakdown {
    /// Build a breakdown; `score` is clamped into `0..=max_score`.
    pub fn new(
        score: f64,
        max_score: f64,
        details: Vec<String>,
        suggestions: Vec<String>,
    ) -> Result<Self> {
        if !(max_score > 0.0) || !max_score.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "score breakdown max score must be positive, got {max_score}"
            )));
        }
        let score = if score.is_finite() {
            score.clamp(0.0, max_score)
        } else {
            0.0
        };
        Ok(Self {
            score,
            max_score,
            percentage: score / max_score * 100.0,
            details,
            suggestions,
        })
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// `0..=100`.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

/// One evaluated checklist criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WowFactorItem {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Classification of a unit-level problem inside a phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// The unit's external call failed.
    Failed,
    /// The unit's external call exceeded its timeout.
    TimedOut,
    /// The unit completed but below the configured quality bar.
    BelowThreshold,
    /// The unit was intentionally left out.
    Skipped,
    /// The caller cancelled the work before it finished.
    Cancelled,
    /// Advisory only; does not affect status.
    Warning,
}

/// A problem with one unit of work (a component, a section, a candidate).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseIssue {
    pub phase: String,
    pub unit: String,
    pub kind: IssueKind,
    pub message: String,
}

impl PhaseIssue {
    pub fn new(phase: &str, unit: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            phase: phase.to_string(),
            unit: unit.into(),
            kind,
            message: message.into(),
        }
    }

    /// Whether this issue degrades the phase to `partial`.
    pub fn is_degrading(&self) -> bool {
        self.kind != IssueKind::Warning
    }
}

impl std::fmt::Display for PhaseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.phase, self.unit, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_is_derived() {
        let b = ScoreBreakdown::new(30.0, 40.0, vec![], vec![]).expect("valid");
        assert_eq!(b.percentage(), 75.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let b = ScoreBreakdown::new(120.0, 100.0, vec![], vec![]).expect("valid");
        assert_eq!(b.score(), 100.0);
        let b = ScoreBreakdown::new(-5.0, 100.0, vec![], vec![]).expect("valid");
        assert_eq!(b.percentage(), 0.0);
    }

    #[test]
    fn test_zero_max_score_rejected() {
        assert!(ScoreBreakdown::new(0.0, 0.0, vec![], vec![]).is_err());
        let json = r#"{"score":1,"maxScore":0,"percentage":100}"#;
        assert!(serde_json::from_str::<ScoreBreakdown>(json).is_err());
    }

    #[test]
    fn test_deserialize_recomputes_percentage() {
        let json = r#"{"score":20,"maxScore":40,"percentage":99,"details":["a"],"suggestions":[]}"#;
        let b: ScoreBreakdown = serde_json::from_str(json).expect("deserialize");
        assert_eq!(b.percentage(), 50.0);
        assert_eq!(b.details(), ["a".to_string()]);
    }

    #[test]
    fn test_issue_display() {
        let issue = PhaseIssue::new("codegen", "hero", IssueKind::BelowThreshold, "scored 55");
        assert_eq!(issue.to_string(), "[codegen] hero: scored 55");
        assert!(issue.is_degrading());
    }
}
