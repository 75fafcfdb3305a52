//! Weighted overall score and the pass/fail gate.

use serde::{Deserialize, Serialize};

use crate::domain::{CategoryWeights, PipelineError, Result, Thresholds, WowFactorItem};

/// Category percentages on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub brand_match: f64,
    pub design_quality: f64,
    pub user_experience: f64,
}

/// `Σ wᵢ·sᵢ / Σ wᵢ`, rounded to two decimals.
///
/// Weights need not sum to one; negative or all-zero weights are rejected.
pub fn weighted_overall(scores: &CategoryScores, weights: &CategoryWeights) -> Result<f64> {
    let pairs = [
        (weights.brand_match, scores.brand_match),
        (weights.design_quality, scores.design_quality),
        (weights.user_experience, scores.user_experience),
    ];
    if pairs.iter().any(|(w, _)| !w.is_finite() || *w < 0.0) {
        return Err(PipelineError::InvalidConfig(
            "category weights must be finite and non-negative".to_string(),
        ));
    }
    let total: f64 = pairs.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return Err(PipelineError::InvalidConfig(
            "category weights must not all be zero".to_string(),
        ));
    }
    let weighted: f64 = pairs.iter().map(|(w, s)| w * s).sum();
    Ok((weighted / total * 100.0).round() / 100.0)
}

/// Categories below their threshold, by wire name.
pub fn failing_categories(scores: &CategoryScores, thresholds: &Thresholds) -> Vec<&'static str> {
    [
        ("brandMatch", scores.brand_match, thresholds.brand_match),
        ("designQuality", scores.design_quality, thresholds.design_quality),
        ("userExperience", scores.user_experience, thresholds.user_experience),
    ]
    .into_iter()
    .filter(|(_, score, threshold)| score < threshold)
    .map(|(name, _, _)| name)
    .collect()
}

/// Every category at or above its threshold, every required item passed,
/// and `overall` above the optional overall threshold.
pub fn passes_threshold(
    scores: &CategoryScores,
    overall: f64,
    checklist: &[WowFactorItem],
    thresholds: &Thresholds,
) -> bool {
    failing_categories(scores, thresholds).is_empty()
        && checklist.iter().all(|item| !item.required || item.passed)
        && thresholds.overall.map_or(true, |min| overall >= min)
}
