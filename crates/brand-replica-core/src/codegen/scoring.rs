//! Match scoring of generated component CSS against the design DNA.
//!
//! Each dimension scores `0..=1`; the weighted blend is scaled to `0..=100`.
//! Drafts that break an enabled [`CssStandards`] requirement are capped at
//! `min_match_score - 1` no matter how well they match otherwise.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::css;
use crate::domain::{CssStandards, DesignDna};

/// Below this a dimension produces refinement feedback.
const FEEDBACK_FLOOR: f64 = 0.7;

/// Score of a dimension the draft says nothing about.
const UNSPECIFIED: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScores {
    pub color: f64,
    pub shape: f64,
    pub spacing: f64,
    pub typography: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    /// `0..=100`.
    pub score: u8,
    pub dimensions: DimensionScores,
    /// Hard requirements the draft breaks.
    pub violations: Vec<String>,
    /// Refinement hints for the next attempt.
    pub feedback: Vec<String>,
}

impl MatchReport {
    pub fn meets(&self, min_match_score: u8) -> bool {
        self.score >= min_match_score
    }
}

pub fn color_score(css_text: &str, dna: &DesignDna) -> f64 {
    let palette: BTreeSet<String> = dna.palette().into_iter().collect();
    if palette.is_empty() {
        return 1.0;
    }
    let used = css::colors(css_text);
    if used.is_empty() {
        return 0.0;
    }
    let shared = used.intersection(&palette).count() as f64;
    let coverage = (shared / palette.len().min(3) as f64).min(1.0);
    let fidelity = shared / used.len() as f64;
    0.6 * coverage + 0.4 * fidelity
}

pub fn typography_score(css_text: &str, dna: &DesignDna) -> f64 {
    let fonts: BTreeSet<String> = dna.fonts().into_iter().collect();
    if fonts.is_empty() {
        return 1.0;
    }
    let used = css::font_families(css_text);
    if used.is_empty() {
        return UNSPECIFIED;
    }
    let shared = used.intersection(&fonts).count() as f64;
    0.5 * (shared / fonts.len() as f64) + 0.5 * (shared / used.len() as f64)
}

pub fn shape_score(css_text: &str, dna: &DesignDna) -> f64 {
    let Some(target) = dna.shape.border_radius_px else {
        return 1.0;
    };
    let radii = css::border_radii_px(css_text);
    if radii.is_empty() {
        return UNSPECIFIED;
    }
    let tolerance = target.max(4.0);
    let closeness: f64 = radii
        .iter()
        .map(|r| 1.0 - ((r - target).abs() / tolerance).min(1.0))
        .sum();
    closeness / radii.len() as f64
}

pub fn spacing_score(css_text: &str, dna: &DesignDna) -> f64 {
    let values = css::spacing_values_px(css_text);
    if values.is_empty() {
        return UNSPECIFIED;
    }
    let base = dna.spacing.base_unit_px;
    let aligned = values.iter().filter(|v| css::on_scale(**v, base)).count();
    aligned as f64 / values.len() as f64
}

/// Enabled requirements the CSS breaks.
pub fn hard_violations(css_text: &str, standards: &CssStandards) -> Vec<String> {
    let checks = [
        (
            standards.require_hover_states,
            css::has_hover_rule(css_text),
            "missing :hover state",
        ),
        (
            standards.require_focus_states,
            css::has_focus_rule(css_text),
            "missing :focus state",
        ),
        (
            standards.require_transitions,
            css::has_transition(css_text),
            "missing transition",
        ),
        (
            standards.require_responsive,
            css::has_responsive_rule(css_text),
            "missing responsive media query",
        ),
        (
            standards.require_css_variables,
            css::uses_variables(css_text),
            "does not use CSS variables",
        ),
    ];
    checks
        .into_iter()
        .filter(|(required, present, _)| *required && !*present)
        .map(|(_, _, message)| message.to_string())
        .collect()
}

/// Score `css_text` against `dna`. Pure and deterministic.
pub fn score_css(
    css_text: &str,
    dna: &DesignDna,
    standards: &CssStandards,
    min_match_score: u8,
) -> MatchReport {
    let dimensions = DimensionScores {
        color: color_score(css_text, dna),
        shape: shape_score(css_text, dna),
        spacing: spacing_score(css_text, dna),
        typography: typography_score(css_text, dna),
    };
    let w = &standards.weights;
    let total = w.total();
    let blended = if total > 0.0 {
        (w.color * dimensions.color
            + w.shape * dimensions.shape
            + w.spacing * dimensions.spacing
            + w.typography * dimensions.typography)
            / total
    } else {
        0.0
    };
    let mut score = (blended * 100.0).round().clamp(0.0, 100.0) as u8;

    let violations = hard_violations(css_text, standards);
    if !violations.is_empty() {
        score = score.min(min_match_score.saturating_sub(1));
    }

    let mut feedback: Vec<String> = violations.iter().map(|v| format!("fix: {v}")).collect();
    for (label, value, hint) in [
        ("color", dimensions.color, "use the brand palette colors"),
        ("shape", dimensions.shape, "match the brand border radius"),
        ("spacing", dimensions.spacing, "keep spacing on the base unit scale"),
        ("typography", dimensions.typography, "use the brand font families"),
    ] {
        if value < FEEDBACK_FLOOR {
            feedback.push(format!("{label} {:.0}%: {hint}", value * 100.0));
        }
    }

    MatchReport {
        score,
        dimensions,
        violations,
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColorTokens, ShapeTokens, TypographyTokens};

    fn dna() -> DesignDna {
        DesignDna {
            colors: ColorTokens {
                primary: "#1a73e8".to_string(),
                secondary: Some("#ffffff".to_string()),
                accent: None,
                neutrals: vec!["#202124".to_string()],
            },
            typography: TypographyTokens {
                heading_font: "Montserrat".to_string(),
                body_font: "Inter".to_string(),
                base_size_px: Some(16.0),
            },
            shape: ShapeTokens {
                border_radius_px: Some(8.0),
                style: None,
            },
            ..DesignDna::default()
        }
    }

    const ON_BRAND: &str = r#"
        .card { color: #202124; background: #ffffff; border: 1px solid #1a73e8;
                font-family: 'Montserrat', sans-serif; border-radius: 8px; padding: 16px 24px; }
        .card p { font-family: Inter, sans-serif; margin: 8px 0; }
        .card:hover { background: #1a73e8; }
    "#;

    #[test]
    fn test_on_brand_css_scores_high() {
        let report = score_css(ON_BRAND, &dna(), &CssStandards::default(), 70);
        assert!(report.score >= 95, "score {}", report.score);
        assert!(report.violations.is_empty());
        assert!(report.feedback.is_empty());
    }

    #[test]
    fn test_off_brand_css_scores_low() {
        let css = ".x { color: #ff0000; font-family: Comic Sans; border-radius: 30px; padding: 13px; } .x:hover { color: #00ff00; }";
        let report = score_css(css, &dna(), &CssStandards::default(), 70);
        assert!(report.score < 30, "score {}", report.score);
        assert_eq!(report.feedback.len(), 4);
    }

    #[test]
    fn test_hard_requirement_caps_score() {
        let css = ON_BRAND.replace(".card:hover", ".card.active");
        let report = score_css(&css, &dna(), &CssStandards::default(), 70);
        assert_eq!(report.score, 69);
        assert_eq!(report.violations, vec!["missing :hover state"]);
        assert!(!report.meets(70));
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let a = score_css(ON_BRAND, &dna(), &CssStandards::default(), 70);
        let b = score_css(ON_BRAND, &dna(), &CssStandards::default(), 70);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unspecified_dimensions_are_neutral() {
        let mut dna = dna();
        dna.shape.border_radius_px = None;
        assert_eq!(shape_score("", &dna), 1.0);
        assert_eq!(spacing_score(".a { color: red; }", &dna), UNSPECIFIED);
    }
}
