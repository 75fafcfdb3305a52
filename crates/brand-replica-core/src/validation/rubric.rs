//! The three scoring rubrics. Each is a pure function of the rendered
//! document and returns a [`ScoreBreakdown`] out of 100.

use std::collections::{BTreeSet, HashSet};

use crate::css;
use crate::domain::{BrandComponent, DesignDna, Result, ScoreBreakdown, SectionDesignDecision};
use crate::markup;

const CRITICAL_PENALTY: f64 = 25.0;
const WARNING_PENALTY: f64 = 5.0;
const MAX_HARDCODED_COLORS: usize = 10;

/// Comfortable measure for body copy, in px.
const READABLE_WIDTH_PX: std::ops::RangeInclusive<f64> = 480.0..=900.0;

/// Share of the visual comparator in the blended brand-match score.
pub const VISUAL_SHARE: f64 = 0.25;

/// Accumulates points, details and suggestions for one rubric.
#[derive(Default)]
struct Tally {
    score: f64,
    details: Vec<String>,
    suggestions: Vec<String>,
}

impl Tally {
    fn award(&mut self, points: f64, max: f64, detail: String, suggestion: Option<&str>) {
        self.score += points.clamp(0.0, max);
        self.details.push(format!("{detail} ({points:.1}/{max})"));
        if points < max {
            if let Some(s) = suggestion {
                self.suggestions.push(s.to_string());
            }
        }
    }

    fn finish(self, max: f64) -> Result<ScoreBreakdown> {
        ScoreBreakdown::new(self.score, max, self.details, self.suggestions)
    }
}

/// Colors 40, typography 30, shape 15, component usage 15. Usage is only
/// scored when `decisions` is non-empty.
pub fn brand_match(
    html: &str,
    stylesheet: &str,
    dna: &DesignDna,
    decisions: &[SectionDesignDecision],
    components: &[BrandComponent],
) -> Result<ScoreBreakdown> {
    let mut tally = Tally::default();

    let palette: BTreeSet<String> = dna.palette().into_iter().collect();
    let used_colors = css::colors(stylesheet);
    let (color_points, color_detail) = if palette.is_empty() {
        (40.0, "no palette to match".to_string())
    } else {
        let shared = palette.intersection(&used_colors).count();
        let wanted = palette.len().min(3);
        (
            40.0 * (shared as f64 / wanted as f64).min(1.0),
            format!("{shared} of {} brand colors used", palette.len()),
        )
    };
    tally.award(
        color_points,
        40.0,
        color_detail,
        Some("Use the brand palette for backgrounds, text and accents"),
    );

    let fonts: BTreeSet<String> = dna.fonts().into_iter().collect();
    let used_fonts = css::font_families(stylesheet);
    let (font_points, font_detail) = if fonts.is_empty() {
        (30.0, "no brand fonts to match".to_string())
    } else {
        let shared = fonts.intersection(&used_fonts).count();
        (
            30.0 * shared as f64 / fonts.len() as f64,
            format!("{shared} of {} brand fonts used", fonts.len()),
        )
    };
    tally.award(
        font_points,
        30.0,
        font_detail,
        Some("Declare the brand heading and body fonts"),
    );

    let radii = css::border_radii_px(stylesheet);
    let shape_points = match dna.shape.border_radius_px {
        None => 15.0,
        Some(_) if radii.is_empty() => 7.5,
        Some(target) => {
            let tolerance = target.max(4.0);
            let closeness: f64 = radii
                .iter()
                .map(|r| 1.0 - ((r - target).abs() / tolerance).min(1.0))
                .sum::<f64>()
                / radii.len() as f64;
            15.0 * closeness
        }
    };
    tally.award(
        shape_points,
        15.0,
        format!("{} border radii checked", radii.len()),
        Some("Match the brand corner radius"),
    );

    // Without a section plan there is nothing to hold rendering against, so
    // the remaining criteria are rescaled instead of scoring usage as zero.
    if decisions.is_empty() {
        tally
            .details
            .push("no section plan, component usage not scored".to_string());
        return tally.finish(85.0);
    }

    let library: HashSet<&str> = components.iter().map(|c| c.id.as_str()).collect();
    let stamped = markup::component_ids(html)
        .into_iter()
        .filter(|id| library.contains(id.as_str()))
        .count();
    tally.award(
        15.0 * (stamped as f64 / decisions.len() as f64).min(1.0),
        15.0,
        format!("{stamped} of {} planned components rendered", decisions.len()),
        Some("Render every mapped section with its brand component"),
    );

    tally.finish(100.0)
}

/// Blend a visual similarity (`0..=100`) into a brand-match breakdown.
pub fn blend_visual(brand: &ScoreBreakdown, similarity: f64) -> Result<ScoreBreakdown> {
    let similarity = if similarity.is_finite() {
        similarity.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let blended = (1.0 - VISUAL_SHARE) * brand.percentage() + VISUAL_SHARE * similarity;
    let mut details = brand.details().to_vec();
    details.push(format!("visual similarity {similarity:.1}%"));
    let mut suggestions = brand.suggestions().to_vec();
    if similarity < 70.0 {
        suggestions.push("Bring the layout closer to the reference screenshots".to_string());
    }
    ScoreBreakdown::new(blended, 100.0, details, suggestions)
}

/// CSS quality: start at 100, deduct 25 per critical issue and 5 per
/// warning, floor at 0.
pub fn design_quality(html: &str, stylesheet: &str, dna: &DesignDna) -> Result<ScoreBreakdown> {
    let mut critical = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    match css::root_block_count(stylesheet) {
        0 => {
            critical.push("no :root design tokens".to_string());
            suggestions.push("Declare the design tokens once in :root".to_string());
        }
        1 => {}
        n => {
            critical.push(format!("{n} :root declarations (expected 1)"));
            suggestions.push("Merge the :root blocks into one".to_string());
        }
    }

    let defined = css::defined_variables(stylesheet);
    let undefined: Vec<String> = css::referenced_variables_without_fallback(stylesheet)
        .into_iter()
        .filter(|v| !defined.contains(v))
        .collect();
    if !undefined.is_empty() {
        critical.push(format!("undefined variables: {}", undefined.join(", ")));
        suggestions.push("Define every referenced variable or give it a fallback".to_string());
    }

    if !css::has_responsive_rule(stylesheet) {
        critical.push("no responsive media query".to_string());
        suggestions.push("Add a max-width media query for small screens".to_string());
    }

    let fonts = css::font_families(stylesheet);
    let brand_uses_arial = dna.fonts().iter().any(|f| f.as_str() == "arial");
    if fonts.contains("arial") && !brand_uses_arial {
        warnings.push("generic Arial typography".to_string());
        suggestions.push("Replace Arial with the brand fonts".to_string());
    }

    let hardcoded = css::hardcoded_color_count(stylesheet);
    if hardcoded > MAX_HARDCODED_COLORS {
        warnings.push(format!("{hardcoded} hard-coded colors"));
        suggestions.push("Reference color tokens instead of literal values".to_string());
    }

    let base = dna.spacing.base_unit_px;
    let off_scale = css::spacing_values_px(stylesheet)
        .into_iter()
        .filter(|v| !css::on_scale(*v, base))
        .count();
    if off_scale > 0 {
        warnings.push(format!("{off_scale} spacing values off the {base}px scale"));
        suggestions.push("Keep spacing on multiples of the base unit".to_string());
    }

    let used_classes = markup::class_names(html);
    let orphans: Vec<String> = css::class_selectors(stylesheet)
        .into_iter()
        .filter(|c| !used_classes.contains(c))
        .collect();
    if !orphans.is_empty() {
        warnings.push(format!("unused class selectors: {}", orphans.join(", ")));
        suggestions.push("Remove CSS rules for classes the page never uses".to_string());
    }

    let score = 100.0
        - CRITICAL_PENALTY * critical.len() as f64
        - WARNING_PENALTY * warnings.len() as f64;
    let details = critical
        .iter()
        .map(|c| format!("critical: {c}"))
        .chain(warnings.iter().map(|w| format!("warning: {w}")))
        .collect();
    ScoreBreakdown::new(score.max(0.0), 100.0, details, suggestions)
}

/// Headings 35, call to action 25, readable width 25, image alt text 15.
pub fn user_experience(html: &str, stylesheet: &str) -> Result<ScoreBreakdown> {
    let mut tally = Tally::default();

    let levels = markup::heading_levels(html);
    let h1_count = levels.iter().filter(|l| **l == 1).count();
    tally.award(
        if h1_count == 1 { 10.0 } else { 0.0 },
        10.0,
        format!("{h1_count} h1 headings"),
        Some("Use exactly one h1 for the article title"),
    );
    let jumps = levels.windows(2).filter(|w| w[1] > w[0] + 1).count();
    tally.award(
        if jumps == 0 { 15.0 } else { 0.0 },
        15.0,
        format!("{jumps} skipped heading levels"),
        Some("Do not skip heading levels"),
    );
    let subheadings = levels.iter().filter(|l| **l > 1).count();
    tally.award(
        if subheadings > 0 { 10.0 } else { 0.0 },
        10.0,
        format!("{subheadings} section headings"),
        Some("Give each section a heading"),
    );

    let ctas = markup::call_to_action_count(html);
    tally.award(
        if ctas > 0 { 25.0 } else { 0.0 },
        25.0,
        format!("{ctas} calls to action"),
        Some("Add a clear call to action"),
    );

    let widths = css::max_widths_px(stylesheet);
    let width_points = if widths.iter().any(|w| READABLE_WIDTH_PX.contains(w)) {
        25.0
    } else if widths.is_empty() {
        0.0
    } else {
        10.0
    };
    tally.award(
        width_points,
        25.0,
        format!("{} max-width constraints", widths.len()),
        Some("Constrain body copy to a readable measure (60-75 characters)"),
    );

    let (images, missing) = markup::image_alt_coverage(html);
    let alt_points = if images == 0 {
        15.0
    } else {
        15.0 * (images - missing) as f64 / images as f64
    };
    tally.award(
        alt_points,
        15.0,
        format!("{missing} of {images} images missing alt text"),
        Some("Give every image descriptive alt text"),
    );

    tally.finish(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColorTokens, TypographyTokens};

    fn dna() -> DesignDna {
        DesignDna {
            colors: ColorTokens {
                primary: "#1a73e8".to_string(),
                secondary: Some("#202124".to_string()),
                ..ColorTokens::default()
            },
            typography: TypographyTokens {
                heading_font: "Montserrat".to_string(),
                body_font: "Inter".to_string(),
                base_size_px: None,
            },
            ..DesignDna::default()
        }
    }

    const GOOD_CSS: &str = r#"
        :root { --brand-primary: #1a73e8; --brand-ink: #202124; --brand-font-heading: Montserrat; --brand-font-body: Inter; }
        .page { max-width: 72ch; padding: 16px; color: var(--brand-ink); }
        .cta { background: var(--brand-primary); }
        @media (max-width: 768px) { .page { padding: 8px; } }
    "#;

    #[test]
    fn test_design_quality_clean_stylesheet() {
        let html = r#"<div class="page"><a class="cta" href="/">Go</a></div>"#;
        let quality = design_quality(html, GOOD_CSS, &dna()).expect("score");
        assert_eq!(quality.percentage(), 100.0);
    }

    #[test]
    fn test_design_quality_penalties() {
        let css = format!(
            "{GOOD_CSS}\n:root {{ --x: 1px; }}\n.orphan {{ color: var(--missing); margin: 13px; font-family: Arial; }}"
        );
        let html = r#"<div class="page"><a class="cta" href="/">Go</a></div>"#;
        let quality = design_quality(html, &css, &dna()).expect("score");
        // duplicate :root, undefined var (critical); Arial, off-scale, orphan (warnings)
        assert_eq!(quality.score(), 100.0 - 50.0 - 15.0);
        assert!(!quality.suggestions().is_empty());
    }

    #[test]
    fn test_design_quality_floors_at_zero() {
        let quality = design_quality("<p>x</p>", ".a { color: var(--b); }", &dna()).expect("score");
        assert!(quality.score() >= 0.0);
    }

    #[test]
    fn test_user_experience() {
        let html = r#"<h1>T</h1><h2>A</h2><a class="btn" href="/">Go</a><img src="a.png" alt="A"><img src="b.png">"#;
        let ux = user_experience(html, GOOD_CSS).expect("score");
        assert_eq!(ux.score(), 10.0 + 15.0 + 10.0 + 25.0 + 25.0 + 7.5);

        let flat = user_experience("<h1>T</h1><h3>B</h3>", "").expect("score");
        assert_eq!(flat.score(), 10.0 + 0.0 + 10.0 + 15.0);
    }

    #[test]
    fn test_brand_match_and_blend() {
        let brand = brand_match("<p></p>", GOOD_CSS, &dna(), &[], &[]).expect("score");
        // colors 40 + fonts 30 + shape 15 (no target), usage not scored
        assert_eq!(brand.score(), 85.0);
        assert_eq!(brand.max_score(), 85.0);
        assert_eq!(brand.percentage(), 100.0);
        assert!(brand.details().iter().any(|d| d.contains("not scored")));
        let blended = blend_visual(&brand, 45.0).expect("blend");
        assert!((blended.percentage() - (0.75 * 100.0 + 0.25 * 45.0)).abs() < 1e-9);
        assert_eq!(blended.details().len(), brand.details().len() + 1);
    }
}
