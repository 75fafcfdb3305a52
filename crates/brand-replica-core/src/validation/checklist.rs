//! Wow-factor checklist evaluation. Items are independent of each other and
//! of the rubric scores.

use std::collections::BTreeSet;

use regex::Regex;

use crate::css;
use crate::domain::{DesignDna, WowCriterion, WowFactorCheck, WowFactorItem};
use crate::markup;

/// The rendered document, pre-scanned once for all checklist items.
pub struct Document<'a> {
    pub html: &'a str,
    pub stylesheet: &'a str,
    pub dna: &'a DesignDna,
}

fn evaluate_criterion(criterion: &WowCriterion, doc: &Document<'_>) -> (bool, String) {
    match criterion {
        WowCriterion::HasHero => {
            let hero = markup::has_class_containing(doc.html, "hero")
                || doc.html.contains("data-emphasis=\"hero\"");
            (hero, if hero { "hero section present" } else { "no hero section" }.to_string())
        }
        WowCriterion::HasCallToAction => {
            let count = markup::call_to_action_count(doc.html);
            (count > 0, format!("{count} calls to action"))
        }
        WowCriterion::UsesBrandColors { min_colors } => {
            let palette: BTreeSet<String> = doc.dna.palette().into_iter().collect();
            let used = css::colors(doc.stylesheet);
            let shared = palette.intersection(&used).count();
            let needed = (*min_colors).min(palette.len());
            (
                shared >= needed,
                format!("{shared} of {} brand colors used, {needed} needed", palette.len()),
            )
        }
        WowCriterion::UsesBrandFonts => {
            let used = css::font_families(doc.stylesheet);
            let missing: Vec<String> = doc
                .dna
                .fonts()
                .into_iter()
                .filter(|f| !used.contains(f))
                .collect();
            if missing.is_empty() {
                (true, "all brand fonts used".to_string())
            } else {
                (false, format!("missing fonts: {}", missing.join(", ")))
            }
        }
        WowCriterion::HoverStates => {
            let ok = css::has_hover_rule(doc.stylesheet);
            (ok, format!("hover rules {}", if ok { "present" } else { "absent" }))
        }
        WowCriterion::Transitions => {
            let ok = css::has_transition(doc.stylesheet);
            (ok, format!("transitions {}", if ok { "present" } else { "absent" }))
        }
        WowCriterion::ResponsiveLayout => {
            let ok = css::has_responsive_rule(doc.stylesheet);
            (ok, format!("media queries {}", if ok { "present" } else { "absent" }))
        }
        WowCriterion::DistinctComponents { min } => {
            let distinct: BTreeSet<String> = markup::component_ids(doc.html).into_iter().collect();
            (
                distinct.len() >= *min,
                format!("{} distinct components, {min} needed", distinct.len()),
            )
        }
        WowCriterion::MatchesPattern { pattern } => match Regex::new(pattern) {
            Ok(re) => {
                let ok = re.is_match(doc.html);
                (ok, format!("pattern {}", if ok { "matched" } else { "not matched" }))
            }
            Err(e) => (false, format!("invalid pattern: {e}")),
        },
    }
}

/// Evaluate every configured check against `doc`.
pub fn evaluate(checks: &[WowFactorCheck], doc: &Document<'_>) -> Vec<WowFactorItem> {
    checks
        .iter()
        .map(|check| {
            let (passed, detail) = evaluate_criterion(&check.criterion, doc);
            WowFactorItem {
                id: check.id.clone(),
                label: check.label.clone(),
                required: check.required,
                passed,
                detail: Some(detail),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{default_wow_factor_checklist, ColorTokens, TypographyTokens};

    fn dna() -> DesignDna {
        DesignDna {
            colors: ColorTokens {
                primary: "#1a73e8".to_string(),
                accent: Some("#fbbc04".to_string()),
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

    #[test]
    fn test_default_checklist_on_rich_page() {
        let html = r#"<section class="hero" data-component-id="a"></section>
            <section data-component-id="b"><button>Buy</button></section>
            <section data-component-id="c"></section>"#;
        let css = ".hero { color: #1a73e8; border-color: #fbbc04; } .hero:hover { opacity: .9; } @media (max-width: 600px) { .hero { padding: 8px; } }";
        let dna = dna();
        let doc = Document {
            html,
            stylesheet: css,
            dna: &dna,
        };
        let items = evaluate(&default_wow_factor_checklist(), &doc);
        assert_eq!(items.len(), 6);
        assert!(items.iter().all(|i| i.passed), "{items:?}");
    }

    #[test]
    fn test_items_fail_independently() {
        let dna = dna();
        let doc = Document {
            html: "<p>plain</p>",
            stylesheet: ".p { font-family: Montserrat; }",
            dna: &dna,
        };
        let checks = vec![
            WowFactorCheck::new("fonts", "Brand fonts", false, WowCriterion::UsesBrandFonts),
            WowFactorCheck::new("cta", "CTA", true, WowCriterion::HasCallToAction),
            WowFactorCheck::new(
                "plain",
                "Says plain",
                false,
                WowCriterion::MatchesPattern {
                    pattern: "plain".to_string(),
                },
            ),
        ];
        let items = evaluate(&checks, &doc);
        assert!(!items[0].passed);
        assert_eq!(items[0].detail.as_deref(), Some("missing fonts: inter"));
        assert!(!items[1].passed);
        assert!(items[2].passed);
    }
}
