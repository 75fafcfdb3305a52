//! CSS token extraction used by component scoring and validation.
//!
//! These are pattern scanners, not a CSS parser: they pull out the visual
//! tokens (colors, font families, radii, spacing) and structural signals
//! (hover rules, media queries, variables) that the rubrics score against.

use std::collections::BTreeSet;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            RE.get_or_init(|| ::regex::Regex::new($pattern).expect("static regex"))
        }
    };
}
pub(crate) use static_regex;

static_regex!(hex_color_re, r"#([0-9a-fA-F]{8}|[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b");
static_regex!(
    rgb_color_re,
    r"rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[0-9.]+\s*)?\)"
);
static_regex!(
    hardcoded_color_re,
    r"(?:^|[;{\s])(?:color|background|background-color|border-color)\s*:\s*#[0-9a-fA-F]{3,8}\b"
);
static_regex!(font_family_re, r"font-family\s*:\s*([^;}]+)");
static_regex!(font_var_re, r"--[A-Za-z0-9_-]*font[A-Za-z0-9_-]*\s*:\s*([^;}]+)");
static_regex!(
    radius_re,
    r"(?:border-radius|--[A-Za-z0-9_-]*radius[A-Za-z0-9_-]*)\s*:\s*([0-9.]+)(px|rem)"
);
static_regex!(
    spacing_decl_re,
    r"(?:padding|margin|gap|row-gap|column-gap)(?:-[a-z]+)?\s*:\s*([^;}]+)"
);
static_regex!(px_value_re, r"([0-9]*\.?[0-9]+)px");
static_regex!(hover_re, r":hover[^{}]*\{");
static_regex!(focus_re, r":focus(?:-visible|-within)?[^{}]*\{");
static_regex!(transition_re, r"transition(?:-property|-duration)?\s*:");
static_regex!(media_width_re, r"@media[^{]*\(\s*(?:max|min)-width");
static_regex!(root_re, r":root\s*\{");
static_regex!(var_def_re, r"(--[A-Za-z0-9_-]+)\s*:");
static_regex!(var_ref_re, r"var\(\s*(--[A-Za-z0-9_-]+)\s*(,)?");
static_regex!(selector_re, r"([^{}]+)\{");
static_regex!(class_in_selector_re, r"\.([A-Za-z_][A-Za-z0-9_-]*)");
static_regex!(max_width_re, r"max-width\s*:\s*([0-9.]+)(px|ch|rem|em)");
static_regex!(media_prelude_re, r"@media[^{]*");

/// Normalize a CSS color to lower-case `#rrggbb`. Alpha channels are dropped.
pub fn normalize_color(raw: &str) -> Option<String> {
    let raw = raw.trim().to_lowercase();
    match raw.as_str() {
        "white" => return Some("#ffffff".to_string()),
        "black" => return Some("#000000".to_string()),
        _ => {}
    }
    if let Some(hex) = raw.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match hex.len() {
            3 => Some(format!(
                "#{}",
                hex.chars().flat_map(|c| [c, c]).collect::<String>()
            )),
            6 => Some(format!("#{hex}")),
            8 => Some(format!("#{}", &hex[..6])),
            _ => None,
        };
    }
    let caps = rgb_color_re().captures(&raw)?;
    let mut out = String::from("#");
    for i in 1..=3 {
        let channel: u16 = caps[i].parse().ok()?;
        if channel > 255 {
            return None;
        }
        out.push_str(&format!("{channel:02x}"));
    }
    Some(out)
}

/// First family of a `font-family` value, unquoted and lower-cased.
pub fn primary_font_family(raw: &str) -> Option<String> {
    let first = raw.split(',').next()?;
    let family = first
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim()
        .to_lowercase();
    if family.is_empty() {
        None
    } else {
        Some(family)
    }
}

/// Every distinct color literal in `css`, normalized.
pub fn colors(css: &str) -> BTreeSet<String> {
    let hexes = hex_color_re()
        .find_iter(css)
        .filter_map(|m| normalize_color(m.as_str()));
    let rgbs = rgb_color_re()
        .find_iter(css)
        .filter_map(|m| normalize_color(m.as_str()));
    hexes.chain(rgbs).collect()
}

/// Number of color declarations that use a literal hex value.
pub fn hardcoded_color_count(css: &str) -> usize {
    hardcoded_color_re().find_iter(css).count()
}

/// Primary family of every `font-family` declaration and font variable.
pub fn font_families(css: &str) -> BTreeSet<String> {
    font_family_re()
        .captures_iter(css)
        .chain(font_var_re().captures_iter(css))
        .filter_map(|c| primary_font_family(&c[1]))
        .filter(|f| !f.starts_with("var("))
        .collect()
}

/// Border radii declared in `css`, in px (`rem` assumes 16px).
pub fn border_radii_px(css: &str) -> Vec<f64> {
    radius_re()
        .captures_iter(css)
        .filter_map(|c| {
            let value: f64 = c[1].parse().ok()?;
            Some(if &c[2] == "rem" { value * 16.0 } else { value })
        })
        .collect()
}

/// Non-zero px values used by padding, margin and gap declarations.
pub fn spacing_values_px(css: &str) -> Vec<f64> {
    spacing_decl_re()
        .captures_iter(css)
        .flat_map(|c| {
            px_value_re()
                .captures_iter(&c[1])
                .filter_map(|v| v[1].parse::<f64>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| *v > 0.0)
        .collect()
}

/// Whether `value` sits on a scale built from `base` (half steps allowed).
pub fn on_scale(value: f64, base: f64) -> bool {
    if base <= 0.0 {
        return false;
    }
    let step = base / 2.0;
    let ratio = value / step;
    (ratio - ratio.round()).abs() < 0.01
}

pub fn has_hover_rule(css: &str) -> bool {
    hover_re().is_match(css)
}

pub fn has_focus_rule(css: &str) -> bool {
    focus_re().is_match(css)
}

pub fn has_transition(css: &str) -> bool {
    transition_re().is_match(css)
}

pub fn has_responsive_rule(css: &str) -> bool {
    media_width_re().is_match(css)
}

pub fn uses_variables(css: &str) -> bool {
    var_ref_re().is_match(css)
}

pub fn root_block_count(css: &str) -> usize {
    root_re().find_iter(css).count()
}

/// Custom properties defined anywhere in `css`.
pub fn defined_variables(css: &str) -> BTreeSet<String> {
    var_def_re()
        .captures_iter(css)
        .map(|c| c[1].to_string())
        .collect()
}

/// Custom properties referenced without a fallback value.
pub fn referenced_variables_without_fallback(css: &str) -> BTreeSet<String> {
    var_ref_re()
        .captures_iter(css)
        .filter(|c| c.get(2).is_none())
        .map(|c| c[1].to_string())
        .collect()
}

/// Class names appearing in rule selectors.
pub fn class_selectors(css: &str) -> BTreeSet<String> {
    selector_re()
        .captures_iter(css)
        .map(|c| c[1].trim().to_string())
        .filter(|selector| !selector.starts_with('@'))
        .flat_map(|selector| {
            class_in_selector_re()
                .captures_iter(&selector)
                .map(|c| c[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// `max-width` values converted to an approximate px width.
///
/// `ch` is taken as 8px and `rem`/`em` as 16px. Media query conditions are
/// ignored.
pub fn max_widths_px(css: &str) -> Vec<f64> {
    let declarations = media_prelude_re().replace_all(css, "");
    max_width_re()
        .captures_iter(&declarations)
        .filter_map(|c| {
            let value: f64 = c[1].parse().ok()?;
            Some(match &c[2] {
                "ch" => value * 8.0,
                "rem" | "em" => value * 16.0,
                _ => value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        :root { --brand-primary: #1A73E8; --brand-font-heading: 'Montserrat', sans-serif; --brand-radius-md: 8px; }
        .card { padding: 16px 24px; margin: 0 auto; border-radius: 0.5rem; color: #202124; }
        .card:hover { box-shadow: 0 2px 4px rgba(0, 0, 0, 0.2); transition: all 200ms ease; }
        .card__title { font-family: var(--brand-font-heading); color: var(--brand-primary); }
        .btn:focus-visible { outline: 2px solid var(--brand-accent, #fbbc04); }
        @media (max-width: 768px) { .card { padding: 12px; } }
    "#;

    #[test]
    fn test_normalize_color_forms() {
        assert_eq!(normalize_color("#ABC").as_deref(), Some("#aabbcc"));
        assert_eq!(normalize_color("#1a73e8ff").as_deref(), Some("#1a73e8"));
        assert_eq!(normalize_color("rgb(255, 0, 16)").as_deref(), Some("#ff0010"));
        assert_eq!(normalize_color("white").as_deref(), Some("#ffffff"));
        assert!(normalize_color("#12").is_none());
        assert!(normalize_color("rgb(300, 0, 0)").is_none());
        assert!(normalize_color("blue-ish").is_none());
    }

    #[test]
    fn test_colors_and_fonts() {
        let found = colors(SAMPLE);
        assert!(found.contains("#1a73e8"));
        assert!(found.contains("#202124"));
        assert!(found.contains("#000000"));

        let fonts = font_families(SAMPLE);
        assert!(fonts.contains("montserrat"));
        assert_eq!(fonts.len(), 1);
    }

    #[test]
    fn test_radii_and_spacing() {
        let radii = border_radii_px(SAMPLE);
        assert_eq!(radii, vec![8.0, 8.0]);

        let spacing = spacing_values_px(SAMPLE);
        assert_eq!(spacing, vec![16.0, 24.0, 12.0]);
        assert!(on_scale(12.0, 8.0));
        assert!(!on_scale(13.0, 8.0));
    }

    #[test]
    fn test_structural_signals() {
        assert!(has_hover_rule(SAMPLE));
        assert!(has_focus_rule(SAMPLE));
        assert!(has_transition(SAMPLE));
        assert!(has_responsive_rule(SAMPLE));
        assert!(uses_variables(SAMPLE));
        assert_eq!(root_block_count(SAMPLE), 1);
        assert!(!has_hover_rule(".card { color: red; }"));
    }

    #[test]
    fn test_variables_and_selectors() {
        let defined = defined_variables(SAMPLE);
        assert!(defined.contains("--brand-primary"));
        let missing: Vec<_> = referenced_variables_without_fallback(SAMPLE)
            .difference(&defined)
            .cloned()
            .collect();
        assert!(missing.is_empty(), "fallback refs are not required: {missing:?}");

        let classes = class_selectors(SAMPLE);
        assert!(classes.contains("card"));
        assert!(classes.contains("card__title"));
        assert!(classes.contains("btn"));
    }

    #[test]
    fn test_hardcoded_colors_and_widths() {
        assert_eq!(hardcoded_color_count(SAMPLE), 1);
        assert_eq!(
            max_widths_px("main { max-width: 70ch; } .x { max-width: 48rem }"),
            vec![560.0, 768.0]
        );
        assert!(max_widths_px(SAMPLE).is_empty());
    }
}
