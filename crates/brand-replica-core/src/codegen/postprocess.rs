//! Repair pass over compiled library CSS.
//!
//! Generator drafts may carry their own `:root` blocks, numeric token names
//! (`--brand-neutral-3`, `--brand-spacing-2`) or references to tokens that
//! were never declared. [`post_process`] folds every `:root` into the single
//! design-token block, renames numeric tokens onto the named scale and maps
//! unknown references onto the closest brand token. Tokens derived from the
//! design DNA always keep their DNA value.

use std::collections::BTreeSet;

use crate::css::{self, static_regex};

static_regex!(root_block_re, r":root\s*\{([^}]*)\}");
static_regex!(declaration_re, r"(--[A-Za-z0-9_-]+)\s*:\s*([^;]+);?");
static_regex!(var_call_re, r"var\(\s*(--[A-Za-z0-9_-]+)\s*(,[^)]*)?\)");
static_regex!(numeric_token_re, r"^--brand-(neutral|spacing|space|radius)-(\d+)$");

/// Named neutral steps, lightest first.
pub const NEUTRAL_SCALE: [&str; 5] = ["lightest", "light", "medium", "dark", "darkest"];

/// Named spacing steps, as multiples of the base unit.
pub const SPACING_SCALE: [(&str, f64); 5] =
    [("xs", 0.5), ("sm", 1.0), ("md", 2.0), ("lg", 3.0), ("xl", 4.0)];

/// Compiled CSS and what the repair pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostProcessed {
    pub css: String,
    /// Draft `:root` blocks folded into the token block.
    pub merged_roots: usize,
    /// Brand tokens a draft tried to redefine.
    pub protected: Vec<String>,
    /// `var()` references rewritten, as `(from, to)`.
    pub renamed: Vec<(String, String)>,
    /// Referenced tokens that are neither declared nor mappable.
    pub unresolved: Vec<String>,
}

/// Where a numeric or unknown token reference should point instead.
#[derive(Debug, Clone, PartialEq)]
enum Target {
    Token(String),
    Literal(&'static str),
}

/// Build one stylesheet from the brand `tokens` and the component `body`.
pub fn post_process(tokens: &[(String, String)], body: &str) -> PostProcessed {
    let brand: BTreeSet<&str> = tokens.iter().map(|(name, _)| name.as_str()).collect();
    let mut declared: Vec<(String, String)> = tokens.to_vec();
    let mut out = PostProcessed::default();

    for block in root_block_re().captures_iter(body) {
        out.merged_roots += 1;
        for decl in declaration_re().captures_iter(&block[1]) {
            let value = decl[2].trim().to_string();
            let name = match numeric_target(&decl[1]) {
                Some(Target::Token(name)) => name,
                Some(Target::Literal(_)) => continue,
                None => decl[1].to_string(),
            };
            if brand.contains(name.as_str()) {
                let kept = declared.iter().find(|(n, _)| *n == name).map(|(_, v)| v);
                if kept != Some(&value) && !out.protected.contains(&name) {
                    out.protected.push(name);
                }
            } else if !declared.iter().any(|(n, _)| *n == name) {
                declared.push((name, value));
            }
        }
    }
    let body = root_block_re().replace_all(body, "").into_owned();

    let mut known: BTreeSet<String> = declared.iter().map(|(n, _)| n.clone()).collect();
    known.extend(css::defined_variables(&body));

    let mut renamed = Vec::new();
    let mut unresolved = BTreeSet::new();
    let body = var_call_re().replace_all(&body, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        let fallback = caps.get(2).map_or("", |m| m.as_str());
        if known.contains(name) {
            return caps[0].to_string();
        }
        let target = numeric_target(name)
            .filter(|t| resolves(t, &known))
            .or_else(|| fallback.is_empty().then(|| alias(name, &known)).flatten());
        match target {
            Some(Target::Literal(literal)) => {
                renamed.push((name.to_string(), literal.to_string()));
                literal.to_string()
            }
            Some(Target::Token(to)) => {
                let replaced = format!("var({to}{fallback})");
                renamed.push((name.to_string(), to));
                replaced
            }
            None => {
                if fallback.is_empty() {
                    unresolved.insert(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    let block = declared
        .iter()
        .map(|(name, value)| format!("  {name}: {value};"))
        .collect::<Vec<_>>()
        .join("\n");
    out.css = format!(":root {{\n{block}\n}}\n\n{}", body.trim());
    out.renamed = renamed;
    out.unresolved = unresolved.into_iter().collect();
    out
}

fn resolves(target: &Target, known: &BTreeSet<String>) -> bool {
    match target {
        Target::Token(name) => known.contains(name),
        Target::Literal(_) => true,
    }
}

/// Named equivalent of a numeric brand token such as `--brand-neutral-600`.
fn numeric_target(name: &str) -> Option<Target> {
    let caps = numeric_token_re().captures(name)?;
    let step: u32 = caps[2].parse().ok()?;
    let target = match &caps[1] {
        "neutral" => {
            // Tailwind-style 50..950 or a plain 0..9 ramp.
            let index = if step >= 50 {
                match step {
                    0..=100 => 0,
                    101..=300 => 1,
                    301..=500 => 2,
                    501..=700 => 3,
                    _ => 4,
                }
            } else {
                match step {
                    0 | 1 => 0,
                    2 | 3 => 1,
                    4 | 5 => 2,
                    6 => 3,
                    _ => 4,
                }
            };
            Target::Token(format!("--brand-neutral-{}", NEUTRAL_SCALE[index]))
        }
        "spacing" | "space" => match step {
            0 => Target::Literal("0"),
            n => {
                let index = (n as usize - 1).min(SPACING_SCALE.len() - 1);
                Target::Token(format!("--brand-space-{}", SPACING_SCALE[index].0))
            }
        },
        _ => match step {
            0 => Target::Literal("0"),
            _ => Target::Token("--brand-radius".to_string()),
        },
    };
    Some(target)
}

/// Closest declared brand token for an unknown reference.
fn alias(name: &str, known: &BTreeSet<String>) -> Option<Target> {
    let key = name.trim_start_matches('-').to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| key.contains(w));
    let candidate = if has(&["font", "family", "typeface"]) {
        if has(&["heading", "display", "title"]) {
            "--brand-font-heading"
        } else {
            "--brand-font-body"
        }
    } else if has(&["primary", "brand-color", "main-color"]) {
        "--brand-primary"
    } else if has(&["secondary"]) {
        "--brand-secondary"
    } else if has(&["accent", "highlight"]) {
        "--brand-accent"
    } else if has(&["radius", "rounded", "corner"]) {
        "--brand-radius"
    } else if has(&["spacing", "space", "gap", "gutter"]) {
        "--brand-space"
    } else if has(&["transition", "duration", "easing"]) {
        "--brand-transition"
    } else if has(&["neutral", "gray", "grey", "muted"]) {
        "--brand-neutral-medium"
    } else {
        return None;
    };
    known
        .contains(candidate)
        .then(|| Target::Token(candidate.to_string()))
}
