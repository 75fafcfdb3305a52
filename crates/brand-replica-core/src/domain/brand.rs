//! Brand-side entities: design DNA, discovered components, generated components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::css;

/// Color tokens of a brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorTokens {
    pub primary: String,
    pub secondary: Option<String>,
    pub accent: Option<String>,
    pub neutrals: Vec<String>,
}

/// Typography tokens of a brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TypographyTokens {
    pub heading_font: String,
    pub body_font: String,
    pub base_size_px: Option<f64>,
}

/// Spacing scale of a brand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SpacingTokens {
    pub base_unit_px: f64,
    pub density: Option<String>,
}

impl Default for SpacingTokens {
    fn default() -> Self {
        Self {
            base_unit_px: 8.0,
            density: None,
        }
    }
}

/// Shape language of a brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeTokens {
    pub border_radius_px: Option<f64>,
    pub style: Option<String>,
}

/// Motion language of a brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MotionTokens {
    pub transition_ms: Option<u32>,
    pub easing: Option<String>,
}

/// Structured description of a brand's visual language.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignDna {
    pub colors: ColorTokens,
    pub typography: TypographyTokens,
    pub spacing: SpacingTokens,
    pub shape: ShapeTokens,
    pub motion: MotionTokens,
    pub personality: Vec<String>,
}

impl DesignDna {
    /// Normalized `#rrggbb` palette, primary first, duplicates removed.
    pub fn palette(&self) -> Vec<String> {
        let mut palette = Vec::new();
        let candidates = std::iter::once(&self.colors.primary)
            .chain(self.colors.secondary.iter())
            .chain(self.colors.accent.iter())
            .chain(self.colors.neutrals.iter());
        for raw in candidates {
            if let Some(color) = css::normalize_color(raw) {
                if !palette.contains(&color) {
                    palette.push(color);
                }
            }
        }
        palette
    }

    /// Lower-cased primary font family names (heading, body), deduplicated.
    pub fn fonts(&self) -> Vec<String> {
        let mut fonts = Vec::new();
        for raw in [&self.typography.heading_font, &self.typography.body_font] {
            if let Some(family) = css::primary_font_family(raw) {
                if !fonts.contains(&family) {
                    fonts.push(family);
                }
            }
        }
        fonts
    }

    /// Structural problems that make this DNA unusable as a styling target.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if css::normalize_color(&self.colors.primary).is_none() {
            problems.push(format!(
                "primary color '{}' is not a recognizable color",
                self.colors.primary
            ));
        }
        if self.typography.heading_font.trim().is_empty()
            && self.typography.body_font.trim().is_empty()
        {
            problems.push("no heading or body font family".to_string());
        }
        if !(self.spacing.base_unit_px > 0.0) {
            problems.push("spacing base unit must be positive".to_string());
        }
        problems
    }
}

/// Reference to a captured screenshot of the source brand.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Screenshot {
    pub label: String,
    pub url: Option<String>,
    /// Path or storage key of the image data.
    pub data_ref: String,
    pub width: u32,
    pub height: u32,
}

/// A UI pattern harvested from the reference site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveredComponent {
    pub id: String,
    pub name: String,
    pub selector: String,
    pub html: String,
    pub css: String,
    pub category: Option<String>,
    pub screenshot: Option<Screenshot>,
}

/// Alternate presentation of a [`BrandComponent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentVariant {
    pub id: String,
    pub name: String,
    pub css_override: String,
    pub html_template: Option<String>,
}

/// A reusable, brand-matched component produced by CodeGen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrandComponent {
    pub id: String,
    pub brand_id: String,
    pub name: String,
    pub purpose: String,
    pub usage_context: String,
    pub css: String,
    pub html_template: String,
    pub preview_html: String,
    pub source_component_id: String,
    /// Fidelity to the source component, `0..=100`.
    pub match_score: u8,
    #[serde(default)]
    pub variants: Vec<ComponentVariant>,
    pub created_at: DateTime<Utc>,
}

impl BrandComponent {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn variant(&self, variant_id: &str) -> Option<&ComponentVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Lower-cased text describing what this component is for.
    pub fn descriptor(&self) -> String {
        format!("{} {} {}", self.name, self.purpose, self.usage_context).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dna() -> DesignDna {
        DesignDna {
            colors: ColorTokens {
                primary: "#1A73E8".to_string(),
                secondary: Some("#fff".to_string()),
                accent: Some("#1a73e8".to_string()),
                neutrals: vec!["rgb(32, 33, 36)".to_string()],
            },
            typography: TypographyTokens {
                heading_font: "'Montserrat', sans-serif".to_string(),
                body_font: "Inter, Arial".to_string(),
                base_size_px: Some(16.0),
            },
            ..DesignDna::default()
        }
    }

    #[test]
    fn test_palette_normalizes_and_dedupes() {
        let palette = dna().palette();
        assert_eq!(palette, vec!["#1a73e8", "#ffffff", "#202124"]);
    }

    #[test]
    fn test_fonts_use_primary_family() {
        assert_eq!(dna().fonts(), vec!["montserrat", "inter"]);
    }

    #[test]
    fn test_problems_flag_missing_primary() {
        let mut broken = dna();
        broken.colors.primary = "brand blue".to_string();
        broken.spacing.base_unit_px = 0.0;
        let problems = broken.problems();
        assert_eq!(problems.len(), 2);
        assert!(dna().problems().is_empty());
    }
}
