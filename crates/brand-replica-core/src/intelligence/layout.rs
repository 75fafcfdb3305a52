//! Layout derivation and configured overrides.

use std::collections::BTreeMap;

use crate::domain::{
    ContextConfig, Emphasis, Layout, LayoutOverride, PositionContext, SectionPosition,
    SemanticRole, WidthClass,
};

/// Column count suggested by the role and number of mapped items.
fn columns_for(role: SemanticRole, items: usize, max_columns: u8) -> u8 {
    let wanted = match role {
        SemanticRole::List => match items {
            0..=2 => 1,
            3 | 5 | 6 => 3,
            _ => 2,
        },
        SemanticRole::Stats => items.clamp(1, 4),
        _ => 1,
    };
    (wanted as u8).clamp(1, max_columns.clamp(1, 4))
}

fn width_for(role: SemanticRole, columns: u8) -> WidthClass {
    match role {
        SemanticRole::Intro | SemanticRole::CallToAction => WidthClass::Full,
        SemanticRole::Quote => WidthClass::Narrow,
        SemanticRole::List | SemanticRole::Stats if columns >= 3 => WidthClass::Wide,
        _ => WidthClass::Medium,
    }
}

/// First sections lean hero/featured, the last standard/supporting.
fn emphasis_for(role: SemanticRole, context: &PositionContext, config: &ContextConfig) -> Emphasis {
    match context.position {
        SectionPosition::Intro => {
            if config.hero_first_section && role == SemanticRole::Intro {
                Emphasis::Hero
            } else {
                Emphasis::Featured
            }
        }
        SectionPosition::Conclusion => match role {
            SemanticRole::CallToAction | SemanticRole::Summary => Emphasis::Standard,
            _ => Emphasis::Supporting,
        },
        SectionPosition::Body => match role {
            SemanticRole::CallToAction | SemanticRole::Stats => Emphasis::Featured,
            SemanticRole::Quote => Emphasis::Supporting,
            _ => Emphasis::Standard,
        },
    }
}

pub fn derive_layout(
    role: SemanticRole,
    items: usize,
    context: &PositionContext,
    config: &ContextConfig,
) -> Layout {
    let columns = columns_for(role, items, config.max_columns);
    Layout {
        columns,
        width: width_for(role, columns),
        emphasis: emphasis_for(role, context, config),
    }
}

/// Apply the override configured for `role`, field by field.
pub fn merge_layout(
    base: Layout,
    role: SemanticRole,
    overrides: &BTreeMap<String, LayoutOverride>,
) -> Layout {
    let Some(patch) = overrides.get(role.as_str()) else {
        return base;
    };
    Layout {
        columns: patch.columns.map_or(base.columns, |c| c.clamp(1, 4)),
        width: patch.width.unwrap_or(base.width),
        emphasis: patch.emphasis.unwrap_or(base.emphasis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(position: SectionPosition) -> PositionContext {
        PositionContext {
            position,
            index: 0,
            total: 3,
            previous_heading: None,
            next_heading: None,
        }
    }

    #[test]
    fn test_position_bias() {
        let config = ContextConfig::default();
        let first = derive_layout(SemanticRole::Intro, 0, &context(SectionPosition::Intro), &config);
        assert_eq!(first.emphasis, Emphasis::Hero);
        assert_eq!(first.width, WidthClass::Full);

        let first_list = derive_layout(SemanticRole::List, 3, &context(SectionPosition::Intro), &config);
        assert_eq!(first_list.emphasis, Emphasis::Featured);

        let last = derive_layout(
            SemanticRole::Content,
            0,
            &context(SectionPosition::Conclusion),
            &config,
        );
        assert!(matches!(last.emphasis, Emphasis::Standard | Emphasis::Supporting));
    }

    #[test]
    fn test_hero_disabled_by_config() {
        let config = ContextConfig {
            hero_first_section: false,
            ..ContextConfig::default()
        };
        let first = derive_layout(SemanticRole::Intro, 0, &context(SectionPosition::Intro), &config);
        assert_eq!(first.emphasis, Emphasis::Featured);
    }

    #[test]
    fn test_columns_respect_cap() {
        let config = ContextConfig {
            max_columns: 2,
            ..ContextConfig::default()
        };
        let stats = derive_layout(SemanticRole::Stats, 6, &context(SectionPosition::Body), &config);
        assert_eq!(stats.columns, 2);
        assert_eq!(stats.width, WidthClass::Medium);
    }

    #[test]
    fn test_merge_applies_present_fields_only() {
        let base = Layout {
            columns: 3,
            width: WidthClass::Wide,
            emphasis: Emphasis::Standard,
        };
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "list".to_string(),
            LayoutOverride {
                columns: Some(2),
                width: None,
                emphasis: Some(Emphasis::Featured),
            },
        );
        let merged = merge_layout(base, SemanticRole::List, &overrides);
        assert_eq!(merged.columns, 2);
        assert_eq!(merged.width, WidthClass::Wide);
        assert_eq!(merged.emphasis, Emphasis::Featured);
        assert_eq!(merge_layout(base, SemanticRole::Faq, &overrides), base);
    }
}
