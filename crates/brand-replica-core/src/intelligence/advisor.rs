//! Ranking of library components for a section.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ArticleSection, BrandComponent, PositionContext, Result, SemanticRole};

/// Everything an advisor sees when ranking one section.
#[derive(Debug, Clone, Copy)]
pub struct RankingRequest<'a> {
    pub section: &'a ArticleSection,
    pub role: SemanticRole,
    pub context: &'a PositionContext,
    pub components: &'a [BrandComponent],
    pub custom_prompt: Option<&'a str>,
}

/// How well one component (and optionally a variant) suits a section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFit {
    pub component_id: String,
    pub variant_id: Option<String>,
    /// `0..=1`.
    pub fit: f64,
    pub reasoning: String,
}

/// Ranks library components for a section, best first.
#[async_trait]
pub trait SectionAdvisor: Send + Sync {
    async fn rank(&self, request: &RankingRequest<'_>) -> Result<Vec<CandidateFit>>;
}

/// Deterministic advisor matching role keywords against component
/// descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordAdvisor;

impl KeywordAdvisor {
    pub fn fit(role: SemanticRole, section: &ArticleSection, component: &BrandComponent) -> CandidateFit {
        let descriptor = component.descriptor();
        let hits: Vec<&str> = role
            .keywords()
            .iter()
            .copied()
            .filter(|k| descriptor.contains(k))
            .collect();
        let heading_overlap = section
            .heading
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 3)
            .any(|w| descriptor.contains(w));

        let mut fit = match hits.len() {
            0 => 0.2,
            n => (0.55 + 0.15 * (n - 1) as f64).min(0.95),
        };
        if heading_overlap {
            fit = (fit + 0.05).min(1.0);
        }

        let variant_id = component
            .variants
            .iter()
            .find(|v| {
                let name = v.name.to_lowercase();
                role.keywords().iter().any(|k| name.contains(k))
            })
            .map(|v| v.id.clone());

        let reasoning = if hits.is_empty() {
            format!("'{}' has no {role} traits", component.name)
        } else {
            format!("'{}' suits {role} ({})", component.name, hits.join(", "))
        };
        CandidateFit {
            component_id: component.id.clone(),
            variant_id,
            fit,
            reasoning,
        }
    }
}

#[async_trait]
impl SectionAdvisor for KeywordAdvisor {
    async fn rank(&self, request: &RankingRequest<'_>) -> Result<Vec<CandidateFit>> {
        let mut ranked: Vec<(CandidateFit, u8)> = request
            .components
            .iter()
            .map(|c| (Self::fit(request.role, request.section, c), c.match_score))
            .collect();
        ranked.sort_by(|(a, a_score), (b, b_score)| {
            b.fit
                .total_cmp(&a.fit)
                .then(b_score.cmp(a_score))
                .then_with(|| a.component_id.cmp(&b.component_id))
        });
        Ok(ranked.into_iter().map(|(fit, _)| fit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComponentVariant, SectionPosition};
    use chrono::Utc;

    fn component(id: &str, name: &str, purpose: &str, score: u8) -> BrandComponent {
        BrandComponent {
            id: id.to_string(),
            brand_id: "acme".to_string(),
            name: name.to_string(),
            purpose: purpose.to_string(),
            usage_context: String::new(),
            css: String::new(),
            html_template: String::new(),
            preview_html: String::new(),
            source_component_id: id.to_string(),
            match_score: score,
            variants: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_keyword_ranking() {
        let mut grid = component("grid", "Feature Grid", "card grid for feature lists", 80);
        grid.variants.push(ComponentVariant {
            id: "grid-compact".to_string(),
            name: "Compact list".to_string(),
            css_override: String::new(),
            html_template: None,
        });
        let library = vec![
            component("hero", "Hero Banner", "page intro", 90),
            grid,
        ];
        let section = ArticleSection {
            id: "s1".to_string(),
            heading: "Features".to_string(),
            heading_level: 2,
            content: "- a\n- b".to_string(),
        };
        let context = PositionContext {
            position: SectionPosition::Body,
            index: 1,
            total: 3,
            previous_heading: None,
            next_heading: None,
        };
        let request = RankingRequest {
            section: &section,
            role: SemanticRole::List,
            context: &context,
            components: &library,
            custom_prompt: None,
        };
        let ranked = KeywordAdvisor.rank(&request).await.expect("rank");
        assert_eq!(ranked[0].component_id, "grid");
        assert_eq!(ranked[0].variant_id.as_deref(), Some("grid-compact"));
        assert!(ranked[0].fit > ranked[1].fit);
        assert_eq!(ranked[1].fit, 0.2);
    }
}
