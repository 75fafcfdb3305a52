//! Deterministic rendering of section decisions into one HTML document.
//!
//! Component templates use `{{title}}`, `{{content}}`, `{{items}}`,
//! `{{ctaText}}`, `{{ctaUrl}}`, `{{highlightedText}}` and `{{iconHint}}`
//! placeholders. Every substituted value is escaped. Sections without a
//! decision render as plain markup so the article stays complete.

use std::collections::HashMap;

use tracing::warn;

use crate::codegen::compile_css;
use crate::domain::{
    Article, ArticleSection, BrandComponent, DesignDna, SectionDesignDecision,
};
use crate::intelligence::content::{bullet_items, ordered_items, prose};
use crate::markup::escape;

const BASE_CSS: &str = r#"
.brand-article { max-width: 72ch; margin: 0 auto; padding: 0 var(--brand-space); font-family: var(--brand-font-body, sans-serif); }
.brand-article h1, .brand-article h2, .brand-article h3 { font-family: var(--brand-font-heading, inherit); }
.brand-section { margin: calc(var(--brand-space) * 4) 0; }
[data-columns="2"] ul, [data-columns="2"] ol { display: grid; grid-template-columns: repeat(2, 1fr); gap: calc(var(--brand-space) * 2); }
[data-columns="3"] ul, [data-columns="3"] ol { display: grid; grid-template-columns: repeat(3, 1fr); gap: calc(var(--brand-space) * 2); }
[data-columns="4"] ul, [data-columns="4"] ol { display: grid; grid-template-columns: repeat(4, 1fr); gap: calc(var(--brand-space) * 2); }
[data-width="narrow"] { max-width: 60ch; margin-inline: auto; }
@media (max-width: 768px) {
  [data-columns] ul, [data-columns] ol { grid-template-columns: 1fr; }
}
"#;

fn paragraphs_html(content: &str) -> String {
    prose(content)
        .iter()
        .map(|p| format!("<p>{}</p>", escape(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn items_html(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("<li>{}</li>", escape(i)))
        .collect::<Vec<_>>()
        .join("")
}

/// Fill a component template with one decision's content.
pub fn fill_template(template: &str, section: &ArticleSection, decision: &SectionDesignDecision) -> String {
    let mapping = &decision.content_mapping;
    let optional = |value: &Option<String>| value.as_deref().map(escape).unwrap_or_default();
    let replacements = [
        ("{{title}}", escape(&mapping.title)),
        ("{{content}}", paragraphs_html(&section.content)),
        ("{{items}}", items_html(&mapping.items)),
        ("{{ctaText}}", optional(&mapping.cta_text)),
        ("{{ctaUrl}}", optional(&mapping.cta_url)),
        ("{{highlightedText}}", optional(&mapping.highlighted_text)),
        ("{{iconHint}}", optional(&mapping.icon_hint)),
    ];
    replacements
        .iter()
        .fold(template.to_string(), |html, (placeholder, value)| {
            html.replace(placeholder, value)
        })
}

fn rendered_section(
    section: &ArticleSection,
    decision: &SectionDesignDecision,
    component: &BrandComponent,
) -> String {
    let template = decision
        .variant_id
        .as_deref()
        .and_then(|id| component.variant(id))
        .and_then(|v| v.html_template.as_deref())
        .unwrap_or(&component.html_template);
    let layout = &decision.layout;
    let variant_attr = decision
        .variant_id
        .as_deref()
        .map(|id| format!(" data-variant-id=\"{}\"", escape(id)))
        .unwrap_or_default();
    format!(
        "<section class=\"brand-section\" data-columns=\"{}\" data-width=\"{}\" data-emphasis=\"{}\" data-section-id=\"{}\" data-component-id=\"{}\"{variant_attr}>\n{}\n</section>",
        layout.columns,
        layout.width.as_str(),
        layout.emphasis.as_str(),
        escape(&section.id),
        escape(&component.id),
        fill_template(template, section, decision).trim(),
    )
}

/// Plain markup for a section without a usable decision.
fn plain_section(section: &ArticleSection) -> String {
    let level = section.heading_level.clamp(2, 6);
    let mut items = bullet_items(&section.content);
    if items.is_empty() {
        items = ordered_items(&section.content);
    }
    let list = if items.is_empty() {
        String::new()
    } else {
        format!("\n<ul>{}</ul>", items_html(&items))
    };
    format!(
        "<section class=\"brand-section plain\" data-section-id=\"{}\">\n<h{level}>{}</h{level}>\n{}{list}\n</section>",
        escape(&section.id),
        escape(&section.heading),
        paragraphs_html(&section.content),
    )
}

/// Render `article` using `decisions`; the stylesheet carries the design
/// tokens and the CSS of every component actually used.
pub fn render_article(
    article: &Article,
    decisions: &[SectionDesignDecision],
    components: &[BrandComponent],
    dna: &DesignDna,
) -> String {
    let by_section: HashMap<&str, &SectionDesignDecision> = decisions
        .iter()
        .map(|d| (d.section_id.as_str(), d))
        .collect();
    let library: HashMap<&str, &BrandComponent> =
        components.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut used: Vec<BrandComponent> = Vec::new();
    let mut body = Vec::with_capacity(article.sections.len());
    for section in &article.sections {
        let resolved = by_section.get(section.id.as_str()).and_then(|decision| {
            let component = library.get(decision.component_id.as_str());
            if component.is_none() {
                warn!(
                    section = %section.id,
                    component = %decision.component_id,
                    "decision references a component outside the library"
                );
            }
            component.map(|c| (*decision, *c))
        });
        match resolved {
            Some((decision, component)) => {
                if !used.iter().any(|c| c.id == component.id) {
                    used.push(component.clone());
                }
                body.push(rendered_section(section, decision, component));
            }
            None => body.push(plain_section(section)),
        }
    }

    let title = escape(&article.title);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>\n{}\n{}\n</style>\n</head>\n<body>\n\
         <main class=\"brand-article\">\n<h1>{title}</h1>\n{}\n</main>\n</body>\n</html>\n",
        compile_css(dna, &used),
        BASE_CSS.trim(),
        body.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColorTokens, ContentMapping, Layout, SemanticRole, TypographyTokens};
    use crate::{css, markup};
    use chrono::Utc;

    fn article() -> Article {
        Article {
            id: "a1".to_string(),
            title: "Cats & Dogs".to_string(),
            sections: vec![
                ArticleSection {
                    id: "intro".to_string(),
                    heading: "Welcome".to_string(),
                    heading_level: 2,
                    content: "Hello <world>.".to_string(),
                },
                ArticleSection {
                    id: "odd".to_string(),
                    heading: "Misc".to_string(),
                    heading_level: 3,
                    content: "- one\n- two".to_string(),
                },
            ],
        }
    }

    fn hero() -> BrandComponent {
        BrandComponent {
            id: "hero".to_string(),
            brand_id: "acme".to_string(),
            name: "Hero".to_string(),
            purpose: String::new(),
            usage_context: String::new(),
            css: ".hero { color: var(--brand-primary); }".to_string(),
            html_template: "<div class=\"hero\"><h2>{{title}}</h2>{{content}}<a class=\"cta\" href=\"{{ctaUrl}}\">{{ctaText}}</a></div>".to_string(),
            preview_html: String::new(),
            source_component_id: "d1".to_string(),
            match_score: 90,
            variants: vec![],
            created_at: Utc::now(),
        }
    }

    fn decision() -> SectionDesignDecision {
        SectionDesignDecision {
            section_id: "intro".to_string(),
            section_heading: "Welcome".to_string(),
            component_id: "hero".to_string(),
            variant_id: None,
            layout: Layout::default(),
            reasoning: String::new(),
            semantic_role: SemanticRole::Intro,
            content_mapping: ContentMapping {
                title: "Welcome".to_string(),
                cta_text: Some("Go".to_string()),
                cta_url: Some("https://acme.test/?a=1&b=2".to_string()),
                ..ContentMapping::default()
            },
            confidence: 0.9,
        }
    }

    fn dna() -> DesignDna {
        DesignDna {
            colors: ColorTokens {
                primary: "#1a73e8".to_string(),
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
    fn test_render_article() {
        let html = render_article(&article(), &[decision()], &[hero()], &dna());
        markup::ensure_parseable(&html).expect("parseable");
        assert_eq!(markup::component_ids(&html), vec!["hero"]);
        assert!(html.contains("<title>Cats &amp; Dogs</title>"));
        assert!(html.contains("<p>Hello &lt;world&gt;.</p>"));
        assert!(html.contains("href=\"https://acme.test/?a=1&amp;b=2\""));
        assert!(html.contains("<h3>Misc</h3>"));
        assert!(html.contains("<li>one</li><li>two</li>"));

        let stylesheet = markup::stylesheet(&html);
        assert_eq!(css::root_block_count(&stylesheet), 1);
        assert!(css::has_responsive_rule(&stylesheet));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_unknown_component_falls_back_to_plain() {
        let mut d = decision();
        d.component_id = "missing".to_string();
        let html = render_article(&article(), &[d], &[hero()], &dna());
        assert!(markup::component_ids(&html).is_empty());
        assert!(html.contains("brand-section plain"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = render_article(&article(), &[decision()], &[hero()], &dna());
        let b = render_article(&article(), &[decision()], &[hero()], &dna());
        assert_eq!(a, b);
    }
}
