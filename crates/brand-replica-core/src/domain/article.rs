//! Article-side entities and per-section design decisions.

use serde::{Deserialize, Serialize};

/// One section of the article being styled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSection {
    pub id: String,
    pub heading: String,
    #[serde(default = "default_heading_level")]
    pub heading_level: u8,
    /// Markdown-flavoured body text.
    #[serde(default)]
    pub content: String,
}

fn default_heading_level() -> u8 {
    2
}

/// The article handed to Intelligence and the renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub sections: Vec<ArticleSection>,
}

/// Semantic role a section plays in the article.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticRole {
    Intro,
    Content,
    List,
    Process,
    Faq,
    Stats,
    Quote,
    CallToAction,
    Summary,
}

impl SemanticRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Content => "content",
            Self::List => "list",
            Self::Process => "process",
            Self::Faq => "faq",
            Self::Stats => "stats",
            Self::Quote => "quote",
            Self::CallToAction => "call-to-action",
            Self::Summary => "summary",
        }
    }

    /// Words a component descriptor is expected to contain when it suits
    /// this role.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Intro => &["hero", "intro", "banner", "header", "lead"],
            Self::Content => &["text", "content", "prose", "article", "body", "section"],
            Self::List => &["list", "grid", "card", "feature", "bullet"],
            Self::Process => &["step", "process", "timeline", "numbered", "how"],
            Self::Faq => &["faq", "accordion", "question", "answer", "toggle"],
            Self::Stats => &["stat", "metric", "number", "counter", "figure"],
            Self::Quote => &["quote", "testimonial", "blockquote", "review"],
            Self::CallToAction => &["cta", "button", "action", "contact", "banner"],
            Self::Summary => &["summary", "takeaway", "conclusion", "highlight", "callout"],
        }
    }

    pub fn icon_hint(self) -> &'static str {
        match self {
            Self::Intro => "sparkles",
            Self::Content => "document",
            Self::List => "check",
            Self::Process => "arrow-right",
            Self::Faq => "question",
            Self::Stats => "chart",
            Self::Quote => "quote",
            Self::CallToAction => "cursor",
            Self::Summary => "flag",
        }
    }
}

impl std::fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width class of a rendered section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WidthClass {
    Narrow,
    Medium,
    Wide,
    Full,
}

impl WidthClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Medium => "medium",
            Self::Wide => "wide",
            Self::Full => "full",
        }
    }
}

/// Visual weight of a rendered section, strongest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    Hero,
    Featured,
    Standard,
    Supporting,
    Minimal,
}

impl Emphasis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Featured => "featured",
            Self::Standard => "standard",
            Self::Supporting => "supporting",
            Self::Minimal => "minimal",
        }
    }
}

/// Layout parameters of one decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Column count, `1..=4`.
    pub columns: u8,
    pub width: WidthClass,
    pub emphasis: Emphasis,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            columns: 1,
            width: WidthClass::Medium,
            emphasis: Emphasis::Standard,
        }
    }
}

/// Partial layout used by configuration overrides; absent fields are kept.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOverride {
    pub columns: Option<u8>,
    pub width: Option<WidthClass>,
    pub emphasis: Option<Emphasis>,
}

/// How section content feeds the component template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentMapping {
    pub title: String,
    pub items: Vec<String>,
    pub cta_text: Option<String>,
    pub cta_url: Option<String>,
    pub highlighted_text: Option<String>,
    pub icon_hint: Option<String>,
}

/// Binding of one article section to one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionDesignDecision {
    pub section_id: String,
    pub section_heading: String,
    pub component_id: String,
    pub variant_id: Option<String>,
    pub layout: Layout,
    pub reasoning: String,
    pub semantic_role: SemanticRole,
    pub content_mapping: ContentMapping,
    /// `0..=1`.
    pub confidence: f64,
}

/// A section deliberately left without a decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSection {
    pub section_id: String,
    pub section_heading: String,
    pub reason: String,
    pub best_confidence: Option<f64>,
}

/// Where a section sits in the article.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionPosition {
    Intro,
    Body,
    Conclusion,
}

/// Position context of one section, including its neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionContext {
    pub position: SectionPosition,
    pub index: usize,
    pub total: usize,
    pub previous_heading: Option<String>,
    pub next_heading: Option<String>,
}

impl PositionContext {
    pub fn for_index(sections: &[ArticleSection], index: usize) -> Self {
        let total = sections.len();
        let position = if index == 0 {
            SectionPosition::Intro
        } else if index + 1 == total {
            SectionPosition::Conclusion
        } else {
            SectionPosition::Body
        };
        Self {
            position,
            index,
            total,
            previous_heading: index
                .checked_sub(1)
                .and_then(|i| sections.get(i))
                .map(|s| s.heading.clone()),
            next_heading: sections.get(index + 1).map(|s| s.heading.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(n: usize) -> Vec<ArticleSection> {
        (0..n)
            .map(|i| ArticleSection {
                id: format!("s{i}"),
                heading: format!("Heading {i}"),
                heading_level: 2,
                content: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_position_context() {
        let all = sections(3);
        let first = PositionContext::for_index(&all, 0);
        assert_eq!(first.position, SectionPosition::Intro);
        assert!(first.previous_heading.is_none());
        assert_eq!(first.next_heading.as_deref(), Some("Heading 1"));

        assert_eq!(PositionContext::for_index(&all, 1).position, SectionPosition::Body);
        let last = PositionContext::for_index(&all, 2);
        assert_eq!(last.position, SectionPosition::Conclusion);
        assert!(last.next_heading.is_none());
    }

    #[test]
    fn test_single_section_is_intro() {
        let only = sections(1);
        assert_eq!(
            PositionContext::for_index(&only, 0).position,
            SectionPosition::Intro
        );
    }

    #[test]
    fn test_role_serde_is_kebab_case() {
        let json = serde_json::to_string(&SemanticRole::CallToAction).expect("serialize");
        assert_eq!(json, "\"call-to-action\"");
        assert_eq!(SemanticRole::CallToAction.as_str(), "call-to-action");
    }

    #[test]
    fn test_section_defaults() {
        let section: ArticleSection =
            serde_json::from_str(r#"{"id":"a","heading":"Why"}"#).expect("deserialize");
        assert_eq!(section.heading_level, 2);
        assert!(section.content.is_empty());
    }
}
