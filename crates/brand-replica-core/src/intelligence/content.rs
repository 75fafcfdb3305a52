//! Section classification and content extraction.

use crate::css::static_regex;
use crate::domain::{ArticleSection, ContentMapping, PositionContext, SectionPosition, SemanticRole};

static_regex!(bullet_re, r"(?m)^\s*[-*+]\s+(.+?)\s*$");
static_regex!(ordered_re, r"(?m)^\s*\d+[.)]\s+(.+?)\s*$");
static_regex!(question_re, r"(?m)^\s*(?:[-*+]\s+|#+\s*)?(.+\?)\s*$");
static_regex!(link_re, r"\[([^\]]+)\]\(([^)\s]+)\)");
static_regex!(bold_re, r"\*\*([^*]+)\*\*");
static_regex!(figure_re, r"\b\d[\d,.]*\s*(?:%|x|k|m|\+)?");
static_regex!(quote_re, r"(?m)^\s*>\s*(.+)$");

const CTA_WORDS: &[&str] = &[
    "get started",
    "sign up",
    "contact",
    "try ",
    "book",
    "buy",
    "subscribe",
    "download",
    "request a",
];

const SUMMARY_WORDS: &[&str] = &["conclusion", "summary", "takeaway", "final thoughts", "wrap"];

pub fn bullet_items(content: &str) -> Vec<String> {
    bullet_re()
        .captures_iter(content)
        .map(|c| strip_inline_markdown(&c[1]))
        .collect()
}

pub fn ordered_items(content: &str) -> Vec<String> {
    ordered_re()
        .captures_iter(content)
        .map(|c| strip_inline_markdown(&c[1]))
        .collect()
}

pub fn questions(content: &str) -> Vec<String> {
    question_re()
        .captures_iter(content)
        .map(|c| strip_inline_markdown(&c[1]))
        .collect()
}

/// First markdown link as `(text, url)`.
pub fn first_link(content: &str) -> Option<(String, String)> {
    link_re()
        .captures(content)
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
}

pub fn first_highlight(content: &str) -> Option<String> {
    bold_re().captures(content).map(|c| c[1].trim().to_string())
}

/// Content with list, quote and link syntax reduced to plain text.
pub fn strip_inline_markdown(text: &str) -> String {
    let text = link_re().replace_all(text, "$1");
    bold_re().replace_all(&text, "$1").trim().to_string()
}

/// Lines of `content` that are not list items, joined as paragraphs.
pub fn prose(content: &str) -> Vec<String> {
    content
        .split("\n\n")
        .map(|block| {
            block
                .lines()
                .filter(|line| {
                    !bullet_re().is_match(line)
                        && !ordered_re().is_match(line)
                        && !quote_re().is_match(line)
                })
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .map(|p| strip_inline_markdown(&p))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Infer the semantic role of a section from its heading, body and position.
pub fn classify_role(section: &ArticleSection, context: &PositionContext) -> SemanticRole {
    let heading = section.heading.to_lowercase();
    let content = &section.content;
    let lowered = content.to_lowercase();

    if heading.contains("faq")
        || heading.contains("frequently asked")
        || questions(content).len() >= 2
    {
        return SemanticRole::Faq;
    }
    if heading.contains("step") || heading.starts_with("how to") || ordered_items(content).len() >= 2
    {
        return SemanticRole::Process;
    }
    if quote_re().is_match(content) || heading.contains("testimonial") {
        return SemanticRole::Quote;
    }
    if heading.contains("stat")
        || heading.contains("by the numbers")
        || figure_re().find_iter(content).count() >= 3
    {
        return SemanticRole::Stats;
    }
    if bullet_items(content).len() >= 2 {
        return SemanticRole::List;
    }
    if SUMMARY_WORDS.iter().any(|w| heading.contains(w)) {
        return SemanticRole::Summary;
    }
    let wants_action = CTA_WORDS
        .iter()
        .any(|w| heading.contains(w) || lowered.contains(w));
    if wants_action && first_link(content).is_some() {
        return SemanticRole::CallToAction;
    }
    if context.position == SectionPosition::Intro {
        return SemanticRole::Intro;
    }
    SemanticRole::Content
}

/// Map section content onto the template slots for `role`.
pub fn map_content(section: &ArticleSection, role: SemanticRole) -> ContentMapping {
    let content = &section.content;
    let items = match role {
        SemanticRole::Faq => questions(content),
        SemanticRole::Process => {
            let ordered = ordered_items(content);
            if ordered.is_empty() {
                bullet_items(content)
            } else {
                ordered
            }
        }
        SemanticRole::Quote => quote_re()
            .captures_iter(content)
            .map(|c| strip_inline_markdown(&c[1]))
            .collect(),
        _ => {
            let bullets = bullet_items(content);
            if bullets.is_empty() {
                ordered_items(content)
            } else {
                bullets
            }
        }
    };
    let (cta_text, cta_url) = match first_link(content) {
        Some((text, url)) => (Some(text), Some(url)),
        None => (None, None),
    };
    ContentMapping {
        title: section.heading.trim().to_string(),
        items,
        cta_text,
        cta_url,
        highlighted_text: first_highlight(content),
        icon_hint: Some(role.icon_hint().to_string()),
    }
}
