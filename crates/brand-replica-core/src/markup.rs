//! HTML scanning helpers for rendered articles.

use std::collections::BTreeSet;

use crate::css::static_regex;
use crate::domain::{PipelineError, Result};

static_regex!(element_re, r"<[A-Za-z][A-Za-z0-9-]*[\s>/]");
static_regex!(style_open_re, r"(?i)<style\b[^>]*>");
static_regex!(style_close_re, r"(?i)</style\s*>");
static_regex!(style_block_re, r"(?is)<style\b[^>]*>(.*?)</style\s*>");
static_regex!(inline_style_re, r#"(?i)\sstyle\s*=\s*"([^"]*)""#);
static_regex!(heading_re, r"(?i)<h([1-6])\b");
static_regex!(class_attr_re, r#"(?i)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#);
static_regex!(
    cta_re,
    r#"(?i)<button\b|<a\b[^>]*class\s*=\s*["'][^"']*(?:cta|button|btn)[^"']*["']"#
);
static_regex!(img_re, r"(?i)<img\b[^>]*>");
static_regex!(alt_re, r#"(?i)\salt\s*=\s*["'][^"']+["']"#);
static_regex!(component_id_re, r#"data-component-id\s*=\s*"([^"]+)""#);

/// Reject documents the validation rubrics cannot meaningfully scan.
pub fn ensure_parseable(html: &str) -> Result<()> {
    if html.trim().is_empty() {
        return Err(PipelineError::UnparseableHtml("document is empty".to_string()));
    }
    if !element_re().is_match(html) {
        return Err(PipelineError::UnparseableHtml(
            "document contains no elements".to_string(),
        ));
    }
    let opened = style_open_re().find_iter(html).count();
    let closed = style_close_re().find_iter(html).count();
    if opened != closed {
        return Err(PipelineError::UnparseableHtml(format!(
            "{opened} <style> tags but {closed} closing tags"
        )));
    }
    Ok(())
}

/// All CSS in the document: `<style>` blocks followed by inline styles.
pub fn stylesheet(html: &str) -> String {
    let blocks = style_block_re().captures_iter(html).map(|c| c[1].to_string());
    let inline = inline_style_re()
        .captures_iter(html)
        .map(|c| format!("[inline] {{ {} }}", &c[1]));
    blocks.chain(inline).collect::<Vec<_>>().join("\n")
}

/// The document with `<style>` blocks removed.
pub fn without_styles(html: &str) -> String {
    style_block_re().replace_all(html, "").into_owned()
}

/// Heading levels in document order.
pub fn heading_levels(html: &str) -> Vec<u8> {
    heading_re()
        .captures_iter(html)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

/// Every class name used by an element.
pub fn class_names(html: &str) -> BTreeSet<String> {
    class_attr_re()
        .captures_iter(html)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .flat_map(|m| {
            m.as_str()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Whether any class name contains `needle` (case-insensitive).
pub fn has_class_containing(html: &str, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    class_names(html)
        .iter()
        .any(|c| c.to_lowercase().contains(&needle))
}

pub fn call_to_action_count(html: &str) -> usize {
    cta_re().find_iter(html).count()
}

/// `(total images, images without alt text)`.
pub fn image_alt_coverage(html: &str) -> (usize, usize) {
    let images: Vec<_> = img_re().find_iter(html).collect();
    let missing = images
        .iter()
        .filter(|m| !alt_re().is_match(m.as_str()))
        .count();
    (images.len(), missing)
}

/// Component ids stamped on rendered sections, in document order.
pub fn component_ids(html: &str) -> Vec<String> {
    component_id_re()
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

/// Escape text for safe inclusion in element content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
