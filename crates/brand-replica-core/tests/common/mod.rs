//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use brand_replica_core::discovery::RawCapture;
use brand_replica_core::domain::{
    ColorTokens, MotionTokens, ShapeTokens, SpacingTokens, TypographyTokens,
};
use brand_replica_core::fakes::{ScriptedGenerator, StaticCapture};
use brand_replica_core::{
    Article, ArticleSection, BrandPipeline, CodeGenInput, Collaborators, DesignDna,
    DiscoveredComponent, PipelineConfig, PipelineRequest, Screenshot, SectionAdvisor,
};

pub const BRAND: &str = "acme";

pub fn dna() -> DesignDna {
    DesignDna {
        colors: ColorTokens {
            primary: "#1a73e8".to_string(),
            secondary: Some("#202124".to_string()),
            accent: Some("#fbbc04".to_string()),
            neutrals: vec![],
        },
        typography: TypographyTokens {
            heading_font: "Montserrat".to_string(),
            body_font: "Inter".to_string(),
            base_size_px: Some(16.0),
        },
        spacing: SpacingTokens {
            base_unit_px: 8.0,
            density: None,
        },
        shape: ShapeTokens {
            border_radius_px: Some(8.0),
            style: Some("rounded".to_string()),
        },
        motion: MotionTokens {
            transition_ms: Some(200),
            easing: Some("ease".to_string()),
        },
        personality: vec!["confident".to_string()],
    }
}

fn candidate(id: &str, name: &str, category: &str) -> DiscoveredComponent {
    DiscoveredComponent {
        id: id.to_string(),
        name: name.to_string(),
        selector: format!(".{id}"),
        html: format!("<div class=\"{id}\">{name}</div>"),
        css: String::new(),
        category: Some(category.to_string()),
        screenshot: None,
    }
}

/// Five candidates covering hero, list, FAQ, stats and CTA sections.
pub fn candidates() -> Vec<DiscoveredComponent> {
    vec![
        candidate("hero", "Hero banner", "hero"),
        candidate("feature-grid", "Feature grid", "list"),
        candidate("faq", "FAQ accordion", "faq"),
        candidate("stats", "Stat counter", "stats"),
        candidate("cta", "CTA button banner", "cta"),
    ]
}

pub fn raw_capture() -> RawCapture {
    RawCapture {
        candidates: candidates(),
        design_dna: dna(),
        screenshots: vec![Screenshot {
            label: "home".to_string(),
            url: Some("https://acme.example/".to_string()),
            data_ref: "screens/home.png".to_string(),
            width: 1440,
            height: 900,
        }],
    }
}

pub fn codegen_input() -> CodeGenInput {
    CodeGenInput {
        brand_id: BRAND.to_string(),
        discovered_components: candidates(),
        design_dna: dna(),
        existing_components: vec![],
    }
}

fn section(id: &str, heading: &str, content: &str) -> ArticleSection {
    ArticleSection {
        id: id.to_string(),
        heading: heading.to_string(),
        heading_level: 2,
        content: content.to_string(),
    }
}

pub fn article() -> Article {
    Article {
        id: "brand-guide".to_string(),
        title: "Building a Memorable Brand".to_string(),
        sections: vec![
            section(
                "intro",
                "Why brands matter",
                "A strong brand makes every page feel **familiar**.",
            ),
            section(
                "features",
                "What you get",
                "- Consistent colors\n- Shared typography\n- Reusable components",
            ),
            section(
                "faq",
                "Frequently asked questions",
                "How long does it take?\nA few minutes.\n\nCan I edit the result?\nYes.",
            ),
            section(
                "cta",
                "Get started",
                "Ready to try it? [Start your free trial](https://acme.example/trial)",
            ),
        ],
    }
}

pub fn request() -> PipelineRequest {
    PipelineRequest {
        brand_id: BRAND.to_string(),
        target_url: "https://acme.example/".to_string(),
        article: article(),
        existing_components: vec![],
    }
}

pub fn pipeline(
    generator: Arc<ScriptedGenerator>,
    advisor: Option<Arc<dyn SectionAdvisor>>,
) -> (BrandPipeline, Arc<StaticCapture>) {
    let capture = Arc::new(StaticCapture::new(raw_capture()));
    let pipeline = BrandPipeline::new(
        PipelineConfig::default(),
        Collaborators {
            capture: capture.clone(),
            generator,
            advisor,
            comparator: None,
        },
    )
    .expect("pipeline");
    (pipeline, capture)
}
