mod common;

use std::sync::Arc;

use brand_replica_core::fakes::FixedComparator;
use brand_replica_core::validation::CategoryScores;
use brand_replica_core::{
    weighted_overall, CategoryWeights, IssueKind, PhaseModule, PhaseState, PipelineError,
    ValidationConfig, ValidationInput, ValidationModule,
};

use common::dna;

const PAGE: &str = r#"<!DOCTYPE html>
<html><head><style>
:root { --brand-primary: #1a73e8; --brand-secondary: #202124; --brand-accent: #fbbc04; --brand-font-heading: Montserrat; --brand-font-body: Inter; --brand-radius: 8px; }
.brand-article { max-width: 72ch; padding: 16px; font-family: var(--brand-font-body); }
.c-hero { background-color: var(--brand-primary); color: var(--brand-secondary); border-radius: 8px; }
.c-hero:hover { border-color: var(--brand-accent); }
@media (max-width: 768px) { .brand-article { padding: 8px; } }
</style></head>
<body><main class="brand-article"><h1>Title</h1>
<section class="c-hero" data-emphasis="hero" data-component-id="hero"><h2>Hello</h2><a class="button" href="/go">Go</a></section>
</main></body></html>"#;

fn input(html: &str) -> ValidationInput {
    ValidationInput {
        rendered_html: html.to_string(),
        decisions: vec![],
        components: vec![],
        design_dna: dna(),
        reference_screenshots: vec![],
    }
}

#[test]
fn overall_is_the_weighted_average_of_categories() {
    let scores = CategoryScores {
        brand_match: 80.0,
        design_quality: 90.0,
        user_experience: 60.0,
    };
    let weights = CategoryWeights {
        brand_match: 0.5,
        design_quality: 0.3,
        user_experience: 0.2,
    };
    assert_eq!(weighted_overall(&scores, &weights).expect("overall"), 79.0);
}

#[tokio::test]
async fn scoring_reports_breakdowns_and_checklist() {
    let module = ValidationModule::new(ValidationConfig::default()).expect("module");

    let output = module.run(&input(PAGE)).await.expect("validation");

    assert_eq!(output.wow_factor_checklist.len(), 6);
    assert!((0.0..=100.0).contains(&output.overall));
    let expected = weighted_overall(&output.category_scores(), &CategoryWeights::default())
        .expect("overall");
    assert_eq!(output.overall, expected);
    let status = if output.passes_threshold {
        PhaseState::Success
    } else {
        PhaseState::Partial
    };
    assert_eq!(output.status, status);
    assert_eq!(module.status().status, status);
    assert!(module.validate_output(&output).valid);
}

#[tokio::test]
async fn document_scored_without_a_section_plan_is_not_capped() {
    let module = ValidationModule::new(ValidationConfig::default()).expect("module");

    let output = module.run(&input(PAGE)).await.expect("validation");

    let brand = &output.brand_match;
    assert_eq!(brand.max_score(), 85.0);
    assert!(brand.score() > 0.0);
    assert!((brand.percentage() - brand.score() / 85.0 * 100.0).abs() < 1e-9);
    assert!(brand.percentage() > brand.score(), "{brand:?}");
    assert!(output
        .brand_match
        .details()
        .iter()
        .all(|d| !d.contains("planned components rendered")));
}

#[tokio::test]
async fn unparseable_html_fails_the_phase() {
    let module = ValidationModule::new(ValidationConfig::default()).expect("module");

    let err = module
        .run(&input("<style>.a { color: red; }"))
        .await
        .expect_err("unparseable");

    assert!(matches!(err, PipelineError::UnparseableHtml(_)));
    assert_eq!(module.status().status, PhaseState::Failed);
}

#[tokio::test]
async fn comparator_failure_is_only_a_warning() {
    let comparator = Arc::new(FixedComparator::failing());
    let module = ValidationModule::new(ValidationConfig::default())
        .expect("module")
        .with_comparator(comparator.clone());
    let mut input = input(PAGE);
    input.reference_screenshots = common::raw_capture().screenshots;

    let output = module.run(&input).await.expect("validation still scores");

    assert_eq!(comparator.calls(), 1);
    let warning = output
        .errors
        .iter()
        .find(|e| e.unit == "visual comparison")
        .expect("warning recorded");
    assert_eq!(warning.kind, IssueKind::Warning);
    assert_ne!(output.status, PhaseState::Failed);
}

#[tokio::test]
async fn comparator_similarity_is_blended_into_brand_match() {
    let plain = ValidationModule::new(ValidationConfig::default()).expect("module");
    let compared = ValidationModule::new(ValidationConfig::default())
        .expect("module")
        .with_comparator(Arc::new(FixedComparator::new(0.0)));
    let mut input = input(PAGE);
    input.reference_screenshots = common::raw_capture().screenshots;

    let without = plain.run(&input).await.expect("plain");
    let with = compared.run(&input).await.expect("compared");

    let expected = without.brand_match.percentage() * 0.75;
    assert!((with.brand_match.percentage() - expected).abs() < 1e-9);
}

#[tokio::test]
async fn failed_required_item_blocks_passing() {
    let mut config = ValidationConfig::default();
    config.thresholds.brand_match = 0.0;
    config.thresholds.design_quality = 0.0;
    config.thresholds.user_experience = 0.0;
    let module = ValidationModule::new(config).expect("module");
    let html = PAGE.replace(r#"<a class="button" href="/go">Go</a>"#, "");

    let output = module.run(&input(&html)).await.expect("validation");

    let cta = output
        .wow_factor_checklist
        .iter()
        .find(|i| i.id == "cta")
        .expect("cta item");
    assert!(cta.required && !cta.passed);
    assert!(!output.passes_threshold);
    assert_eq!(output.status, PhaseState::Partial);
    assert!(output
        .errors
        .iter()
        .any(|e| e.unit == "cta" && e.kind == IssueKind::BelowThreshold));
}

#[tokio::test]
async fn validate_output_is_idempotent() {
    let module = ValidationModule::new(ValidationConfig::default()).expect("module");
    let output = module.run(&input(PAGE)).await.expect("validation");

    assert_eq!(module.validate_output(&output), module.validate_output(&output));

    let mut tampered = output.clone();
    tampered.passes_threshold = !tampered.passes_threshold;
    assert!(!module.validate_output(&tampered).valid);
}
