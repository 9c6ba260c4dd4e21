//! Unit tests for archive name templates

use archivist::utils::template::{render, FixedClock, NameTemplate, TemplateError, TemplateParams};
use rstest::rstest;
use test_utils::fixed_instant;

#[test]
fn test_date_only_pattern() {
    let params = TemplateParams {
        year: 2024,
        month: "03".to_string(),
        day: "07".to_string(),
        ..Default::default()
    };
    assert_eq!(render("{yyyy}{mm}{dd}", &params).unwrap(), "20240307");
}

#[rstest]
#[case("backup-{yyyy}{mm}{dd}-{HH}{MM}{SS}", "backup-20240307-040506")]
#[case("{tags}_{yyyy}", "nightly_2024")]
#[case("plain", "plain")]
#[case("{{{yyyy}}}", "{2024}")]
fn test_patterns(#[case] pattern: &str, #[case] expected: &str) {
    let template = NameTemplate::new(pattern, "nightly");
    assert_eq!(template.render_now(&FixedClock(fixed_instant())).unwrap(), expected);
}

#[rstest]
#[case("{year}")]
#[case("{yyyy}-{hostname}")]
fn test_unknown_placeholders(#[case] pattern: &str) {
    let result = NameTemplate::new(pattern, "").render_at(fixed_instant());
    assert!(matches!(result, Err(TemplateError::UnknownPlaceholder { .. })));
}

#[test]
fn test_error_names_placeholder() {
    let err = NameTemplate::new("db-{host}", "")
        .render_at(fixed_instant())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unknown placeholder `{host}` in name pattern `db-{host}`"
    );
}
