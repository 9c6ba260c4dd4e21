//! Tests for the 'validate' command
//!
//! Validation loads the file, checks its sections and builds every source and
//! vault without running anything.

use archivist::{BackupRunner, BuildError, ConfigFormat, SourceError};
use test_utils::{
    sample_json, sample_yaml, ResultAssertions, SettingsBuilder, SourceConfig, TestContext,
    BROKEN_ENTRIES_YAML, EMPTY_SECTIONS_YAML,
};

#[tokio::test]
async fn test_validate_sample_config() {
    let ctx = TestContext::new();
    let data = ctx.create_subdir("data");
    let path = ctx.create_file(
        "backup.yml",
        &sample_yaml(&ctx.temp_dir().join("tmp").display().to_string(), &data.display().to_string()),
    );

    let runner = BackupRunner::create_with_config(&path, None, &ctx.backup_context())
        .await
        .assert_ok();

    assert_eq!(runner.sources().len(), 3);
    assert_eq!(runner.vaults().len(), 2);
    assert!(ctx.executor.get_calls().is_empty(), "validation must not dump");
}

#[tokio::test]
async fn test_validate_json_config() {
    let ctx = TestContext::new();
    let path = ctx.create_file("backup.json", &sample_json("/tmp/archivist-json", "/srv/data"));

    let runner = BackupRunner::create_with_config(&path, Some(ConfigFormat::Json), &ctx.backup_context())
        .await
        .assert_ok();
    assert_eq!(runner.sources().len(), 2);
}

#[tokio::test]
async fn test_validate_builder_config() {
    let ctx = TestContext::new();
    let (path, _settings, _temp_dir) = SettingsBuilder::minimal()
        .add_populated_dir_source("files", &[("a.txt", "a")])
        .write_yaml();

    BackupRunner::create_with_config(&path, None, &ctx.backup_context())
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_validate_empty_sections() {
    let ctx = TestContext::new();
    let path = ctx.create_file("backup.yml", EMPTY_SECTIONS_YAML);

    let errors = BackupRunner::create_with_config(&path, None, &ctx.backup_context())
        .await
        .unwrap_err();

    assert!(errors.has_key("backups"));
    assert!(errors.has_key("vaults"));
    // Nothing was constructed, so no client was requested
    assert!(ctx.clients.requested_settings().is_empty());
}

#[tokio::test]
async fn test_validate_reports_every_broken_entry() {
    let ctx = TestContext::new();
    let path = ctx.create_file("backup.yml", BROKEN_ENTRIES_YAML);

    let errors = BackupRunner::create_with_config(&path, None, &ctx.backup_context())
        .await
        .unwrap_err();

    let keys: Vec<&str> = errors.issues.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["backups[0]", "backups[1]", "vaults.bad", "vaults.nameless"]
    );
    assert_eq!(
        errors.issues[0].message,
        "Unknown database source scheme `oracle`"
    );
    assert_eq!(errors.issues[1].message, "Unsupported source type `ftp`");
    assert_eq!(
        errors.issues[2].message,
        "Unknown vault service `dropbox` for vault `bad`"
    );
    assert_eq!(
        errors.issues[3].message,
        "Key `service` is missing for vault `nameless`"
    );
}

#[tokio::test]
async fn test_validate_missing_file() {
    let ctx = TestContext::new();
    let result =
        BackupRunner::create_with_config(&ctx.temp_dir().join("backup.yml"), None, &ctx.backup_context())
            .await;
    result.assert_err_contains("Errors in configuration file");
}

#[tokio::test]
async fn test_name_with_separator_rejected_before_run() {
    let ctx = TestContext::new();
    let data = ctx.create_subdir("web");
    let (settings, _temp_dir) = SettingsBuilder::minimal()
        .add_source(SourceConfig {
            kind: Some("dir".to_string()),
            path: Some(data),
            name: "{tags}-{yyyy}".to_string(),
            tags: "prod/web".to_string(),
            ..SourceConfig::default()
        })
        .add_populated_dir_source("later", &[("x.txt", "x")])
        .persist();

    let failures = BackupRunner::build(settings, &ctx.backup_context())
        .await
        .unwrap_err();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].key, "backups[0]");
    assert!(matches!(
        failures[0].error,
        BuildError::Source(SourceError::InvalidName(ref name)) if name == "prod/web-2024"
    ));
    assert!(failures[0].to_issue().message.contains("single file name"));
}
