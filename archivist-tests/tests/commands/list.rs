//! Tests for the 'list' command
//!
//! Listing shows sources in configuration order and vaults by name.

use archivist::{BackupRunner, Source, Vault};
use test_utils::{ArchiveFormat, SettingsBuilder, TestContext};

#[tokio::test]
async fn test_list_order_and_descriptions() {
    let ctx = TestContext::new();
    let builder = SettingsBuilder::new()
        .with_format(ArchiveFormat::Tar)
        .add_s3_vault("zeta", "bucket-z")
        .add_glacier_vault("alpha", "vault-a")
        .add_database_source("mysql://root@db/shop", "shop-")
        .add_populated_dir_source("files", &[("f.txt", "f")])
        .add_database_source("postgres://u:pw@pg:5432/app", "app-");
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();

    let sources: Vec<String> = runner
        .sources()
        .iter()
        .map(|s| format!("{} {}", s.kind(), s.describe()))
        .collect();
    assert_eq!(sources[0], "mysql mysql://db/shop");
    assert!(sources[1].starts_with("dir "));
    assert_eq!(sources[2], "postgres postgres://pg/app");

    let vaults: Vec<String> = runner.vaults().values().map(|v| v.describe()).collect();
    assert_eq!(
        vaults,
        vec!["Amazon Glacier [us-east-1] vault-a", "Amazon S3 bucket-z"]
    );
    assert_eq!(runner.vaults()["zeta"].name(), "zeta");
    assert_eq!(runner.archiver().format(), ArchiveFormat::Tar);
}

#[tokio::test]
async fn test_list_never_leaks_credentials() {
    let ctx = TestContext::new();
    let (settings, _temp_dir) = SettingsBuilder::minimal()
        .add_database_source("postgres://admin:hunter2@pg/app", "app-")
        .persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();

    let source = &runner.sources()[0];
    assert!(!source.describe().contains("hunter2"));
    assert!(!format!("{:?}", source).contains("hunter2"));
}
