//! Unit tests for source and vault routing

use archivist::sources::{BackupSource, Source, SourceEnv, SourceError};
use archivist::utils::template::FixedClock;
use archivist::vaults::{BackupVault, Vault, VaultError};
use rstest::rstest;
use std::sync::Arc;
use test_utils::{fixed_instant, MockClientFactory, MockExecutor, SourceConfig, VaultConfig};

fn env() -> SourceEnv {
    SourceEnv {
        executor: Arc::new(MockExecutor::new()),
        clock: Arc::new(FixedClock(fixed_instant())),
        timeout: None,
    }
}

fn database(url: &str) -> SourceConfig {
    SourceConfig {
        kind: Some("database".to_string()),
        url: Some(url.to_string()),
        name: "db-{yyyy}".to_string(),
        ..SourceConfig::default()
    }
}

#[rstest]
#[case("postgres://u@h:5432/mydb", "postgres", "postgres://h/mydb")]
#[case("postgresql://h/mydb", "postgres", "postgresql://h/mydb")]
#[case("mysql://root:pw@db:3306/shop", "mysql", "mysql://db/shop")]
fn test_database_routing(#[case] url: &str, #[case] kind: &str, #[case] described: &str) {
    let source = BackupSource::from_config(&database(url), &env()).unwrap();
    assert_eq!(source.kind(), kind);
    assert_eq!(source.describe(), described);
}

#[rstest]
#[case("oracle://h/db")]
#[case("mongodb://h/db")]
fn test_unknown_scheme(#[case] url: &str) {
    let err = BackupSource::from_config(&database(url), &env()).unwrap_err();
    assert!(matches!(err, SourceError::UnsupportedScheme(_)));
}

#[test]
fn test_database_without_name() {
    let err = BackupSource::from_config(&database("postgres://h:5432"), &env()).unwrap_err();
    assert!(matches!(err, SourceError::MissingDatabaseName(_)));
}

#[test]
fn test_dir_routing() {
    let config = SourceConfig {
        kind: Some("dir".to_string()),
        path: Some("/srv/data".into()),
        ..SourceConfig::default()
    };
    let source = BackupSource::from_config(&config, &env()).unwrap();
    assert!(matches!(source, BackupSource::Directory(_)));
    assert_eq!(source.describe(), "/srv/data");
}

#[rstest]
#[case(Some("ftp"))]
#[case(None)]
fn test_unsupported_source_type(#[case] kind: Option<&str>) {
    let config = SourceConfig {
        kind: kind.map(str::to_string),
        ..SourceConfig::default()
    };
    let err = BackupSource::from_config(&config, &env()).unwrap_err();
    assert!(matches!(err, SourceError::UnsupportedSourceType(_)));
}

fn vault(service: Option<&str>) -> VaultConfig {
    VaultConfig {
        service: service.map(str::to_string),
        name: Some("target".to_string()),
        ..VaultConfig::default()
    }
}

#[tokio::test]
async fn test_vault_kinds_are_distinct() {
    let factory = MockClientFactory::new();

    let glacier = BackupVault::from_config("a", &vault(Some("glacier")), &factory)
        .await
        .unwrap();
    let s3 = BackupVault::from_config("b", &vault(Some("s3")), &factory)
        .await
        .unwrap();

    assert!(matches!(glacier, BackupVault::ColdStorage(_)));
    assert!(matches!(s3, BackupVault::ObjectStorage(_)));
    assert_eq!(glacier.describe(), "Amazon Glacier [default region] target");
    assert_eq!(s3.describe(), "Amazon S3 target");
}

#[tokio::test]
async fn test_vault_service_errors() {
    let factory = MockClientFactory::new();

    let unknown = BackupVault::from_config("a", &vault(Some("ftp")), &factory)
        .await
        .unwrap_err();
    assert!(matches!(unknown, VaultError::UnknownService { .. }));

    let missing = BackupVault::from_config("a", &vault(None), &factory)
        .await
        .unwrap_err();
    assert!(matches!(missing, VaultError::MissingService { .. }));
}

#[tokio::test]
async fn test_vault_client_failure() {
    let factory = MockClientFactory::new().failing("no credentials");
    let err = BackupVault::from_config("a", &vault(Some("s3")), &factory)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Client { .. }));
    assert!(err.to_string().contains("no credentials"));
}
