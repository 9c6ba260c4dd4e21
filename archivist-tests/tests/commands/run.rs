//! Tests for the 'run' command
//!
//! A run extracts every source in order, archives non-empty extractions and
//! uploads each archive to every vault.

use archivist::utils::executor::mock::output_file;
use archivist::utils::{CommandExecutor, FixedClock, Invocation};
use archivist::{BackupContext, BackupRunner, SourceOutcome, VaultResult};
use async_trait::async_trait;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_utils::{
    fixed_instant, MockArchiveStore, MockExecutor, MockObjectStore, MockResponse,
    SettingsBuilder, TestContext,
};

#[tokio::test]
async fn test_run_empty_directory_produces_nothing() {
    let ctx = TestContext::new();
    let builder = SettingsBuilder::minimal().add_populated_dir_source("empty", &[]);
    let tmpdir = builder.tmpdir();
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].outcome, SourceOutcome::Empty);
    assert_eq!(report.upload_attempts(), 0);
    assert!(ctx.object_store.get_calls().is_empty());

    // Staging directory removed, no archive created
    assert!(ctx.list_dir(&tmpdir).is_empty());
    assert!(report
        .to_string()
        .starts_with(&format!("Nothing to archive from source {}", report.sources[0].source)));
}

#[tokio::test]
async fn test_run_one_vault_rejecting() {
    // Glacier accepts, S3 answers without confirmation
    let ctx = TestContext::with_stores(MockObjectStore::rejecting(), MockArchiveStore::new());
    let builder = SettingsBuilder::new()
        .add_glacier_vault("a-cold", "long-term")
        .add_s3_vault("b-bucket", "offsite")
        .add_populated_dir_source(
            "files",
            &[("one.txt", "1"), ("two.txt", "2"), ("three.txt", "3")],
        )
        .add_populated_dir_source("later", &[("x.txt", "x")]);
    let tmpdir = builder.tmpdir();
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    let first = &report.sources[0];
    let archive = first.archive().expect("first source archived");
    assert!(archive.exists());
    assert!(archive.starts_with(&tmpdir));

    let uploads = first.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].vault, "a-cold");
    let metadata = uploads[0].metadata().expect("glacier upload metadata");
    assert!(metadata.contains_key("id"));
    assert_eq!(
        metadata["description"],
        archive.file_name().unwrap().to_string_lossy()
    );
    assert_eq!(uploads[1].vault, "b-bucket");
    assert_eq!(uploads[1].result, VaultResult::Rejected);
    assert!(uploads[1].metadata().is_none());

    // The run went on with the next source
    assert!(report.sources[1].archive().is_some());
    assert_eq!(report.upload_attempts(), 4);
    assert_eq!(report.uploaded_count(), 2);

    // The archive holds the three files
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    assert_eq!(zip.len(), 3);
    let mut content = String::new();
    zip.by_name("two.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "2");
}

#[tokio::test]
async fn test_run_n_sources_m_vaults() {
    let ctx = TestContext::new();
    let builder = SettingsBuilder::new()
        .add_s3_vault("one", "bucket-1")
        .add_glacier_vault("two", "vault-2")
        .add_s3_vault("three", "bucket-3")
        .add_populated_dir_source("a", &[("a.txt", "a")])
        .add_populated_dir_source("b", &[("b.txt", "b")]);
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.upload_attempts(), 6);
    assert_eq!(ctx.object_store.get_calls().len(), 4);
    assert_eq!(ctx.archive_store.get_calls().len(), 2);

    // Uploads go out in vault name order
    let order: Vec<&str> = report.sources[0]
        .uploads()
        .iter()
        .map(|u| u.vault.as_str())
        .collect();
    assert_eq!(order, vec!["one", "three", "two"]);
}

#[tokio::test]
async fn test_run_database_dump_uses_rendered_name() {
    let ctx = TestContext::new();
    let builder = SettingsBuilder::minimal()
        .add_database_source("postgres://backup:secret@db:5432/app", "app-{yyyy}{mm}{dd}-");
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    let calls = ctx.executor.get_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "pg_dump");
    assert!(calls[0].args[0].ends_with("/app-20240307-"));
    assert_eq!(calls[0].args.last().unwrap(), "app");
    assert_eq!(
        calls[0].envs,
        vec![("PGPASSWORD".to_string(), "secret".to_string())]
    );

    // The mock writes nothing, so the archive is an empty container
    assert!(report.sources[0].archive().is_some());
    assert_eq!(report.uploaded_count(), 1);
}

#[tokio::test]
async fn test_run_database_dump_lands_in_archive() {
    let ctx = TestContext::new().with_executor(MockExecutor::new().expect(
        "mysqldump",
        MockResponse::Dump {
            contents: "INSERT INTO orders VALUES (1);".to_string(),
        },
    ));
    let (settings, _temp_dir) = SettingsBuilder::minimal()
        .add_database_source("mysql://root:pw@db/shop", "shop-")
        .persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    let archive = report.sources[0].archive().expect("dump archived");
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    assert_eq!(zip.len(), 1);

    let mut dump = String::new();
    zip.by_index(0).unwrap().read_to_string(&mut dump).unwrap();
    assert_eq!(dump, "INSERT INTO orders VALUES (1);");
}

#[tokio::test]
async fn test_run_failed_dump_is_isolated() {
    let executor = MockExecutor::new().expect(
        "mysqldump",
        MockResponse::Failure {
            stderr: "Access denied for user 'root'".to_string(),
            exit_code: 2,
        },
    );
    let ctx = TestContext::new().with_executor(executor);
    let builder = SettingsBuilder::minimal()
        .add_database_source("mysql://root@db/shop", "shop-")
        .add_populated_dir_source("files", &[("f.txt", "f")]);
    let tmpdir = builder.tmpdir();
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    match &report.sources[0].outcome {
        SourceOutcome::Failed { error } => assert!(error.contains("Access denied")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.sources[1].archive().is_some());
    assert!(report.has_failures());

    // Only the second source's archive is left behind
    let leftovers = ctx.list_dir(&tmpdir);
    assert_eq!(leftovers.len(), 1);
    assert!(leftovers[0].starts_with("files-") && leftovers[0].ends_with(".zip"));
}

#[tokio::test]
async fn test_run_upload_error_reported_per_vault() {
    let ctx = TestContext::with_stores(MockObjectStore::failing("connection reset"), MockArchiveStore::new());
    let builder = SettingsBuilder::new()
        .add_s3_vault("bucket", "b")
        .add_glacier_vault("cold", "c")
        .add_populated_dir_source("files", &[("f.txt", "f")]);
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    let uploads = report.sources[0].uploads();
    assert!(matches!(&uploads[0].result, VaultResult::Failed { error } if error.contains("connection reset")));
    assert!(uploads[1].is_uploaded());
}

#[tokio::test]
async fn test_run_without_keeping_archives() {
    let ctx = TestContext::new();
    let builder = SettingsBuilder::minimal()
        .with_keep_archives(false)
        .add_populated_dir_source("files", &[("f.txt", "f")]);
    let tmpdir = builder.tmpdir();
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(report.uploaded_count(), 1);
    assert!(ctx.list_dir(&tmpdir).is_empty());
}

#[tokio::test]
async fn test_run_unwritable_tmpdir_aborts() {
    let ctx = TestContext::new();
    let blocker = ctx.create_file("not-a-dir", "file in the way");
    let builder = SettingsBuilder::minimal()
        .with_tmpdir(&blocker.join("staging"))
        .add_populated_dir_source("files", &[("f.txt", "f")]);
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &ctx.backup_context()).await.unwrap();
    let err = runner.run().await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to stage source"));
}

/// Writes a dump and remembers whether its staging directory existed at call time
#[derive(Default)]
struct StagingRecorder {
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

#[async_trait]
impl CommandExecutor for StagingRecorder {
    async fn run_command(
        &self,
        invocation: &Invocation,
        _timeout: Option<Duration>,
    ) -> anyhow::Result<Output> {
        let file = output_file(invocation).expect("dump names its output file");
        let staging = file.parent().expect("dump file has a parent").to_path_buf();
        self.seen
            .lock()
            .unwrap()
            .push((staging.clone(), staging.is_dir()));
        std::fs::write(&file, "-- dump")?;
        Ok(Output {
            status: ExitStatus::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[tokio::test]
async fn test_staging_directory_exists_only_while_source_is_processed() {
    let ctx = TestContext::new();
    let recorder = Arc::new(StagingRecorder::default());
    let backup_ctx = BackupContext::new(
        recorder.clone(),
        Arc::new(FixedClock(fixed_instant())),
        Arc::new(ctx.clients.clone()),
    );
    let builder = SettingsBuilder::minimal()
        .add_database_source("postgres://db/app", "app-")
        .add_database_source("mysql://db/shop", "shop-");
    let tmpdir = builder.tmpdir();
    let (settings, _temp_dir) = builder.persist();

    let runner = BackupRunner::build(settings, &backup_ctx).await.unwrap();
    let report = runner.run().await.unwrap();

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_ne!(seen[0].0, seen[1].0);
    for (staging, existed) in &seen {
        assert!(existed, "{} missing during extraction", staging.display());
        assert!(staging.starts_with(&tmpdir));
        assert!(!staging.exists(), "{} left behind", staging.display());
    }

    // Packing saw the staged dump
    for source in &report.sources {
        let archive = source.archive().expect("dump archived");
        let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
    }
    assert_eq!(ctx.list_dir(&tmpdir).len(), 2);
}
