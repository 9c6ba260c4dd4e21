//! Unit tests for staging directories and archive formats

use archivist::utils::archive::{remove_tree, Archiver};
use rstest::rstest;
use std::fs;
use test_utils::{ArchiveFormat, TestContext};

#[rstest]
#[case(ArchiveFormat::Zip, ".zip")]
#[case(ArchiveFormat::Tar, ".tar")]
#[case(ArchiveFormat::Gztar, ".tar.gz")]
fn test_archive_extension(#[case] format: ArchiveFormat, #[case] suffix: &str) {
    let ctx = TestContext::new();
    let archiver = Archiver::new(&ctx.temp_dir().join("root"), format);
    let staging = archiver.stage("db-").unwrap();
    fs::write(staging.path().join("dump"), "data").unwrap();

    let archive = archiver.pack(staging.path()).unwrap();

    assert!(archive.to_string_lossy().ends_with(suffix));
    assert!(archive.starts_with(archiver.root()));
    assert!(fs::metadata(&archive).unwrap().len() > 0);
}

#[test]
fn test_staging_prefix_and_cleanup() {
    let ctx = TestContext::new();
    let archiver = Archiver::new(ctx.temp_dir(), ArchiveFormat::Zip);

    let mut staging = archiver.stage("app-20240307-").unwrap();
    let name = staging.path().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("app-20240307-"));
    assert!(name.len() > "app-20240307-".len());

    staging.cleanup().unwrap();
    assert!(!staging.path().exists());
}

#[test]
fn test_remove_missing_tree_is_noop() {
    let ctx = TestContext::new();
    remove_tree(&ctx.temp_dir().join("never-created")).unwrap();
}
