#![cfg(target_os = "linux")]

use assert_fs::TempDir;
use common::file::{FileSpec, write_file};
use pretty_assertions::assert_eq;
use rstest::rstest;
use snow::artifacts::access::access_guard::{self, AccessMode, AccessOutcome};
use snow::artifacts::access::access_report::ViolationKind;
use snow::artifacts::checkout::reset_flags::ResetFlags;
use snow::errors::{ErrorKind, SnowError, as_snow_error, error_kind};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::PermissionsExt;

mod common;

fn violations(outcomes: &[(String, AccessOutcome)]) -> Vec<&str> {
    outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, AccessOutcome::Violation(_)))
        .map(|(path, _)| path.as_str())
        .collect()
}

#[rstest]
#[tokio::test]
async fn only_files_open_for_writing_are_reported(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let root = repository_dir.path();
    let mut paths = vec!["idle.bin".to_string(), "reader.bin".to_string()];
    paths.extend((0..10).map(|i| format!("writer-{i:02}.bin")));
    for path in &paths {
        write_file(FileSpec::new(root.join(path), "payload".to_string()));
    }

    let _reader = File::open(root.join("reader.bin"))?;
    let _writers = paths[2..]
        .iter()
        .map(|path| OpenOptions::new().append(true).open(root.join(path)))
        .collect::<Result<Vec<_>, _>>()?;

    let outcomes = access_guard::inspect(root, &paths, AccessMode::Writable).await?;

    assert_eq!(
        outcomes.iter().map(|(path, _)| path.as_str()).collect::<Vec<_>>(),
        paths.iter().map(String::as_str).collect::<Vec<_>>()
    );
    assert_eq!(violations(&outcomes), paths[2..].iter().map(String::as_str).collect::<Vec<_>>());
    for (_, outcome) in &outcomes[2..] {
        let AccessOutcome::Violation(violation) = outcome else {
            unreachable!()
        };
        assert_eq!(violation.kind, ViolationKind::OpenElsewhere);
        assert!(violation.message.contains("is written by"));
    }

    let error = access_guard::check(root, &paths, AccessMode::Readable)
        .await
        .unwrap_err();
    assert_eq!(error_kind(&error), ErrorKind::AccessDenied);
    let Some(SnowError::AccessDenied(report)) = as_snow_error(&error) else {
        panic!("access report expected, got {error}");
    };
    assert_eq!(report.violations.len(), 10);

    Ok(())
}

#[rstest]
#[tokio::test]
async fn files_without_handles_pass(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let root = repository_dir.path();
    let specs = common::file::write_generated_files(root, 5);
    let paths = specs
        .iter()
        .filter_map(|spec| spec.path.file_name()?.to_str().map(str::to_string))
        .collect::<Vec<_>>();

    access_guard::check(root, &paths, AccessMode::Writable).await?;
    access_guard::check(root, &paths, AccessMode::Readable).await?;

    Ok(())
}

#[rstest]
#[tokio::test]
async fn read_only_files_cannot_be_checked_for_writing(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let root = repository_dir.path();
    let path = root.join("locked.bin");
    write_file(FileSpec::new(path.clone(), "payload".to_string()));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444))?;

    // privileged users open read-only files for writing anyway
    if OpenOptions::new().write(true).open(&path).is_ok() {
        return Ok(());
    }

    let error = access_guard::check(root, &["locked.bin".to_string()], AccessMode::Writable)
        .await
        .unwrap_err();
    let Some(SnowError::AccessDenied(report)) = as_snow_error(&error) else {
        panic!("access report expected, got {error}");
    };
    assert_eq!(report.violations[0].kind, ViolationKind::PermissionDenied);
    assert!(error.to_string().contains("permission denied"));

    Ok(())
}

#[rstest]
#[tokio::test]
async fn commit_refuses_files_still_being_written(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let root = repository_dir.path();
    let repository = common::init_repository(root);
    write_file(FileSpec::new(root.join("render.exr"), "partial".to_string()));
    let _writer = OpenOptions::new().append(true).open(root.join("render.exr"))?;

    let error = common::commit_paths(&repository, &["render.exr"], &[], "render")
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error), ErrorKind::AccessDenied);
    assert!(error.to_string().contains("File 'render.exr' is written by"));
    assert_eq!(repository.head_commit()?.root().all_files().len(), 0);

    Ok(())
}

#[rstest]
#[tokio::test]
async fn checkout_refuses_to_touch_files_still_being_written(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let root = repository_dir.path();
    let repository = common::init_repository(root);
    write_file(FileSpec::new(root.join("a.psd"), "layers".to_string()));
    let first = common::commit_paths(&repository, &["a.psd"], &[], "add a").await?;
    write_file(FileSpec::new(root.join("b.psd"), "more layers".to_string()));
    let second = common::commit_paths(&repository, &["b.psd"], &[], "add b").await?;
    let _writer = OpenOptions::new().append(true).open(root.join("b.psd"))?;

    let error = repository
        .checkout(first.hash().as_ref(), ResetFlags::DETACH)
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error), ErrorKind::AccessDenied);
    let Some(SnowError::AccessDenied(report)) = as_snow_error(&error) else {
        panic!("access report expected, got {error}");
    };
    assert_eq!(report.paths(), vec!["b.psd"]);
    assert!(root.join("a.psd").exists());
    assert!(root.join("b.psd").exists());
    assert_eq!(repository.get_head()?.hash, *second.hash());
    assert!(!repository.get_head()?.detached);

    Ok(())
}
