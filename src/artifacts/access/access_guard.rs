//! Access checks run before files are read into or written from a snapshot
//!
//! Each path is probed on its own blocking task: it must exist and open in the
//! requested mode. A single scan of open handles then tells which of the
//! probed files another handle is still writing. Results keep the order of the
//! input paths regardless of which probe finished first, and every violation
//! is reported, not only the first one.

use crate::artifacts::access::access_report::{AccessReport, AccessViolation};
use crate::artifacts::access::open_handles::{FileKey, WriterTable};
use crate::artifacts::core::rel_path;
use crate::errors::SnowError;
use anyhow::Context;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The file is about to be read into a snapshot
    Readable,
    /// The file is about to be overwritten or deleted
    Writable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Accessible,
    Violation(AccessViolation),
}

enum Probe {
    Opened(Option<FileKey>),
    Refused(AccessViolation),
}

/// Fail with [`SnowError::AccessDenied`] listing every path that is not accessible
pub async fn check(root: &Path, paths: &[String], mode: AccessMode) -> anyhow::Result<()> {
    let violations = inspect(root, paths, mode)
        .await?
        .into_iter()
        .filter_map(|(_, outcome)| match outcome {
            AccessOutcome::Violation(violation) => Some(violation),
            AccessOutcome::Accessible => None,
        })
        .collect::<Vec<_>>();

    if violations.is_empty() {
        return Ok(());
    }

    tracing::debug!(violations = violations.len(), ?mode, "access check failed");
    Err(SnowError::AccessDenied(AccessReport { violations }).into())
}

/// Outcome per path, in input order
pub async fn inspect(
    root: &Path,
    paths: &[String],
    mode: AccessMode,
) -> anyhow::Result<Vec<(String, AccessOutcome)>> {
    let mut probes = JoinSet::new();
    for (position, path) in paths.iter().enumerate() {
        let abs_path = rel_path::to_path(root, path);
        let path = path.clone();

        probes.spawn_blocking(move || {
            let probe = probe(&abs_path, &path, mode);
            (position, path, probe)
        });
    }

    let mut probed = BTreeMap::new();
    while let Some(joined) = probes.join_next().await {
        let (position, path, probe) = joined.context("access probe failed")?;
        probed.insert(position, (path, probe));
    }

    let targets = probed
        .values()
        .filter_map(|(_, probe)| match probe {
            Probe::Opened(key) => *key,
            Probe::Refused(_) => None,
        })
        .collect::<HashSet<_>>();
    let table = tokio::task::spawn_blocking(move || WriterTable::scan(&targets))
        .await
        .context("open handle scan failed")??;

    Ok(probed
        .into_values()
        .map(|(path, probe)| {
            let outcome = match probe {
                Probe::Refused(violation) => AccessOutcome::Violation(violation),
                Probe::Opened(None) => AccessOutcome::Accessible,
                Probe::Opened(Some(key)) => match table.writers_of(&key) {
                    [] => AccessOutcome::Accessible,
                    writers => {
                        AccessOutcome::Violation(AccessViolation::open_elsewhere(&path, writers))
                    }
                },
            };
            (path, outcome)
        })
        .collect())
}

fn probe(abs_path: &Path, path: &str, mode: AccessMode) -> Probe {
    let metadata = match std::fs::metadata(abs_path) {
        Ok(metadata) => metadata,
        Err(e) => return Probe::Refused(refusal(path, &e)),
    };
    if metadata.is_dir() {
        return Probe::Opened(None);
    }

    let mut options = std::fs::OpenOptions::new();
    match mode {
        AccessMode::Readable => options.read(true),
        AccessMode::Writable => options.write(true),
    };

    let file = match options.open(abs_path) {
        Ok(file) => file,
        Err(e) => return Probe::Refused(refusal(path, &e)),
    };
    if is_locked_elsewhere(&file, mode) {
        return Probe::Refused(AccessViolation::open_elsewhere(path, &[]));
    }

    Probe::Opened(FileKey::of(&metadata))
}

fn refusal(path: &str, error: &std::io::Error) -> AccessViolation {
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => AccessViolation::permission_denied(path, error),
        _ => AccessViolation::missing(path),
    }
}

#[cfg(target_os = "linux")]
fn is_locked_elsewhere(_file: &std::fs::File, _mode: AccessMode) -> bool {
    false
}

/// Without a handle table, fall back to an advisory lock probe
#[cfg(not(target_os = "linux"))]
fn is_locked_elsewhere(file: &std::fs::File, mode: AccessMode) -> bool {
    let lock = match mode {
        AccessMode::Readable => file_guard::Lock::Shared,
        AccessMode::Writable => file_guard::Lock::Exclusive,
    };

    matches!(
        file_guard::try_lock(file, lock, 0, 1),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::access::access_report::ViolationKind;
    use crate::errors::{ErrorKind, as_snow_error, error_kind};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_files_and_directories_are_told_apart() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        std::fs::create_dir(dir.path().join("folder"))?;
        std::fs::write(dir.path().join("present.txt"), b"x")?;

        let outcomes = inspect(
            dir.path(),
            &["missing.txt".into(), "folder".into(), "present.txt".into()],
            AccessMode::Readable,
        )
        .await?;

        assert_eq!(outcomes[0].0, "missing.txt");
        assert!(matches!(
            &outcomes[0].1,
            AccessOutcome::Violation(violation) if violation.kind == ViolationKind::Missing
        ));
        assert_eq!(outcomes[1].1, AccessOutcome::Accessible);
        assert_eq!(outcomes[2].1, AccessOutcome::Accessible);

        Ok(())
    }

    #[tokio::test]
    async fn check_aggregates_every_violation() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;

        let error = check(
            dir.path(),
            &["a".into(), "b".into(), "c".into()],
            AccessMode::Writable,
        )
        .await
        .unwrap_err();

        assert_eq!(error_kind(&error), ErrorKind::AccessDenied);
        let Some(SnowError::AccessDenied(report)) = as_snow_error(&error) else {
            panic!("expected an access report, got {error:?}");
        };
        assert_eq!(report.paths(), vec!["a", "b", "c"]);

        Ok(())
    }

    #[tokio::test]
    async fn nothing_to_check_passes() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;

        check(dir.path(), &[], AccessMode::Writable).await
    }
}
