#![allow(dead_code)]

pub mod file;

use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use snow::areas::index::Index;
use snow::areas::repository::Repository;
use snow::artifacts::commit::commit_writer::CommitOptions;
use snow::artifacts::objects::commit::{Commit, UserData};
use std::path::Path;

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Fresh repository in `dir` that prints nothing
pub fn init_repository(dir: &Path) -> Repository {
    Repository::init_ext(dir, None)
        .expect("Failed to initialize repository")
        .with_writer(Box::new(std::io::sink()))
}

/// Stage `adds` and `deletes` on the main index and commit them
pub async fn commit_paths(
    repository: &Repository,
    adds: &[&str],
    deletes: &[&str],
    message: &str,
) -> anyhow::Result<Commit> {
    let mut index = repository.ensure_main_index()?;
    index.add_files(adds)?;
    index.delete_files(deletes)?;

    commit_index(repository, &mut index, message).await
}

pub async fn commit_index(
    repository: &Repository,
    index: &mut Index,
    message: &str,
) -> anyhow::Result<Commit> {
    repository
        .create_commit(
            index,
            message,
            CommitOptions::default(),
            Vec::new(),
            UserData::new(),
        )
        .await
}

pub fn run_snow_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("snow").expect("Failed to find snow binary");
    cmd.current_dir(dir).env("NO_COLOR", "1").args(args);
    cmd
}
