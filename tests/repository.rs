use assert_fs::TempDir;
use pretty_assertions::assert_eq;
use rstest::rstest;
use snow::areas::repository::{
    INITIAL_COMMIT_MESSAGE, RepoState, Repository, SNOW_MARKER, get_repo_details,
};
use snow::artifacts::branch::DEFAULT_BRANCH;
use snow::artifacts::log::history::CommitOrder;
use snow::errors::{ErrorKind, error_kind};

mod common;

#[rstest]
fn init_creates_the_initial_commit_on_main(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let repository = common::init_repository(repository_dir.path());

    let head = repository.get_head()?;
    assert_eq!(head.name, DEFAULT_BRANCH);
    assert!(!head.detached);

    let commits = repository.get_all_commits(CommitOrder::NewestFirst)?;
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message(), INITIAL_COMMIT_MESSAGE);
    assert_eq!(commits[0].parent(), None);
    assert!(commits[0].root().children.is_empty());
    assert_eq!(commits[0].hash(), &head.hash);

    Ok(())
}

#[rstest]
fn init_twice_is_refused(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    common::init_repository(repository_dir.path());

    let error = Repository::init_ext(repository_dir.path(), None)
        .err()
        .expect("second init must fail");
    assert_eq!(error_kind(&error), ErrorKind::InvalidState);

    Ok(())
}

#[rstest]
fn external_commondir_is_found_through_the_marker_file(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let workdir = repository_dir.path().join("work");
    let commondir = repository_dir.path().join("store");
    let created = Repository::init_ext(&workdir, Some(&commondir))?;

    assert!(workdir.join(SNOW_MARKER).is_file());
    assert!(commondir.join("config").is_file());

    std::fs::create_dir_all(workdir.join("a/b"))?;
    let opened = Repository::open(&workdir.join("a/b"))?;
    assert_eq!(opened.workdir(), created.workdir());
    assert_eq!(opened.commondir(), commondir.canonicalize()?.as_path());
    assert_eq!(opened.config().uuid, created.config().uuid);

    Ok(())
}

#[rstest]
fn repo_details_walk_upward_only(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let root = repository_dir.path();
    std::fs::create_dir_all(root.join("plain/nested"))?;
    std::fs::create_dir_all(root.join("git/.git"))?;
    std::fs::create_dir_all(root.join("git/src"))?;
    std::fs::write(root.join("git/src/main.c"), b"int main;")?;
    let repository = common::init_repository(&root.join("project"));

    // the repository below `plain` is never discovered from above
    common::init_repository(&root.join("plain/nested/inner"));
    assert_eq!(get_repo_details(&root.join("plain"))?.state, RepoState::None);

    let git = get_repo_details(&root.join("git/src/main.c"))?;
    assert_eq!(git.state, RepoState::Git);
    assert_eq!(git.workdir, Some(root.join("git").canonicalize()?));

    let snow = get_repo_details(&root.join("project"))?;
    assert_eq!(snow.state, RepoState::Snow);
    assert_eq!(snow.uuid, Some(repository.config().uuid));

    let missing = get_repo_details(&root.join("does-not-exist")).unwrap_err();
    assert_eq!(error_kind(&missing), ErrorKind::NotFound);

    Ok(())
}

#[rstest]
fn snow_marker_wins_over_git_marker(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(repository_dir.path().join(".git"))?;
    common::init_repository(repository_dir.path());

    let details = get_repo_details(repository_dir.path())?;
    assert_eq!(details.state, RepoState::Snow);

    Ok(())
}

#[rstest]
fn open_outside_a_repository_is_not_found(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let error = Repository::open(repository_dir.path())
        .err()
        .expect("no repository here");
    assert_eq!(error_kind(&error), ErrorKind::NotFound);

    Ok(())
}

#[rstest]
fn indexes_are_created_loaded_and_listed(
    #[from(common::repository_dir)] repository_dir: TempDir,
) -> anyhow::Result<()> {
    let repository = common::init_repository(repository_dir.path());

    let mut main = repository.ensure_main_index()?;
    assert!(main.is_empty());
    main.add_files(["texture.png"])?;
    main.write_files()?;

    let auxiliary = repository.create_index()?;
    let reloaded = repository.get_index(auxiliary.id())?;
    assert!(reloaded.is_empty());

    let mut ids = repository.get_indexes()?;
    ids.sort();
    let mut expected = vec!["main".to_string(), auxiliary.id().to_string()];
    expected.sort();
    assert_eq!(ids, expected);

    assert_eq!(
        repository.ensure_main_index()?.adds().iter().collect::<Vec<_>>(),
        vec!["texture.png"]
    );

    let error = repository.get_index("unknown").unwrap_err();
    assert_eq!(error_kind(&error), ErrorKind::NotFound);

    Ok(())
}
