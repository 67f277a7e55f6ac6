//! Building snapshot trees from the working directory
//!
//! The directory walk happens on a blocking thread, then every file is hashed
//! on its own blocking task. Results are collected into a path-ordered map
//! before the tree is assembled, so the outcome never depends on which hash
//! finished first.

use crate::areas::workspace::{Workspace, WorkspaceEntry};
use crate::artifacts::core::rel_path;
use crate::artifacts::objects::hasher;
use crate::artifacts::status::ignore::IgnoreRules;
use crate::artifacts::tree::tree_entry::{TreeDir, TreeEntry, TreeFile};
use crate::errors::SnowError;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::task::JoinSet;

/// Snapshot of the whole directory at `root`
pub async fn construct(root: &Path, ignore: &IgnoreRules) -> anyhow::Result<TreeDir> {
    let workspace = Workspace::new(root.into());
    let ignore = ignore.clone();

    let entries = tokio::task::spawn_blocking(move || workspace.scan("", Some(&ignore)))
        .await
        .context("directory walk failed")??;
    tracing::debug!(root = %root.display(), entries = entries.len(), "directory walked");

    build(root, entries).await
}

/// Snapshot holding only the given files and their parent directories
///
/// Every path must name an existing regular file.
pub async fn construct_paths(root: &Path, paths: &[String]) -> anyhow::Result<TreeDir> {
    let workspace = Workspace::new(root.into());
    let paths = paths.to_vec();

    let entries = tokio::task::spawn_blocking(move || {
        paths
            .iter()
            .map(|path| match workspace.stat(path)? {
                Some(entry) if !entry.is_dir => Ok(entry),
                Some(_) => Err(SnowError::invalid_state(format!("'{path}' is a directory")).into()),
                None => Err(SnowError::not_found("file", path).into()),
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await
    .context("stat task failed")??;

    build(root, entries).await
}

async fn build(root: &Path, entries: Vec<WorkspaceEntry>) -> anyhow::Result<TreeDir> {
    let mut tree = TreeDir::root();
    let mut hashing = JoinSet::new();

    for entry in entries {
        if entry.is_dir {
            if tree.find(&entry.path).is_none() {
                tree.insert(TreeEntry::Dir(TreeDir::new(entry.path)));
            }
            continue;
        }

        let abs_path = rel_path::to_path(root, &entry.path);
        hashing.spawn_blocking(move || -> anyhow::Result<TreeFile> {
            let hashed = hasher::hash_file(&abs_path)?;

            Ok(TreeFile {
                path: entry.path,
                hash: hashed.hash,
                size: hashed.size,
                ctime: entry.ctime,
                mtime: entry.mtime,
                blocks: hashed.blocks,
            })
        });
    }

    let mut files = BTreeMap::new();
    while let Some(joined) = hashing.join_next().await {
        let file = joined.context("hashing task failed")??;
        files.insert(file.path.clone(), file);
    }

    for file in files.into_values() {
        tree.insert(TreeEntry::File(file));
    }
    tree.update_hashes();

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tree::merge::merge_trees;
    use pretty_assertions::assert_eq;

    fn write_files(root: &Path, paths: &[&str]) {
        for path in paths {
            let abs = rel_path::to_path(root, path);
            std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
            std::fs::write(abs, ".".repeat(rel_path::basename(path).len())).unwrap();
        }
    }

    #[tokio::test]
    async fn construct_hashes_every_file() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        write_files(dir.path(), &["foo-bar", "sub/xyz"]);
        std::fs::create_dir(dir.path().join("empty"))?;

        let tree = construct(dir.path(), &IgnoreRules::defaults()).await?;

        assert_eq!(
            tree.all_entries(true).keys().copied().collect::<Vec<_>>(),
            vec!["empty", "foo-bar", "sub", "sub/xyz"]
        );
        assert_eq!(tree.size, 10);
        assert_eq!(
            tree.find("sub/xyz").unwrap().hash(),
            &hasher::hash_content(b"...")
        );
        assert_eq!(tree.find("empty").unwrap().hash(), &hasher::hash_content(b""));

        Ok(())
    }

    #[tokio::test]
    async fn construct_skips_ignored_files() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        write_files(dir.path(), &["scene.blend", ".DS_Store", "sub/thumbs.db"]);

        let tree = construct(dir.path(), &IgnoreRules::defaults()).await?;

        assert_eq!(
            tree.all_entries(true).keys().copied().collect::<Vec<_>>(),
            vec!["scene.blend", "sub"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn construct_paths_keeps_only_listed_files() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        write_files(dir.path(), &["a/one", "a/two", "b/three"]);

        let tree = construct_paths(dir.path(), &["a/two".to_string()]).await?;

        assert_eq!(
            tree.all_entries(true).keys().copied().collect::<Vec<_>>(),
            vec!["a", "a/two"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn construct_paths_rejects_missing_files() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;

        let error = construct_paths(dir.path(), &["gone".to_string()])
            .await
            .unwrap_err();

        assert_eq!(
            crate::errors::error_kind(&error),
            crate::errors::ErrorKind::NotFound
        );

        Ok(())
    }

    #[tokio::test]
    async fn constructed_tree_merged_with_its_clone_is_unchanged() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        write_files(dir.path(), &["foo", "bar/baz"]);

        let tree = construct(dir.path(), &IgnoreRules::defaults()).await?;
        let merged = merge_trees(&tree, &tree.clone());

        assert_eq!(merged.all_entries(false).len(), 2);
        assert_eq!(merged, tree);

        Ok(())
    }
}
