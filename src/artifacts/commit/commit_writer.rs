//! Turning a staging index into a commit
//!
//! The new snapshot is HEAD's tree with the staged adds merged on top and the
//! staged deletes pruned. Only added files are read from disk: they are access
//! checked first, then hashed, then streamed into the blob store (re-hashed on
//! the way, so a file changing in between fails the commit instead of storing
//! torn content).

use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::access::access_guard::{self, AccessMode};
use crate::artifacts::core::rel_path;
use crate::artifacts::objects::commit::{Commit, UserData};
use crate::artifacts::tree::construct::construct_paths;
use crate::artifacts::tree::merge::merge_trees;
use crate::artifacts::tree::tree_entry::{TreeDir, TreeEntry};
use crate::errors::SnowError;
use anyhow::Context;
use derive_new::new;
use std::collections::BTreeSet;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Create the commit even if the snapshot equals its parent's
    pub allow_empty: bool,
}

#[derive(new)]
pub struct CommitWriter<'r> {
    repository: &'r Repository,
}

impl<'r> CommitWriter<'r> {
    pub async fn write(
        &self,
        index: &mut Index,
        message: &str,
        options: CommitOptions,
        tags: Vec<String>,
        user_data: UserData,
    ) -> anyhow::Result<Commit> {
        let (_, parent_hash) = self.repository.refs().resolve_head()?;
        let parent = self.repository.database().load_commit(&parent_hash)?;

        let added = self.expand_adds(index)?;
        let deleted = index.deletes().len();
        let workdir = self.repository.workspace().path();
        access_guard::check(workdir, &added, AccessMode::Readable).await?;

        let added_tree = construct_paths(workdir, &added).await?;
        self.store_blobs(&added_tree).await?;

        let mut base = parent.root().clone();
        // a file standing where an added path needs a directory gives way
        for path in &added {
            for ancestor in rel_path::ancestors(path) {
                if base.find(ancestor).is_some_and(TreeEntry::is_file) {
                    base.remove(ancestor);
                }
            }
        }

        let mut root = merge_trees(&base, &added_tree);
        for path in index.deletes() {
            if root.remove(path).is_none() {
                tracing::debug!(path = %path, "staged delete is not part of the snapshot");
                continue;
            }
            self.prune_vanished_parents(&mut root, path);
        }
        root.update_hashes();

        if root.hash == parent.root().hash && !options.allow_empty {
            return Err(SnowError::invalid_state("nothing to commit").into());
        }

        let commit = Commit::new(
            Some(parent_hash),
            root,
            message.to_string(),
            tags,
            user_data,
        )?;
        self.repository.database().store_commit(&commit)?;
        self.repository.refs().update_head_target(commit.hash())?;

        index.clear();
        index.write_files()?;
        tracing::info!(
            hash = %commit.hash(),
            added = added.len(),
            deleted,
            "commit created"
        );

        Ok(commit)
    }

    /// Staged directories stand for the files beneath them
    fn expand_adds(&self, index: &Index) -> anyhow::Result<Vec<String>> {
        let workspace = self.repository.workspace();
        let ignore = self.repository.ignore_rules();

        let mut added = BTreeSet::new();
        for path in index.adds() {
            added.extend(workspace.expand_files(path, ignore)?);
        }

        Ok(added.into_iter().collect())
    }

    async fn store_blobs(&self, tree: &TreeDir) -> anyhow::Result<()> {
        let mut storing = JoinSet::new();
        for (path, file) in tree.all_files() {
            let database = self.repository.database().clone();
            let source = self.repository.workspace().abs_path(path);
            let hash = file.hash.clone();

            storing.spawn_blocking(move || database.store_blob(&source, &hash));
        }

        while let Some(joined) = storing.join_next().await {
            joined.context("blob storing task failed")??;
        }

        Ok(())
    }

    /// Drop directories emptied by a delete unless they still exist on disk
    fn prune_vanished_parents(&self, root: &mut TreeDir, path: &str) {
        let workspace = self.repository.workspace();

        for ancestor in rel_path::ancestors(path).into_iter().rev() {
            let is_empty = root
                .find(ancestor)
                .and_then(TreeEntry::as_dir)
                .is_some_and(|dir| dir.children.is_empty());

            if !is_empty || workspace.abs_path(ancestor).is_dir() {
                break;
            }
            root.remove(ancestor);
        }
    }
}
