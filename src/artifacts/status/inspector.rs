//! Working directory against a committed tree
//!
//! A file is compared by size first. Equal sizes with a different mtime are
//! settled by re-hashing the file; equal size and mtime count as unmodified.
//! A tracked directory is modified when anything beneath it changed. Ignore
//! rules only apply to untracked paths: a committed file stays tracked even if
//! it matches a rule added later.

use crate::areas::repository::Repository;
use crate::artifacts::core::rel_path;
use crate::artifacts::objects::hasher;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::status_entry::{StatusEntry, StatusFilter, StatusFlags};
use crate::artifacts::tree::tree_entry::{TreeDir, TreeEntry};
use anyhow::Context;
use derive_new::new;
use std::collections::{BTreeMap, HashSet};
use tokio::task::JoinSet;

#[derive(new)]
pub struct Inspector<'r> {
    repository: &'r Repository,
}

impl<'r> Inspector<'r> {
    /// Status of the working directory relative to HEAD
    pub async fn status(&self, filter: StatusFilter) -> anyhow::Result<Vec<StatusEntry>> {
        let head = self.repository.head_commit()?;
        self.status_against(head.root(), filter).await
    }

    pub async fn status_against(
        &self,
        tree: &TreeDir,
        filter: StatusFilter,
    ) -> anyhow::Result<Vec<StatusEntry>> {
        let workspace = self.repository.workspace().clone();
        let on_disk = tokio::task::spawn_blocking(move || workspace.scan("", None))
            .await
            .context("directory walk failed")??;
        let ignore = self.repository.ignore_rules();
        let committed = tree.all_entries(true);

        let mut statuses = BTreeMap::new();
        let mut suspects = Vec::new();
        for entry in &on_disk {
            let status = match committed.get(entry.path.as_str()) {
                None if ignore.is_ignored(&entry.path) => StatusFlags::NEW | StatusFlags::IGNORED,
                None => StatusFlags::NEW,
                Some(TreeEntry::File(file)) if !entry.is_dir => {
                    if file.size != entry.size {
                        StatusFlags::MODIFIED
                    } else if file.mtime != entry.mtime {
                        suspects.push((entry.path.clone(), file.hash.clone()));
                        StatusFlags::UNMODIFIED
                    } else {
                        StatusFlags::UNMODIFIED
                    }
                }
                Some(TreeEntry::Dir(_)) if entry.is_dir => StatusFlags::UNMODIFIED,
                // a file replaced a directory or the other way around
                Some(_) => StatusFlags::MODIFIED,
            };
            statuses.insert(entry.path.clone(), (entry.is_dir, status));
        }

        let on_disk_paths = on_disk
            .iter()
            .map(|entry| entry.path.as_str())
            .collect::<HashSet<_>>();
        for (path, entry) in &committed {
            if !on_disk_paths.contains(path) {
                statuses.insert(path.to_string(), (entry.is_dir(), StatusFlags::DELETED));
            }
        }

        for path in self.rehash_changed(suspects).await? {
            if let Some((_, status)) = statuses.get_mut(&path) {
                *status = StatusFlags::MODIFIED;
            }
        }

        Self::propagate_to_directories(&mut statuses);

        let entries = statuses
            .into_iter()
            .filter(|(_, (_, status))| filter.admits(*status))
            .map(|(path, (is_dir, status))| StatusEntry {
                path,
                is_dir,
                status,
            })
            .collect::<Vec<_>>();
        tracing::debug!(entries = entries.len(), "status computed");

        Ok(entries)
    }

    /// Paths among `suspects` whose content no longer hashes to the committed hash
    async fn rehash_changed(
        &self,
        suspects: Vec<(String, ObjectId)>,
    ) -> anyhow::Result<Vec<String>> {
        let mut hashing = JoinSet::new();
        for (path, expected) in suspects {
            let abs_path = self.repository.workspace().abs_path(&path);
            hashing.spawn_blocking(move || -> anyhow::Result<Option<String>> {
                let hashed = hasher::hash_file(&abs_path)?;
                Ok((hashed.hash != expected).then_some(path))
            });
        }

        let mut changed = Vec::new();
        while let Some(joined) = hashing.join_next().await {
            if let Some(path) = joined.context("hashing task failed")?? {
                changed.push(path);
            }
        }

        Ok(changed)
    }

    fn propagate_to_directories(statuses: &mut BTreeMap<String, (bool, StatusFlags)>) {
        let changed_ancestors = statuses
            .iter()
            .filter(|(_, (_, status))| {
                !status.contains(StatusFlags::IGNORED)
                    && status.intersects(
                        StatusFlags::NEW | StatusFlags::MODIFIED | StatusFlags::DELETED,
                    )
            })
            .flat_map(|(path, _)| rel_path::ancestors(path))
            .map(str::to_string)
            .collect::<HashSet<_>>();

        for ancestor in changed_ancestors {
            if let Some((true, status)) = statuses.get_mut(&ancestor)
                && *status == StatusFlags::UNMODIFIED
            {
                *status = StatusFlags::MODIFIED;
            }
        }
    }
}
