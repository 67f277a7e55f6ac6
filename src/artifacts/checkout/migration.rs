//! Checkout migration
//!
//! Moving the working directory to a target commit runs through
//!
//! ```text
//! Idle -> Diffing -> Validating -> Applying -> Done
//!            \            \            \
//!             `------------`------------`---> Failed
//! ```
//!
//! 1. Diffing: resolve the target and collect local changes against HEAD
//! 2. Validating: every local change must be covered by the reset flags, and
//!    every existing path about to be overwritten or deleted must pass a
//!    write-mode access check
//! 3. Applying: deletes, directory removals (deepest first), directory
//!    creations, then file writes; finally HEAD moves
//!
//! Nothing on disk changes before Applying. Each file write is atomic on its
//! own, but a failure while applying leaves the earlier mutations in place.

use crate::areas::repository::Repository;
use crate::artifacts::access::access_guard::{self, AccessMode};
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::reference::{Head, HeadInfo};
use crate::artifacts::checkout::conflict::{LocalChange, LocalChangeKind};
use crate::artifacts::checkout::reset_flags::ResetFlags;
use crate::artifacts::core::rel_path;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::inspector::Inspector;
use crate::artifacts::status::status_entry::StatusFilter;
use crate::artifacts::tree::tree_entry::{TreeDir, TreeEntry};
use crate::errors::SnowError;
use anyhow::Context;
use derive_new::new;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    Diffing,
    Validating,
    Applying,
    Done,
    Failed,
}

/// File system changes a checkout performs
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Target content per path, restores included
    pub writes: BTreeMap<String, ObjectId>,
    /// Paths deleted locally that the target brings back
    pub restores: BTreeSet<String>,
    pub deletes: BTreeSet<String>,
    pub mkdirs: BTreeSet<String>,
    /// Directories to remove; `true` when a file has to take their place
    pub rmdirs: BTreeMap<String, bool>,
}

/// Plain result of a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOutcome {
    pub commit: ObjectId,
    pub head: HeadInfo,
    pub written: Vec<String>,
    pub deleted: Vec<String>,
    pub restored: Vec<String>,
}

/// Working directory entries, `true` for directories
type DiskEntries = BTreeMap<String, bool>;

#[derive(new)]
pub struct Migration<'r> {
    repository: &'r Repository,
    flags: ResetFlags,
    #[new(value = "MigrationState::Idle")]
    state: MigrationState,
}

impl<'r> Migration<'r> {
    pub fn state(&self) -> MigrationState {
        self.state
    }

    fn transition(&mut self, state: MigrationState) {
        tracing::debug!(from = ?self.state, to = ?state, "checkout state");
        self.state = state;
    }

    pub async fn run(&mut self, target: &str) -> anyhow::Result<CheckoutOutcome> {
        let outcome = self.migrate(target).await;

        match &outcome {
            Ok(outcome) => {
                self.transition(MigrationState::Done);
                tracing::info!(
                    commit = %outcome.commit,
                    written = outcome.written.len(),
                    deleted = outcome.deleted.len(),
                    restored = outcome.restored.len(),
                    "checkout finished"
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "checkout aborted");
                self.transition(MigrationState::Failed);
            }
        }

        outcome
    }

    async fn migrate(&mut self, target: &str) -> anyhow::Result<CheckoutOutcome> {
        self.transition(MigrationState::Diffing);
        let (commit, branch) = self.resolve_target(target)?;
        let head_commit = self.repository.head_commit()?;
        let changes = self.local_changes(head_commit.root()).await?;
        let on_disk = self.disk_entries().await?;

        self.transition(MigrationState::Validating);
        let kept = self.validate_changes(target, &changes)?;
        self.validate_kept_paths(target, commit.root(), &changes, &kept)?;
        let plan = self.plan(head_commit.root(), commit.root(), &changes, &kept, &on_disk);
        self.validate_directory_removals(&plan, &on_disk)?;

        let overwritten = plan
            .deletes
            .iter()
            .chain(plan.writes.keys())
            .filter(|path| on_disk.get(path.as_str()) == Some(&false))
            .cloned()
            .collect::<Vec<_>>();
        access_guard::check(
            self.repository.workspace().path(),
            &overwritten,
            AccessMode::Writable,
        )
        .await?;

        self.transition(MigrationState::Applying);
        self.apply(&plan)?;

        let head = match branch {
            Some(branch) if !self.flags.contains(ResetFlags::DETACH) => Head::Attached(branch),
            _ => Head::Detached(commit.hash().clone()),
        };
        self.repository.refs().set_head(&head)?;

        Ok(CheckoutOutcome {
            commit: commit.hash().clone(),
            head: HeadInfo::new(&head, commit.hash().clone()),
            written: plan
                .writes
                .keys()
                .filter(|path| !plan.restores.contains(*path))
                .cloned()
                .collect(),
            deleted: plan.deletes.into_iter().collect(),
            restored: plan.restores.into_iter().collect(),
        })
    }

    /// A branch name attaches (unless detaching), a full commit hash detaches
    fn resolve_target(&self, target: &str) -> anyhow::Result<(Commit, Option<BranchName>)> {
        if let Ok(branch) = BranchName::try_parse(target.to_string())
            && self.repository.refs().branch_exists(&branch)
        {
            let record = self.repository.refs().read_branch(&branch)?;
            let commit = self.repository.database().load_commit(&record.hash)?;
            return Ok((commit, Some(branch)));
        }

        if let Ok(hash) = ObjectId::try_parse(target.to_string())
            && self.repository.database().has_commit(&hash)
        {
            return Ok((self.repository.database().load_commit(&hash)?, None));
        }

        Err(SnowError::not_found("commit or branch", target).into())
    }

    async fn local_changes(
        &self,
        head_tree: &TreeDir,
    ) -> anyhow::Result<BTreeMap<String, LocalChangeKind>> {
        let entries = Inspector::new(self.repository)
            .status_against(head_tree, StatusFilter::INCLUDE_UNTRACKED)
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| {
                LocalChangeKind::from_status(entry.status).map(|kind| (entry.path, kind))
            })
            .collect())
    }

    async fn disk_entries(&self) -> anyhow::Result<DiskEntries> {
        let workspace = self.repository.workspace().clone();
        let entries = tokio::task::spawn_blocking(move || workspace.scan("", None))
            .await
            .context("directory walk failed")??;

        Ok(entries
            .into_iter()
            .map(|entry| (entry.path, entry.is_dir))
            .collect())
    }

    /// Paths left untouched, or a conflict if a change is not covered at all
    fn validate_changes(
        &self,
        target: &str,
        changes: &BTreeMap<String, LocalChangeKind>,
    ) -> anyhow::Result<BTreeSet<String>> {
        let uncovered = changes
            .iter()
            .filter(|(_, kind)| !self.flags.covers(**kind))
            .map(|(path, kind)| LocalChange {
                path: path.clone(),
                kind: *kind,
            })
            .collect::<Vec<_>>();

        if !uncovered.is_empty() {
            return Err(SnowError::Conflict {
                target: target.to_string(),
                changes: uncovered,
            }
            .into());
        }

        Ok(changes
            .iter()
            .filter(|(_, kind)| !self.flags.discards(**kind))
            .map(|(path, _)| path.clone())
            .collect())
    }

    /// A kept path cannot stay where the target needs a directory, nor below a target file
    fn validate_kept_paths(
        &self,
        target: &str,
        target_tree: &TreeDir,
        changes: &BTreeMap<String, LocalChangeKind>,
        kept: &BTreeSet<String>,
    ) -> anyhow::Result<()> {
        let blocked = kept
            .iter()
            .filter(|path| {
                target_tree.find(path).is_some_and(TreeEntry::is_dir)
                    || rel_path::ancestors(path)
                        .into_iter()
                        .any(|ancestor| target_tree.find(ancestor).is_some_and(TreeEntry::is_file))
            })
            .filter_map(|path| {
                changes.get(path).map(|kind| LocalChange {
                    path: path.clone(),
                    kind: *kind,
                })
            })
            .collect::<Vec<_>>();

        if blocked.is_empty() {
            Ok(())
        } else {
            Err(SnowError::Conflict {
                target: target.to_string(),
                changes: blocked,
            }
            .into())
        }
    }

    fn plan(
        &self,
        current: &TreeDir,
        target: &TreeDir,
        changes: &BTreeMap<String, LocalChangeKind>,
        kept: &BTreeSet<String>,
        on_disk: &DiskEntries,
    ) -> MigrationPlan {
        let mut plan = MigrationPlan::default();
        let current_files = current.all_files();
        let target_entries = target.all_entries(true);

        let candidates = current_files
            .keys()
            .copied()
            .chain(target.all_files().into_keys())
            .chain(changes.keys().map(String::as_str))
            .filter(|path| !kept.contains(*path))
            .collect::<BTreeSet<_>>();

        for path in candidates {
            let change = changes.get(path);

            match target_entries.get(path) {
                Some(TreeEntry::File(file)) => {
                    let up_to_date = change.is_none()
                        && on_disk.get(path) == Some(&false)
                        && current_files
                            .get(path)
                            .is_some_and(|current| current.hash == file.hash);
                    if up_to_date {
                        continue;
                    }

                    if change == Some(&LocalChangeKind::Deleted) {
                        plan.restores.insert(path.to_string());
                    }
                    plan.writes.insert(path.to_string(), file.hash.clone());
                }
                _ => {
                    if on_disk.get(path) == Some(&false) {
                        plan.deletes.insert(path.to_string());
                    }
                }
            }
        }

        for (path, _) in on_disk.iter().filter(|(_, is_dir)| **is_dir) {
            if target_entries.get(path.as_str()).is_some_and(|entry| entry.is_dir()) {
                continue;
            }

            let required = std::iter::once(path.as_str())
                .chain(rel_path::ancestors(path))
                .any(|candidate| target_entries.get(candidate).is_some_and(|e| e.is_file()));
            let tracked = current.find(path).is_some_and(TreeEntry::is_dir);
            let discardable = self.flags.contains(ResetFlags::DELETE_NEW_FILES)
                && current.find(path).is_none();

            if required || tracked || discardable {
                plan.rmdirs.insert(path.clone(), required);
            }
        }

        for (path, entry) in &target_entries {
            if entry.is_dir() && on_disk.get(*path) != Some(&true) {
                plan.mkdirs.insert(path.to_string());
            }
        }

        plan
    }

    /// Directories that must make room for a file may not keep anything behind
    fn validate_directory_removals(
        &self,
        plan: &MigrationPlan,
        on_disk: &DiskEntries,
    ) -> anyhow::Result<()> {
        for (directory, _) in plan.rmdirs.iter().filter(|(_, required)| **required) {
            let leftover = on_disk.iter().find(|(path, is_dir)| {
                !**is_dir
                    && rel_path::is_within(path, directory)
                    && path.as_str() != directory.as_str()
                    && !plan.deletes.contains(path.as_str())
            });

            if let Some((leftover, _)) = leftover {
                return Err(SnowError::invalid_state(format!(
                    "directory '{directory}' has to make room for a file but still contains '{leftover}'"
                ))
                .into());
            }
        }

        Ok(())
    }

    fn apply(&self, plan: &MigrationPlan) -> anyhow::Result<()> {
        let workspace = self.repository.workspace();

        for path in &plan.deletes {
            workspace.remove_file(path)?;
        }

        let mut rmdirs = plan.rmdirs.iter().collect::<Vec<_>>();
        rmdirs.sort_by(|(a, _), (b, _)| {
            let depth = |path: &str| path.matches(rel_path::SEPARATOR).count();
            depth(b).cmp(&depth(a)).then_with(|| b.cmp(a))
        });
        for (path, required) in rmdirs {
            workspace.remove_directory(path, *required)?;
        }

        for path in &plan.mkdirs {
            workspace.make_directory(path)?;
        }

        for (path, hash) in &plan.writes {
            let parent = rel_path::parent(path);
            if !parent.is_empty() {
                workspace.make_directory(parent)?;
            }

            let blob = self.repository.database().open_blob(hash)?;
            workspace
                .write_file(path, std::io::BufReader::new(blob), hash)
                .with_context(|| format!("Unable to check out '{path}'"))?;
        }

        Ok(())
    }
}
