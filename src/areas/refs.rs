//! Branches and HEAD
//!
//! ## File Format
//!
//! - `HEAD`: `ref: <branch>` when attached, a 64-character commit hash when detached
//! - `refs/<branch>`: JSON `{hash, start, userData}`; branch names containing `/`
//!   give nested directories
//!
//! Every write replaces the whole file atomically under an exclusive lock.

use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::reference::{BranchRecord, Head};
use crate::artifacts::core::locked_file;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{ErrorKind, SnowError, error_kind};
use anyhow::Context;
use derive_new::new;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regex pattern for parsing an attached HEAD
const SYMREF_REGEX: &str = r"^ref: (.+)$";

#[derive(Debug, new)]
pub struct Refs {
    /// Path to the commondir
    path: Box<Path>,
}

impl Refs {
    pub fn head_path(&self) -> PathBuf {
        self.path.join("HEAD")
    }

    pub fn refs_path(&self) -> PathBuf {
        self.path.join("refs")
    }

    fn branch_path(&self, name: &BranchName) -> PathBuf {
        self.refs_path().join(name.as_ref())
    }

    pub fn read_head(&self) -> anyhow::Result<Head> {
        let content = match locked_file::read_to_string(&self.head_path()) {
            Ok(content) => content,
            Err(e) if error_kind(&e) == ErrorKind::NotFound => {
                return Err(SnowError::not_found("reference", "HEAD").into());
            }
            Err(e) => return Err(e),
        };
        let content = content.trim();

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Head::Attached(BranchName::try_parse(
                symref_match[1].to_string(),
            )?))
        } else {
            Ok(Head::Detached(
                ObjectId::try_parse(content.to_string())
                    .with_context(|| format!("corrupt HEAD file: '{content}'"))?,
            ))
        }
    }

    pub fn set_head(&self, head: &Head) -> anyhow::Result<()> {
        locked_file::write(&self.head_path(), head.to_raw().as_bytes())?;
        tracing::info!(head = %head.to_raw(), "HEAD moved");

        Ok(())
    }

    /// Commit HEAD resolves to
    pub fn resolve_head(&self) -> anyhow::Result<(Head, ObjectId)> {
        let head = self.read_head()?;
        let hash = match &head {
            Head::Attached(branch) => self.read_branch(branch)?.hash,
            Head::Detached(hash) => hash.clone(),
        };

        Ok((head, hash))
    }

    /// Point HEAD's target at `hash`
    ///
    /// An attached HEAD advances its branch, a detached one moves itself.
    pub fn update_head_target(&self, hash: &ObjectId) -> anyhow::Result<()> {
        match self.read_head()? {
            Head::Attached(branch) => {
                let mut record = self.read_branch(&branch)?;
                record.hash = hash.clone();
                self.write_branch(&branch, &record)
            }
            Head::Detached(_) => self.set_head(&Head::Detached(hash.clone())),
        }
    }

    pub fn branch_exists(&self, name: &BranchName) -> bool {
        self.branch_path(name).is_file()
    }

    pub fn read_branch(&self, name: &BranchName) -> anyhow::Result<BranchRecord> {
        let path = self.branch_path(name);
        if !path.is_file() {
            return Err(SnowError::not_found("branch", name.as_ref()).into());
        }

        let content = locked_file::read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("corrupt branch file at {:?}", path))
    }

    fn write_branch(&self, name: &BranchName, record: &BranchRecord) -> anyhow::Result<()> {
        let content = serde_json::to_vec(record).context("Unable to serialize branch")?;
        locked_file::write(&self.branch_path(name), &content)
    }

    pub fn create_branch(&self, name: &BranchName, record: BranchRecord) -> anyhow::Result<()> {
        // check whether another branch with the same name already exists
        if self.branch_exists(name) {
            return Err(SnowError::invalid_state(format!("branch '{name}' already exists")).into());
        }
        if self.has_prefix_conflict(name) {
            return Err(SnowError::invalid_state(format!(
                "branch '{name}' clashes with an existing branch hierarchy"
            ))
            .into());
        }

        self.write_branch(name, &record)?;
        tracing::info!(branch = %name, hash = %record.hash, "branch created");

        Ok(())
    }

    /// `a/b` cannot coexist with a branch `a`, nor `a` with `a/b`
    fn has_prefix_conflict(&self, name: &BranchName) -> bool {
        let path = self.branch_path(name);
        let refs_path = self.refs_path();

        path.is_dir()
            || path
                .ancestors()
                .skip(1)
                .take_while(|ancestor| *ancestor != refs_path.as_path())
                .any(|ancestor| ancestor.is_file())
    }

    pub fn delete_branch(&self, name: &BranchName) -> anyhow::Result<BranchRecord> {
        let record = self.read_branch(name)?;
        let branch_path = self.branch_path(name);

        std::fs::remove_file(&branch_path)
            .with_context(|| format!("failed to delete branch file at {:?}", branch_path))?;
        self.prune_branch_empty_parent_dirs(&branch_path)?;
        tracing::info!(branch = %name, hash = %record.hash, "branch deleted");

        Ok(record)
    }

    /// Every branch with its record, sorted by name
    pub fn list_branches(&self) -> anyhow::Result<Vec<(BranchName, BranchRecord)>> {
        let refs_path = self.refs_path();
        if !refs_path.is_dir() {
            return Ok(Vec::new());
        }

        let names = WalkDir::new(&refs_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative_path = entry.path().strip_prefix(&refs_path).ok()?;
                let name = relative_path
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                BranchName::try_parse(name).ok()
            })
            .collect::<Vec<_>>();

        let mut branches = names
            .into_iter()
            .map(|name| {
                let record = self.read_branch(&name)?;
                Ok((name, record))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        branches.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(branches)
    }

    fn prune_branch_empty_parent_dirs(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && parent != self.refs_path().as_path()
            && parent.read_dir()?.next().is_none()
        {
            std::fs::remove_dir(parent).with_context(|| {
                format!("failed to remove empty branch directory at {:?}", parent)
            })?;
            self.prune_branch_empty_parent_dirs(parent)?;
        }

        Ok(())
    }
}
