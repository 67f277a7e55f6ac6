//! Staging index
//!
//! An index is a named set of pending adds and deletes. A path is never staged
//! for both at once: staging it for one removes it from the other.
//!
//! ## File Format
//!
//! `<commondir>/indexes/<id>`: JSON `{ "id", "adds": [..], "deletes": [..] }`
//! with both lists sorted, so writing an unchanged index is idempotent.

use crate::artifacts::core::{locked_file, rel_path};
use crate::errors::{ErrorKind, SnowError, error_kind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Id of the index used when no other is named
pub const MAIN_INDEX_ID: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexFile {
    id: String,
    adds: BTreeSet<String>,
    deletes: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    path: PathBuf,
    id: String,
    adds: BTreeSet<String>,
    deletes: BTreeSet<String>,
}

pub fn indexes_path(commondir: &Path) -> PathBuf {
    commondir.join("indexes")
}

pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Index {
    /// Fresh, empty index that is not persisted yet
    pub fn new(commondir: &Path, id: &str) -> anyhow::Result<Self> {
        if !is_valid_id(id) {
            return Err(SnowError::invalid_state(format!("invalid index id: '{id}'")).into());
        }

        Ok(Index {
            path: indexes_path(commondir).join(id),
            id: id.to_string(),
            adds: BTreeSet::new(),
            deletes: BTreeSet::new(),
        })
    }

    pub fn load(commondir: &Path, id: &str) -> anyhow::Result<Self> {
        let mut index = Self::new(commondir, id)?;

        let content = match locked_file::read_to_string(&index.path) {
            Ok(content) => content,
            Err(e) if error_kind(&e) == ErrorKind::NotFound => {
                return Err(SnowError::not_found("index", id).into());
            }
            Err(e) => return Err(e),
        };
        let file: IndexFile = serde_json::from_str(&content)
            .with_context(|| format!("corrupt index file {}", index.path.display()))?;

        index.adds = file.adds;
        index.deletes = file.deletes;

        Ok(index)
    }

    pub fn exists(commondir: &Path, id: &str) -> bool {
        is_valid_id(id) && indexes_path(commondir).join(id).is_file()
    }

    /// Ids of every persisted index, sorted
    pub fn list_ids(commondir: &Path) -> anyhow::Result<Vec<String>> {
        let path = indexes_path(commondir);
        if !path.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = std::fs::read_dir(&path)
            .with_context(|| format!("Unable to list {}", path.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|id| is_valid_id(id))
            .collect::<Vec<_>>();
        ids.sort();

        Ok(ids)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn adds(&self) -> &BTreeSet<String> {
        &self.adds
    }

    pub fn deletes(&self) -> &BTreeSet<String> {
        &self.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.deletes.is_empty()
    }

    pub fn add_files<I, S>(&mut self, paths: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = rel_path::normalize(path.as_ref())?;
            if path.is_empty() {
                continue;
            }
            self.deletes.remove(&path);
            self.adds.insert(path);
        }

        Ok(())
    }

    pub fn delete_files<I, S>(&mut self, paths: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = rel_path::normalize(path.as_ref())?;
            if path.is_empty() {
                continue;
            }
            self.adds.remove(&path);
            self.deletes.insert(path);
        }

        Ok(())
    }

    pub fn clear(&mut self) {
        self.adds.clear();
        self.deletes.clear();
    }

    /// Persist the staged sets under this index's id
    pub fn write_files(&self) -> anyhow::Result<()> {
        let content = serde_json::to_vec_pretty(&IndexFile {
            id: self.id.clone(),
            adds: self.adds.clone(),
            deletes: self.deletes.clone(),
        })
        .context("Unable to serialize index")?;

        locked_file::write(&self.path, &content)?;
        tracing::debug!(
            index = %self.id,
            adds = self.adds.len(),
            deletes = self.deletes.len(),
            "index written"
        );

        Ok(())
    }
}
