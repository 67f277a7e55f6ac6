use crate::artifacts::core::rel_path;
use crate::artifacts::objects::hasher;
use crate::artifacts::objects::object_id::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a snapshot tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeEntry {
    File(TreeFile),
    Dir(TreeDir),
}

/// A regular file as recorded in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFile {
    pub path: String,
    pub hash: ObjectId,
    pub size: u64,
    /// Milliseconds since the Unix epoch
    pub ctime: i64,
    /// Milliseconds since the Unix epoch
    pub mtime: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<ObjectId>,
}

/// A directory and everything beneath it
///
/// `hash` and `size` are aggregates over the children and are only correct after
/// [`TreeDir::update_hashes`] ran on the latest structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDir {
    pub path: String,
    pub hash: ObjectId,
    pub size: u64,
    pub children: BTreeMap<String, TreeEntry>,
}

impl TreeEntry {
    pub fn path(&self) -> &str {
        match self {
            TreeEntry::File(file) => &file.path,
            TreeEntry::Dir(dir) => &dir.path,
        }
    }

    pub fn hash(&self) -> &ObjectId {
        match self {
            TreeEntry::File(file) => &file.hash,
            TreeEntry::Dir(dir) => &dir.hash,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            TreeEntry::File(file) => file.size,
            TreeEntry::Dir(dir) => dir.size,
        }
    }

    pub fn name(&self) -> &str {
        rel_path::basename(self.path())
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, TreeEntry::Dir(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, TreeEntry::File(_))
    }

    pub fn as_file(&self) -> Option<&TreeFile> {
        match self {
            TreeEntry::File(file) => Some(file),
            TreeEntry::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&TreeDir> {
        match self {
            TreeEntry::Dir(dir) => Some(dir),
            TreeEntry::File(_) => None,
        }
    }
}

impl TreeDir {
    /// An empty directory at `path`
    pub fn new(path: impl Into<String>) -> Self {
        TreeDir {
            path: path.into(),
            hash: hasher::hash_content(b""),
            size: 0,
            children: BTreeMap::new(),
        }
    }

    /// An empty snapshot root
    pub fn root() -> Self {
        Self::new("")
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Look up an entry by its relative path
    ///
    /// The root itself is not an entry of its own tree, so the empty path finds
    /// nothing.
    pub fn find(&self, path: &str) -> Option<&TreeEntry> {
        let mut segments = path.split(rel_path::SEPARATOR).filter(|s| !s.is_empty());
        let mut current = self.children.get(segments.next()?)?;

        for segment in segments {
            current = current.as_dir()?.children.get(segment)?;
        }

        Some(current)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut TreeEntry> {
        let mut segments = path.split(rel_path::SEPARATOR).filter(|s| !s.is_empty());
        let mut current = self.children.get_mut(segments.next()?)?;

        for segment in segments {
            current = match current {
                TreeEntry::Dir(dir) => dir.children.get_mut(segment)?,
                TreeEntry::File(_) => return None,
            };
        }

        Some(current)
    }

    /// Place `entry` at its path, creating missing parent directories
    ///
    /// A file standing where a parent directory is needed gets replaced. An
    /// existing entry at the same path is overwritten. Aggregates are not
    /// recomputed.
    pub fn insert(&mut self, entry: TreeEntry) {
        let path = entry.path().to_string();
        let mut current = self;

        for ancestor in rel_path::ancestors(&path) {
            if ancestor.len() <= current.path.len() {
                continue;
            }

            let name = rel_path::basename(ancestor).to_string();
            let slot = current
                .children
                .entry(name)
                .or_insert_with(|| TreeEntry::Dir(TreeDir::new(ancestor)));
            if slot.is_file() {
                *slot = TreeEntry::Dir(TreeDir::new(ancestor));
            }

            let TreeEntry::Dir(dir) = slot else {
                return;
            };
            current = dir;
        }

        current
            .children
            .insert(rel_path::basename(&path).to_string(), entry);
    }

    /// Prune the entry at `path` together with everything below it
    pub fn remove(&mut self, path: &str) -> Option<TreeEntry> {
        let parent = rel_path::parent(path);
        let name = rel_path::basename(path);

        if parent.is_empty() {
            return self.children.remove(name);
        }

        match self.find_mut(parent)? {
            TreeEntry::Dir(dir) => dir.children.remove(name),
            TreeEntry::File(_) => None,
        }
    }

    /// Recompute aggregate hash and size of every directory, bottom-up
    pub fn update_hashes(&mut self) {
        for child in self.children.values_mut() {
            if let TreeEntry::Dir(dir) = child {
                dir.update_hashes();
            }
        }

        self.hash = hasher::hash_children(
            self.children
                .iter()
                .map(|(name, child)| (name.as_str(), child.is_dir(), child.hash())),
        );
        self.size = self.children.values().map(TreeEntry::size).sum();
    }

    /// Depth-first, pre-order visit of every entry below this directory
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TreeEntry)) {
        for child in self.children.values() {
            visit(child);
            if let TreeEntry::Dir(dir) = child {
                dir.walk(visit);
            }
        }
    }

    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut TreeEntry)) {
        for child in self.children.values_mut() {
            visit(child);
            if let TreeEntry::Dir(dir) = child {
                dir.walk_mut(visit);
            }
        }
    }

    /// Flatten the tree into a path-keyed map
    pub fn all_entries(&self, include_dirs: bool) -> BTreeMap<&str, &TreeEntry> {
        let mut entries = BTreeMap::new();
        self.walk(&mut |entry| {
            if include_dirs || entry.is_file() {
                entries.insert(entry.path(), entry);
            }
        });

        entries
    }

    pub fn all_files(&self) -> BTreeMap<&str, &TreeFile> {
        let mut files = BTreeMap::new();
        self.walk(&mut |entry| {
            if let TreeEntry::File(file) = entry {
                files.insert(file.path.as_str(), file);
            }
        });

        files
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// In-memory tree whose files hold as many bytes as their name is long
    pub fn tree_of(paths: &[&str]) -> TreeDir {
        let mut root = TreeDir::root();
        for path in paths {
            let name = rel_path::basename(path);
            root.insert(TreeEntry::File(TreeFile {
                path: path.to_string(),
                hash: hasher::hash_content(".".repeat(name.len()).as_bytes()),
                size: name.len() as u64,
                ctime: 0,
                mtime: 0,
                blocks: Vec::new(),
            }));
        }
        root.update_hashes();
        root
    }
}
