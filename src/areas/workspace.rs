use crate::areas::repository::SNOW_MARKER;
use crate::artifacts::core::{locked_file, rel_path};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::{BLOCK_SIZE, hasher};
use crate::artifacts::status::ignore::IgnoreRules;
use crate::errors::SnowError;
use anyhow::Context;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Stat record of one working directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub ctime: i64,
    pub mtime: i64,
}

impl WorkspaceEntry {
    fn from_metadata(path: String, metadata: &std::fs::Metadata) -> Self {
        let mtime = to_millis(metadata.modified());
        // birth time is not available on every file system
        let ctime = metadata
            .created()
            .map_or(mtime, |created| to_millis(Ok(created)));

        WorkspaceEntry {
            path,
            is_dir: metadata.is_dir(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            ctime,
            mtime,
        }
    }
}

/// Milliseconds since the Unix epoch, 0 when the platform cannot tell
pub fn to_millis(time: std::io::Result<SystemTime>) -> i64 {
    time.map(|time| chrono::DateTime::<chrono::Utc>::from(time).timestamp_millis())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn abs_path(&self, rel_path: &str) -> PathBuf {
        rel_path::to_path(&self.path, rel_path)
    }

    /// Every file and directory below `start`, depth-first
    ///
    /// The repository marker is never entered. With `ignore` rules, ignored
    /// entries are skipped together with everything below them. Symbolic links
    /// and entries that cannot be read are left out.
    pub fn scan(
        &self,
        start: &str,
        ignore: Option<&IgnoreRules>,
    ) -> anyhow::Result<Vec<WorkspaceEntry>> {
        let start_path = self.abs_path(start);
        if !start_path.is_dir() {
            return Ok(Vec::new());
        }

        let entries = WalkDir::new(&start_path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match self.rel_path_of(entry.path()) {
                Some(rel) => {
                    rel != SNOW_MARKER && !ignore.is_some_and(|rules| rules.is_ignored(&rel))
                }
                None => false,
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable workspace entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() || entry.file_type().is_dir())
            .filter_map(|entry| {
                let rel = self.rel_path_of(entry.path())?;
                let metadata = entry.metadata().ok()?;
                Some(WorkspaceEntry::from_metadata(rel, &metadata))
            })
            .collect::<Vec<_>>();

        Ok(entries)
    }

    fn rel_path_of(&self, path: &Path) -> Option<String> {
        rel_path::relative_to(&self.path, path).ok()
    }

    /// Stat one entry, `None` if nothing exists at `rel_path`
    pub fn stat(&self, rel_path: &str) -> anyhow::Result<Option<WorkspaceEntry>> {
        match std::fs::metadata(self.abs_path(rel_path)) {
            Ok(metadata) => Ok(Some(WorkspaceEntry::from_metadata(
                rel_path.to_string(),
                &metadata,
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Unable to stat '{rel_path}'")),
        }
    }

    /// Files a staged path stands for
    ///
    /// A directory expands to the non-ignored files beneath it, anything else
    /// (including a path that no longer exists) stands for itself.
    pub fn expand_files(&self, rel_path: &str, ignore: &IgnoreRules) -> anyhow::Result<Vec<String>> {
        match self.stat(rel_path)? {
            Some(entry) if entry.is_dir => Ok(self
                .scan(rel_path, Some(ignore))?
                .into_iter()
                .filter(|entry| !entry.is_dir)
                .map(|entry| entry.path)
                .collect()),
            _ => Ok(vec![rel_path.to_string()]),
        }
    }

    pub fn remove_file(&self, rel_path: &str) -> anyhow::Result<()> {
        let path = self.abs_path(rel_path);

        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Failed to remove file: {rel_path}"))
            }
            _ => Ok(()),
        }
    }

    /// Remove a directory that should be empty by now
    ///
    /// Leftovers (e.g. ignored files) keep the directory alive unless it has to
    /// make room for a file, in which case this fails.
    pub fn remove_directory(&self, rel_path: &str, required: bool) -> anyhow::Result<()> {
        let path = self.abs_path(rel_path);

        match std::fs::remove_dir(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::DirectoryNotEmpty && !required => {
                tracing::debug!(path = rel_path, "directory kept, still has content");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove directory: {rel_path}")),
        }
    }

    pub fn make_directory(&self, rel_path: &str) -> anyhow::Result<()> {
        let path = self.abs_path(rel_path);

        if path.is_file() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove file in the way of {rel_path}"))?;
        }

        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {rel_path}"))
    }

    /// Write stored content to `rel_path`
    ///
    /// The content lands in a temporary sibling first and only replaces the
    /// destination once its hash matched `expected`.
    pub fn write_file(
        &self,
        rel_path: &str,
        content: impl Read,
        expected: &ObjectId,
    ) -> anyhow::Result<()> {
        let path = self.abs_path(rel_path);
        let temp_path = locked_file::temp_sibling(&path)?;

        let file = std::fs::File::create_new(&temp_path)
            .with_context(|| format!("Failed to open file: {}", temp_path.display()))?;
        let hashed = hasher::hash_copy(content, std::io::BufWriter::new(file), BLOCK_SIZE);

        let hashed = match hashed {
            Ok(hashed) if &hashed.hash == expected => hashed,
            Ok(hashed) => {
                let _ = std::fs::remove_file(&temp_path);
                return Err(SnowError::IntegrityMismatch {
                    path: rel_path.to_string(),
                    expected: expected.to_string(),
                    actual: hashed.hash.to_string(),
                }
                .into());
            }
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                return Err(e.context(format!("Failed to write to file: {rel_path}")));
            }
        };

        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to move file into place: {rel_path}"))?;
        tracing::debug!(path = rel_path, size = hashed.size, "file written");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn workspace_with(files: &[&str]) -> (assert_fs::TempDir, Workspace) {
        let dir = assert_fs::TempDir::new().unwrap();
        for file in files {
            let path = rel_path::to_path(dir.path(), file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, file.as_bytes()).unwrap();
        }
        let workspace = Workspace::new(dir.path().into());
        (dir, workspace)
    }

    #[test]
    fn scan_lists_files_and_dirs_but_not_the_marker() {
        let (_dir, workspace) = workspace_with(&["a/b.txt", "c.txt", ".snow/config"]);

        let paths = workspace
            .scan("", None)
            .unwrap()
            .into_iter()
            .map(|entry| entry.path)
            .collect::<Vec<_>>();

        assert_eq!(paths, vec!["a", "a/b.txt", "c.txt"]);
    }

    #[test]
    fn scan_prunes_ignored_directories() {
        let (_dir, workspace) = workspace_with(&["cache/x.bin", "keep.txt"]);
        let rules = IgnoreRules::defaults().with_lines(["cache"]).unwrap();

        let paths = workspace
            .scan("", Some(&rules))
            .unwrap()
            .into_iter()
            .map(|entry| entry.path)
            .collect::<Vec<_>>();

        assert_eq!(paths, vec!["keep.txt"]);
    }

    #[test]
    fn expand_files_walks_directories_only() {
        let (_dir, workspace) = workspace_with(&["a/b.txt", "a/c/d.txt", "e.txt"]);
        let rules = IgnoreRules::defaults();

        assert_eq!(
            workspace.expand_files("a", &rules).unwrap(),
            vec!["a/b.txt", "a/c/d.txt"]
        );
        assert_eq!(workspace.expand_files("e.txt", &rules).unwrap(), vec!["e.txt"]);
        assert_eq!(workspace.expand_files("gone", &rules).unwrap(), vec!["gone"]);
    }

    #[test]
    fn write_file_refuses_content_with_the_wrong_hash() {
        let (dir, workspace) = workspace_with(&[]);
        let expected = hasher::hash_content(b"expected");

        let error = workspace
            .write_file("out.txt", &b"something else"[..], &expected)
            .unwrap_err();

        assert_eq!(
            crate::errors::error_kind(&error),
            crate::errors::ErrorKind::IntegrityMismatch
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_file_replaces_existing_content() {
        let (dir, workspace) = workspace_with(&["out.txt"]);
        let content = b"fresh content";

        workspace
            .write_file("out.txt", &content[..], &hasher::hash_content(content))
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("out.txt")).unwrap(), content);
    }
}
