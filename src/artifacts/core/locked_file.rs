//! Small persisted files (HEAD, references, indexes, config)
//!
//! Writes go to a uniquely named sibling under an exclusive lock and are renamed
//! over the destination, so a reader never observes a half-written file. Reads
//! hold a shared lock while the content is loaded.

use anyhow::Context;
use file_guard::Lock;
use std::io::{Read, Write};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// Unique temporary sibling of `path`
pub fn temp_sibling(path: &Path) -> anyhow::Result<PathBuf> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid file path {}", path.display()))?;

    Ok(parent.join(format!(".tmp-{}", uuid::Uuid::new_v4().simple())))
}

pub fn write(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid file path {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Unable to create directory {}", parent.display()))?;

    let temp_path = temp_sibling(path)?;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| format!("Unable to open temporary file {}", temp_path.display()))?;

    let written = (|| -> anyhow::Result<()> {
        let mut lock = file_guard::lock(&mut file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(content)?;
        lock.deref_mut().sync_all()?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.context(format!("Unable to write {}", path.display())));
    }

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Unable to rename temporary file to {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "persisted");

    Ok(())
}

pub fn read_to_string(path: &Path) -> anyhow::Result<String> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("Unable to open {}", path.display()))?;
    let mut lock = file_guard::lock(&mut file, Lock::Shared, 0, 1)
        .with_context(|| format!("Unable to lock {}", path.display()))?;

    let mut content = String::new();
    lock.deref_mut()
        .read_to_string(&mut content)
        .with_context(|| format!("Unable to read {}", path.display()))?;

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_replaces_content_and_leaves_no_temporaries() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let path = dir.path().join("nested").join("HEAD");

        write(&path, b"first")?;
        write(&path, b"second")?;

        assert_eq!(read_to_string(&path)?, "second");
        assert_eq!(std::fs::read_dir(dir.path().join("nested"))?.count(), 1);

        Ok(())
    }

    #[test]
    fn reading_a_missing_file_fails_with_not_found() {
        let error = read_to_string(Path::new("/no/such/file")).unwrap_err();

        assert_eq!(
            crate::errors::error_kind(&error),
            crate::errors::ErrorKind::NotFound
        );
    }
}
