//! Content-addressed storage
//!
//! Two kinds of objects live in the commondir:
//!
//! - Blobs in `objects/<2>/<62>`: raw file content keyed by its whole-file hash
//! - Commits in `versions/<hash>`: zlib-compressed JSON
//!
//! Both are written to a temporary file first and renamed into place, so an
//! object either exists completely or not at all. Objects are never rewritten.

use crate::artifacts::core::locked_file;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::{BLOCK_SIZE, hasher};
use crate::errors::SnowError;
use anyhow::Context;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(commondir: Box<Path>) -> Self {
        Database { path: commondir }
    }

    pub fn objects_path(&self) -> PathBuf {
        self.path.join("objects")
    }

    pub fn versions_path(&self) -> PathBuf {
        self.path.join("versions")
    }

    pub fn blob_path(&self, hash: &ObjectId) -> PathBuf {
        self.objects_path().join(hash.to_path())
    }

    pub fn has_blob(&self, hash: &ObjectId) -> bool {
        self.blob_path(hash).is_file()
    }

    /// Stream a working file into the blob store
    ///
    /// The bytes are re-hashed while copied. If they no longer match `expected`
    /// (the file changed after it was hashed) nothing is stored and the call
    /// fails with an integrity mismatch. Returns whether a new blob was written.
    pub fn store_blob(&self, source: &Path, expected: &ObjectId) -> anyhow::Result<bool> {
        let blob_path = self.blob_path(expected);
        if blob_path.exists() {
            return Ok(false);
        }

        let blob_dir = blob_path
            .parent()
            .context(format!("Invalid object path {}", blob_path.display()))?;
        std::fs::create_dir_all(blob_dir).context(format!(
            "Unable to create object directory {}",
            blob_dir.display()
        ))?;

        let reader = std::fs::File::open(source)
            .with_context(|| format!("Unable to open {}", source.display()))?;
        let temp_path = locked_file::temp_sibling(&blob_path)?;
        let writer = std::fs::File::create_new(&temp_path).context(format!(
            "Unable to open object file {}",
            temp_path.display()
        ))?;

        let hashed = match hasher::hash_copy(reader, std::io::BufWriter::new(writer), BLOCK_SIZE)
        {
            Ok(hashed) => hashed,
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                return Err(e.context(format!("Unable to store {}", source.display())));
            }
        };

        if &hashed.hash != expected {
            let _ = std::fs::remove_file(&temp_path);
            return Err(SnowError::IntegrityMismatch {
                path: source.display().to_string(),
                expected: expected.to_string(),
                actual: hashed.hash.to_string(),
            }
            .into());
        }

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_path, &blob_path).context(format!(
            "Unable to rename object file to {}",
            blob_path.display()
        ))?;
        tracing::debug!(hash = %expected, size = hashed.size, "blob stored");

        Ok(true)
    }

    pub fn open_blob(&self, hash: &ObjectId) -> anyhow::Result<std::fs::File> {
        let blob_path = self.blob_path(hash);

        match std::fs::File::open(&blob_path) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SnowError::not_found("object", hash.as_ref()).into())
            }
            Err(e) => Err(e).context(format!(
                "Unable to read object file {}",
                blob_path.display()
            )),
        }
    }

    pub fn store_commit(&self, commit: &Commit) -> anyhow::Result<()> {
        let commit_path = self.versions_path().join(commit.hash().as_ref());
        if commit_path.exists() {
            return Ok(());
        }

        let content = serde_json::to_vec(commit).context("Unable to serialize commit")?;
        let content = Self::compress(&content)?;
        locked_file::write(&commit_path, &content)?;
        tracing::debug!(hash = %commit.hash(), "commit stored");

        Ok(())
    }

    pub fn has_commit(&self, hash: &ObjectId) -> bool {
        self.versions_path().join(hash.as_ref()).is_file()
    }

    pub fn load_commit(&self, hash: &ObjectId) -> anyhow::Result<Commit> {
        let commit_path = self.versions_path().join(hash.as_ref());

        let content = match std::fs::read(&commit_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnowError::not_found("commit", hash.as_ref()).into());
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Unable to read commit file {}",
                    commit_path.display()
                ));
            }
        };

        let content = Self::decompress(&content)?;
        let commit: Commit = serde_json::from_slice(&content)
            .with_context(|| format!("Corrupt commit object {hash}"))?;

        let mut root = commit.root().clone();
        root.update_hashes();
        if root.hash != commit.root().hash {
            return Err(SnowError::IntegrityMismatch {
                path: commit_path.display().to_string(),
                expected: commit.root().hash.to_string(),
                actual: root.hash.to_string(),
            }
            .into());
        }

        let actual = commit.compute_hash()?;
        if &actual != hash {
            return Err(SnowError::IntegrityMismatch {
                path: commit_path.display().to_string(),
                expected: hash.to_string(),
                actual: actual.to_string(),
            }
            .into());
        }

        Ok(commit)
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::UserData;
    use crate::artifacts::tree::tree_entry::TreeDir;
    use crate::artifacts::tree::tree_entry::test_support::tree_of;
    use crate::errors::{ErrorKind, error_kind};
    use pretty_assertions::assert_eq;

    #[test]
    fn blobs_are_stored_once_under_their_hash() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let database = Database::new(dir.path().join("common").into());
        let source = dir.path().join("asset.bin");
        std::fs::write(&source, b"hello World")?;
        let hash = hasher::hash_content(b"hello World");

        assert!(database.store_blob(&source, &hash)?);
        assert!(!database.store_blob(&source, &hash)?);

        let mut stored = Vec::new();
        database.open_blob(&hash)?.read_to_end(&mut stored)?;
        assert_eq!(stored, b"hello World");

        Ok(())
    }

    #[test]
    fn changed_source_is_not_stored() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let database = Database::new(dir.path().join("common").into());
        let source = dir.path().join("asset.bin");
        std::fs::write(&source, b"changed after hashing")?;
        let hash = hasher::hash_content(b"original");

        let error = database.store_blob(&source, &hash).unwrap_err();

        assert_eq!(error_kind(&error), ErrorKind::IntegrityMismatch);
        assert!(!database.has_blob(&hash));

        Ok(())
    }

    #[test]
    fn commits_round_trip_through_compressed_storage() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let database = Database::new(dir.path().into());
        let commit = Commit::new(
            None,
            TreeDir::root(),
            "Created Project".to_string(),
            Vec::new(),
            UserData::new(),
        )?;

        database.store_commit(&commit)?;

        assert!(database.has_commit(commit.hash()));
        assert_eq!(database.load_commit(commit.hash())?, commit);

        Ok(())
    }

    #[test]
    fn rewritten_paths_in_a_stored_tree_are_detected() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let database = Database::new(dir.path().into());
        let commit = Commit::new(
            None,
            tree_of(&["a.psd"]),
            "Add a".to_string(),
            Vec::new(),
            UserData::new(),
        )?;

        let mut json = serde_json::to_value(&commit)?;
        let children = json["root"]["children"]
            .as_object_mut()
            .context("root has children")?;
        let mut entry = children.remove("a.psd").context("a.psd is recorded")?;
        entry["path"] = serde_json::json!("b.psd");
        children.insert("b.psd".to_string(), entry);
        locked_file::write(
            &database.versions_path().join(commit.hash().as_ref()),
            &Database::compress(&serde_json::to_vec(&json)?)?,
        )?;

        assert_eq!(
            error_kind(&database.load_commit(commit.hash()).unwrap_err()),
            ErrorKind::IntegrityMismatch
        );

        Ok(())
    }

    #[test]
    fn unknown_objects_are_not_found() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        let database = Database::new(dir.path().into());
        let hash = hasher::hash_content(b"nothing");

        assert_eq!(
            error_kind(&database.load_commit(&hash).unwrap_err()),
            ErrorKind::NotFound
        );
        assert_eq!(
            error_kind(&database.open_blob(&hash).unwrap_err()),
            ErrorKind::NotFound
        );

        Ok(())
    }
}
