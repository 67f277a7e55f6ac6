//! Whole-content and block-level hashing
//!
//! The whole-file hash is the SHA-256 digest of the complete byte content and is
//! the canonical content address. Files at or above the block size additionally
//! get one digest per consecutive block (the final block may be shorter), which
//! lets a large asset be verified block by block.
//!
//! Files are always streamed; neither hashing nor verification loads a file into
//! memory as a whole.

use crate::artifacts::objects::BLOCK_SIZE;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// Result of hashing a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
    pub hash: ObjectId,
    /// Empty unless the content was at least one block long
    pub blocks: Vec<ObjectId>,
    pub size: u64,
}

pub fn hash_content(bytes: &[u8]) -> ObjectId {
    ObjectId::from_digest(&Sha256::digest(bytes))
}

/// Block hashes of `bytes`, or nothing if the content is shorter than one block
pub fn hash_blocks(bytes: &[u8], block_size: usize) -> Vec<ObjectId> {
    if block_size == 0 || bytes.len() < block_size {
        return Vec::new();
    }

    bytes.chunks(block_size).map(hash_content).collect()
}

/// Aggregate hash of a directory from its `(name, is_dir, hash)` children, in
/// child-name order
///
/// Names and kinds are part of the digest, so moving or renaming a file changes
/// every aggregate above it even when no content changed.
pub fn hash_children<'a>(
    children: impl IntoIterator<Item = (&'a str, bool, &'a ObjectId)>,
) -> ObjectId {
    let mut hasher = Sha256::new();
    for (name, is_dir, hash) in children {
        hasher.update(if is_dir { b"d " } else { b"f " });
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(hash.as_ref().as_bytes());
    }

    ObjectId::from_digest(&hasher.finalize())
}

/// Incremental whole + block hasher
struct StreamHasher {
    whole: Sha256,
    block: Sha256,
    block_size: u64,
    in_block: u64,
    size: u64,
    blocks: Vec<ObjectId>,
}

impl StreamHasher {
    fn new(block_size: u64) -> Self {
        StreamHasher {
            whole: Sha256::new(),
            block: Sha256::new(),
            block_size,
            in_block: 0,
            size: 0,
            blocks: Vec::new(),
        }
    }

    fn update(&mut self, mut data: &[u8]) {
        self.whole.update(data);
        self.size += data.len() as u64;

        if self.block_size == 0 {
            return;
        }

        while !data.is_empty() {
            let room = (self.block_size - self.in_block) as usize;
            let take = room.min(data.len());
            self.block.update(&data[..take]);
            self.in_block += take as u64;
            data = &data[take..];

            if self.in_block == self.block_size {
                let digest = std::mem::take(&mut self.block).finalize();
                self.blocks.push(ObjectId::from_digest(&digest));
                self.in_block = 0;
            }
        }
    }

    fn finish(mut self) -> FileHash {
        if self.in_block > 0 {
            let digest = self.block.finalize();
            self.blocks.push(ObjectId::from_digest(&digest));
        }

        if self.block_size == 0 || self.size < self.block_size {
            self.blocks.clear();
        }

        FileHash {
            hash: ObjectId::from_digest(&self.whole.finalize()),
            blocks: self.blocks,
            size: self.size,
        }
    }
}

pub fn hash_reader(reader: impl Read, block_size: u64) -> anyhow::Result<FileHash> {
    hash_copy(reader, std::io::sink(), block_size)
}

/// Copy `reader` into `writer`, hashing everything that passes through
pub fn hash_copy(
    mut reader: impl Read,
    mut writer: impl Write,
    block_size: u64,
) -> anyhow::Result<FileHash> {
    let mut hasher = StreamHasher::new(block_size);
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
    }
    writer.flush()?;

    Ok(hasher.finish())
}

pub fn hash_file(path: &Path) -> anyhow::Result<FileHash> {
    hash_file_with_block_size(path, BLOCK_SIZE)
}

pub fn hash_file_with_block_size(path: &Path, block_size: u64) -> anyhow::Result<FileHash> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Unable to open {} for hashing", path.display()))?;

    hash_reader(file, block_size).with_context(|| format!("Unable to hash {}", path.display()))
}

/// Recompute the hashes of a file and compare them with the expected values
///
/// Returns `false` on any mismatch, including a single altered block hash even
/// when the whole-file hash matches. Only an unreadable file is an error.
pub fn compare_file_hash(
    path: &Path,
    expected: &ObjectId,
    expected_blocks: Option<&[ObjectId]>,
) -> anyhow::Result<bool> {
    compare_file_hash_with_block_size(path, expected, expected_blocks, BLOCK_SIZE)
}

pub fn compare_file_hash_with_block_size(
    path: &Path,
    expected: &ObjectId,
    expected_blocks: Option<&[ObjectId]>,
    block_size: u64,
) -> anyhow::Result<bool> {
    let actual = hash_file_with_block_size(path, block_size)?;

    if &actual.hash != expected {
        return Ok(false);
    }

    match expected_blocks {
        Some(expected_blocks) => Ok(actual.blocks.len() == expected_blocks.len()
            && actual
                .blocks
                .iter()
                .zip(expected_blocks)
                .all(|(actual, expected)| actual == expected)),
        None => Ok(true),
    }
}
