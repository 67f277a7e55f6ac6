//! Content addressing
//!
//! Everything snow persists is named by a SHA-256 fingerprint of its content:
//!
//! - **Blobs**: raw file content, stored under the whole-file hash
//! - **Commits**: snapshot metadata plus the root tree, stored under the commit hash
//!
//! Large files additionally carry a list of block hashes, one per `BLOCK_SIZE`
//! chunk, so they can be verified block by block.

pub mod commit;
pub mod hasher;
pub mod object_id;

/// Length of a SHA-256 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 64;

/// Size of one hashed block, and the file size from which block hashes are kept
pub const BLOCK_SIZE: u64 = 100_000_000;
