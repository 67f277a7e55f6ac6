//! Shared utilities
//!
//! - `rel_path`: Platform-independent relative paths
//! - `locked_file`: Atomic, lock-protected persistence of small files

pub mod locked_file;
pub mod rel_path;
