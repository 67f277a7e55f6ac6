//! Data structures and algorithms
//!
//! - `access`: detection of files held open by other processes
//! - `branch`: branch names, HEAD and reference records
//! - `checkout`: reset flags, conflict detection and the checkout engine
//! - `commit`: turning an index into a commit
//! - `core`: relative paths and atomically written files
//! - `log`: commit history
//! - `objects`: hashing, object ids and commits
//! - `status`: working directory status and ignore rules
//! - `tree`: snapshot trees, their construction and merging

pub mod access;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod core;
pub mod log;
pub mod objects;
pub mod status;
pub mod tree;
