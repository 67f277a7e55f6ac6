//! Snapshot tree model
//!
//! A snapshot is a tree of [`tree_entry::TreeEntry`] values rooted at the
//! working directory (the empty path). Files carry their content hash and
//! timestamps; directories carry an aggregate hash and size derived from their
//! children.
//!
//! - `tree_entry`: The tree types and in-place operations (find, insert, remove, walk)
//! - `construct`: Building trees from the working directory
//! - `merge`: Structural merge of two trees

pub mod construct;
pub mod merge;
pub mod tree_entry;
