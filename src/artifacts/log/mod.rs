//! Commit history traversal

pub mod history;
