//! Creating commits from a staging index

pub mod commit_writer;
