//! Detection of files that are still being written by another process

pub mod access_guard;
pub mod access_report;
pub mod open_handles;
