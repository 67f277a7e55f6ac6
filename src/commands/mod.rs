//! Command implementations
//!
//! Every command is a method on [`crate::areas::repository::Repository`] that
//! runs one library operation and renders its plain result through the
//! repository's writer.

pub mod porcelain;
