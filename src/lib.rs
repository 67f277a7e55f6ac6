//! snow: version control for large binary and graphic assets
//!
//! - `areas`: durable repository areas and the [`areas::repository::Repository`] context
//! - `artifacts`: data structures and algorithms (hashing, trees, access guard,
//!   references, status, commit and checkout engines)
//! - `commands`: user-facing command handlers
//! - `errors`: classified failures

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
