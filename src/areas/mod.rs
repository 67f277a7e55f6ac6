//! Durable repository areas
//!
//! - `database`: blob store and commit store
//! - `index`: named staging indexes
//! - `refs`: branches and HEAD
//! - `repository`: the context every operation runs against
//! - `workspace`: the working directory

pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
