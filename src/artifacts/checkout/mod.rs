//! Checkout and reset
//!
//! Moving the working directory to another commit happens in three phases:
//!
//! - local changes are collected and checked against the reset flags
//! - the file system changes are planned and every path about to be
//!   overwritten or deleted is access checked
//! - the plan is applied and HEAD is moved
//!
//! Nothing on disk is touched before the first two phases succeed.

pub mod conflict;
pub mod migration;
pub mod reset_flags;
