//! Porcelain commands (user-facing operations)
//!
//! ## Commands
//!
//! - `init`: Create a repository, optionally with an external commondir
//! - `add`, `rm`: Stage additions and deletions
//! - `commit`: Turn an index into a commit
//! - `status`: Show working directory changes
//! - `log`: Show commit history
//! - `branch`: Create, list, or delete branches
//! - `checkout`, `switch`: Move the working directory to a commit or branch
//! - `index`: Create and select staging indexes

pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod index;
pub mod init;
pub mod log;
pub mod rm;
pub mod status;

use crate::areas::repository::Repository;
use serde::Serialize;
use std::io::Write;

/// Rendering of command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl Repository {
    fn write_json<T: Serialize>(&self, value: &T, format: OutputFormat) -> anyhow::Result<()> {
        let rendered = match format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };
        writeln!(self.writer(), "{rendered}")?;

        Ok(())
    }
}
