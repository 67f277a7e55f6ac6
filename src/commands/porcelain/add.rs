use crate::areas::repository::Repository;
use crate::artifacts::core::rel_path;
use crate::artifacts::status::status_entry::StatusFilter;
use crate::errors::SnowError;
use std::path::Path;

/// Pattern staging every change in the working directory
const ALL_PATTERN: &str = "*";
/// Pattern staging every change below the current directory
const CWD_PATTERN: &str = ".";

impl Repository {
    /// Stage new and modified files as adds, deleted files as deletes
    ///
    /// `pattern` is `*`, `.` or a path, relative to `cwd`.
    pub async fn stage(
        &self,
        pattern: &str,
        cwd: &Path,
        index: Option<&str>,
    ) -> anyhow::Result<()> {
        let prefix = rel_path::relative_to(self.workdir(), cwd)?;
        let target = match pattern {
            ALL_PATTERN => String::new(),
            CWD_PATTERN => prefix,
            path => rel_path::normalize(&rel_path::join(&prefix, path))?,
        };

        let mut index = self.select_index(index)?;
        let changes = self
            .get_status(StatusFilter::INCLUDE_UNTRACKED)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir && rel_path::is_within(&entry.path, &target))
            .collect::<Vec<_>>();

        if changes.is_empty() && !self.workspace().abs_path(&target).exists() {
            return Err(SnowError::not_found("path", pattern).into());
        }

        let (deleted, changed): (Vec<_>, Vec<_>) =
            changes.into_iter().partition(|entry| entry.is_deleted());
        index.add_files(changed.iter().map(|entry| entry.path.as_str()))?;
        index.delete_files(deleted.iter().map(|entry| entry.path.as_str()))?;
        index.write_files()?;

        tracing::info!(
            index = %index.id(),
            adds = changed.len(),
            deletes = deleted.len(),
            "changes staged"
        );

        Ok(())
    }
}
