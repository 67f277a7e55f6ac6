use crate::areas::repository::Repository;
use crate::artifacts::core::rel_path;
use crate::errors::SnowError;
use anyhow::Context;
use std::path::Path;

impl Repository {
    /// Delete `path` from the working directory and stage the deletion
    pub fn remove(&self, path: &str, cwd: &Path, index: Option<&str>) -> anyhow::Result<()> {
        let prefix = rel_path::relative_to(self.workdir(), cwd)?;
        let target = rel_path::normalize(&rel_path::join(&prefix, path))?;
        if target.is_empty() {
            return Err(SnowError::invalid_state("refusing to remove the working directory").into());
        }

        let abs_path = self.workspace().abs_path(&target);
        if abs_path.is_dir() {
            std::fs::remove_dir_all(&abs_path)
                .with_context(|| format!("Unable to remove {}", abs_path.display()))?;
        } else if abs_path.is_file() {
            self.workspace().remove_file(&target)?;
        } else {
            return Err(SnowError::not_found("path", path).into());
        }

        let mut index = self.select_index(index)?;
        index.delete_files([target.as_str()])?;
        index.write_files()?;
        tracing::info!(index = %index.id(), path = %target, "deletion staged");

        Ok(())
    }
}
