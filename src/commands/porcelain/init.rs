use crate::areas::repository::{Repository, SNOW_MARKER};
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Create a repository and report where it lives
    pub fn init(
        workdir: &Path,
        commondir: Option<&Path>,
        writer: Box<dyn Write>,
    ) -> anyhow::Result<Repository> {
        let repository = Repository::init_ext(workdir, commondir)?.with_writer(writer);

        write!(
            repository.writer(),
            "Initialized empty snow repository at {}",
            repository.workdir().display()
        )?;
        let marker = repository.workdir().join(SNOW_MARKER);
        if repository.commondir() != marker.as_path() {
            write!(
                repository.writer(),
                " (commondir: {})",
                repository.commondir().display()
            )?;
        }
        writeln!(repository.writer())?;

        Ok(repository)
    }
}
