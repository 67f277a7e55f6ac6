use crate::areas::index::Index;
use crate::areas::repository::Repository;
use std::io::Write;

/// `--index` value asking for a brand new index
pub const CREATE_INDEX: &str = "create";

impl Repository {
    /// The index named on the command line, the main index when none is
    pub fn select_index(&self, selector: Option<&str>) -> anyhow::Result<Index> {
        match selector {
            None => self.ensure_main_index(),
            Some(CREATE_INDEX) => {
                let index = self.create_index()?;
                writeln!(self.writer(), "Created new index: [{}]", index.id())?;
                Ok(index)
            }
            Some(id) => self.get_index(id),
        }
    }

    pub fn index_create(&self) -> anyhow::Result<()> {
        self.select_index(Some(CREATE_INDEX))?;

        Ok(())
    }
}
