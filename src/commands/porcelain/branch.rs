use crate::areas::repository::Repository;
use crate::artifacts::branch::reference::ReferenceKind;
use crate::artifacts::objects::commit::UserData;
use colored::Colorize;
use std::io::Write;

impl Repository {
    /// Create `name`, or delete it with `delete`; list every branch without a name
    pub fn branch(
        &self,
        name: Option<&str>,
        start_point: Option<&str>,
        delete: bool,
        user_data: UserData,
    ) -> anyhow::Result<()> {
        let Some(name) = name else {
            return self.list_branches();
        };

        if delete {
            let hash = self.delete_reference(ReferenceKind::Branch, name)?;
            writeln!(
                self.writer(),
                "Deleted branch '{}' (was {})",
                name,
                hash.to_short_oid()
            )?;
        } else {
            let reference =
                self.create_new_reference(ReferenceKind::Branch, name, start_point, user_data)?;
            writeln!(self.writer(), "A branch '{}' got created.", reference.name)?;
        }

        Ok(())
    }

    fn list_branches(&self) -> anyhow::Result<()> {
        let head = self.get_head()?;
        if head.detached {
            writeln!(
                self.writer(),
                "* {}",
                format!("(HEAD detached at {})", head.hash.to_short_oid()).green()
            )?;
        }

        for reference in self.get_all_references()? {
            if !head.detached && reference.name == head.name {
                writeln!(
                    self.writer(),
                    "* {} {}",
                    reference.name.green(),
                    reference.hash.to_short_oid()
                )?;
            } else {
                writeln!(
                    self.writer(),
                    "  {} {}",
                    reference.name,
                    reference.hash.to_short_oid()
                )?;
            }
        }

        Ok(())
    }
}
