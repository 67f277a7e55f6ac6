use crate::areas::repository::Repository;
use crate::artifacts::commit::commit_writer::CommitOptions;
use crate::artifacts::objects::commit::UserData;
use std::io::Write;

impl Repository {
    pub async fn commit(
        &self,
        message: &str,
        options: CommitOptions,
        tags: Vec<String>,
        user_data: UserData,
        index: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut index = self.select_index(index)?;
        let message = message.trim();

        let commit = self
            .create_commit(&mut index, message, options, tags, user_data)
            .await?;
        let head = self.get_head()?;

        writeln!(
            self.writer(),
            "[{} {}] {}",
            head.name,
            commit.hash().to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
