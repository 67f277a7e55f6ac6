use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::reference::HeadInfo;
use crate::artifacts::checkout::migration::CheckoutOutcome;
use crate::artifacts::checkout::reset_flags::ResetFlags;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::SnowError;
use std::io::Write;

const DETACHMENT_NOTICE: &str = r#"
You are in 'detached HEAD' state. You can look around, make experimental
changes and commit them, and you can discard any commits you make in this
state without impacting any branches by switching back to a branch.

If you want to create a new branch to retain commits you create, you may
do so (now or later) by using the branch command. Example:

    snow branch <new-branch-name>
"#;

/// How local changes are treated by `checkout` and `switch`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangePolicy {
    pub discard_changes: bool,
    pub keep_changes: bool,
}

impl ChangePolicy {
    fn reset_flags(&self) -> anyhow::Result<ResetFlags> {
        match (self.discard_changes, self.keep_changes) {
            (true, true) => Err(SnowError::invalid_state(
                "either --discard-changes or --keep-changes can be used, not both",
            )
            .into()),
            (true, false) => Ok(ResetFlags::DISCARD_CHANGES),
            (false, true) => Ok(ResetFlags::KEEP_CHANGES),
            (false, false) => Ok(ResetFlags::NONE),
        }
    }
}

impl Repository {
    /// Move the working directory to a commit, detaching HEAD
    pub async fn checkout_commit(&self, target: &str, policy: ChangePolicy) -> anyhow::Result<()> {
        let flags = policy.reset_flags()?;
        if self.is_branch(target) {
            return Err(SnowError::invalid_state(format!(
                "target {target} seems to be a branch and must be checked out via 'snow switch'"
            ))
            .into());
        }

        self.move_head(target, flags | ResetFlags::DETACH).await
    }

    /// Move the working directory to a branch
    pub async fn switch(&self, target: &str, policy: ChangePolicy, detach: bool) -> anyhow::Result<()> {
        let mut flags = policy.reset_flags()?;
        if detach {
            flags |= ResetFlags::DETACH;
        }

        let is_commit = ObjectId::try_parse(target.to_string())
            .is_ok_and(|hash| self.database().has_commit(&hash));
        if is_commit && !self.is_branch(target) {
            return Err(SnowError::invalid_state(format!(
                "target {target} seems to be a commit and must be checked out via 'snow checkout'"
            ))
            .into());
        }

        self.move_head(target, flags).await
    }

    fn is_branch(&self, target: &str) -> bool {
        BranchName::try_parse(target.to_string()).is_ok_and(|branch| self.refs().branch_exists(&branch))
    }

    async fn move_head(&self, target: &str, flags: ResetFlags) -> anyhow::Result<()> {
        let previous = self.get_head()?;
        let outcome = self.checkout(target, flags).await?;

        self.print_previous_head(&previous, &outcome)?;
        self.print_detachment_notice(&previous, &outcome.head, target)?;
        self.print_new_head(&previous, &outcome)?;

        Ok(())
    }

    fn print_previous_head(&self, previous: &HeadInfo, outcome: &CheckoutOutcome) -> anyhow::Result<()> {
        if previous.detached && previous.hash != outcome.commit {
            self.print_head_position("Previous HEAD position was", &previous.hash)?;
        }

        Ok(())
    }

    fn print_detachment_notice(
        &self,
        previous: &HeadInfo,
        current: &HeadInfo,
        target: &str,
    ) -> anyhow::Result<()> {
        if !previous.detached && current.detached {
            writeln!(self.writer(), "Note: checking out '{target}'.\n{DETACHMENT_NOTICE}")?;
        }

        Ok(())
    }

    fn print_new_head(&self, previous: &HeadInfo, outcome: &CheckoutOutcome) -> anyhow::Result<()> {
        let current = &outcome.head;

        if current.detached {
            self.print_head_position("HEAD is now at", &outcome.commit)?;
        } else if !previous.detached && previous.name == current.name {
            writeln!(self.writer(), "Already on '{}'", current.name)?;
        } else {
            writeln!(self.writer(), "Switched to branch '{}'", current.name)?;
        }

        Ok(())
    }

    fn print_head_position(&self, message: &str, hash: &ObjectId) -> anyhow::Result<()> {
        let commit = self.database().load_commit(hash)?;

        writeln!(
            self.writer(),
            "{} {} {}",
            message,
            hash.to_short_oid(),
            commit.short_message()
        )?;

        Ok(())
    }
}
