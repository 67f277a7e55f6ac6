use crate::artifacts::checkout::reset_flags::ResetFlags;
use crate::artifacts::status::status_entry::StatusFlags;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalChangeKind {
    Modified,
    New,
    Deleted,
}

impl LocalChangeKind {
    pub fn from_status(status: StatusFlags) -> Option<Self> {
        if status.contains(StatusFlags::IGNORED) {
            None
        } else if status.contains(StatusFlags::DELETED) {
            Some(LocalChangeKind::Deleted)
        } else if status.contains(StatusFlags::NEW) {
            Some(LocalChangeKind::New)
        } else if status.contains(StatusFlags::MODIFIED) {
            Some(LocalChangeKind::Modified)
        } else {
            None
        }
    }

    /// Reset flag that authorizes discarding this kind of change
    pub fn discard_flag(&self) -> ResetFlags {
        match self {
            LocalChangeKind::Modified => ResetFlags::DELETE_MODIFIED_FILES,
            LocalChangeKind::New => ResetFlags::DELETE_NEW_FILES,
            LocalChangeKind::Deleted => ResetFlags::RESTORE_DELETED_FILES,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            LocalChangeKind::Modified => "M",
            LocalChangeKind::New => "A",
            LocalChangeKind::Deleted => "D",
        }
    }
}

/// A path whose local change blocks a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalChange {
    pub path: String,
    pub kind: LocalChangeKind,
}

impl LocalChange {
    pub fn render_conflict(target: &str, changes: &[LocalChange]) -> String {
        let mut lines = changes
            .iter()
            .map(|change| format!("{} {}", change.kind.marker(), change.path))
            .collect::<Vec<_>>();
        lines.push(format!(
            "You have local changes to '{target}'; not switching branches."
        ));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn conflict_lists_each_change_before_the_verdict() {
        let changes = vec![
            LocalChange {
                path: "a.psd".to_string(),
                kind: LocalChangeKind::Modified,
            },
            LocalChange {
                path: "b/c.png".to_string(),
                kind: LocalChangeKind::Deleted,
            },
        ];

        assert_eq!(
            LocalChange::render_conflict("Main", &changes),
            "M a.psd\nD b/c.png\nYou have local changes to 'Main'; not switching branches."
        );
    }

    #[test]
    fn ignored_and_unmodified_entries_are_not_changes() {
        assert_eq!(
            LocalChangeKind::from_status(StatusFlags::NEW | StatusFlags::IGNORED),
            None
        );
        assert_eq!(LocalChangeKind::from_status(StatusFlags::UNMODIFIED), None);
        assert_eq!(
            LocalChangeKind::from_status(StatusFlags::NEW),
            Some(LocalChangeKind::New)
        );
    }
}
