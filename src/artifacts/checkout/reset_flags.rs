use crate::artifacts::checkout::conflict::LocalChangeKind;
use bitflags::bitflags;

bitflags! {
    /// How checkout and switch treat HEAD and local changes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResetFlags: u32 {
        const NONE = 0;
        /// Leave HEAD detached even when the target is a branch
        const DETACH = 0b00001;
        const DELETE_MODIFIED_FILES = 0b00010;
        const DELETE_NEW_FILES = 0b00100;
        const RESTORE_DELETED_FILES = 0b01000;
        /// Leave every locally changed path as it is
        const KEEP_CHANGES = 0b10000;
        const DISCARD_CHANGES = Self::DELETE_MODIFIED_FILES.bits()
            | Self::DELETE_NEW_FILES.bits()
            | Self::RESTORE_DELETED_FILES.bits();
    }
}

impl ResetFlags {
    /// Whether a local change of `kind` may be discarded
    pub fn discards(&self, kind: LocalChangeKind) -> bool {
        self.contains(kind.discard_flag())
    }

    /// Whether a local change of `kind` is resolved one way or the other
    pub fn covers(&self, kind: LocalChangeKind) -> bool {
        self.discards(kind) || self.contains(ResetFlags::KEEP_CHANGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_discard_bit_covers_its_own_class() {
        let flags = ResetFlags::DELETE_NEW_FILES;

        assert!(flags.covers(LocalChangeKind::New));
        assert!(!flags.covers(LocalChangeKind::Modified));
        assert!(!flags.covers(LocalChangeKind::Deleted));
        assert!(!ResetFlags::NONE.covers(LocalChangeKind::New));
    }

    #[test]
    fn discard_bits_win_over_keep_changes() {
        let flags = ResetFlags::KEEP_CHANGES | ResetFlags::RESTORE_DELETED_FILES;

        assert!(flags.discards(LocalChangeKind::Deleted));
        assert!(!flags.discards(LocalChangeKind::Modified));
        assert!(flags.covers(LocalChangeKind::Modified));
    }

    #[test]
    fn discard_changes_covers_every_class() {
        for kind in [
            LocalChangeKind::Modified,
            LocalChangeKind::New,
            LocalChangeKind::Deleted,
        ] {
            assert!(ResetFlags::DISCARD_CHANGES.discards(kind));
        }
        assert!(!ResetFlags::DISCARD_CHANGES.contains(ResetFlags::DETACH));
    }
}
