use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    pub struct StatusFlags: u32 {
        const NEW = 0b00001;
        const MODIFIED = 0b00010;
        const DELETED = 0b00100;
        const IGNORED = 0b01000;
        const UNMODIFIED = 0b10000;
    }
}

bitflags! {
    /// Which entries beyond tracked changes a status report includes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFilter: u32 {
        const INCLUDE_UNTRACKED = 0b001;
        const INCLUDE_IGNORED = 0b010;
        const INCLUDE_UNMODIFIED = 0b100;
        const DEFAULT = Self::INCLUDE_UNTRACKED.bits();
        const ALL = Self::INCLUDE_UNTRACKED.bits()
            | Self::INCLUDE_IGNORED.bits()
            | Self::INCLUDE_UNMODIFIED.bits();
    }
}

impl StatusFilter {
    pub fn admits(&self, status: StatusFlags) -> bool {
        if status.contains(StatusFlags::IGNORED) {
            self.contains(StatusFilter::INCLUDE_IGNORED)
        } else if status.contains(StatusFlags::NEW) {
            self.contains(StatusFilter::INCLUDE_UNTRACKED)
        } else if status.contains(StatusFlags::UNMODIFIED) {
            self.contains(StatusFilter::INCLUDE_UNMODIFIED)
        } else {
            true
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub path: String,
    pub is_dir: bool,
    pub status: StatusFlags,
}

impl StatusEntry {
    pub fn is_new(&self) -> bool {
        self.status.contains(StatusFlags::NEW)
    }

    pub fn is_modified(&self) -> bool {
        self.status.contains(StatusFlags::MODIFIED)
    }

    pub fn is_deleted(&self) -> bool {
        self.status.contains(StatusFlags::DELETED)
    }

    pub fn is_ignored(&self) -> bool {
        self.status.contains(StatusFlags::IGNORED)
    }

    /// One-letter marker used in console output
    pub fn marker(&self) -> &'static str {
        if self.is_deleted() {
            "D"
        } else if self.is_ignored() {
            "I"
        } else if self.is_new() {
            "A"
        } else if self.is_modified() {
            "M"
        } else {
            " "
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_shows_changes_and_untracked_files_only() {
        let filter = StatusFilter::DEFAULT;

        assert!(filter.admits(StatusFlags::MODIFIED));
        assert!(filter.admits(StatusFlags::DELETED));
        assert!(filter.admits(StatusFlags::NEW));
        assert!(!filter.admits(StatusFlags::NEW | StatusFlags::IGNORED));
        assert!(!filter.admits(StatusFlags::UNMODIFIED));
    }

    #[test]
    fn empty_filter_shows_tracked_changes_only() {
        let filter = StatusFilter::empty();

        assert!(filter.admits(StatusFlags::MODIFIED));
        assert!(!filter.admits(StatusFlags::NEW));
        assert!(StatusFilter::ALL.admits(StatusFlags::UNMODIFIED));
    }
}
