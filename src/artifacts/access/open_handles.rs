//! Table of processes holding files open for writing
//!
//! On Linux every process exposes its descriptors under `/proc/<pid>/fd` and
//! their open flags under `/proc/<pid>/fdinfo/<fd>`. A descriptor whose access
//! mode is `O_WRONLY` or `O_RDWR` marks its file as being written. Files are
//! matched by device and inode, so hard links and differently spelled paths
//! resolve to the same entry. The calling process is included.
//!
//! Other platforms get an empty table and rely on lock probing instead.

use std::collections::{HashMap, HashSet};
use std::fs::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileKey {
    dev: u64,
    ino: u64,
}

impl FileKey {
    #[cfg(unix)]
    pub fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;

        Some(FileKey {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Writers per file, as `(pid, command)`
#[derive(Debug, Default)]
pub struct WriterTable {
    writers: HashMap<FileKey, Vec<(u32, String)>>,
}

impl WriterTable {
    pub fn writers_of(&self, key: &FileKey) -> &[(u32, String)] {
        self.writers.get(key).map_or(&[], Vec::as_slice)
    }

    /// Collect the writers of `targets`
    #[cfg(target_os = "linux")]
    pub fn scan(targets: &HashSet<FileKey>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut table = WriterTable::default();
        if targets.is_empty() {
            return Ok(table);
        }

        let mut uninspectable = 0usize;
        for process in std::fs::read_dir(PROC_ROOT).context("Unable to list processes")? {
            let Ok(process) = process else { continue };
            let Some(pid) = process
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };

            let descriptors = match std::fs::read_dir(process.path().join("fd")) {
                Ok(descriptors) => descriptors,
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    uninspectable += 1;
                    continue;
                }
                // the process exited meanwhile
                Err(_) => continue,
            };

            for descriptor in descriptors.filter_map(Result::ok) {
                let Ok(metadata) = std::fs::metadata(descriptor.path()) else {
                    continue;
                };
                if !metadata.is_file() {
                    continue;
                }
                let Some(key) = FileKey::of(&metadata).filter(|key| targets.contains(key)) else {
                    continue;
                };

                let fdinfo = process.path().join("fdinfo").join(descriptor.file_name());
                if !is_open_for_writing(&fdinfo) {
                    continue;
                }

                let writers = table.writers.entry(key).or_default();
                if !writers.iter().any(|(writer, _)| *writer == pid) {
                    writers.push((pid, command_of(&process.path())));
                }
            }
        }

        if uninspectable > 0 {
            tracing::warn!(
                processes = uninspectable,
                "open files of some processes could not be inspected"
            );
        }
        tracing::debug!(files = table.writers.len(), "writer table collected");

        Ok(table)
    }

    #[cfg(not(target_os = "linux"))]
    pub fn scan(_targets: &HashSet<FileKey>) -> anyhow::Result<Self> {
        Ok(WriterTable::default())
    }
}

#[cfg(target_os = "linux")]
const PROC_ROOT: &str = "/proc";

#[cfg(target_os = "linux")]
const O_ACCMODE: u32 = 0o3;

#[cfg(target_os = "linux")]
fn is_open_for_writing(fdinfo: &std::path::Path) -> bool {
    let Ok(content) = std::fs::read_to_string(fdinfo) else {
        return false;
    };

    content
        .lines()
        .find_map(|line| line.strip_prefix("flags:"))
        .and_then(|flags| u32::from_str_radix(flags.trim(), 8).ok())
        .is_some_and(|flags| flags & O_ACCMODE != 0)
}

#[cfg(target_os = "linux")]
fn command_of(process: &std::path::Path) -> String {
    std::fs::read_to_string(process.join("comm"))
        .map(|command| command.trim().to_string())
        .unwrap_or_else(|_| "unknown process".to_string())
}
