//! Platform-independent relative paths
//!
//! Every path recorded in a snapshot, an index or a status report is relative to
//! the working directory, separated by `/`, and never carries a leading, trailing
//! or doubled separator. The repository root itself is the empty path.

use anyhow::Context;
use std::path::{Component, Path, PathBuf};

pub const SEPARATOR: char = '/';

/// Normalize a user- or OS-provided relative path
///
/// Backslashes are treated as separators, `.` segments are dropped and doubled
/// separators collapse. `..` segments are rejected because they would escape
/// the working directory.
pub fn normalize(path: &str) -> anyhow::Result<String> {
    let mut segments = Vec::new();

    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => anyhow::bail!("path '{}' escapes the working directory", path),
            segment => segments.push(segment),
        }
    }

    Ok(segments.join("/"))
}

/// Convert a path below `root` into its normalized relative form
pub fn relative_to(root: &Path, path: &Path) -> anyhow::Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is not inside {}", path.display(), root.display()))?;

    from_path(relative)
}

/// Convert an OS relative path into its normalized form
pub fn from_path(path: &Path) -> anyhow::Result<String> {
    let segments = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(
                name.to_str()
                    .map(str::to_string)
                    .with_context(|| format!("path {} is not valid UTF-8", path.display())),
            ),
            _ => None,
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(segments.join("/"))
}

/// Resolve a normalized relative path against `root`
pub fn to_path(root: &Path, rel_path: &str) -> PathBuf {
    rel_path
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of a relative path, `""` for top-level entries
pub fn parent(rel_path: &str) -> &str {
    rel_path.rsplit_once(SEPARATOR).map_or("", |(parent, _)| parent)
}

pub fn basename(rel_path: &str) -> &str {
    rel_path.rsplit_once(SEPARATOR).map_or(rel_path, |(_, name)| name)
}

/// All proper ancestors of a relative path, shallowest first
pub fn ancestors(rel_path: &str) -> Vec<&str> {
    rel_path
        .match_indices(SEPARATOR)
        .map(|(idx, _)| &rel_path[..idx])
        .collect()
}

/// Whether `rel_path` equals `ancestor` or lies beneath it
pub fn is_within(rel_path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || rel_path == ancestor
        || (rel_path.starts_with(ancestor)
            && rel_path[ancestor.len()..].starts_with(SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("foo//bar/").unwrap(), "foo/bar");
        assert_eq!(normalize("./foo\\bar").unwrap(), "foo/bar");
        assert_eq!(normalize("/foo").unwrap(), "foo");
        assert_eq!(normalize("").unwrap(), "");
    }

    #[test]
    fn normalize_rejects_parent_segments() {
        assert!(normalize("foo/../../etc").is_err());
    }

    #[test]
    fn ancestors_are_listed_shallowest_first() {
        assert_eq!(ancestors("a/b/c.txt"), vec!["a", "a/b"]);
        assert!(ancestors("c.txt").is_empty());
    }

    #[test]
    fn parent_and_basename_split_on_last_separator() {
        assert_eq!(parent("a/b/c.txt"), "a/b");
        assert_eq!(basename("a/b/c.txt"), "c.txt");
        assert_eq!(parent("c.txt"), "");
        assert_eq!(basename("c.txt"), "c.txt");
    }

    #[test]
    fn is_within_respects_segment_boundaries() {
        assert!(is_within("foo/bar", "foo"));
        assert!(is_within("foo", "foo"));
        assert!(!is_within("foobar", "foo"));
        assert!(is_within("anything", ""));
    }

    #[test]
    fn relative_to_strips_root() {
        let root = Path::new("/work/project");
        let path = Path::new("/work/project/assets/cube.blend");

        assert_eq!(relative_to(root, path).unwrap(), "assets/cube.blend");
        assert!(relative_to(root, Path::new("/elsewhere/file")).is_err());
    }
}
