//! Ignore rules
//!
//! Paths matching an ignore rule never enter a snapshot and only show up in a
//! status report when explicitly requested. Rules come from a built-in list of
//! operating-system clutter plus the optional `.snowignore` file at the root of
//! the working directory.
//!
//! ## Pattern syntax
//!
//! One glob per line, `#` starts a comment line, blank lines are skipped.
//!
//! - `*` matches any run of characters except `/`
//! - `?` matches exactly one character except `/`
//! - A pattern without `/` matches any single path segment (`*.tmp` ignores
//!   `a/b/c.tmp`); a pattern with `/` matches a path from the root
//! - A matching directory ignores everything beneath it

use anyhow::Context;
use regex::{Regex, RegexBuilder};
use std::path::Path;

pub const IGNORE_FILE: &str = ".snowignore";

const DEFAULT_PATTERNS: [&str; 4] = [".DS_Store", "thumbs.db", "desktop.ini", "._*"];

#[derive(Debug, Clone)]
struct Pattern {
    regex: Regex,
    anchored: bool,
}

impl Pattern {
    fn compile(glob: &str, case_insensitive: bool) -> anyhow::Result<Self> {
        let anchored = glob.contains('/');
        let glob = glob.trim_matches('/');

        let mut source = String::from("^");
        for c in glob.chars() {
            match c {
                '*' => source.push_str("[^/]*"),
                '?' => source.push_str("[^/]"),
                c => source.push_str(&regex::escape(&c.to_string())),
            }
        }
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(case_insensitive)
            .build()
            .with_context(|| format!("invalid ignore pattern '{glob}'"))?;

        Ok(Pattern { regex, anchored })
    }

    fn matches(&self, rel_path: &str) -> bool {
        if self.anchored {
            crate::artifacts::core::rel_path::ancestors(rel_path)
                .into_iter()
                .chain(std::iter::once(rel_path))
                .any(|candidate| self.regex.is_match(candidate))
        } else {
            rel_path
                .split('/')
                .any(|segment| self.regex.is_match(segment))
        }
    }
}

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<Pattern>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::defaults()
    }
}

impl IgnoreRules {
    /// Built-in rules only
    pub fn defaults() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .filter_map(|glob| Pattern::compile(glob, true).ok())
            .collect();

        IgnoreRules { patterns }
    }

    /// Built-in rules plus the working directory's ignore file, if any
    pub fn load(workdir: &Path) -> anyhow::Result<Self> {
        let ignore_file = workdir.join(IGNORE_FILE);
        if !ignore_file.is_file() {
            return Ok(Self::defaults());
        }

        let content = std::fs::read_to_string(&ignore_file)
            .with_context(|| format!("Unable to read {}", ignore_file.display()))?;

        Self::defaults().with_lines(content.lines())
    }

    pub fn with_lines<'a>(mut self, lines: impl IntoIterator<Item = &'a str>) -> anyhow::Result<Self> {
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            self.patterns.push(Pattern::compile(line, false)?);
        }

        Ok(self)
    }

    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(rel_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_ignore_os_clutter_anywhere() {
        let rules = IgnoreRules::defaults();

        assert!(rules.is_ignored(".DS_Store"));
        assert!(rules.is_ignored("textures/Thumbs.db"));
        assert!(rules.is_ignored("a/b/._cube.blend"));
        assert!(!rules.is_ignored("textures/wood.png"));
    }

    #[test]
    fn wildcards_stay_within_one_segment() -> anyhow::Result<()> {
        let rules = IgnoreRules::defaults().with_lines(["*.tmp", "render/cache-??"])?;

        assert!(rules.is_ignored("scene.tmp"));
        assert!(rules.is_ignored("deep/inside/scene.tmp"));
        assert!(rules.is_ignored("render/cache-01"));
        assert!(rules.is_ignored("render/cache-01/frame.exr"));
        assert!(!rules.is_ignored("render/cache-001"));
        assert!(!rules.is_ignored("other/render/cache-01"));

        Ok(())
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() -> anyhow::Result<()> {
        let rules = IgnoreRules::defaults().with_lines(["# exports", "", "  build  "])?;

        assert!(rules.is_ignored("build/out.fbx"));
        assert!(!rules.is_ignored("# exports"));

        Ok(())
    }

    #[test]
    fn ignore_file_is_read_from_workdir() -> anyhow::Result<()> {
        let dir = assert_fs::TempDir::new()?;
        std::fs::write(dir.path().join(IGNORE_FILE), "*.bak\n")?;

        let rules = IgnoreRules::load(dir.path())?;

        assert!(rules.is_ignored("model.bak"));
        assert!(rules.is_ignored(".DS_Store"));

        Ok(())
    }
}
