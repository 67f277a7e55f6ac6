use crate::areas::repository::Repository;
use crate::artifacts::status::status_entry::{StatusEntry, StatusFilter};
use crate::commands::porcelain::OutputFormat;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Default, Serialize)]
struct StatusReport<'s> {
    new_files: Vec<&'s str>,
    modified_files: Vec<&'s str>,
    deleted_files: Vec<&'s str>,
    staged_adds: Vec<&'s str>,
    staged_deletes: Vec<&'s str>,
}

impl Repository {
    pub async fn status(&self, format: OutputFormat, index: Option<&str>) -> anyhow::Result<()> {
        let index = self.select_index(index)?;
        let entries = self.get_status(StatusFilter::DEFAULT).await?;
        let files = entries.iter().filter(|entry| !entry.is_dir);

        let mut report = StatusReport {
            staged_adds: index.adds().iter().map(String::as_str).collect(),
            staged_deletes: index.deletes().iter().map(String::as_str).collect(),
            ..StatusReport::default()
        };
        for entry in files {
            if entry.is_deleted() {
                report.deleted_files.push(&entry.path);
            } else if entry.is_new() {
                report.new_files.push(&entry.path);
            } else if entry.is_modified() {
                report.modified_files.push(&entry.path);
            }
        }

        match format {
            OutputFormat::Text => self.print_status(&entries, &report),
            format => self.write_json(&report, format),
        }
    }

    fn print_status(&self, entries: &[StatusEntry], report: &StatusReport) -> anyhow::Result<()> {
        let head = self.get_head()?;
        if head.detached {
            writeln!(self.writer(), "HEAD detached at {}", head.hash.to_short_oid())?;
        } else {
            writeln!(self.writer(), "On branch {}", head.name)?;
        }

        if !report.staged_adds.is_empty() || !report.staged_deletes.is_empty() {
            writeln!(self.writer(), "Changes to be committed:")?;
            for path in &report.staged_adds {
                writeln!(self.writer(), "  {} {}", "A".green(), path)?;
            }
            for path in &report.staged_deletes {
                writeln!(self.writer(), "  {} {}", "D".green(), path)?;
            }
        }

        let changes = entries.iter().filter(|entry| !entry.is_dir).collect::<Vec<_>>();
        if changes.is_empty() {
            writeln!(self.writer(), "nothing to commit, working tree clean")?;
            return Ok(());
        }

        writeln!(self.writer(), "Changes not staged for commit:")?;
        for entry in changes {
            writeln!(self.writer(), "  {} {}", Self::colored_marker(entry), entry.path)?;
        }

        Ok(())
    }

    fn colored_marker(entry: &StatusEntry) -> ColoredString {
        let marker = entry.marker();
        if entry.is_deleted() {
            marker.red()
        } else if entry.is_new() {
            marker.green()
        } else {
            marker.yellow()
        }
    }
}
