use crate::areas::repository::Repository;
use crate::artifacts::branch::reference::{HeadInfo, Reference};
use crate::artifacts::log::history::CommitOrder;
use crate::artifacts::objects::commit::{Commit, UserData};
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::porcelain::OutputFormat;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

/// Commit as listed by `log`, without its tree
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry<'c> {
    hash: &'c ObjectId,
    parent: Option<&'c ObjectId>,
    message: &'c str,
    date: DateTime<Utc>,
    tags: &'c [String],
    user_data: &'c UserData,
}

impl<'c> From<&'c Commit> for LogEntry<'c> {
    fn from(commit: &'c Commit) -> Self {
        LogEntry {
            hash: commit.hash(),
            parent: commit.parent(),
            message: commit.message(),
            date: commit.date(),
            tags: commit.tags(),
            user_data: commit.user_data(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LogReport<'c> {
    commits: Vec<LogEntry<'c>>,
    refs: &'c [Reference],
    head: &'c HeadInfo,
}

impl Repository {
    pub fn log(&self, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
        let commits = self.get_all_commits(CommitOrder::NewestFirst)?;
        let refs = self.get_all_references()?;
        let head = self.get_head()?;

        if format != OutputFormat::Text {
            let report = LogReport {
                commits: commits.iter().map(LogEntry::from).collect(),
                refs: &refs,
                head: &head,
            };
            return self.write_json(&report, format);
        }

        let mut decorations = HashMap::<&ObjectId, Vec<String>>::new();
        for reference in &refs {
            let name = if !head.detached && reference.name == head.name {
                format!("HEAD -> {}", reference.name)
            } else {
                reference.name.clone()
            };
            decorations.entry(&reference.hash).or_default().push(name);
        }
        if head.detached {
            decorations
                .entry(&head.hash)
                .or_default()
                .insert(0, "HEAD".to_string());
        }

        for commit in &commits {
            let decoration = decorations
                .get(commit.hash())
                .map(|names| format!(" ({})", names.join(", ")))
                .unwrap_or_default();

            writeln!(
                self.writer(),
                "{}{}",
                format!("commit {}", commit.hash()).yellow(),
                decoration.cyan()
            )?;
            writeln!(self.writer(), "Date:   {}", commit.readable_date())?;
            if verbose {
                self.show_commit_details(commit)?;
            }
            writeln!(self.writer())?;
            for line in commit.message().lines() {
                writeln!(self.writer(), "    {line}")?;
            }
            writeln!(self.writer())?;
        }

        Ok(())
    }

    fn show_commit_details(&self, commit: &Commit) -> anyhow::Result<()> {
        if let Some(parent) = commit.parent() {
            writeln!(self.writer(), "Parent: {parent}")?;
        }
        if !commit.tags().is_empty() {
            writeln!(self.writer(), "Tags:   {}", commit.tags().join(", "))?;
        }
        for (key, value) in commit.user_data() {
            writeln!(self.writer(), "Data:   {key} = {value}")?;
        }
        for (path, file) in commit.root().all_files() {
            writeln!(self.writer(), "        {} ({} bytes)", path, file.size)?;
        }

        Ok(())
    }
}
