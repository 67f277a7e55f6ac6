//! Commit history across every reference
//!
//! Commits are collected by following parent links from every branch and from
//! HEAD, each commit visited once. They are ordered by date, then by distance
//! from the root commit, then by hash, so commits created within the same
//! millisecond still come out in a stable order.

use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::reference::ReferenceKind;
use crate::artifacts::branch::{HEAD_REF_NAME, resolve_alias};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::SnowError;
use derive_new::new;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommitOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(new)]
pub struct History<'r> {
    repository: &'r Repository,
}

impl<'r> History<'r> {
    pub fn all_commits(&self, order: CommitOrder) -> anyhow::Result<Vec<Commit>> {
        let refs = self.repository.refs();
        let mut pending = refs
            .list_branches()?
            .into_iter()
            .map(|(_, record)| record.hash)
            .collect::<Vec<_>>();
        pending.push(refs.resolve_head()?.1);

        let mut commits = HashMap::new();
        while let Some(hash) = pending.pop() {
            if commits.contains_key(&hash) {
                continue;
            }

            let commit = self.repository.database().load_commit(&hash)?;
            if let Some(parent) = commit.parent() {
                pending.push(parent.clone());
            }
            commits.insert(hash, commit);
        }

        let depths = Self::depths(&commits);
        let mut commits = commits.into_values().collect::<Vec<_>>();
        commits.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| depths.get(a.hash()).cmp(&depths.get(b.hash())))
                .then_with(|| a.hash().cmp(b.hash()))
        });

        if order == CommitOrder::NewestFirst {
            commits.reverse();
        }

        Ok(commits)
    }

    /// Distance of every commit from its root commit
    fn depths(commits: &HashMap<ObjectId, Commit>) -> HashMap<ObjectId, usize> {
        let mut depths = HashMap::new();

        for hash in commits.keys() {
            let mut chain = Vec::new();
            let mut cursor = Some(hash);
            let mut base = 0;

            while let Some(current) = cursor {
                if let Some(depth) = depths.get(current) {
                    base = depth + 1;
                    break;
                }
                chain.push(current);
                cursor = commits.get(current).and_then(Commit::parent);
            }

            for (offset, hash) in chain.into_iter().rev().enumerate() {
                depths.insert(hash.clone(), base + offset);
            }
        }

        depths
    }

    pub fn find_commit_by_hash(&self, hash: &str) -> anyhow::Result<Commit> {
        let hash = ObjectId::try_parse(hash.to_string())
            .map_err(|_| SnowError::not_found("commit", hash))?;

        self.repository.database().load_commit(&hash)
    }

    pub fn find_commit_by_reference_name(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> anyhow::Result<Commit> {
        let refs = self.repository.refs();

        let hash = match kind {
            ReferenceKind::Head => refs.resolve_head()?.1,
            ReferenceKind::Branch if resolve_alias(name) == HEAD_REF_NAME => {
                refs.resolve_head()?.1
            }
            ReferenceKind::Branch => {
                let branch = BranchName::try_parse(name.to_string())
                    .map_err(|_| SnowError::not_found("branch", name))?;
                refs.read_branch(&branch)?.hash
            }
        };

        self.repository.database().load_commit(&hash)
    }
}
