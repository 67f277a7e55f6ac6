//! Commit object
//!
//! A commit freezes one snapshot tree together with its metadata. Commits are
//! immutable and append-only; each one names its parent (none for the first
//! commit of a repository).
//!
//! ## Hash
//!
//! The commit hash is the SHA-256 digest of the canonical JSON encoding of
//!
//! ```text
//! { parent, root, message, date, tags, userData }
//! ```
//!
//! where `root` is the root tree's aggregate hash. User data is kept in a sorted
//! map, so the hash can always be recomputed from a loaded commit.
//!
//! ## Storage
//!
//! `<commondir>/versions/<hash>`: zlib-compressed JSON of the whole commit,
//! including the root tree.

use crate::artifacts::objects::hasher;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::tree::tree_entry::TreeDir;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Arbitrary user supplied key/value data
pub type UserData = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    hash: ObjectId,
    parent: Option<ObjectId>,
    message: String,
    date: DateTime<Utc>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    user_data: UserData,
    root: TreeDir,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedFields<'c> {
    parent: Option<&'c ObjectId>,
    root: &'c ObjectId,
    message: &'c str,
    date: &'c DateTime<Utc>,
    tags: &'c [String],
    user_data: &'c UserData,
}

impl HashedFields<'_> {
    fn digest(&self) -> anyhow::Result<ObjectId> {
        let canonical = serde_json::to_vec(self)?;

        Ok(hasher::hash_content(&canonical))
    }
}

impl Commit {
    /// Create a commit dated now
    pub fn new(
        parent: Option<ObjectId>,
        root: TreeDir,
        message: String,
        tags: Vec<String>,
        user_data: UserData,
    ) -> anyhow::Result<Self> {
        Self::new_with_date(parent, root, message, tags, user_data, Utc::now())
    }

    pub fn new_with_date(
        parent: Option<ObjectId>,
        root: TreeDir,
        message: String,
        tags: Vec<String>,
        user_data: UserData,
        date: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let date = date.trunc_subsecs(3);
        let hash = HashedFields {
            parent: parent.as_ref(),
            root: &root.hash,
            message: &message,
            date: &date,
            tags: &tags,
            user_data: &user_data,
        }
        .digest()?;

        Ok(Commit {
            hash,
            parent,
            message,
            date,
            tags,
            user_data,
            root,
        })
    }

    /// Recompute the content address from the other fields
    pub fn compute_hash(&self) -> anyhow::Result<ObjectId> {
        HashedFields {
            parent: self.parent.as_ref(),
            root: &self.root.hash,
            message: &self.message,
            date: &self.date,
            tags: &self.tags,
            user_data: &self.user_data,
        }
        .digest()
    }

    pub fn hash(&self) -> &ObjectId {
        &self.hash
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parent.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// First line of the commit message
    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn user_data(&self) -> &UserData {
        &self.user_data
    }

    pub fn root(&self) -> &TreeDir {
        &self.root
    }

    /// Format timestamp in human-readable form
    ///
    /// # Returns
    ///
    /// String like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_date(&self) -> String {
        self.date.format("%a %b %-d %H:%M:%S %Y %z").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::tree::tree_entry::test_support::tree_of;
    use pretty_assertions::assert_eq;

    fn sample(user_data: UserData) -> Commit {
        Commit::new_with_date(
            None,
            tree_of(&["a/b.txt"]),
            "Add b".to_string(),
            vec!["wip".to_string()],
            user_data,
            DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn hash_is_recomputable_after_a_json_round_trip() {
        let mut user_data = UserData::new();
        user_data.insert("zeta".into(), serde_json::json!(1));
        user_data.insert("alpha".into(), serde_json::json!({"nested": true}));
        let commit = sample(user_data);

        let json = serde_json::to_string(&commit).unwrap();
        let loaded: Commit = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded, commit);
        assert_eq!(loaded.compute_hash().unwrap(), *commit.hash());
    }

    #[test]
    fn hash_covers_every_field() {
        let base = sample(UserData::new());
        let mut user_data = UserData::new();
        user_data.insert("k".into(), serde_json::json!("v"));

        assert_ne!(sample(user_data).hash(), base.hash());
        assert_ne!(
            Commit::new_with_date(
                Some(base.hash().clone()),
                base.root().clone(),
                base.message().to_string(),
                base.tags().to_vec(),
                UserData::new(),
                base.date(),
            )
            .unwrap()
            .hash(),
            base.hash()
        );
    }

    #[test]
    fn date_is_kept_to_the_millisecond() {
        assert_eq!(sample(UserData::new()).date().timestamp_subsec_millis(), 123);
        assert_eq!(
            sample(UserData::new()).date().timestamp_subsec_nanos(),
            123_000_000
        );
    }

    #[test]
    fn new_commits_carry_a_full_length_hash() {
        let commit = sample(UserData::new());

        assert!(ObjectId::is_valid(commit.hash().as_ref()));
        assert_eq!(commit.hash().to_short_oid().len(), 7);
    }

    #[test]
    fn short_message_is_the_first_line() {
        let commit = Commit::new(
            None,
            TreeDir::root(),
            "Title\n\nBody".to_string(),
            Vec::new(),
            UserData::new(),
        )
        .unwrap();

        assert_eq!(commit.short_message(), "Title");
    }
}
