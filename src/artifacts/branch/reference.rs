//! Reference values
//!
//! HEAD is either attached to a branch or detached at a commit. It is never an
//! alias of a mutable pointer: an attached HEAD names its branch and the commit
//! is looked up from the branch record whenever it is needed.

use crate::artifacts::branch::HEAD_REF_NAME;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::commit::UserData;
use crate::artifacts::objects::object_id::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Branch,
    Head,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Branch => write!(f, "branch"),
            ReferenceKind::Head => write!(f, "head"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Attached(BranchName),
    Detached(ObjectId),
}

impl Head {
    pub fn is_detached(&self) -> bool {
        matches!(self, Head::Detached(_))
    }

    pub fn branch(&self) -> Option<&BranchName> {
        match self {
            Head::Attached(branch) => Some(branch),
            Head::Detached(_) => None,
        }
    }

    /// Content of the HEAD file
    pub fn to_raw(&self) -> String {
        match self {
            Head::Attached(branch) => format!("ref: {branch}"),
            Head::Detached(hash) => hash.to_string(),
        }
    }
}

/// Persisted content of a branch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRecord {
    pub hash: ObjectId,
    #[serde(default)]
    pub start: Option<ObjectId>,
    #[serde(default)]
    pub user_data: UserData,
}

impl BranchRecord {
    pub fn new(hash: ObjectId, user_data: UserData) -> Self {
        BranchRecord {
            start: Some(hash.clone()),
            hash,
            user_data,
        }
    }
}

/// A branch as handed out to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub kind: ReferenceKind,
    pub name: String,
    pub hash: ObjectId,
    pub start: Option<ObjectId>,
    pub user_data: UserData,
}

impl Reference {
    pub fn from_record(name: &BranchName, record: BranchRecord) -> Self {
        Reference {
            kind: ReferenceKind::Branch,
            name: name.to_string(),
            hash: record.hash,
            start: record.start,
            user_data: record.user_data,
        }
    }
}

/// Resolved HEAD
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadInfo {
    /// Branch HEAD is attached to, `HEAD` when detached
    pub name: String,
    pub hash: ObjectId,
    pub detached: bool,
}

impl HeadInfo {
    pub fn new(head: &Head, hash: ObjectId) -> Self {
        HeadInfo {
            name: head
                .branch()
                .map_or_else(|| HEAD_REF_NAME.to_string(), |branch| branch.to_string()),
            hash,
            detached: head.is_detached(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::hasher;
    use pretty_assertions::assert_eq;

    #[test]
    fn head_renders_its_file_content() {
        let hash = hasher::hash_content(b"commit");

        assert_eq!(
            Head::Attached(BranchName::default_branch()).to_raw(),
            "ref: Main"
        );
        assert_eq!(Head::Detached(hash.clone()).to_raw(), hash.to_string());
    }

    #[test]
    fn detached_head_info_is_named_head() {
        let hash = hasher::hash_content(b"commit");
        let info = HeadInfo::new(&Head::Detached(hash.clone()), hash);

        assert_eq!(info.name, "HEAD");
        assert!(info.detached);
    }

    #[test]
    fn branch_records_use_camel_case_json() {
        let hash = hasher::hash_content(b"commit");
        let mut user_data = UserData::new();
        user_data.insert("owner".into(), serde_json::json!("ana"));

        let json = serde_json::to_value(BranchRecord::new(hash.clone(), user_data)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "hash": hash.to_string(),
                "start": hash.to_string(),
                "userData": { "owner": "ana" },
            })
        );
    }
}
