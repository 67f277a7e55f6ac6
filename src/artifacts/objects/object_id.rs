//! Content identifier (SHA-256 hash)
//!
//! Object IDs are 64-character lowercase hexadecimal strings. They name file
//! content, directory aggregates and commits alike.
//!
//! ## Format
//!
//! - Full: 64 hex characters
//! - Short: First 7 characters
//!
//! ## Storage
//!
//! Blobs are stored in `<commondir>/objects/<first-2-chars>/<remaining-62-chars>`

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Content identifier (SHA-256 hash)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    ///
    /// Uppercase hex digits are accepted and folded to lowercase.
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an object ID from a raw digest
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn is_valid(id: &str) -> bool {
        id.len() == OBJECT_ID_LENGTH && id.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Convert to file system path for object storage
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters of the hash
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_parse(value)
    }
}

impl From<ObjectId> for String {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn parses_full_length_hex() {
        let oid = ObjectId::try_parse(EMPTY.to_uppercase()).unwrap();
        assert_eq!(oid.as_ref(), EMPTY);
        assert_eq!(oid.to_short_oid(), "e3b0c44");
    }

    #[test]
    fn rejects_wrong_length_and_characters() {
        assert!(ObjectId::try_parse("abc".to_string()).is_err());
        assert!(ObjectId::try_parse("z".repeat(OBJECT_ID_LENGTH)).is_err());
    }

    #[test]
    fn empty_id_is_rejected() {
        assert!(ObjectId::try_parse(String::new()).is_err());
        assert!(serde_json::from_str::<ObjectId>("\"\"").is_err());
    }

    #[test]
    fn splits_storage_path_after_two_characters() {
        let oid = ObjectId::try_parse(EMPTY.to_string()).unwrap();
        assert_eq!(oid.to_path(), PathBuf::from("e3").join(&EMPTY[2..]));
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let json = format!("\"{EMPTY}\"");
        let oid: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_string(&oid).unwrap(), json);
        assert!(serde_json::from_str::<ObjectId>("\"nope\"").is_err());
    }
}
