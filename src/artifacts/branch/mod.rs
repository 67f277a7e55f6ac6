//! Branches, HEAD and the plain reference records handed to callers

pub mod branch_name;
pub mod reference;

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Name of the reference HEAD is attached to right after `init`
pub const DEFAULT_BRANCH: &str = "Main";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

/// Resolve `@` and friends to the reference they stand for
pub fn resolve_alias(name: &str) -> &str {
    REF_ALIASES.get(name).copied().unwrap_or(name)
}
