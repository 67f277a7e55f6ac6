//! Structural union of two snapshot trees
//!
//! The merge is right-biased: when both sides hold a file at the same path, the
//! right-hand record wins. Directories present on both sides merge recursively.
//! When one side has a file where the other has a directory, the file wins no
//! matter which side it comes from and the directory's whole subtree is dropped.

use crate::artifacts::tree::tree_entry::{TreeDir, TreeEntry};

pub fn merge_trees(left: &TreeDir, right: &TreeDir) -> TreeDir {
    let mut merged = left.clone();
    merge_into(&mut merged, right);
    merged.update_hashes();

    merged
}

fn merge_into(target: &mut TreeDir, right: &TreeDir) {
    for (name, right_child) in &right.children {
        let Some(left_child) = target.children.get_mut(name) else {
            target.children.insert(name.clone(), right_child.clone());
            continue;
        };

        match (left_child, right_child) {
            (TreeEntry::Dir(left_dir), TreeEntry::Dir(right_dir)) => {
                merge_into(left_dir, right_dir);
            }
            (TreeEntry::File(_), TreeEntry::Dir(_)) => {}
            (slot, TreeEntry::File(_)) => {
                *slot = right_child.clone();
            }
        }
    }
}
