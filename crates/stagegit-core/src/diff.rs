// StageGit - Remote-Backed Working Copies
// Copyright (C) 2026 StageGit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Tree diffing primitives for the three-way algorithm
//!
//! A diff maps each changed path to the child's entry, or to `None` when the
//! path was deleted relative to the parent. Entries compare structurally
//! (OID, mode and size), so a mode flip alone is a change.

use crate::{Oid, TreeEntries, TreeEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How one side changed a path relative to a parent tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Same content on both sides
    Identical,
    /// Path absent from the parent
    Added,
    /// Path absent from the child
    Deleted,
    /// Present on both sides with different content
    Modified,
}

impl ChangeKind {
    /// Classify a parent/child hash pair
    pub fn classify(parent: Option<Oid>, child: Option<Oid>) -> ChangeKind {
        if parent == child {
            ChangeKind::Identical
        } else if parent.is_none() {
            ChangeKind::Added
        } else if child.is_none() {
            ChangeKind::Deleted
        } else {
            ChangeKind::Modified
        }
    }
}

/// Diff two trees: changed paths mapped to the child entry
///
/// For the union of both key sets, keeps only paths where the two maps'
/// values differ; the value is the child's entry, or `None` meaning "deleted
/// relative to parent".
pub fn diff(parent: &TreeEntries, child: &TreeEntries) -> BTreeMap<String, Option<TreeEntry>> {
    let paths: BTreeSet<&String> = parent.keys().chain(child.keys()).collect();

    let mut changed = BTreeMap::new();
    for path in paths {
        let before = parent.get(path);
        let after = child.get(path);
        if before != after {
            changed.insert(path.clone(), after.cloned());
        }
    }
    changed
}
