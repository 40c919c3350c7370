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

//! Three-way conflict detection and resolution
//!
//! Two branches' trees are compared against their nearest common ancestor.
//! A path conflicts only when *both* sides changed it relative to the
//! ancestor *and* the two sides disagree; everything else auto-merges. The
//! resulting conflict set is minimal by construction:
//!
//! - a path changed on one side only is never a conflict
//! - a path changed identically on both sides is never a conflict
//!
//! Conflicts are resolved by choosing a side, supplying replacement content,
//! or deleting the path; unresolved conflicts default to the base side.
//! There is no intra-file textual merge at this layer.

use crate::{
    diff, Blob, ChangeKind, CommitBuilder, Driver, Oid, Result, Signature, TreeEntries, TreeEntry,
    WorkingState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace};

/// Classification of a detected conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Both sides added the path with different content
    BothAdded,
    /// Base deleted while head modified
    DeletedOnBase,
    /// Head deleted while base modified
    DeletedOnHead,
    /// Both sides modified with different content
    BothModified,
    /// Any status combination outside the four above
    ///
    /// Unreachable for conflicts built by [`compare_trees`], but the
    /// classifier is a total function because it is exposed independently.
    NoConflict,
}

/// One path's three-way conflict and its resolution state
///
/// Unsolved by construction. Resolution sets `solved` plus exactly one of
/// `solved_oid` (reuse existing content) or `solved_content` (new content)
/// or neither (deletion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Hash at the path in the ancestor tree (`None` if absent)
    pub parent_oid: Option<Oid>,

    /// Hash at the path in the base tree (`None` if absent)
    pub base_oid: Option<Oid>,

    /// Hash at the path in the head tree (`None` if absent)
    pub head_oid: Option<Oid>,

    /// Whether a resolution has been recorded
    #[serde(default)]
    pub solved: bool,

    /// Resolution: reuse the content with this hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved_oid: Option<Oid>,

    /// Resolution: replace with this new content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved_content: Option<Blob>,
}

impl Conflict {
    /// Build an unsolved conflict from the three trees' hashes at a path
    pub fn new(parent_oid: Option<Oid>, base_oid: Option<Oid>, head_oid: Option<Oid>) -> Self {
        Self {
            parent_oid,
            base_oid,
            head_oid,
            solved: false,
            solved_oid: None,
            solved_content: None,
        }
    }

    /// Classify the conflict from its two sides' change kinds
    ///
    /// Total over all status combinations; combinations that
    /// [`compare_trees`] never produces map to [`ConflictKind::NoConflict`].
    pub fn kind(&self) -> ConflictKind {
        let base_status = ChangeKind::classify(self.parent_oid, self.base_oid);
        let head_status = ChangeKind::classify(self.parent_oid, self.head_oid);

        match (base_status, head_status) {
            (ChangeKind::Added, ChangeKind::Added) => ConflictKind::BothAdded,
            (ChangeKind::Deleted, ChangeKind::Modified) => ConflictKind::DeletedOnBase,
            (ChangeKind::Modified, ChangeKind::Deleted) => ConflictKind::DeletedOnHead,
            (ChangeKind::Modified, ChangeKind::Modified) => ConflictKind::BothModified,
            _ => ConflictKind::NoConflict,
        }
    }

    /// Resolve by reusing the content with the given hash
    pub fn solve_with_oid(&mut self, oid: Oid) {
        self.solved = true;
        self.solved_oid = Some(oid);
        self.solved_content = None;
    }

    /// Resolve by replacing the path with new content
    pub fn solve_with_content(&mut self, content: Blob) {
        self.solved = true;
        self.solved_oid = None;
        self.solved_content = Some(content);
    }

    /// Resolve by deleting the path
    pub fn solve_by_deletion(&mut self) {
        self.solved = true;
        self.solved_oid = None;
        self.solved_content = None;
    }

    /// Resolve to the base side's version (deletion if base deleted)
    pub fn keep_base(&mut self) {
        match self.base_oid {
            Some(oid) => self.solve_with_oid(oid),
            None => self.solve_by_deletion(),
        }
    }

    /// Resolve to the head side's version (deletion if head deleted)
    pub fn keep_head(&mut self) {
        match self.head_oid {
            Some(oid) => self.solve_with_oid(oid),
            None => self.solve_by_deletion(),
        }
    }

    /// Discard any recorded resolution
    pub fn reset_unsolved(&mut self) {
        self.solved = false;
        self.solved_oid = None;
        self.solved_content = None;
    }

    /// Whether the recorded resolution deletes the path
    pub fn resolves_to_deletion(&self) -> bool {
        self.solved && self.solved_oid.is_none() && self.solved_content.is_none()
    }
}

/// Build the minimal conflict set between two trees and their ancestor
///
/// A path conflicts iff both sides changed it relative to the ancestor and
/// the two sides' results differ structurally.
pub fn compare_trees(
    parent: &TreeEntries,
    base: &TreeEntries,
    head: &TreeEntries,
) -> BTreeMap<String, Conflict> {
    let base_diff = diff(parent, base);
    let head_diff = diff(parent, head);

    let mut conflicts = BTreeMap::new();
    for (path, base_entry) in &base_diff {
        let Some(head_entry) = head_diff.get(path) else {
            continue;
        };
        if base_entry == head_entry {
            trace!(path = %path, "identical change on both sides, auto-merge");
            continue;
        }

        let oid_at = |tree: &TreeEntries| tree.get(path).and_then(|entry| entry.oid);
        conflicts.insert(
            path.clone(),
            Conflict::new(oid_at(parent), oid_at(base), oid_at(head)),
        );
    }

    debug!(conflicts = conflicts.len(), "compared trees");
    conflicts
}

/// Per-kind conflict counters for reporting layers
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConflictStats {
    /// Total number of conflicts
    pub total: usize,
    /// Number of BothAdded conflicts
    pub both_added: usize,
    /// Number of DeletedOnBase conflicts
    pub deleted_on_base: usize,
    /// Number of DeletedOnHead conflicts
    pub deleted_on_head: usize,
    /// Number of BothModified conflicts
    pub both_modified: usize,
}

/// How two branch heads relate through their common ancestor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Divergence {
    /// Base and head point at the same commit
    Identical,
    /// Base still sits at the ancestor; head has moved
    Ahead,
    /// Head still sits at the ancestor; base has moved
    Behind,
    /// Both sides have moved past the ancestor
    Diverged,
}

/// Three-way comparison of two branches' working states
///
/// `conflicts` holds only paths genuinely in conflict, never every changed
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConflict {
    /// The branch being merged into
    pub base: WorkingState,

    /// The branch being merged
    pub head: WorkingState,

    /// Their nearest common ancestor (empty when histories share none)
    pub parent: WorkingState,

    /// Minimal conflict set keyed by path
    pub conflicts: BTreeMap<String, Conflict>,
}

impl TreeConflict {
    /// Compare three working states and build the minimal conflict set
    pub fn compare(parent: WorkingState, base: WorkingState, head: WorkingState) -> Self {
        let conflicts = compare_trees(
            &parent.merged_tree_entries(),
            &base.merged_tree_entries(),
            &head.merged_tree_entries(),
        );
        Self {
            base,
            head,
            parent,
            conflicts,
        }
    }

    /// Fetch both sides and their nearest common ancestor, then compare
    ///
    /// When the driver reports no common ancestor the parent side is the
    /// empty working state, so every path present on either side counts as
    /// added.
    #[instrument(skip(driver))]
    pub async fn fetch(driver: &dyn Driver, base_ref: &str, head_ref: &str) -> Result<Self> {
        let base = driver.fetch_working_state(base_ref).await?;
        let head = driver.fetch_working_state(head_ref).await?;
        let parent = match driver.find_parent_commit(base_ref, head_ref).await? {
            Some(ancestor) => driver.fetch_working_state(&ancestor.id.to_hex()).await?,
            None => WorkingState::empty(),
        };

        Ok(Self::compare(parent, base, head))
    }

    /// Overlay caller resolutions, then default the rest to the base side
    ///
    /// Caller entries win per path. Every conflict in the returned value is
    /// solved.
    pub fn solve(mut self, user_solved: BTreeMap<String, Conflict>) -> Self {
        for (path, conflict) in user_solved {
            self.conflicts.insert(path, conflict);
        }
        for conflict in self.conflicts.values_mut() {
            if !conflict.solved {
                conflict.keep_base();
            }
        }
        self
    }

    /// The merged tree implied by both sides' diffs and the resolutions
    ///
    /// Layers, later overriding earlier per path: ancestor entries, base
    /// diff, head diff, resolutions. Paths whose final value is a deletion
    /// are dropped. Non-conflicting edits from either side land untouched;
    /// for conflicting paths the (possibly defaulted) resolution wins.
    pub fn resolved_tree_entries(&self) -> TreeEntries {
        let parent_entries = self.parent.merged_tree_entries();
        let base_entries = self.base.merged_tree_entries();
        let head_entries = self.head.merged_tree_entries();

        let mut layered: BTreeMap<String, Option<TreeEntry>> = parent_entries
            .iter()
            .map(|(path, entry)| (path.clone(), Some(entry.clone())))
            .collect();
        layered.extend(diff(&parent_entries, &base_entries));
        layered.extend(diff(&parent_entries, &head_entries));
        for (path, conflict) in &self.conflicts {
            layered.insert(path.clone(), self.resolved_entry(path, conflict));
        }

        layered
            .into_iter()
            .filter_map(|(path, entry)| entry.map(|entry| (path, entry)))
            .collect()
    }

    /// Assemble a merge commit from the resolved tree
    ///
    /// `blobs` carries the resolutions that supplied new content. A merge is
    /// never `empty`, even with no net tree change: recording the merge
    /// itself matters.
    pub fn merge_commit(
        &self,
        parents: Vec<Oid>,
        author: Signature,
        message: impl Into<String>,
    ) -> CommitBuilder {
        let tree_entries = self.resolved_tree_entries();

        let blobs: BTreeMap<String, Blob> = tree_entries
            .iter()
            .filter(|(_, entry)| entry.oid.is_none())
            .filter_map(|(path, _)| {
                self.conflicts
                    .get(path)
                    .and_then(|conflict| conflict.solved_content.clone())
                    .map(|blob| (path.clone(), blob))
            })
            .collect();

        CommitBuilder {
            committer: author.clone(),
            author,
            message: message.into(),
            parents,
            tree_entries,
            blobs,
            empty: false,
        }
    }

    /// How the two heads relate through the ancestor (informational)
    pub fn status(&self) -> Divergence {
        if self.base.head == self.head.head {
            Divergence::Identical
        } else if self.base.head == self.parent.head {
            Divergence::Ahead
        } else if self.head.head == self.parent.head {
            Divergence::Behind
        } else {
            Divergence::Diverged
        }
    }

    /// Count conflicts by kind
    pub fn conflict_stats(&self) -> ConflictStats {
        let mut stats = ConflictStats {
            total: self.conflicts.len(),
            ..Default::default()
        };
        for conflict in self.conflicts.values() {
            match conflict.kind() {
                ConflictKind::BothAdded => stats.both_added += 1,
                ConflictKind::DeletedOnBase => stats.deleted_on_base += 1,
                ConflictKind::DeletedOnHead => stats.deleted_on_head += 1,
                ConflictKind::BothModified => stats.both_modified += 1,
                ConflictKind::NoConflict => {}
            }
        }
        stats
    }

    fn resolved_entry(&self, path: &str, conflict: &Conflict) -> Option<TreeEntry> {
        if conflict.resolves_to_deletion() {
            return None;
        }
        if let Some(content) = &conflict.solved_content {
            return Some(TreeEntry::from_blob(content));
        }

        let oid = conflict.solved_oid;
        // Prefer the side entries at this path so mode and size survive the
        // resolution when an existing version was kept.
        [&self.base, &self.head, &self.parent]
            .into_iter()
            .filter_map(|side| side.merged_tree_entries().get(path).cloned())
            .find(|entry| entry.oid == oid)
            .or(Some(TreeEntry {
                oid,
                mode: Default::default(),
                size: 0,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileMode;

    fn entry(content: &[u8]) -> TreeEntry {
        TreeEntry::persisted(Oid::hash(content), FileMode::Regular, content.len() as u64)
    }

    fn tree(entries: Vec<(&str, &[u8])>) -> TreeEntries {
        entries
            .into_iter()
            .map(|(path, content)| (path.to_string(), entry(content)))
            .collect()
    }

    fn working(entries: Vec<(&str, &[u8])>, head: &[u8]) -> WorkingState {
        WorkingState::new(Oid::hash(head), tree(entries))
    }

    #[test]
    fn test_kind_matrix() {
        let a = Some(Oid::hash(b"a"));
        let b = Some(Oid::hash(b"b"));
        let p = Some(Oid::hash(b"p"));

        assert_eq!(Conflict::new(None, a, b).kind(), ConflictKind::BothAdded);
        assert_eq!(Conflict::new(p, None, a).kind(), ConflictKind::DeletedOnBase);
        assert_eq!(Conflict::new(p, a, None).kind(), ConflictKind::DeletedOnHead);
        assert_eq!(Conflict::new(p, a, b).kind(), ConflictKind::BothModified);
    }

    #[test]
    fn test_kind_is_total() {
        let p = Some(Oid::hash(b"p"));
        let a = Some(Oid::hash(b"a"));

        // Combinations compare_trees never emits still classify.
        assert_eq!(Conflict::new(p, p, p).kind(), ConflictKind::NoConflict);
        assert_eq!(Conflict::new(p, p, a).kind(), ConflictKind::NoConflict);
        assert_eq!(Conflict::new(p, None, None).kind(), ConflictKind::NoConflict);
    }

    #[test]
    fn test_one_sided_change_is_not_a_conflict() {
        // Scenario A: base adds g, head modifies f; neither path conflicts.
        let parent = tree(vec![("f", b"s1")]);
        let base = tree(vec![("f", b"s1"), ("g", b"s2")]);
        let head = tree(vec![("f", b"s3")]);

        assert!(compare_trees(&parent, &base, &head).is_empty());
    }

    #[test]
    fn test_identical_change_is_not_a_conflict() {
        let parent = tree(vec![("f", b"s1")]);
        let both = tree(vec![("f", b"s2")]);

        assert!(compare_trees(&parent, &both, &both).is_empty());
    }

    #[test]
    fn test_both_modified_conflict() {
        // Scenario B
        let parent = tree(vec![("f", b"s1")]);
        let base = tree(vec![("f", b"s2")]);
        let head = tree(vec![("f", b"s3")]);

        let conflicts = compare_trees(&parent, &base, &head);
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts["f"];
        assert_eq!(conflict.kind(), ConflictKind::BothModified);
        assert_eq!(conflict.base_oid, Some(Oid::hash(b"s2")));
        assert_eq!(conflict.head_oid, Some(Oid::hash(b"s3")));
    }

    #[test]
    fn test_both_added_conflict() {
        // Scenario C
        let parent = tree(vec![]);
        let base = tree(vec![("f", b"sB")]);
        let head = tree(vec![("f", b"sH")]);

        let conflicts = compare_trees(&parent, &base, &head);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts["f"].kind(), ConflictKind::BothAdded);
        assert_eq!(conflicts["f"].parent_oid, None);
    }

    #[test]
    fn test_delete_vs_modify() {
        let parent = tree(vec![("f", b"s1")]);
        let base = tree(vec![]);
        let head = tree(vec![("f", b"s2")]);

        let conflicts = compare_trees(&parent, &base, &head);
        assert_eq!(conflicts["f"].kind(), ConflictKind::DeletedOnBase);

        let conflicts = compare_trees(&parent, &head, &base);
        assert_eq!(conflicts["f"].kind(), ConflictKind::DeletedOnHead);
    }

    #[test]
    fn test_delete_of_unchanged_path_auto_merges() {
        let parent = tree(vec![("f", b"same")]);
        let base = tree(vec![("f", b"same")]);
        let head = tree(vec![]);

        assert!(compare_trees(&parent, &base, &head).is_empty());
    }

    #[test]
    fn test_solve_operations_set_exactly_one_payload() {
        let mut conflict = Conflict::new(
            Some(Oid::hash(b"p")),
            Some(Oid::hash(b"b")),
            Some(Oid::hash(b"h")),
        );

        conflict.solve_with_oid(Oid::hash(b"b"));
        assert!(conflict.solved && conflict.solved_oid.is_some());
        assert!(conflict.solved_content.is_none());

        conflict.solve_with_content(Blob::from_text("merged").unwrap());
        assert!(conflict.solved_oid.is_none() && conflict.solved_content.is_some());

        conflict.solve_by_deletion();
        assert!(conflict.resolves_to_deletion());

        conflict.reset_unsolved();
        assert!(!conflict.solved);
    }

    #[test]
    fn test_keep_base_and_keep_head() {
        let mut conflict = Conflict::new(Some(Oid::hash(b"p")), None, Some(Oid::hash(b"h")));

        conflict.keep_head();
        assert_eq!(conflict.solved_oid, Some(Oid::hash(b"h")));

        conflict.keep_base();
        assert!(conflict.resolves_to_deletion(), "base deleted, so keeping base deletes");
    }

    #[test]
    fn test_solve_defaults_to_base() {
        let tc = TreeConflict::compare(
            working(vec![("f", b"s1")], b"p"),
            working(vec![("f", b"s2")], b"b"),
            working(vec![("f", b"s3")], b"h"),
        );

        let solved = tc.solve(BTreeMap::new());
        let conflict = &solved.conflicts["f"];
        assert!(conflict.solved);
        assert_eq!(conflict.solved_oid, Some(Oid::hash(b"s2")), "defaults to base");
    }

    #[test]
    fn test_solve_user_entry_wins() {
        let tc = TreeConflict::compare(
            working(vec![("f", b"s1")], b"p"),
            working(vec![("f", b"s2")], b"b"),
            working(vec![("f", b"s3")], b"h"),
        );

        let mut user = tc.conflicts["f"].clone();
        user.keep_head();
        let solved = tc.solve(BTreeMap::from([("f".to_string(), user)]));
        assert_eq!(solved.conflicts["f"].solved_oid, Some(Oid::hash(b"s3")));
    }

    #[test]
    fn test_resolved_tree_merges_independent_edits() {
        // Scenario A merged tree: {f: s3, g: s2}
        let tc = TreeConflict::compare(
            working(vec![("f", b"s1")], b"p"),
            working(vec![("f", b"s1"), ("g", b"s2")], b"b"),
            working(vec![("f", b"s3")], b"h"),
        );
        assert!(tc.conflicts.is_empty());

        let resolved = tc.resolved_tree_entries();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["f"].oid, Some(Oid::hash(b"s3")));
        assert_eq!(resolved["g"].oid, Some(Oid::hash(b"s2")));
    }

    #[test]
    fn test_resolution_overrides_both_diffs() {
        let tc = TreeConflict::compare(
            working(vec![("f", b"s1")], b"p"),
            working(vec![("f", b"s2")], b"b"),
            working(vec![("f", b"s3")], b"h"),
        )
        .solve(BTreeMap::new());

        let resolved = tc.resolved_tree_entries();
        assert_eq!(
            resolved["f"].oid,
            Some(Oid::hash(b"s2")),
            "defaulted base resolution beats head's diff"
        );
    }

    #[test]
    fn test_resolution_by_deletion_drops_path() {
        let mut user = BTreeMap::new();
        let tc = TreeConflict::compare(
            working(vec![("f", b"s1")], b"p"),
            working(vec![("f", b"s2")], b"b"),
            working(vec![("f", b"s3")], b"h"),
        );
        let mut conflict = tc.conflicts["f"].clone();
        conflict.solve_by_deletion();
        user.insert("f".to_string(), conflict);

        let resolved = tc.solve(user).resolved_tree_entries();
        assert!(!resolved.contains_key("f"));
    }

    #[test]
    fn test_merge_commit_carries_new_content() {
        let tc = TreeConflict::compare(
            working(vec![], b"p"),
            working(vec![("f", b"sB")], b"b"),
            working(vec![("f", b"sH")], b"h"),
        );
        let mut conflict = tc.conflicts["f"].clone();
        let merged_blob = Blob::from_text("hand merged").unwrap();
        conflict.solve_with_content(merged_blob.clone());

        let solved = tc.solve(BTreeMap::from([("f".to_string(), conflict)]));
        let parents = vec![solved.base.head, solved.head.head];
        let builder = solved.merge_commit(
            parents.clone(),
            Signature::now("Merger", "merge@example.com"),
            "Merge head into base",
        );

        assert!(builder.is_merge());
        assert_eq!(builder.parents, parents);
        assert!(!builder.empty, "a merge is never empty");
        assert_eq!(builder.tree_entries["f"].oid, None);
        assert_eq!(builder.blobs["f"], merged_blob);
    }

    #[test]
    fn test_status() {
        let parent = working(vec![], b"p");
        let base = working(vec![], b"b");
        let head = working(vec![], b"h");

        let status = |p: &WorkingState, b: &WorkingState, h: &WorkingState| {
            TreeConflict::compare(p.clone(), b.clone(), h.clone()).status()
        };

        assert_eq!(status(&parent, &base, &base), Divergence::Identical);
        assert_eq!(status(&parent, &parent, &head), Divergence::Ahead);
        assert_eq!(status(&parent, &base, &parent), Divergence::Behind);
        assert_eq!(status(&parent, &base, &head), Divergence::Diverged);
    }

    #[test]
    fn test_conflict_stats() {
        let tc = TreeConflict::compare(
            working(vec![("m", b"s1"), ("d", b"s1")], b"p"),
            working(vec![("m", b"s2"), ("d", b"s2"), ("a", b"sB")], b"b"),
            working(vec![("m", b"s3"), ("a", b"sH")], b"h"),
        );

        let stats = tc.conflict_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.both_modified, 1);
        assert_eq!(stats.deleted_on_head, 1);
        assert_eq!(stats.both_added, 1);
        assert_eq!(stats.deleted_on_base, 0);
    }
}
