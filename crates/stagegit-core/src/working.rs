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

//! Working state: a fetched tree plus its pending-change overlay
//!
//! A [`WorkingState`] is created clean from a driver tree fetch and is only
//! ever "mutated" by returning a new value with a replaced change map. The
//! merged ("virtual") tree is computed on demand by applying the pending
//! changes on top of the fetched entries; it is the only tree offered to
//! callers for browsing or diffing.

use crate::{Blob, BlobCache, Change, Error, Oid, Result, TreeEntries, TreeEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A branch's fetched tree entries plus its pending changes
///
/// Lifecycle: created clean from a driver fetch (`changes` empty); becomes
/// the basis of a [`CommitBuilder`](crate::CommitBuilder) when flushed;
/// discarded whenever the branch's remote hash advances independently.
///
/// # Examples
///
/// ```
/// use stagegit_core::{Blob, Change, WorkingState};
///
/// let ws = WorkingState::empty()
///     .with_change("notes.md", Change::create(Blob::from_text("hi").unwrap()));
/// assert!(!ws.is_clean());
/// assert!(ws.merged_file_set().contains("notes.md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingState {
    /// Commit hash the tree was fetched at
    pub head: Oid,

    /// Fetched tree entries, sorted by path
    pub tree_entries: TreeEntries,

    /// Pending changes keyed by path, sorted by path
    #[serde(default)]
    pub changes: BTreeMap<String, Change>,
}

impl WorkingState {
    /// Create a clean working state from a fetched tree
    pub fn new(head: Oid, tree_entries: TreeEntries) -> Self {
        Self {
            head,
            tree_entries,
            changes: BTreeMap::new(),
        }
    }

    /// Working state with no backing commit and no entries
    ///
    /// Used when no branch is checked out, and as the ancestor side of a
    /// comparison between branches with no common history.
    pub fn empty() -> Self {
        Self::new(Oid::ZERO, TreeEntries::new())
    }

    /// True iff there are no pending changes
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }

    /// The virtual current tree: fetched entries with pending changes applied
    ///
    /// Removes drop their paths; creates and updates synthesize an entry
    /// whose OID is the change's source hash (`None` for new unpersisted
    /// content) and whose size comes from the staged content, or from an
    /// existing entry with the same hash for copies.
    pub fn merged_tree_entries(&self) -> TreeEntries {
        let mut merged = self.tree_entries.clone();

        for (path, change) in &self.changes {
            if change.is_remove() {
                merged.remove(path);
            } else {
                merged.insert(path.clone(), self.synthesize_entry(change));
            }
        }

        merged
    }

    /// Paths of the virtual current tree
    pub fn merged_file_set(&self) -> BTreeSet<String> {
        self.merged_tree_entries().into_keys().collect()
    }

    /// Resolve the active content hash for a path
    ///
    /// `Ok(None)` means the path resolves to staged content with no backing
    /// object yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the path is removed by a pending
    /// change or absent from both the changes and the fetched tree.
    pub fn find_oid(&self, path: &str) -> Result<Option<Oid>> {
        if let Some(change) = self.changes.get(path) {
            if change.is_remove() {
                return Err(Error::not_found(path));
            }
            return Ok(change.source());
        }

        match self.tree_entries.get(path) {
            Some(entry) => Ok(entry.oid),
            None => Err(Error::not_found(path)),
        }
    }

    /// Store a change for a path, applying the reconciliation rule
    ///
    /// - A remove of a path absent from the fetched tree (it only ever
    ///   existed as a local, unflushed create) drops any pending change for
    ///   that path instead of storing a tombstone.
    /// - A create of a path present in the fetched tree (re-adding something
    ///   that already exists remotely) is stored as an update.
    /// - Anything else replaces the previous change at that path as given.
    ///
    /// Idempotent: applying the same change twice equals applying it once.
    pub fn with_change(&self, path: impl Into<String>, change: Change) -> WorkingState {
        let path = path.into();
        let mut next = self.clone();

        if change.is_remove() && !self.tree_entries.contains_key(&path) {
            trace!(path = %path, "remove of never-fetched path, dropping pending change");
            next.changes.remove(&path);
            return next;
        }

        let change = if change.is_create() && self.tree_entries.contains_key(&path) {
            trace!(path = %path, "create of fetched path, storing as update");
            change.into_update()
        } else {
            change
        };

        next.changes.insert(path, change);
        next
    }

    /// Read a path's content
    ///
    /// Persisted content comes from the shared cache (the caller must have
    /// fetched it); new staged content is read directly off the change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the path does not resolve, or when
    /// its hash is known but the content is not resident in the cache.
    pub fn read(&self, path: &str, cache: &BlobCache) -> Result<Blob> {
        match self.find_oid(path)? {
            Some(oid) => cache
                .get(&oid)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("blob {} for {}", oid.to_hex(), path))),
            None => self
                .changes
                .get(path)
                .and_then(|change| change.content())
                .cloned()
                .ok_or_else(|| Error::not_found(path)),
        }
    }

    /// Content length for a path, without requiring the content to be cached
    ///
    /// Falls back to scanning the fetched entries for a matching hash and
    /// using its recorded size when the blob is not resident.
    pub fn size_of(&self, path: &str, cache: &BlobCache) -> Result<u64> {
        match self.find_oid(path)? {
            Some(oid) => {
                if let Some(blob) = cache.get(&oid) {
                    return Ok(blob.byte_len());
                }
                self.tree_entries
                    .values()
                    .find(|entry| entry.oid == Some(oid))
                    .map(|entry| entry.size)
                    .ok_or_else(|| Error::not_found(format!("size of {}", path)))
            }
            None => self
                .changes
                .get(path)
                .and_then(|change| change.content())
                .map(Blob::byte_len)
                .ok_or_else(|| Error::not_found(path)),
        }
    }

    fn synthesize_entry(&self, change: &Change) -> TreeEntry {
        if let Some(content) = change.content() {
            return TreeEntry::from_blob(content);
        }
        let size = change
            .source()
            .and_then(|source| {
                self.tree_entries
                    .values()
                    .find(|entry| entry.oid == Some(source))
                    .map(|entry| entry.size)
            })
            .unwrap_or(0);
        TreeEntry {
            oid: change.source(),
            mode: Default::default(),
            size,
        }
    }
}

impl Default for WorkingState {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileMode;

    fn fetched(entries: Vec<(&str, &[u8])>) -> WorkingState {
        let tree: TreeEntries = entries
            .into_iter()
            .map(|(path, content)| {
                (
                    path.to_string(),
                    TreeEntry::persisted(Oid::hash(content), FileMode::Regular, content.len() as u64),
                )
            })
            .collect();
        WorkingState::new(Oid::hash(b"head"), tree)
    }

    #[test]
    fn test_clean_after_fetch() {
        let ws = fetched(vec![("README.md", b"hello")]);
        assert!(ws.is_clean());
        assert_eq!(ws.merged_tree_entries(), ws.tree_entries);
    }

    #[test]
    fn test_merged_tree_applies_remove() {
        let ws = fetched(vec![("a.txt", b"a"), ("b.txt", b"b")])
            .with_change("a.txt", Change::remove());

        let merged = ws.merged_tree_entries();
        assert!(!merged.contains_key("a.txt"));
        assert!(merged.contains_key("b.txt"));
    }

    #[test]
    fn test_merged_tree_synthesizes_staged_entry() {
        let blob = Blob::from_text("new content").unwrap();
        let ws = fetched(vec![]).with_change("new.txt", Change::create(blob.clone()));

        let merged = ws.merged_tree_entries();
        let entry = merged.get("new.txt").unwrap();
        assert_eq!(entry.oid, None, "staged content has no backing object");
        assert_eq!(entry.size, blob.byte_len());
    }

    #[test]
    fn test_merged_tree_copy_keeps_source_oid_and_size() {
        let ws = fetched(vec![("orig.txt", b"seven b")]);
        let source = ws.tree_entries["orig.txt"].oid.unwrap();
        let ws = ws.with_change("copy.txt", Change::create_from(source));

        let merged = ws.merged_tree_entries();
        let entry = &merged["copy.txt"];
        assert_eq!(entry.oid, Some(source));
        assert_eq!(entry.size, 7, "size recovered from the matching fetched entry");
    }

    #[test]
    fn test_find_oid() {
        let ws = fetched(vec![("kept.txt", b"kept")]);
        let oid = Oid::hash(b"kept");
        assert_eq!(ws.find_oid("kept.txt").unwrap(), Some(oid));

        let ws = ws
            .with_change("kept.txt", Change::remove())
            .with_change("new.txt", Change::create(Blob::from_text("n").unwrap()));
        assert!(ws.find_oid("kept.txt").is_err(), "removed path is gone");
        assert_eq!(ws.find_oid("new.txt").unwrap(), None);
        assert!(ws.find_oid("absent.txt").is_err());
    }

    #[test]
    fn test_reconcile_remove_of_unflushed_create() {
        let ws = fetched(vec![])
            .with_change("new.txt", Change::create(Blob::from_text("x").unwrap()))
            .with_change("new.txt", Change::remove());

        assert!(ws.is_clean(), "create then delete of a never-fetched file is a no-op");
    }

    #[test]
    fn test_reconcile_create_of_fetched_path_becomes_update() {
        let ws = fetched(vec![("README.md", b"old")])
            .with_change("README.md", Change::create(Blob::from_text("new").unwrap()));

        assert!(matches!(
            ws.changes.get("README.md"),
            Some(Change::Update { .. })
        ));
    }

    #[test]
    fn test_with_change_idempotent() {
        let change = Change::update(Blob::from_text("v2").unwrap());
        let base = fetched(vec![("f.txt", b"v1")]);

        let once = base.with_change("f.txt", change.clone());
        let twice = once.with_change("f.txt", change);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_of_fetched_path_is_tombstoned() {
        let ws = fetched(vec![("f.txt", b"v1")]).with_change("f.txt", Change::remove());
        assert!(!ws.is_clean());
        assert!(ws.changes.get("f.txt").unwrap().is_remove());
    }

    #[test]
    fn test_read_staged_content() {
        let blob = Blob::from_text("staged").unwrap();
        let ws = fetched(vec![]).with_change("s.txt", Change::create(blob.clone()));
        assert_eq!(ws.read("s.txt", &BlobCache::new()).unwrap(), blob);
    }

    #[test]
    fn test_read_persisted_content_through_cache() {
        let ws = fetched(vec![("f.txt", b"fetched")]);
        let mut cache = BlobCache::new();

        assert!(ws.read("f.txt", &cache).is_err(), "content not resident yet");

        cache.insert(Blob::from_bytes(b"fetched".to_vec()).unwrap());
        assert_eq!(ws.read("f.txt", &cache).unwrap().as_bytes(), b"fetched");
    }

    #[test]
    fn test_size_without_cached_content() {
        let ws = fetched(vec![("f.txt", b"seven b")]);
        let size = ws.size_of("f.txt", &BlobCache::new()).unwrap();
        assert_eq!(size, 7, "size comes from the recorded entry, not the content");
    }

    #[test]
    fn test_size_of_staged_content() {
        let ws = fetched(vec![]).with_change(
            "s.txt",
            Change::create(Blob::from_text("12345").unwrap()),
        );
        assert_eq!(ws.size_of("s.txt", &BlobCache::new()).unwrap(), 5);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ws = fetched(vec![("a.txt", b"a")])
            .with_change("b.txt", Change::create(Blob::from_text("b").unwrap()))
            .with_change("a.txt", Change::remove());

        let json = serde_json::to_string(&ws).unwrap();
        let back: WorkingState = serde_json::from_str(&json).unwrap();
        assert_eq!(ws, back);
    }
}
