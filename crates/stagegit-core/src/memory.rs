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

//! In-memory driver: the reference backend and test double
//!
//! Keeps branches, commits, trees and blobs in a process-local store behind
//! a `tokio::sync::RwLock`. Implements the full required [`Driver`] subset
//! with real compare-and-swap semantics on `forward_branch`, so concurrency
//! tests exercise the same failure mode a remote backend produces.
//!
//! Seeding helpers (`seed_branch`, `commit_files`) populate history without
//! going through the engine, and a driver-call counter supports asserting
//! that an operation performed zero I/O.

use crate::{
    compare_trees, config::DEFAULT_COMMIT_LIMIT, diff, validate_branch_name, Blob, Branch, Commit,
    CommitBuilder, Driver, Error, FileMode, FilePatch, ListCommitsOptions, MergeOptions, Oid,
    PatchStatus, Result, Signature, TreeEntries, TreeEntry, WorkingState,
};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CommitRecord {
    commit: Commit,
    tree: TreeEntries,
}

#[derive(Debug, Default)]
struct Store {
    branches: BTreeMap<String, Branch>,
    commits: HashMap<Oid, CommitRecord>,
    blobs: HashMap<Oid, Blob>,
}

impl Store {
    fn resolve(&self, refspec: &str) -> Result<Oid> {
        if let Some(branch) = self.branches.get(refspec) {
            return Ok(branch.target);
        }
        if refspec.len() == 64 {
            if let Ok(oid) = Oid::from_hex(refspec) {
                return Ok(oid);
            }
        }
        Err(Error::ref_not_found(refspec))
    }

    fn record(&self, oid: Oid) -> Result<&CommitRecord> {
        self.commits
            .get(&oid)
            .ok_or_else(|| Error::not_found(format!("commit {}", oid.to_hex())))
    }

    /// Walk parents breadth-first from `from`, yielding every reachable
    /// commit hash including `from` itself.
    fn ancestors(&self, from: Oid) -> Vec<Oid> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        let mut ordered = Vec::new();

        while let Some(oid) = queue.pop_front() {
            if !seen.insert(oid) {
                continue;
            }
            ordered.push(oid);
            if let Some(record) = self.commits.get(&oid) {
                queue.extend(record.commit.parents.iter().copied());
            }
        }
        ordered
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> bool {
        self.ancestors(descendant).contains(&ancestor)
    }

    fn nearest_common_ancestor(&self, a: Oid, b: Oid) -> Option<Oid> {
        let reachable: HashSet<Oid> = self.ancestors(a).into_iter().collect();
        self.ancestors(b).into_iter().find(|oid| reachable.contains(oid))
    }

    fn insert_commit(
        &mut self,
        tree: TreeEntries,
        parents: Vec<Oid>,
        author: Signature,
        committer: Signature,
        message: String,
    ) -> Result<Commit> {
        let parent_tree = parents
            .first()
            .and_then(|parent| self.commits.get(parent))
            .map(|record| record.tree.clone())
            .unwrap_or_default();
        let patches = patches_between(&parent_tree, &tree);

        let id = commit_id(&tree, &parents, &author, &committer, &message)?;
        let commit = Commit {
            id,
            parents,
            author,
            committer,
            message,
            patches,
        };
        self.commits.insert(
            id,
            CommitRecord {
                commit: commit.clone(),
                tree,
            },
        );
        Ok(commit)
    }
}

fn patches_between(parent: &TreeEntries, child: &TreeEntries) -> Vec<FilePatch> {
    diff(parent, child)
        .into_iter()
        .map(|(path, entry)| {
            let status = match (parent.contains_key(&path), entry.is_some()) {
                (_, false) => PatchStatus::Removed,
                (true, true) => PatchStatus::Modified,
                (false, true) => PatchStatus::Added,
            };
            FilePatch { path, status }
        })
        .collect()
}

fn commit_id(
    tree: &TreeEntries,
    parents: &[Oid],
    author: &Signature,
    committer: &Signature,
    message: &str,
) -> Result<Oid> {
    #[derive(Serialize)]
    struct Raw<'a> {
        tree: &'a TreeEntries,
        parents: &'a [Oid],
        author: &'a Signature,
        committer: &'a Signature,
        message: &'a str,
    }

    let encoded = serde_json::to_vec(&Raw {
        tree,
        parents,
        author,
        committer,
        message,
    })
    .map_err(|e| Error::Other(e.into()))?;
    Ok(Oid::hash(&encoded))
}

/// In-memory [`Driver`] implementation
///
/// Thread-safe and cheaply cloneable; clones share the same store, so a
/// test can seed through one handle and drive the engine through another.
#[derive(Clone, Default)]
pub struct MemoryDriver {
    store: Arc<RwLock<Store>>,
    calls: Arc<AtomicUsize>,
}

impl MemoryDriver {
    /// Create an empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`Driver`] trait calls served so far
    ///
    /// Seeding helpers do not count; this measures engine-driven I/O.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Create a branch with a root commit holding the given text files
    pub async fn seed_branch(&self, name: &str, files: &[(&str, &str)]) -> Result<Branch> {
        validate_branch_name(name)?;
        let mut store = self.store.write().await;
        if store.branches.contains_key(name) {
            return Err(Error::already_exists(name));
        }

        let mut tree = TreeEntries::new();
        for (path, content) in files {
            let blob = Blob::from_text(content)?;
            let oid = blob.oid();
            let entry = TreeEntry::persisted(oid, FileMode::Regular, blob.byte_len());
            store.blobs.insert(oid, blob);
            tree.insert((*path).to_string(), entry);
        }

        let signature = seed_signature();
        let commit = store.insert_commit(
            tree,
            Vec::new(),
            signature.clone(),
            signature,
            format!("Seed {}", name),
        )?;

        let branch = Branch::local(name, commit.id);
        store.branches.insert(name.to_string(), branch.clone());
        debug!(branch = %name, commit = %commit.id, "seeded branch");
        Ok(branch)
    }

    /// Advance a branch with a commit updating and removing the given files
    pub async fn commit_files(
        &self,
        branch: &str,
        files: &[(&str, &str)],
        removes: &[&str],
        message: &str,
    ) -> Result<Commit> {
        let mut store = self.store.write().await;
        let tip = store
            .branches
            .get(branch)
            .ok_or_else(|| Error::ref_not_found(branch))?
            .target;

        let mut tree = store.record(tip)?.tree.clone();
        for path in removes {
            tree.remove(*path);
        }
        for (path, content) in files {
            let blob = Blob::from_text(content)?;
            let oid = blob.oid();
            let entry = TreeEntry::persisted(oid, FileMode::Regular, blob.byte_len());
            store.blobs.insert(oid, blob);
            tree.insert((*path).to_string(), entry);
        }

        let signature = seed_signature();
        let commit = store.insert_commit(tree, vec![tip], signature.clone(), signature, message.to_string())?;
        if let Some(known) = store.branches.get_mut(branch) {
            known.target = commit.id;
        }
        Ok(commit)
    }
}

fn seed_signature() -> Signature {
    Signature::now("StageGit Seeder", "seed@stagegit.dev")
}

impl fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDriver").finish()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn fetch_blob(&self, oid: Oid) -> Result<Blob> {
        self.tick();
        let store = self.store.read().await;
        store
            .blobs
            .get(&oid)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("blob {}", oid.to_hex())))
    }

    async fn fetch_working_state(&self, refspec: &str) -> Result<WorkingState> {
        self.tick();
        let store = self.store.read().await;
        let oid = store.resolve(refspec)?;
        let record = store.record(oid)?;
        Ok(WorkingState::new(record.commit.id, record.tree.clone()))
    }

    async fn fetch_branches(&self) -> Result<Vec<Branch>> {
        self.tick();
        let store = self.store.read().await;
        Ok(store.branches.values().cloned().collect())
    }

    async fn flush_commit(&self, builder: &CommitBuilder) -> Result<Commit> {
        self.tick();
        let mut store = self.store.write().await;

        let mut tree = builder.tree_entries.clone();
        for (path, blob) in &builder.blobs {
            let entry = tree.get_mut(path).ok_or_else(|| {
                Error::invalid_argument(format!("blob for {} has no tree entry", path))
            })?;
            let oid = blob.oid();
            entry.oid = Some(oid);
            entry.size = blob.byte_len();
            store.blobs.insert(oid, blob.clone());
        }
        if let Some((path, _)) = tree.iter().find(|(_, entry)| entry.oid.is_none()) {
            return Err(Error::invalid_argument(format!(
                "staged entry for {} has no content",
                path
            )));
        }

        let parents: Vec<Oid> = builder
            .parents
            .iter()
            .copied()
            .filter(|parent| !parent.is_zero())
            .collect();

        store.insert_commit(
            tree,
            parents,
            builder.author.clone(),
            builder.committer.clone(),
            builder.message.clone(),
        )
    }

    async fn find_parent_commit(&self, ref_a: &str, ref_b: &str) -> Result<Option<Commit>> {
        self.tick();
        let store = self.store.read().await;
        let a = store.resolve(ref_a)?;
        let b = store.resolve(ref_b)?;

        match store.nearest_common_ancestor(a, b) {
            Some(oid) => Ok(Some(store.record(oid)?.commit.clone().without_patches())),
            None => Ok(None),
        }
    }

    async fn list_commits(&self, options: &ListCommitsOptions) -> Result<Vec<Commit>> {
        self.tick();
        let store = self.store.read().await;
        let limit = options.limit.unwrap_or(DEFAULT_COMMIT_LIMIT);

        let mut commits = Vec::new();
        let mut cursor = Some(store.resolve(&options.refspec)?);
        while let Some(oid) = cursor {
            if commits.len() >= limit {
                break;
            }
            let record = store.record(oid)?;
            cursor = record.commit.first_parent().copied();

            if let Some(author) = &options.author {
                let matches = record.commit.author.name.contains(author.as_str())
                    || record.commit.author.email.contains(author.as_str());
                if !matches {
                    continue;
                }
            }
            if let Some(path) = &options.path {
                let touches = record
                    .commit
                    .patches
                    .iter()
                    .any(|patch| patch.path == *path);
                if !touches {
                    continue;
                }
            }
            commits.push(record.commit.clone().without_patches());
        }
        Ok(commits)
    }

    async fn fetch_commit(&self, oid: Oid) -> Result<Commit> {
        self.tick();
        let store = self.store.read().await;
        Ok(store.record(oid)?.commit.clone())
    }

    async fn forward_branch(&self, branch: &Branch, oid: Oid) -> Result<()> {
        self.tick();
        let mut store = self.store.write().await;
        let full_name = branch.full_name();

        let current = store
            .branches
            .get(&full_name)
            .ok_or_else(|| Error::ref_not_found(full_name.as_str()))?
            .target;
        let commit = store.record(oid)?.commit.clone();

        if current != oid && !store.is_ancestor(current, oid) {
            debug!(branch = %full_name, "ref moved, rejecting forward");
            return Err(Error::NotFastForward {
                branch: full_name,
                commit: Some(Box::new(commit)),
            });
        }

        if let Some(known) = store.branches.get_mut(&full_name) {
            known.target = oid;
        }
        Ok(())
    }

    async fn create_branch(&self, base_ref: &str, name: &str) -> Result<Branch> {
        self.tick();
        validate_branch_name(name)?;
        let mut store = self.store.write().await;
        if store.branches.contains_key(name) {
            return Err(Error::already_exists(name));
        }

        let target = store.resolve(base_ref)?;
        store.record(target)?;

        let branch = Branch::local(name, target);
        store.branches.insert(name.to_string(), branch.clone());
        Ok(branch)
    }

    async fn delete_branch(&self, branch: &Branch) -> Result<()> {
        self.tick();
        let mut store = self.store.write().await;
        store
            .branches
            .remove(&branch.full_name())
            .map(|_| ())
            .ok_or_else(|| Error::ref_not_found(branch.full_name()))
    }

    async fn merge(
        &self,
        from_ref: &str,
        into_ref: &str,
        options: &MergeOptions,
    ) -> Result<Option<Commit>> {
        self.tick();
        let mut store = self.store.write().await;
        let from_tip = store.resolve(from_ref)?;
        let into_tip = store.resolve(into_ref)?;
        if !store.branches.contains_key(into_ref) {
            return Err(Error::invalid_argument(format!(
                "merge target must be a branch: {}",
                into_ref
            )));
        }

        if from_tip == into_tip || store.is_ancestor(from_tip, into_tip) {
            return Ok(None);
        }

        if store.is_ancestor(into_tip, from_tip) {
            let commit = store.record(from_tip)?.commit.clone();
            if let Some(known) = store.branches.get_mut(into_ref) {
                known.target = from_tip;
            }
            debug!(from = %from_ref, into = %into_ref, "fast-forward merge");
            return Ok(Some(commit));
        }

        let ancestor_tree = store
            .nearest_common_ancestor(from_tip, into_tip)
            .and_then(|oid| store.commits.get(&oid))
            .map(|record| record.tree.clone())
            .unwrap_or_default();
        let into_tree = store.record(into_tip)?.tree.clone();
        let from_tree = store.record(from_tip)?.tree.clone();

        let conflicts = compare_trees(&ancestor_tree, &into_tree, &from_tree);
        if !conflicts.is_empty() {
            return Err(Error::conflict(format!(
                "{} conflicting paths merging {} into {}",
                conflicts.len(),
                from_ref,
                into_ref
            )));
        }

        let mut merged = into_tree;
        for (path, entry) in diff(&ancestor_tree, &from_tree) {
            match entry {
                Some(entry) => {
                    merged.insert(path, entry);
                }
                None => {
                    merged.remove(&path);
                }
            }
        }

        let message = options
            .message
            .clone()
            .unwrap_or_else(|| format!("Merge {} into {}", from_ref, into_ref));
        let signature = seed_signature();
        let commit = store.insert_commit(
            merged,
            vec![into_tip, from_tip],
            signature.clone(),
            signature,
            message,
        )?;
        if let Some(known) = store.branches.get_mut(into_ref) {
            known.target = commit.id;
        }
        Ok(Some(commit))
    }
}
