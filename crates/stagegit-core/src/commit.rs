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

//! Commits and commit assembly
//!
//! [`Commit`] is what a driver returns for created or fetched history.
//! [`CommitBuilder`] is the engine-side assembly of a commit: the final tree
//! entries, the new blobs to create, and the parent hashes, ready to hand to
//! a driver's `flush_commit`.

use crate::{Blob, Oid, RepositoryState, TreeEntries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Author or committer information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Name of the author or committer
    pub name: String,

    /// Email address
    pub email: String,

    /// Timestamp of the signature
    pub timestamp: DateTime<Utc>,
}

impl Signature {
    /// Create a new signature
    pub fn new(name: impl Into<String>, email: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
        }
    }

    /// Create a signature with the current timestamp
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name, email, Utc::now())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// What a commit did to one path, relative to its primary parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchStatus {
    /// Path did not exist in the primary parent
    Added,
    /// Path existed with different content
    Modified,
    /// Path no longer exists
    Removed,
}

/// One path touched by a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    /// Path of the touched file
    pub path: String,

    /// How the commit changed it
    pub status: PatchStatus,
}

/// A commit object as reported by a driver
///
/// `patches` is populated by `fetch_commit` and left empty by
/// `list_commits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit hash
    pub id: Oid,

    /// Parent commit hashes; two or more for a merge
    pub parents: Vec<Oid>,

    /// Author information
    pub author: Signature,

    /// Committer information
    pub committer: Signature,

    /// Commit message
    pub message: String,

    /// Paths touched relative to the primary parent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<FilePatch>,
}

impl Commit {
    /// Check if this is a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// The primary parent, if any
    pub fn first_parent(&self) -> Option<&Oid> {
        self.parents.first()
    }

    /// First line of the message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// The same commit without its file patches
    pub fn without_patches(mut self) -> Self {
        self.patches.clear();
        self
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.summary())
    }
}

/// An assembled commit, ready to hand to a driver
///
/// `blobs` holds exactly the entries of `tree_entries` whose OID is `None`:
/// the staged content the driver must persist before it can write the tree.
/// `empty` records whether the commit changes nothing relative to its
/// primary parent; the flush path uses it to skip vacuous single-parent
/// commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitBuilder {
    /// Committer information
    pub committer: Signature,

    /// Author information
    pub author: Signature,

    /// Commit message
    pub message: String,

    /// Parent commit hashes; two or more make a merge commit
    pub parents: Vec<Oid>,

    /// Final tree entries of the commit
    pub tree_entries: TreeEntries,

    /// Staged content to persist, keyed by path
    pub blobs: BTreeMap<String, Blob>,

    /// Whether the commit changes nothing relative to its primary parent
    pub empty: bool,
}

impl CommitBuilder {
    /// Assemble a commit from the current working state
    ///
    /// The tree is the working state's merged tree; the blobs are the
    /// pending changes that carry new content (changes with a source hash
    /// reference content the backend already has).
    pub fn prepare(
        state: &RepositoryState,
        author: Signature,
        message: impl Into<String>,
    ) -> CommitBuilder {
        let working = state.current_state();

        let blobs: BTreeMap<String, Blob> = working
            .changes
            .iter()
            .filter(|(_, change)| change.source().is_none())
            .filter_map(|(path, change)| {
                change.content().map(|blob| (path.clone(), blob.clone()))
            })
            .collect();

        CommitBuilder {
            committer: author.clone(),
            author,
            message: message.into(),
            parents: vec![working.head],
            tree_entries: working.merged_tree_entries(),
            blobs,
            empty: working.is_clean(),
        }
    }

    /// Check if this builder describes a merge commit
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}
