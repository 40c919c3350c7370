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

//! Driver boundary: the backend abstraction the engine performs I/O through
//!
//! A driver supplies raw blob/tree/branch/commit I/O against some backend: a
//! remote API, a local checkout, or the in-memory store in
//! [`MemoryDriver`](crate::MemoryDriver). The engine depends only on this
//! trait.
//!
//! The trait has a required subset (fetch/flush/branch operations) and an
//! explicitly optional subset of remote-sync operations whose default
//! implementations return [`Error::Unsupported`](crate::Error::Unsupported)
//! instead of pretending the capability exists.

use crate::{Blob, Branch, Commit, CommitBuilder, Oid, Result, WorkingState};
use async_trait::async_trait;
use std::fmt::Debug;

/// Filters for commit listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCommitsOptions {
    /// Branch full name or commit hash to walk from
    pub refspec: String,

    /// Only commits touching this path
    pub path: Option<String>,

    /// Only commits whose author name or email contains this string
    pub author: Option<String>,

    /// Maximum number of commits; driver default when `None`
    pub limit: Option<usize>,
}

impl ListCommitsOptions {
    /// List commits reachable from a refspec with no filters
    pub fn for_ref(refspec: impl Into<String>) -> Self {
        Self {
            refspec: refspec.into(),
            ..Default::default()
        }
    }
}

/// Options for a backend-side merge attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Merge commit message; driver default when `None`
    pub message: Option<String>,
}

/// A configured remote on a driver's backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Remote name (e.g. "origin")
    pub name: String,

    /// Remote URL
    pub url: String,
}

/// Backend abstraction for all engine I/O
///
/// All operations are async; implementations must be `Send + Sync` so a
/// driver can be shared across tasks. The engine never retries: transient
/// failure handling is the driver's concern.
///
/// # Consistency requirements
///
/// - `fetch_working_state` returns a *clean* state (no pending changes).
/// - `forward_branch` is a compare-and-swap against the branch's current
///   hash. Concurrent committers are detected here and nowhere else; a lost
///   race surfaces as [`Error::NotFastForward`](crate::Error::NotFastForward)
///   carrying the already-created commit when one exists.
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Fetch blob content by hash
    async fn fetch_blob(&self, oid: Oid) -> Result<Blob>;

    /// Fetch a clean working state for a branch full name or commit hash
    async fn fetch_working_state(&self, refspec: &str) -> Result<WorkingState>;

    /// Fetch the current branch list
    async fn fetch_branches(&self) -> Result<Vec<Branch>>;

    /// Persist an assembled commit and its staged blobs
    ///
    /// Creates the commit object without moving any ref.
    async fn flush_commit(&self, builder: &CommitBuilder) -> Result<Commit>;

    /// Nearest common ancestor of two refs, if their histories meet
    async fn find_parent_commit(&self, ref_a: &str, ref_b: &str) -> Result<Option<Commit>>;

    /// List commits reachable from a ref, without file patches
    async fn list_commits(&self, options: &ListCommitsOptions) -> Result<Vec<Commit>>;

    /// Fetch a single commit, with file patches
    async fn fetch_commit(&self, oid: Oid) -> Result<Commit>;

    /// Compare-and-swap the branch ref to the given commit
    async fn forward_branch(&self, branch: &Branch, oid: Oid) -> Result<()>;

    /// Create a branch at the commit a ref resolves to
    async fn create_branch(&self, base_ref: &str, name: &str) -> Result<Branch>;

    /// Delete a branch ref
    async fn delete_branch(&self, branch: &Branch) -> Result<()>;

    /// Backend-side automatic merge attempt
    ///
    /// `Ok(None)` means already up to date;
    /// [`Error::Conflict`](crate::Error::Conflict) means the backend could
    /// not merge and the caller should run the engine's three-way flow.
    async fn merge(
        &self,
        from_ref: &str,
        into_ref: &str,
        options: &MergeOptions,
    ) -> Result<Option<Commit>>;

    // --- Optional remote-sync subset -------------------------------------

    /// Check out a ref in a backing local working tree
    async fn checkout(&self, _refspec: &str) -> Result<()> {
        Err(crate::Error::Unsupported("checkout"))
    }

    /// List configured remotes
    async fn list_remotes(&self) -> Result<Vec<Remote>> {
        Err(crate::Error::Unsupported("list_remotes"))
    }

    /// Add or update a remote
    async fn edit_remote(&self, _name: &str, _url: &str) -> Result<()> {
        Err(crate::Error::Unsupported("edit_remote"))
    }

    /// Pull a ref from its remote
    async fn pull(&self, _refspec: &str) -> Result<()> {
        Err(crate::Error::Unsupported("pull"))
    }

    /// Push a ref to its remote
    async fn push(&self, _refspec: &str) -> Result<()> {
        Err(crate::Error::Unsupported("push"))
    }

    /// Paths modified in a backing local working tree
    async fn status(&self) -> Result<Vec<String>> {
        Err(crate::Error::Unsupported("status"))
    }

    /// Set the upstream tracking branch for a local branch
    async fn track(&self, _branch: &str, _remote: &str) -> Result<()> {
        Err(crate::Error::Unsupported("track"))
    }
}
