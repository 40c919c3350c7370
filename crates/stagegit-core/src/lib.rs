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

//! Working-copy engine for remote-backed repositories
//!
//! This crate implements an in-memory model of a Git-style repository that
//! a consumer application embeds to:
//! - stage local edits against a remote-backed branch through a
//!   pending-change overlay
//! - detect conflicts between two diverged branches against their nearest
//!   common ancestor, with a minimal conflict set
//! - resolve those conflicts and assemble a single commit (ordinary or
//!   merge) for a backend
//!
//! # Architecture
//!
//! - **Immutable snapshots**: [`RepositoryState`] and [`WorkingState`] are
//!   values; every mutation returns a new snapshot, old ones stay readable
//! - **Content addressing**: blobs are identified by SHA-256 [`Oid`]s and
//!   memoized in an append-only [`BlobCache`]
//! - **Pluggable backends**: all I/O goes through the async [`Driver`]
//!   trait; [`MemoryDriver`] ships as the in-process reference backend
//! - **Optimistic concurrency**: `forward_branch` is a compare-and-swap;
//!   a lost race surfaces as `NotFastForward` carrying the created commit
//!
//! # Examples
//!
//! ```
//! use stagegit_core::{
//!     Blob, Change, CommitBuilder, EngineConfig, MemoryDriver, RepositoryState, Signature,
//! };
//!
//! #[tokio::main]
//! async fn main() -> stagegit_core::Result<()> {
//!     let driver = MemoryDriver::new();
//!     driver.seed_branch("main", &[("README.md", "# Hello\n")]).await?;
//!
//!     // Fetch the repository and stage an edit.
//!     let state = RepositoryState::initialize(&driver, &EngineConfig::default()).await?;
//!     let working = state
//!         .current_state()
//!         .with_change("notes.md", Change::create(Blob::from_text("notes\n")?));
//!     let state = state.with_working_state("main", Some(working));
//!
//!     // Assemble and flush a commit, then the branch tree is refetched.
//!     let builder = CommitBuilder::prepare(
//!         &state,
//!         Signature::now("Alice", "alice@example.com"),
//!         "Add notes",
//!     );
//!     let state = state.flush(&driver, &builder, None, true).await?;
//!     assert!(state.current_state().is_clean());
//!     Ok(())
//! }
//! ```

mod blob;
mod branch;
mod cache;
mod change;
mod commit;
pub mod config;
mod conflict;
mod diff;
mod driver;
mod error;
mod memory;
mod oid;
mod repo;
mod tree;
mod working;

pub use blob::Blob;
pub use branch::{validate_branch_name, Branch};
pub use cache::BlobCache;
pub use change::Change;
pub use commit::{Commit, CommitBuilder, FilePatch, PatchStatus, Signature};
pub use config::EngineConfig;
pub use conflict::{
    compare_trees, Conflict, ConflictKind, ConflictStats, Divergence, TreeConflict,
};
pub use diff::{diff, ChangeKind};
pub use driver::{Driver, ListCommitsOptions, MergeOptions, Remote};
pub use error::{Error, Result};
pub use memory::MemoryDriver;
pub use oid::Oid;
pub use repo::RepositoryState;
pub use tree::{FileMode, TreeEntries, TreeEntry};
pub use working::WorkingState;

#[cfg(test)]
mod tests {
    #[test]
    fn engine_compiles() {
        // Foundation test
    }
}
