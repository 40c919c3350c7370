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

//! Repository state: branch list, fetched working states, blob cache
//!
//! [`RepositoryState`] is an immutable snapshot. Every mutating operation is
//! a pure function returning a new snapshot, so old snapshots stay valid and
//! readable and can be compared for staleness. Structural invariants:
//!
//! - every fetched working state belongs to a branch in the branch list
//! - the current branch, if set, is always fetched
//! - a working state is never silently kept pointing at the wrong tree:
//!   branch-list replacement invalidates states for branches that vanished
//!   or whose target moved

use crate::{
    validate_branch_name, BlobCache, Branch, Commit, CommitBuilder, Driver, EngineConfig, Error,
    Oid, Result, WorkingState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Aggregate snapshot of everything fetched and staged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryState {
    /// Full name of the checked-out branch
    pub current_branch: Option<String>,

    /// Fetched working states keyed by branch full name
    #[serde(default)]
    pub working_states: BTreeMap<String, WorkingState>,

    /// Known branches
    #[serde(default)]
    pub branches: Vec<Branch>,

    /// Content-addressed blob cache shared across branches
    #[serde(default)]
    pub cache: BlobCache,
}

impl RepositoryState {
    /// Create an empty repository state
    pub fn new() -> Self {
        Self::default()
    }

    /// The current branch's working state, or an empty one if none is set
    pub fn current_state(&self) -> WorkingState {
        self.current_branch
            .as_ref()
            .and_then(|name| self.working_states.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Find a branch by its full name
    pub fn branch(&self, full_name: &str) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|branch| branch.full_name() == full_name)
    }

    /// Find a branch by full name, falling back to the bare name
    pub fn find_branch(&self, name_or_full: &str) -> Option<&Branch> {
        self.branch(name_or_full)
            .or_else(|| self.branches.iter().find(|branch| branch.name == name_or_full))
    }

    /// Replace the branch list (no invalidation; see `fetch_branches`)
    pub fn with_branches(mut self, branches: Vec<Branch>) -> Self {
        self.branches = branches;
        self
    }

    /// Set or delete a branch's working state
    ///
    /// Deleting expresses "this branch's cached tree is stale, refetch
    /// before the next checkout". Deleting the current branch's state also
    /// clears the checkout so the current branch stays fetched by invariant.
    pub fn with_working_state(
        mut self,
        full_name: &str,
        working_state: Option<WorkingState>,
    ) -> Self {
        match working_state {
            Some(state) => {
                debug_assert!(
                    self.branch(full_name).is_some(),
                    "working state for unknown branch {}",
                    full_name
                );
                self.working_states.insert(full_name.to_string(), state);
            }
            None => {
                self.working_states.remove(full_name);
                if self.current_branch.as_deref() == Some(full_name) {
                    self.current_branch = None;
                }
            }
        }
        self
    }

    /// Switch the checkout to an already-fetched branch (no I/O)
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefNotFound`] when the target branch's tree has not
    /// been fetched.
    pub fn checkout(mut self, name_or_full: &str) -> Result<Self> {
        let full_name = if self.working_states.contains_key(name_or_full) {
            name_or_full.to_string()
        } else {
            let candidate = self
                .find_branch(name_or_full)
                .map(|branch| branch.full_name())
                .ok_or_else(|| Error::ref_not_found(name_or_full))?;
            if !self.working_states.contains_key(&candidate) {
                return Err(Error::ref_not_found(format!(
                    "{} has no fetched tree",
                    name_or_full
                )));
            }
            candidate
        };

        debug!(branch = %full_name, "checked out");
        self.current_branch = Some(full_name);
        Ok(self)
    }

    /// Refresh the branch list from the driver, invalidating stale trees
    ///
    /// Every previously known branch that disappeared or whose target moved
    /// loses its working state.
    #[instrument(skip(self, driver))]
    pub async fn fetch_branches(&self, driver: &dyn Driver) -> Result<Self> {
        let branches = driver.fetch_branches().await?;

        let mut next = self.clone();
        let targets: BTreeMap<String, Oid> = branches
            .iter()
            .map(|branch| (branch.full_name(), branch.target))
            .collect();

        for old in &self.branches {
            let full_name = old.full_name();
            let stale = match targets.get(&full_name) {
                Some(target) => *target != old.target,
                None => true,
            };
            if stale && next.working_states.contains_key(&full_name) {
                warn!(branch = %full_name, "branch moved or vanished, invalidating tree");
                next = next.with_working_state(&full_name, None);
            }
        }

        next.branches = branches;
        Ok(next)
    }

    /// Fetch a fresh, clean working state for a branch and store it
    ///
    /// Always resets: pending changes for that branch are discarded.
    #[instrument(skip_all, fields(branch = %branch.full_name()))]
    pub async fn fetch_tree(&self, driver: &dyn Driver, branch: &Branch) -> Result<Self> {
        let full_name = branch.full_name();
        let working_state = driver.fetch_working_state(&full_name).await?;

        let mut next = self.clone();
        next.working_states.insert(full_name, working_state);
        Ok(next)
    }

    /// Bootstrap a state from a driver
    ///
    /// Fetches branches, picks the first configured preferred branch present
    /// (else the first branch), fetches its tree and checks it out.
    #[instrument(skip(driver, config))]
    pub async fn initialize(driver: &dyn Driver, config: &EngineConfig) -> Result<Self> {
        let state = RepositoryState::new().fetch_branches(driver).await?;

        let chosen = config
            .preferred_branches
            .iter()
            .find_map(|name| state.find_branch(name))
            .or_else(|| state.branches.first())
            .ok_or_else(|| Error::ref_not_found("no branches on backend"))?
            .clone();

        info!(branch = %chosen.full_name(), "initialized");
        let state = state.fetch_tree(driver, &chosen).await?;
        state.checkout(&chosen.full_name())
    }

    /// Create a branch on the backend and record it
    pub async fn create_branch(
        &self,
        driver: &dyn Driver,
        base_ref: &str,
        name: &str,
    ) -> Result<Self> {
        validate_branch_name(name)?;
        if self.find_branch(name).is_some() {
            return Err(Error::already_exists(name));
        }

        let branch = driver.create_branch(base_ref, name).await?;
        info!(branch = %branch.full_name(), "branch created");

        let mut next = self.clone();
        next.branches.push(branch);
        Ok(next)
    }

    /// Delete a branch on the backend and drop its local bookkeeping
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for the current branch.
    pub async fn delete_branch(&self, driver: &dyn Driver, branch: &Branch) -> Result<Self> {
        let full_name = branch.full_name();
        if self.current_branch.as_deref() == Some(full_name.as_str()) {
            return Err(Error::invalid_argument(format!(
                "cannot delete the current branch: {}",
                full_name
            )));
        }

        driver.delete_branch(branch).await?;
        info!(branch = %full_name, "branch deleted");

        let mut next = self.clone();
        next.branches.retain(|known| known.full_name() != full_name);
        next.working_states.remove(&full_name);
        Ok(next)
    }

    /// Flush an assembled commit and advance the branch ref
    ///
    /// Sequencing: flush commit → forward ref (compare-and-swap) → on
    /// success, update the branch target and refetch its tree. A vacuous
    /// single-parent commit is skipped entirely when `ignore_empty` is set:
    /// the input state comes back unchanged with zero driver calls.
    ///
    /// # Errors
    ///
    /// A lost ref race surfaces as
    /// [`Error::NotFastForward`](crate::Error::NotFastForward) carrying the
    /// already-created commit, so the caller can merge it manually instead
    /// of losing it.
    #[instrument(skip_all, fields(empty = builder.empty, branch = ?branch))]
    pub async fn flush(
        &self,
        driver: &dyn Driver,
        builder: &CommitBuilder,
        branch: Option<&str>,
        ignore_empty: bool,
    ) -> Result<Self> {
        if ignore_empty && builder.empty && builder.parents.len() < 2 {
            debug!("nothing to commit, skipping flush");
            return Ok(self.clone());
        }

        let full_name = match branch {
            Some(name) => name.to_string(),
            None => self
                .current_branch
                .clone()
                .ok_or_else(|| Error::ref_not_found("no branch checked out"))?,
        };
        let target = self
            .find_branch(&full_name)
            .ok_or_else(|| Error::ref_not_found(full_name.as_str()))?
            .clone();

        let commit = driver.flush_commit(builder).await?;
        debug!(commit = %commit.id, branch = %target.full_name(), "commit flushed, forwarding ref");

        Self::forward(driver, &target, &commit).await?;

        let mut next = self.clone();
        for known in &mut next.branches {
            if known.full_name() == target.full_name() {
                known.target = commit.id;
            }
        }
        let mut advanced = target;
        advanced.target = commit.id;
        next.fetch_tree(driver, &advanced).await
    }

    async fn forward(driver: &dyn Driver, branch: &Branch, commit: &Commit) -> Result<()> {
        driver
            .forward_branch(branch, commit.id)
            .await
            .map_err(|error| match error {
                Error::NotFastForward {
                    branch: name,
                    commit: orphan,
                } => Error::NotFastForward {
                    branch: name,
                    commit: orphan.or_else(|| Some(Box::new(commit.clone()))),
                },
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeEntries;

    fn branch(name: &str, tip: &[u8]) -> Branch {
        Branch::local(name, Oid::hash(tip))
    }

    fn fetched_state(branches: Vec<Branch>) -> RepositoryState {
        let mut state = RepositoryState::new().with_branches(branches.clone());
        for b in &branches {
            state = state.with_working_state(
                &b.full_name(),
                Some(WorkingState::new(b.target, TreeEntries::new())),
            );
        }
        state
    }

    #[test]
    fn test_current_state_empty_without_checkout() {
        let state = RepositoryState::new();
        assert_eq!(state.current_state(), WorkingState::empty());
    }

    #[test]
    fn test_checkout_requires_fetched_tree() {
        let state = RepositoryState::new().with_branches(vec![branch("main", b"tip")]);
        assert!(matches!(
            state.clone().checkout("main"),
            Err(Error::RefNotFound(_))
        ));

        let state = state.with_working_state(
            "main",
            Some(WorkingState::new(Oid::hash(b"tip"), TreeEntries::new())),
        );
        let state = state.checkout("main").unwrap();
        assert_eq!(state.current_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_checkout_unknown_branch() {
        let state = fetched_state(vec![branch("main", b"tip")]);
        assert!(state.checkout("missing").is_err());
    }

    #[test]
    fn test_checkout_resolves_remote_branch_by_name() {
        let remote = Branch::new("develop", "origin", Oid::hash(b"tip"));
        let state = fetched_state(vec![remote]);

        let state = state.checkout("develop").unwrap();
        assert_eq!(state.current_branch.as_deref(), Some("origin/develop"));
    }

    #[test]
    fn test_deleting_current_working_state_clears_checkout() {
        let state = fetched_state(vec![branch("main", b"tip")])
            .checkout("main")
            .unwrap()
            .with_working_state("main", None);

        assert!(state.current_branch.is_none());
        assert!(state.working_states.is_empty());
    }

    #[test]
    fn test_snapshots_are_independent() {
        let old = fetched_state(vec![branch("main", b"tip")]);
        let new = old.clone().checkout("main").unwrap();

        assert!(old.current_branch.is_none(), "old snapshot is untouched");
        assert_eq!(new.current_branch.as_deref(), Some("main"));
    }

    #[test]
    fn test_find_branch_by_either_name() {
        let state = RepositoryState::new()
            .with_branches(vec![Branch::new("main", "origin", Oid::hash(b"t"))]);

        assert!(state.find_branch("origin/main").is_some());
        assert!(state.find_branch("main").is_some());
        assert!(state.branch("main").is_none(), "branch() wants the full name");
    }

    #[test]
    fn test_serde_roundtrip_including_empty() {
        let empty = RepositoryState::new();
        let json = serde_json::to_string(&empty).unwrap();
        assert_eq!(empty, serde_json::from_str(&json).unwrap());

        let state = fetched_state(vec![branch("main", b"tip")])
            .checkout("main")
            .unwrap();
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(state, serde_json::from_str::<RepositoryState>(&json).unwrap());
    }
}
