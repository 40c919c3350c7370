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

//! Branch refs and name validation

use crate::{Error, Oid, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A branch ref: name, optional remote qualifier, commit pointer
///
/// The full identity key is `remote/name` when the remote is non-empty,
/// plain `name` otherwise; it must be unique within a repository state's
/// branch list.
///
/// # Examples
///
/// ```
/// use stagegit_core::{Branch, Oid};
///
/// let local = Branch::local("main", Oid::hash(b"tip"));
/// assert_eq!(local.full_name(), "main");
///
/// let remote = Branch::new("main", "origin", Oid::hash(b"tip"));
/// assert_eq!(remote.full_name(), "origin/main");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name (e.g. "main", "feature/auth")
    pub name: String,

    /// Remote qualifier; empty for a local branch
    #[serde(default)]
    pub remote: String,

    /// OID of the commit the branch points to
    pub target: Oid,
}

impl Branch {
    /// Create a branch ref
    pub fn new(name: impl Into<String>, remote: impl Into<String>, target: Oid) -> Self {
        Self {
            name: name.into(),
            remote: remote.into(),
            target,
        }
    }

    /// Create a local branch ref
    pub fn local(name: impl Into<String>, target: Oid) -> Self {
        Self::new(name, "", target)
    }

    /// Check whether the branch has no remote qualifier
    pub fn is_local(&self) -> bool {
        self.remote.is_empty()
    }

    /// Full identity key: `remote/name`, or `name` for a local branch
    pub fn full_name(&self) -> String {
        if self.remote.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.remote, self.name)
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Validate a branch name
///
/// Rejects names that a git-style backend would refuse: empty names,
/// leading/trailing slashes, `..` sequences, whitespace and control
/// characters, the ref-syntax characters `~^:?*[\`, and a `.lock` suffix.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming the offending rule.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("branch name cannot be empty"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::invalid_argument(format!(
            "branch name cannot start or end with '/': {}",
            name
        )));
    }
    if name.contains("..") {
        return Err(Error::invalid_argument(format!(
            "branch name cannot contain '..': {}",
            name
        )));
    }
    if name.ends_with(".lock") {
        return Err(Error::invalid_argument(format!(
            "branch name cannot end with '.lock': {}",
            name
        )));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c))
    {
        return Err(Error::invalid_argument(format!(
            "branch name contains an invalid character: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_local() {
        let branch = Branch::local("develop", Oid::hash(b"tip"));
        assert!(branch.is_local());
        assert_eq!(branch.full_name(), "develop");
    }

    #[test]
    fn test_full_name_remote() {
        let branch = Branch::new("develop", "origin", Oid::hash(b"tip"));
        assert!(!branch.is_local());
        assert_eq!(branch.full_name(), "origin/develop");
        assert_eq!(branch.to_string(), "origin/develop");
    }

    #[test]
    fn test_valid_names() {
        for name in ["main", "feature/auth", "release-1.2", "hotfix_x"] {
            assert!(validate_branch_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "",
            "/leading",
            "trailing/",
            "a..b",
            "has space",
            "tilde~1",
            "caret^2",
            "colon:ref",
            "quest?ion",
            "glob*",
            "brack[et",
            "back\\slash",
            "ends.lock",
        ] {
            assert!(
                validate_branch_name(name).is_err(),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let branch = Branch::new("main", "origin", Oid::hash(b"tip"));
        let json = serde_json::to_string(&branch).unwrap();
        let back: Branch = serde_json::from_str(&json).unwrap();
        assert_eq!(branch, back);
    }
}
