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

//! Error types for the working-copy engine
//!
//! Construction failures ([`Error::BlobTooBig`]) and lookup failures
//! ([`Error::NotFound`], [`Error::RefNotFound`]) surface at the offending
//! call and are never retried here. [`Error::NotFastForward`] is the one
//! error the engine supports recovery from: it carries the already-created
//! commit so a caller can merge it instead of losing it.

use crate::Commit;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the working-copy engine or a driver
#[derive(Error, Debug)]
pub enum Error {
    /// A branch or object with this identity already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A branch ref moved concurrently; the ref forward was rejected
    ///
    /// When the rejected forward followed a successful `flush_commit`, the
    /// orphaned commit rides along so the caller can reuse it.
    #[error("non-fast-forward update of branch '{branch}'")]
    NotFastForward {
        /// Full name of the branch whose ref moved
        branch: String,
        /// The commit that was created but never referenced
        commit: Option<Box<Commit>>,
    },

    /// File, blob or commit not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend-side automatic merge failed with conflicts
    #[error("merge conflict: {0}")]
    Conflict(String),

    /// Named remote is not configured on the driver
    #[error("unknown remote: {0}")]
    UnknownRemote(String),

    /// Driver could not authenticate against its backend
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Blob content exceeds the fixed size ceiling
    #[error("blob of {size} bytes exceeds the {limit} byte limit")]
    BlobTooBig {
        /// Size of the rejected content
        size: u64,
        /// The fixed ceiling
        limit: u64,
    },

    /// Branch or refspec could not be resolved
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// Malformed input (branch name, hex string, change payload)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Optional driver capability is not implemented by this driver
    #[error("operation not supported by this driver: {0}")]
    Unsupported(&'static str),

    /// Transparent delegation for wrapped driver-internal error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a NotFound error for the given path or object
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Error::NotFound(what.into())
    }

    /// Create a RefNotFound error for the given refspec
    pub fn ref_not_found<S: Into<String>>(refspec: S) -> Self {
        Error::RefNotFound(refspec.into())
    }

    /// Create an AlreadyExists error
    pub fn already_exists<S: Into<String>>(what: S) -> Self {
        Error::AlreadyExists(what.into())
    }

    /// Create an InvalidArgument error with context
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a Conflict error with context
    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Error::Conflict(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a NotFastForward error
    pub fn is_not_fast_forward(&self) -> bool {
        matches!(self, Error::NotFastForward { .. })
    }

    /// Take the orphaned commit out of a NotFastForward error, if any
    pub fn into_orphan_commit(self) -> Option<Commit> {
        match self {
            Error::NotFastForward {
                commit: Some(commit),
                ..
            } => Some(*commit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::not_found("src/lib.rs");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: src/lib.rs");
    }

    #[test]
    fn test_blob_too_big_display() {
        let err = Error::BlobTooBig {
            size: 2_097_152,
            limit: 1_048_576,
        };
        assert_eq!(
            err.to_string(),
            "blob of 2097152 bytes exceeds the 1048576 byte limit"
        );
    }

    #[test]
    fn test_not_fast_forward_without_commit() {
        let err = Error::NotFastForward {
            branch: "main".to_string(),
            commit: None,
        };
        assert!(err.is_not_fast_forward());
        assert!(err.into_orphan_commit().is_none());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("backend hiccup").into();
        assert!(matches!(err, Error::Other(_)));
    }
}
