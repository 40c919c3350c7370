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

//! Staged edits against a fetched tree
//!
//! A [`Change`] describes one pending edit for a path: create, update or
//! remove. Create and update carry either new content (a staged [`Blob`]) or
//! the hash of an existing blob ("create by copying"), never both. Remove
//! carries neither.

use crate::{Blob, Oid};
use serde::{Deserialize, Serialize};

/// One staged edit for a path
///
/// # Examples
///
/// ```
/// use stagegit_core::{Blob, Change};
///
/// let change = Change::create(Blob::from_text("new file\n").unwrap());
/// assert!(!change.is_remove());
/// assert!(change.source().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// Path is new relative to the fetched tree
    Create {
        /// New staged content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Blob>,
        /// Hash of an existing blob to copy
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Oid>,
    },
    /// Path exists in the fetched tree and its content is replaced
    Update {
        /// New staged content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Blob>,
        /// Hash of an existing blob to copy
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<Oid>,
    },
    /// Path is removed from the tree
    Remove,
}

impl Change {
    /// Create a path with new staged content
    pub fn create(content: Blob) -> Self {
        Change::Create {
            content: Some(content),
            source: None,
        }
    }

    /// Create a path by copying an existing blob
    pub fn create_from(source: Oid) -> Self {
        Change::Create {
            content: None,
            source: Some(source),
        }
    }

    /// Replace a path's content with new staged content
    pub fn update(content: Blob) -> Self {
        Change::Update {
            content: Some(content),
            source: None,
        }
    }

    /// Replace a path's content with an existing blob
    pub fn update_from(source: Oid) -> Self {
        Change::Update {
            content: None,
            source: Some(source),
        }
    }

    /// Remove a path
    pub fn remove() -> Self {
        Change::Remove
    }

    /// The staged content, if this change carries any
    pub fn content(&self) -> Option<&Blob> {
        match self {
            Change::Create { content, .. } | Change::Update { content, .. } => content.as_ref(),
            Change::Remove => None,
        }
    }

    /// The source blob hash, if this change copies existing content
    pub fn source(&self) -> Option<Oid> {
        match self {
            Change::Create { source, .. } | Change::Update { source, .. } => *source,
            Change::Remove => None,
        }
    }

    /// Check whether this change removes its path
    pub fn is_remove(&self) -> bool {
        matches!(self, Change::Remove)
    }

    /// Check whether this change creates a path new to the fetched tree
    pub fn is_create(&self) -> bool {
        matches!(self, Change::Create { .. })
    }

    /// Rewrite a Create into an Update carrying the same payload
    ///
    /// Used by the reconciliation rule when the target path turns out to
    /// already exist in the fetched tree.
    pub fn into_update(self) -> Self {
        match self {
            Change::Create { content, source } => Change::Update { content, source },
            other => other,
        }
    }
}
