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

//! Tree entries referencing file content by path
//!
//! A fetched tree is a flat `path -> TreeEntry` map, sorted by path for a
//! canonical representation. An entry without an OID refers to content that
//! exists only as a staged [`Blob`](crate::Blob), not yet persisted by any
//! driver.

use crate::{Blob, Oid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Flat tree: full path mapped to its entry, sorted by path
pub type TreeEntries = BTreeMap<String, TreeEntry>;

/// File mode of a tree entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Regular file (100644)
    #[default]
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symlink (120000)
    Symlink,
}

impl FileMode {
    /// Get the file mode from its Unix permission bits
    pub fn from_u32(mode: u32) -> crate::Result<Self> {
        match mode {
            0o100644 => Ok(FileMode::Regular),
            0o100755 => Ok(FileMode::Executable),
            0o120000 => Ok(FileMode::Symlink),
            _ => Err(crate::Error::invalid_argument(format!(
                "unknown file mode: {:o}",
                mode
            ))),
        }
    }

    /// Convert to Unix permission bits
    pub fn as_u32(&self) -> u32 {
        match self {
            FileMode::Regular => 0o100644,
            FileMode::Executable => 0o100755,
            FileMode::Symlink => 0o120000,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.as_u32())
    }
}

/// One path's reference into a tree
///
/// Equality is structural: OID, mode and size are all compared.
///
/// # Examples
///
/// ```
/// use stagegit_core::{FileMode, Oid, TreeEntry};
///
/// let entry = TreeEntry::persisted(Oid::hash(b"content"), FileMode::Regular, 7);
/// assert!(entry.is_persisted());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Content hash; `None` while content exists only as a staged blob
    pub oid: Option<Oid>,

    /// File mode
    #[serde(default)]
    pub mode: FileMode,

    /// Content length in bytes, as recorded by the backend
    pub size: u64,
}

impl TreeEntry {
    /// Entry for content a driver has already persisted
    pub fn persisted(oid: Oid, mode: FileMode, size: u64) -> Self {
        Self {
            oid: Some(oid),
            mode,
            size,
        }
    }

    /// Entry for staged content with no backing object yet
    pub fn staged(size: u64) -> Self {
        Self {
            oid: None,
            mode: FileMode::default(),
            size,
        }
    }

    /// Entry synthesized from a staged blob
    pub fn from_blob(blob: &Blob) -> Self {
        Self::staged(blob.byte_len())
    }

    /// Check whether the entry references persisted content
    pub fn is_persisted(&self) -> bool {
        self.oid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mode_values() {
        assert_eq!(FileMode::Regular.as_u32(), 0o100644);
        assert_eq!(FileMode::Executable.as_u32(), 0o100755);
        assert_eq!(FileMode::Symlink.as_u32(), 0o120000);
    }

    #[test]
    fn test_file_mode_from_u32() {
        assert_eq!(FileMode::from_u32(0o100644).unwrap(), FileMode::Regular);
        assert_eq!(FileMode::from_u32(0o100755).unwrap(), FileMode::Executable);
        assert_eq!(FileMode::from_u32(0o120000).unwrap(), FileMode::Symlink);
        assert!(FileMode::from_u32(0o777).is_err());
    }

    #[test]
    fn test_file_mode_display() {
        assert_eq!(FileMode::Regular.to_string(), "100644");
    }

    #[test]
    fn test_structural_equality() {
        let oid = Oid::hash(b"content");
        let a = TreeEntry::persisted(oid, FileMode::Regular, 7);
        let b = TreeEntry::persisted(oid, FileMode::Regular, 7);
        assert_eq!(a, b);

        let other_mode = TreeEntry::persisted(oid, FileMode::Executable, 7);
        assert_ne!(a, other_mode, "mode participates in equality");

        let other_size = TreeEntry::persisted(oid, FileMode::Regular, 8);
        assert_ne!(a, other_size, "size participates in equality");
    }

    #[test]
    fn test_staged_entry() {
        let blob = Blob::from_text("staged").unwrap();
        let entry = TreeEntry::from_blob(&blob);
        assert!(!entry.is_persisted());
        assert_eq!(entry.size, 6);
        assert_eq!(entry.mode, FileMode::Regular);
    }

    #[test]
    fn test_serde_roundtrip() {
        let entry = TreeEntry::persisted(Oid::hash(b"x"), FileMode::Executable, 42);
        let json = serde_json::to_string(&entry).unwrap();
        let back: TreeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
