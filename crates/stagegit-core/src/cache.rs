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

//! Content-addressed blob cache
//!
//! The cache memoizes fetched blobs by their hash so the same content is
//! never fetched twice within a repository snapshot. It is append-only and
//! never evicts; it is an explicit field of
//! [`RepositoryState`](crate::RepositoryState), never ambient state.

use crate::{Blob, Driver, Oid, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Append-only, content-addressed memo of fetched blobs
///
/// Because keys are content hashes, an insert for an already-present hash is
/// a no-op by construction: the content is necessarily identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobCache {
    blobs: BTreeMap<Oid, Blob>,
}

impl BlobCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether content with this hash is resident
    pub fn contains(&self, oid: &Oid) -> bool {
        self.blobs.contains_key(oid)
    }

    /// Get resident content by hash
    pub fn get(&self, oid: &Oid) -> Option<&Blob> {
        self.blobs.get(oid)
    }

    /// Insert content under its own hash
    ///
    /// A duplicate insert is a presence-checked no-op.
    pub fn insert(&mut self, blob: Blob) -> Oid {
        let oid = blob.oid();
        self.blobs.entry(oid).or_insert(blob);
        oid
    }

    /// Get content by hash, fetching it through the driver when absent
    ///
    /// An already-cached hash performs zero driver calls.
    pub async fn ensure(&mut self, driver: &dyn Driver, oid: Oid) -> Result<&Blob> {
        if !self.blobs.contains_key(&oid) {
            trace!(oid = %oid, "blob cache miss, fetching");
            let blob = driver.fetch_blob(oid).await?;
            self.blobs.insert(oid, blob);
        }
        self.blobs
            .get(&oid)
            .ok_or_else(|| crate::Error::not_found(oid.to_hex()))
    }

    /// Number of resident blobs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut cache = BlobCache::new();
        let blob = Blob::from_text("cached").unwrap();
        let oid = cache.insert(blob.clone());

        assert!(cache.contains(&oid));
        assert_eq!(cache.get(&oid), Some(&blob));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut cache = BlobCache::new();
        let blob = Blob::from_text("same").unwrap();

        let oid1 = cache.insert(blob.clone());
        let oid2 = cache.insert(blob);
        assert_eq!(oid1, oid2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss() {
        let cache = BlobCache::new();
        assert!(cache.get(&Oid::hash(b"absent")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut cache = BlobCache::new();
        cache.insert(Blob::from_bytes(vec![1, 2, 3]).unwrap());
        cache.insert(Blob::from_text("text").unwrap());

        let json = serde_json::to_string(&cache).unwrap();
        let back: BlobCache = serde_json::from_str(&json).unwrap();
        assert_eq!(cache, back);
    }
}
