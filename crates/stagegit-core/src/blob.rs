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

//! Blob value type: immutable, size-capped byte content
//!
//! Blobs hold staged file content before a driver has persisted it, and
//! fetched file content inside the blob cache. Construction is the only
//! fallible operation: content larger than [`Blob::LIMIT`] is rejected with
//! [`Error::BlobTooBig`].

use crate::{Error, Oid, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Immutable byte content, capped at [`Blob::LIMIT`] bytes
///
/// Equality is by content bytes. In the persisted JSON encoding a blob is a
/// base64 string.
///
/// # Examples
///
/// ```
/// use stagegit_core::Blob;
///
/// let blob = Blob::from_text("# Hello\n").unwrap();
/// assert_eq!(blob.byte_len(), 8);
/// assert_eq!(blob.as_text().unwrap(), "# Hello\n");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    content: Vec<u8>,
}

impl Blob {
    /// Fixed size ceiling for blob content: 1 MiB
    pub const LIMIT: u64 = 1024 * 1024;

    /// Create a blob from raw bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlobTooBig`] when the content exceeds [`Blob::LIMIT`].
    pub fn from_bytes(content: Vec<u8>) -> Result<Self> {
        let size = content.len() as u64;
        if size > Self::LIMIT {
            return Err(Error::BlobTooBig {
                size,
                limit: Self::LIMIT,
            });
        }
        Ok(Blob { content })
    }

    /// Create a blob from UTF-8 text
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_bytes(text.as_bytes().to_vec())
    }

    /// Create a blob by decoding base64 text
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for malformed base64 and
    /// [`Error::BlobTooBig`] when the decoded content exceeds the ceiling.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let content = BASE64
            .decode(encoded)
            .map_err(|e| Error::invalid_argument(format!("invalid base64 content: {}", e)))?;
        Self::from_bytes(content)
    }

    /// Get the content as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    /// Get the content as UTF-8 text
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the content is not valid UTF-8.
    pub fn as_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| Error::invalid_argument(format!("blob content is not UTF-8: {}", e)))
    }

    /// Encode the content as base64 text
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.content)
    }

    /// Content length in bytes
    pub fn byte_len(&self) -> u64 {
        self.content.len() as u64
    }

    /// Check if the blob holds no bytes
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Content address of the blob bytes
    pub fn oid(&self) -> Oid {
        Oid::hash(&self.content)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("byte_len", &self.byte_len())
            .field("oid", &self.oid())
            .finish()
    }
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Blob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Blob::from_base64(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let blob = Blob::from_bytes(vec![1, 2, 3]).unwrap();
        assert_eq!(blob.as_bytes(), &[1, 2, 3]);
        assert_eq!(blob.byte_len(), 3);
    }

    #[test]
    fn test_size_ceiling() {
        let at_limit = Blob::from_bytes(vec![0u8; Blob::LIMIT as usize]);
        assert!(at_limit.is_ok());

        let over_limit = Blob::from_bytes(vec![0u8; Blob::LIMIT as usize + 1]);
        assert!(matches!(over_limit, Err(Error::BlobTooBig { .. })));
    }

    #[test]
    fn test_text_roundtrip() {
        let blob = Blob::from_text("título\n").unwrap();
        assert_eq!(blob.as_text().unwrap(), "título\n");
    }

    #[test]
    fn test_non_utf8_as_text() {
        let blob = Blob::from_bytes(vec![0xff, 0xfe]).unwrap();
        assert!(blob.as_text().is_err());
    }

    #[test]
    fn test_base64_roundtrip() {
        let blob = Blob::from_bytes(vec![0x89, 0x50, 0x4e, 0x47]).unwrap();
        let encoded = blob.to_base64();
        let decoded = Blob::from_base64(&encoded).unwrap();
        assert_eq!(blob, decoded);
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            Blob::from_base64("not b64!!"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_equality_by_content() {
        let a = Blob::from_text("same").unwrap();
        let b = Blob::from_bytes(b"same".to_vec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.oid(), b.oid());
    }

    #[test]
    fn test_serde_as_base64_string() {
        let blob = Blob::from_bytes(vec![0, 1, 2, 255]).unwrap();
        let json = serde_json::to_string(&blob).unwrap();
        let back: Blob = serde_json::from_str(&json).unwrap();
        assert_eq!(blob, back);
    }
}
