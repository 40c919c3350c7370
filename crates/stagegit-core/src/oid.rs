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

//! Object Identifier (OID) for content-addressable state
//!
//! An OID is a SHA-256 hash of an object's content, providing:
//! - Unique identification of blobs and commits
//! - Automatic content deduplication in the blob cache
//! - Cheap staleness comparison between repository snapshots

use crate::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// Object Identifier - SHA-256 hash of object content
///
/// The OID is a 32-byte (256-bit) SHA-256 hash that uniquely identifies
/// an object by its content. Identical content produces identical OIDs.
///
/// In the persisted JSON encoding an OID is a 64-character lowercase hex
/// string, so it can double as a map key.
///
/// # Examples
///
/// ```
/// use stagegit_core::Oid;
///
/// let oid = Oid::hash(b"Hello, World!");
/// assert_eq!(oid.to_hex().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid([u8; 32]);

impl Oid {
    /// The all-zero OID, used as the head of an empty working state that has
    /// no backing commit.
    pub const ZERO: Oid = Oid([0u8; 32]);

    /// Create an OID by hashing the given data
    ///
    /// # Examples
    ///
    /// ```
    /// use stagegit_core::Oid;
    ///
    /// let oid1 = Oid::hash(b"content");
    /// let oid2 = Oid::hash(b"content");
    /// assert_eq!(oid1, oid2);
    /// ```
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Oid(bytes)
    }

    /// Create OID from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Oid(bytes)
    }

    /// Get the raw bytes of the OID
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check whether this is the all-zero OID
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert OID to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create OID from a 64-character hex string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the string is not 64 hex
    /// characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != 64 {
            return Err(Error::invalid_argument(format!(
                "OID hex string must be 64 characters, got {}",
                s.len()
            )));
        }

        let bytes = hex::decode(s)
            .map_err(|e| Error::invalid_argument(format!("invalid OID hex: {}", e)))?;
        let mut oid_bytes = [0u8; 32];
        oid_bytes.copy_from_slice(&bytes);
        Ok(Oid(oid_bytes))
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self.to_hex())
    }
}

impl From<[u8; 32]> for Oid {
    fn from(bytes: [u8; 32]) -> Self {
        Oid(bytes)
    }
}

impl From<Oid> for [u8; 32] {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

// Persisted as a hex string rather than a byte array so that OIDs are
// readable in the JSON form and usable as JSON map keys.
impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Oid::from_hex(&s).map_err(D::Error::custom)
    }
}
