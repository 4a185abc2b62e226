// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Trie core library
//!
//! Shared types, Keccak-256 hashing, and the nibble-path utilities the rest
//! of the trie engine is built on.
//!
//! # Key Features
//!
//! - Keccak-256 content addressing
//! - Nibble expansion with a terminator sentinel for terminal values
//! - Type-safe error handling with a distinct variant per failure class

use sha3::{Digest, Keccak256};
use statedb_common::StoreError;
use thiserror::Error;

/// 32-byte Keccak-256 hash used throughout the trie
pub type Hash = [u8; 32];

/// Key type for the trie
///
/// Keys are opaque byte vectors; the engine only ever sees their nibble
/// expansion.
pub type Key = Vec<u8>;

/// Value type for the trie
pub type Value = Vec<u8>;

/// Node identifier (hash of the node's canonical encoding)
pub type NodeId = Hash;

/// Result type for trie operations
pub type TrieResult<T> = Result<T, TrieError>;

/// Sentinel nibble appended to every expanded key
///
/// Nibble values are 0-15; the sentinel 16 marks the end of a complete key
/// so a terminal value occupies the dedicated 17th branch slot and the
/// mutation code handles all slots uniformly.
pub const TERMINATOR: u8 = 16;

/// Root hash of the empty trie: `keccak256("")`
pub const EMPTY_ROOT: Hash = [
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
];

/// Errors that can occur in trie operations
///
/// A key that is simply absent is not an error; absence is reported as
/// `Ok(None)` by the lookup paths. These variants all indicate that the
/// trie's integrity guarantee cannot be trusted for the touched subtree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrieError {
    /// A hash reference could not be resolved from the backing store
    #[error("node not found: {}", hex::encode(.0))]
    NodeNotFound(NodeId),

    /// Stored bytes do not parse as a valid node encoding
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The backing store failed
    #[error("storage error: {0}")]
    StorageError(String),

    /// A proof does not verify against the given root hash
    #[error("invalid proof")]
    InvalidProof,
}

impl From<StoreError> for TrieError {
    fn from(err: StoreError) -> Self {
        TrieError::StorageError(err.to_string())
    }
}

/// Calculate the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Expand a key into its nibble path
///
/// Each byte splits into a high and a low nibble, followed by the
/// [`TERMINATOR`] sentinel, so the result holds `2 * key.len() + 1` entries.
pub fn key_to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2 + 1);
    for byte in key {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles.push(TERMINATOR);
    nibbles
}

/// Convert a nibble path back into key bytes
///
/// A trailing [`TERMINATOR`] is dropped; the remaining nibbles are packed
/// two per byte.
pub fn nibbles_to_key(nibbles: &[u8]) -> Vec<u8> {
    let nibbles = match nibbles.last() {
        Some(&TERMINATOR) => &nibbles[..nibbles.len() - 1],
        _ => nibbles,
    };
    let mut key = Vec::with_capacity(nibbles.len() / 2);
    for pair in nibbles.chunks(2) {
        if pair.len() == 2 {
            key.push((pair[0] << 4) | pair[1]);
        } else {
            key.push(pair[0] << 4);
        }
    }
    key
}

/// Find the length of the common prefix of two nibble slices
pub fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    let mut i = 0;
    while i < a.len().min(b.len()) && a[i] == b[i] {
        i += 1;
    }
    i
}
