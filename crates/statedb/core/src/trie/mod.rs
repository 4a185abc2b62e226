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

//! Merkle Patricia Trie
//!
//! A cryptographically authenticated key-value structure. Keys are addressed
//! by their nibble expansion, values are opaque bytes, and every committed
//! state is summarized by a single Keccak-256 root hash. Unexpanded subtrees
//! are carried as 32-byte hash references and resolved on demand through a
//! shared [`TrieDatabase`].
//!
//! # Module Structure
//!
//! - `lib`: core types, nibble utilities, hashing, error definitions
//! - `node`: the four-variant node model and its canonical encoding
//! - `db`: cache + backing-store adapter with batch commit
//! - `trie`: get/update/delete with node splitting and collapsing
//! - `proof`: inclusion/non-inclusion proofs and their verifier
//!
//! # Usage
//!
//! ```rust
//! use statedb_core::trie::Trie;
//!
//! let mut trie = Trie::new_in_memory();
//! trie.update(b"key1", b"value1").unwrap();
//! assert_eq!(trie.get(b"key1").unwrap(), Some(b"value1".to_vec()));
//!
//! let root = trie.commit().unwrap();
//! let reopened = Trie::open(trie.db().clone(), root).unwrap();
//! assert_eq!(reopened.get(b"key1").unwrap(), Some(b"value1".to_vec()));
//! ```

/// Core types, nibble utilities, and error definitions
pub mod lib;

/// Trie node model and canonical encoding
pub mod node;

/// Cache + backing-store adapter
pub mod db;

/// Inclusion proofs and verification
pub mod proof;

/// Main trie implementation and operations
pub mod trie;

// Re-export commonly used types for convenience
pub use db::TrieDatabase;
pub use lib::{EMPTY_ROOT, Hash, Key, NodeId, TrieError, TrieResult, Value, keccak256};
pub use node::Node;
pub use proof::{Proof, verify_proof};
pub use trie::Trie;
