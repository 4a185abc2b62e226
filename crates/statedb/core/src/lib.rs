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

//! Authenticated state-storage engine
//!
//! This crate implements the state trie of a blockchain node: a compressed
//! radix trie (Merkle Patricia Trie) mapping fixed-length keys to opaque
//! byte values under a single 32-byte root hash, together with inclusion and
//! non-inclusion proofs verifiable against that hash, and the small
//! pruning-offset ledger that bounds how much historical trie data the live
//! store retains.
//!
//! # Module Structure
//!
//! - `trie`: node model, trie database, mutation, commit/hash, proofs
//! - `rawdb`: low-level schema accessors for the pruning-offset ledger

/// Low-level database schema accessors (pruning-offset ledger)
pub mod rawdb;

/// Merkle Patricia Trie engine
pub mod trie;
