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

//! Merkle proofs
//!
//! A proof is the ordered list of canonical node encodings along a key's
//! path, root first. Verification needs only the root hash, the key, and
//! the proof itself: each entry must hash to the reference expected by its
//! predecessor, so a verifier reconstructs the path without any access to
//! the trie or its store.
//!
//! The same structure witnesses both outcomes. A proof ending in the key's
//! value shows inclusion; a proof whose last node diverges from the key's
//! path shows non-inclusion. Verification reports inclusion as
//! `Ok(Some(value))`, proven absence as `Ok(None)`, and any inconsistency
//! as an error.

use super::lib::{EMPTY_ROOT, NodeId, TrieError, TrieResult, Value, keccak256, key_to_nibbles};
use super::node::Node;
use serde::{Deserialize, Serialize};

/// An ordered path proof for a single key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    nodes: Vec<Vec<u8>>,
}

impl Proof {
    /// Create an empty proof
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append the next node encoding on the path
    pub(crate) fn push(&mut self, encoded: Vec<u8>) {
        self.nodes.push(encoded);
    }

    /// Node encodings in path order, root first
    pub fn nodes(&self) -> &[Vec<u8>] {
        &self.nodes
    }

    /// Number of nodes in the proof
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check whether the proof contains no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize the proof for transport
    pub fn encode(&self) -> TrieResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| TrieError::SerializationError(e.to_string()))
    }

    /// Deserialize a proof received over the wire
    pub fn decode(data: &[u8]) -> TrieResult<Self> {
        let (proof, _): (Self, _) = bincode::serde::decode_from_slice(data, bincode::config::standard()).map_err(|e| TrieError::SerializationError(e.to_string()))?;
        Ok(proof)
    }
}

impl Default for Proof {
    fn default() -> Self {
        Self::new()
    }
}

/// What one verified proof node tells us about the rest of the path
enum Step {
    /// The key's path leaves the proven trie here: proven absence
    Diverged,
    /// The key's value was reached
    Found(Value),
    /// The path continues into the child expected to hash to `next`
    Continue { next: NodeId, consumed: usize },
}

/// Verify a proof against a root hash
///
/// Returns `Ok(Some(value))` when the proof shows `key` is bound to
/// `value` under `root`, `Ok(None)` when it shows `key` is absent, and
/// `Err(InvalidProof)` when the proof is inconsistent with the root —
/// a hash mismatch, a malformed node, a truncated or overlong path.
pub fn verify_proof(root: NodeId, key: &[u8], proof: &Proof) -> TrieResult<Option<Value>> {
    if proof.is_empty() {
        // only the empty trie proves anything with zero nodes
        if root == EMPTY_ROOT {
            return Ok(None);
        }
        return Err(TrieError::InvalidProof);
    }

    let path = key_to_nibbles(key);
    let mut offset = 0usize;
    let mut expected = root;
    let mut entries = proof.nodes().iter();

    while let Some(encoded) = entries.next() {
        if keccak256(encoded) != expected {
            return Err(TrieError::InvalidProof);
        }
        let node = Node::decode(encoded).map_err(|_| TrieError::InvalidProof)?;
        match step(&node, &path[offset..])? {
            Step::Diverged => {
                // a divergence is only a valid witness as the last entry
                if entries.next().is_some() {
                    return Err(TrieError::InvalidProof);
                }
                return Ok(None);
            }
            Step::Found(value) => {
                if entries.next().is_some() {
                    return Err(TrieError::InvalidProof);
                }
                return Ok(Some(value));
            }
            Step::Continue { next, consumed } => {
                expected = next;
                offset += consumed;
            }
        }
    }
    // path unfinished but the entries ran out
    Err(TrieError::InvalidProof)
}

fn step(node: &Node, path: &[u8]) -> TrieResult<Step> {
    match node {
        Node::Short { key, val } => {
            if path.len() < key.len() || path[..key.len()] != key[..] {
                return Ok(Step::Diverged);
            }
            match val.as_ref() {
                Node::Value(value) => {
                    if path.len() == key.len() {
                        Ok(Step::Found(value.clone()))
                    } else {
                        Ok(Step::Diverged)
                    }
                }
                Node::Hash(next) => Ok(Step::Continue {
                    next: *next,
                    consumed: key.len(),
                }),
                _ => Err(TrieError::InvalidProof),
            }
        }
        Node::Branch(children) => {
            let Some((&nibble, _)) = path.split_first() else {
                return Err(TrieError::InvalidProof);
            };
            match &children[nibble as usize] {
                None => Ok(Step::Diverged),
                Some(Node::Value(value)) => {
                    // slot 16: the terminator nibble ends the path here
                    if path.len() == 1 {
                        Ok(Step::Found(value.clone()))
                    } else {
                        Err(TrieError::InvalidProof)
                    }
                }
                Some(Node::Hash(next)) => Ok(Step::Continue { next: *next, consumed: 1 }),
                Some(_) => Err(TrieError::InvalidProof),
            }
        }
        // Node::decode only admits branch and short nodes
        _ => Err(TrieError::InvalidProof),
    }
}
