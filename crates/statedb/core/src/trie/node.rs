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

//! Node model for the Merkle Patricia Trie
//!
//! This module provides the four node variants and their canonical
//! encoding/decoding.
//!
//! # Node Variants
//!
//! - `Branch`: 17 child slots — one per nibble value plus a terminal-value
//!   slot at index 16
//! - `Short`: a compacted nibble key and a single child; a leaf when the
//!   child is a value, an extension otherwise
//! - `Value`: the raw stored bytes for a key
//! - `Hash`: a 32-byte content address standing in for an unexpanded
//!   subtree held only in the backing store
//!
//! # Encoding
//!
//! Nodes are encoded with bincode's standard configuration, which is
//! deterministic: semantically equal nodes produce identical bytes, and the
//! enum tag keeps the four variants unambiguous on decode. Only collapsed
//! nodes are ever encoded — every child slot holds a hash reference or an
//! inline value — so an encoding's size is bounded regardless of subtree
//! size, and hashing can recurse one level at a time.

use super::lib::{Hash, NodeId, TrieError, TrieResult, Value, keccak256};
use serde::{Deserialize, Serialize};

/// Child slots in a branch node: 16 nibble slots plus the terminal-value slot
pub const BRANCH_SLOTS: usize = 17;

/// A node in the trie
///
/// The in-memory graph is acyclic by construction: children either live
/// inline (owned, uncommitted) or behind a `Hash` reference that must be
/// resolved through the trie database before traversal continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Branch node: children indexed by nibble, slot 16 holds the value
    /// stored at this exact path position
    Branch(Box<[Option<Node>; BRANCH_SLOTS]>),
    /// Extension or leaf: the longest shared nibble prefix since the last
    /// branching point, plus a single child
    Short { key: Vec<u8>, val: Box<Node> },
    /// Terminal node holding the raw stored bytes
    Value(Value),
    /// Content address of an unexpanded subtree
    Hash(NodeId),
}

impl Node {
    /// Create a short node
    pub fn short(key: Vec<u8>, val: Node) -> Self {
        Node::Short { key, val: Box::new(val) }
    }

    /// Create an empty branch child array
    pub fn empty_branch() -> Box<[Option<Node>; BRANCH_SLOTS]> {
        Box::new(std::array::from_fn(|_| None))
    }

    /// Check if node is a branch
    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch(_))
    }

    /// Check if node is a short (extension/leaf) node
    pub fn is_short(&self) -> bool {
        matches!(self, Node::Short { .. })
    }

    /// Check if node is a value
    pub fn is_value(&self) -> bool {
        matches!(self, Node::Value(_))
    }

    /// Check if node is a hash reference
    pub fn is_hash(&self) -> bool {
        matches!(self, Node::Hash(_))
    }

    /// Encode the node into its canonical byte representation
    ///
    /// Only valid for collapsed nodes; expanded children would make the
    /// encoding depend on subtree layout rather than content addresses.
    pub fn encode(&self) -> TrieResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| TrieError::SerializationError(e.to_string()))
    }

    /// Decode a node from stored bytes
    ///
    /// Fails with `SerializationError` when the bytes do not parse or when
    /// the decoded node is not in stored (collapsed branch/short) form,
    /// both of which indicate store corruption.
    pub fn decode(data: &[u8]) -> TrieResult<Node> {
        let (node, _): (Node, _) = bincode::serde::decode_from_slice(data, bincode::config::standard()).map_err(|e| TrieError::SerializationError(e.to_string()))?;
        node.check_stored_form()?;
        Ok(node)
    }

    /// Compute the content hash of this (collapsed) node
    pub fn hash(&self) -> TrieResult<Hash> {
        Ok(keccak256(&self.encode()?))
    }

    /// Validate that the node is a legal stored form
    ///
    /// Stored nodes are always a branch or a short node whose children are
    /// hash references, with inline values only in the terminal-value slot
    /// or as a leaf payload.
    fn check_stored_form(&self) -> TrieResult<()> {
        match self {
            Node::Branch(children) => {
                for (i, slot) in children.iter().enumerate() {
                    match slot {
                        None => {}
                        Some(Node::Hash(_)) if i < 16 => {}
                        Some(Node::Value(_)) if i == 16 => {}
                        Some(_) => {
                            return Err(TrieError::SerializationError(format!("stored branch has an illegal child in slot {i}")));
                        }
                    }
                }
                Ok(())
            }
            Node::Short { key, val } => {
                if key.is_empty() {
                    return Err(TrieError::SerializationError("stored short node has an empty key".into()));
                }
                match val.as_ref() {
                    Node::Hash(_) | Node::Value(_) => Ok(()),
                    _ => Err(TrieError::SerializationError("stored short node has an expanded child".into())),
                }
            }
            _ => Err(TrieError::SerializationError("stored node must be a branch or short node".into())),
        }
    }
}

/// Count the occupied slots of a branch child array
pub(crate) fn occupied_slots(children: &[Option<Node>; BRANCH_SLOTS]) -> usize {
    children.iter().filter(|slot| slot.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::lib::{TERMINATOR, key_to_nibbles};

    fn leaf(key: &[u8], value: &[u8]) -> Node {
        Node::short(key_to_nibbles(key), Node::Value(value.to_vec()))
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let node = leaf(b"key", b"value");
        assert_eq!(node.encode().unwrap(), node.encode().unwrap());
        assert_eq!(node.hash().unwrap(), node.hash().unwrap());
    }

    #[test]
    fn test_different_nodes_different_hashes() {
        let a = leaf(b"key1", b"value");
        let b = leaf(b"key2", b"value");
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut children = Node::empty_branch();
        children[0x0a] = Some(Node::Hash([1u8; 32]));
        children[16] = Some(Node::Value(b"terminal".to_vec()));
        let node = Node::Branch(children);

        let decoded = Node::decode(&node.encode().unwrap()).unwrap();
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_short_node_roundtrip() {
        let node = Node::short(vec![0x0a, 0x07, TERMINATOR], Node::Value(b"v".to_vec()));
        let decoded = Node::decode(&node.encode().unwrap()).unwrap();
        assert_eq!(decoded, node);
        assert!(decoded.is_short());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(Node::decode(b"not a node"), Err(TrieError::SerializationError(_))));
    }

    #[test]
    fn test_decode_rejects_expanded_child() {
        // a short node chained directly into another short node is never a
        // legal stored form
        let inner = leaf(b"k", b"v");
        let node = Node::short(vec![1, 2], inner);
        let encoded = node.encode().unwrap();
        assert!(matches!(Node::decode(&encoded), Err(TrieError::SerializationError(_))));
    }

    #[test]
    fn test_decode_rejects_bare_value() {
        let encoded = Node::Value(b"v".to_vec()).encode().unwrap();
        assert!(matches!(Node::decode(&encoded), Err(TrieError::SerializationError(_))));
    }

    #[test]
    fn test_decode_rejects_value_in_nibble_slot() {
        let mut children = Node::empty_branch();
        children[3] = Some(Node::Value(b"v".to_vec()));
        children[4] = Some(Node::Hash([0u8; 32]));
        let encoded = Node::Branch(children).encode().unwrap();
        assert!(matches!(Node::decode(&encoded), Err(TrieError::SerializationError(_))));
    }

    #[test]
    fn test_variant_predicates() {
        assert!(Node::Hash([0u8; 32]).is_hash());
        assert!(Node::Value(vec![]).is_value());
        assert!(Node::Branch(Node::empty_branch()).is_branch());
        assert!(!Node::Value(vec![]).is_branch());
    }

    #[test]
    fn test_occupied_slots() {
        let mut children = Node::empty_branch();
        assert_eq!(occupied_slots(&children), 0);
        children[1] = Some(Node::Hash([0u8; 32]));
        children[16] = Some(Node::Value(vec![1]));
        assert_eq!(occupied_slots(&children), 2);
    }
}
