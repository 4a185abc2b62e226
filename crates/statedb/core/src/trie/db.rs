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

//! Trie database
//!
//! The adapter between the in-memory node graph and the backing key-value
//! store. Hash references encountered during traversal are resolved here:
//! fetched, decoded, and cached so repeated resolutions of the same subtree
//! decode once. Commits flow the other way — a set of freshly hashed nodes
//! is written through as one atomic batch and then becomes part of the
//! clean cache.
//!
//! Several trie handles (different roots, read-only snapshots) may share a
//! single `TrieDatabase`; the clean-node cache is the one structure touched
//! from multiple handles and is guarded by a `parking_lot::RwLock`.

use super::lib::{NodeId, TrieError, TrieResult};
use super::node::Node;
use parking_lot::RwLock;
use statedb_common::{KeyValueStore, WriteBatch};
use std::collections::HashMap;
use tracing::{debug, trace};

/// One freshly hashed node pending batch commit
///
/// Carries both the decoded node (destined for the clean cache) and its
/// canonical encoding (destined for the store) so neither side re-derives
/// the other.
pub struct CommitEntry {
    pub id: NodeId,
    pub node: Node,
    pub encoded: Vec<u8>,
}

/// Cache + backing-store adapter for trie nodes
pub struct TrieDatabase<DB: KeyValueStore> {
    disk: DB,
    cleans: RwLock<HashMap<NodeId, Node>>,
}

impl<DB: KeyValueStore> TrieDatabase<DB> {
    /// Create a trie database over the given backing store
    pub fn new(disk: DB) -> Self {
        Self {
            disk,
            cleans: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a hash reference into its decoded node
    ///
    /// Cache hits clone the decoded node; misses fetch from the backing
    /// store, decode, and cache before returning. A hash absent from the
    /// store is an unrecoverable structural error (`NodeNotFound`), never a
    /// silent default.
    pub fn resolve(&self, id: &NodeId) -> TrieResult<Node> {
        if let Some(node) = self.cleans.read().get(id) {
            return Ok(node.clone());
        }
        let bytes = self.disk.get(id)?.ok_or(TrieError::NodeNotFound(*id))?;
        let node = Node::decode(&bytes)?;
        trace!(id = %hex::encode(id), "resolved trie node from disk");
        self.cleans.write().insert(*id, node.clone());
        Ok(node)
    }

    /// Check whether a node is present in the cache or the backing store
    pub fn contains(&self, id: &NodeId) -> TrieResult<bool> {
        if self.cleans.read().contains_key(id) {
            return Ok(true);
        }
        Ok(self.disk.get(id)?.is_some())
    }

    /// Flush a commit's worth of nodes as one atomic batch
    ///
    /// After the batch lands, the nodes join the clean cache; the pending
    /// set exists only for the duration of this call.
    pub fn commit(&self, entries: Vec<CommitEntry>) -> TrieResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        for entry in &entries {
            batch.put(entry.id.to_vec(), entry.encoded.clone());
        }
        let count = entries.len();
        self.disk.write_batch(batch)?;

        let mut cleans = self.cleans.write();
        for entry in entries {
            cleans.insert(entry.id, entry.node);
        }
        debug!(count, "flushed trie nodes to disk");
        Ok(())
    }

    /// Number of decoded nodes currently cached
    pub fn cached_nodes(&self) -> usize {
        self.cleans.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::lib::key_to_nibbles;
    use statedb_common::MemoryStore;
    use std::sync::Arc;

    fn sample_node() -> Node {
        Node::short(key_to_nibbles(b"key"), Node::Value(b"value".to_vec()))
    }

    #[test]
    fn test_resolve_unknown_hash_is_node_not_found() {
        let db = TrieDatabase::new(MemoryStore::new());
        let missing = [7u8; 32];
        assert_eq!(db.resolve(&missing), Err(TrieError::NodeNotFound(missing)));
    }

    #[test]
    fn test_commit_then_resolve() {
        let db = TrieDatabase::new(MemoryStore::new());
        let node = sample_node();
        let encoded = node.encode().unwrap();
        let id = node.hash().unwrap();

        db.commit(vec![CommitEntry {
            id,
            node: node.clone(),
            encoded,
        }])
        .unwrap();

        assert!(db.contains(&id).unwrap());
        assert_eq!(db.resolve(&id).unwrap(), node);
    }

    #[test]
    fn test_resolve_reads_through_shared_store() {
        let store = Arc::new(MemoryStore::new());
        let writer = TrieDatabase::new(Arc::clone(&store));
        let reader = TrieDatabase::new(Arc::clone(&store));

        let node = sample_node();
        let encoded = node.encode().unwrap();
        let id = node.hash().unwrap();
        writer
            .commit(vec![CommitEntry {
                id,
                node: node.clone(),
                encoded,
            }])
            .unwrap();

        // the reader has a cold cache and must hit the store
        assert_eq!(reader.cached_nodes(), 0);
        assert_eq!(reader.resolve(&id).unwrap(), node);
        assert_eq!(reader.cached_nodes(), 1);
    }

    #[test]
    fn test_resolve_rejects_corrupt_bytes() {
        let store = Arc::new(MemoryStore::new());
        let id = [9u8; 32];
        store.put(&id, b"corrupt").unwrap();

        let db = TrieDatabase::new(store);
        assert!(matches!(db.resolve(&id), Err(TrieError::SerializationError(_))));
    }

    #[test]
    fn test_empty_commit_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let db = TrieDatabase::new(Arc::clone(&store));
        db.commit(Vec::new()).unwrap();
        assert!(store.is_empty());
    }
}
