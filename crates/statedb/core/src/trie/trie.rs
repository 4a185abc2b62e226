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

//! Merkle Patricia Trie implementation
//!
//! The mutation engine over the node model: nibble-path get/update/delete
//! with node splitting on divergence and collapsing on deletion, plus the
//! commit walk that replaces dirty nodes with their content hashes and
//! flushes them through the trie database.
//!
//! A trie handle is single-writer: one logical caller mutates it at a time
//! and no internal locking is performed. Mutation is copy-on-write — every
//! node along a touched path is rebuilt, so nodes reachable from an already
//! committed root are never edited and prior roots stay valid.
//!
//! Collapsing is the correctness-critical half of deletion: a branch left
//! with a single occupant must shrink back to a short node and adjacent
//! short nodes must merge, otherwise the trie still answers lookups but its
//! root hash diverges from the canonical shape.

use super::db::{CommitEntry, TrieDatabase};
use super::lib::{EMPTY_ROOT, NodeId, TERMINATOR, TrieError, TrieResult, Value, common_prefix, keccak256, key_to_nibbles};
use super::node::{Node, occupied_slots};
use super::proof::Proof;
use statedb_common::{KeyValueStore, MemoryStore};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a recursive delete step
enum Deletion {
    /// Key not present below this node; the node is handed back unchanged
    NotFound(Node),
    /// Key removed; the replacement subtree, or `None` when it vanished
    Deleted(Option<Node>),
}

/// A handle onto one trie state
///
/// Holds the in-memory root (empty, expanded, or a hash reference to a
/// committed root) and a shared reference to the trie database used for
/// on-demand resolution and commit.
pub struct Trie<DB: KeyValueStore> {
    db: Arc<TrieDatabase<DB>>,
    root: Option<Node>,
}

impl<DB: KeyValueStore> Trie<DB> {
    /// Create an empty trie
    pub fn new(db: Arc<TrieDatabase<DB>>) -> Self {
        Self { db, root: None }
    }

    /// Open a trie at a previously committed root hash
    ///
    /// The root is resolved eagerly so an unknown or pruned root surfaces
    /// `NodeNotFound` here rather than on first use.
    pub fn open(db: Arc<TrieDatabase<DB>>, root: NodeId) -> TrieResult<Self> {
        if root == EMPTY_ROOT {
            return Ok(Self { db, root: None });
        }
        db.resolve(&root)?;
        Ok(Self {
            db,
            root: Some(Node::Hash(root)),
        })
    }

    /// Shared trie database backing this handle
    pub fn db(&self) -> &Arc<TrieDatabase<DB>> {
        &self.db
    }

    /// Current in-memory root node, if any
    pub fn root_node(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Get the value stored under `key`
    ///
    /// Absence (including any path divergence) is `Ok(None)`; errors are
    /// reserved for unresolvable or corrupt nodes.
    pub fn get(&self, key: &[u8]) -> TrieResult<Option<Value>> {
        match &self.root {
            None => Ok(None),
            Some(root) => self.get_at(root, &key_to_nibbles(key)),
        }
    }

    fn get_at(&self, node: &Node, key: &[u8]) -> TrieResult<Option<Value>> {
        match node {
            Node::Value(value) => {
                if key.is_empty() {
                    Ok(Some(value.clone()))
                } else {
                    Ok(None)
                }
            }
            Node::Short { key: nkey, val } => {
                if key.len() < nkey.len() || key[..nkey.len()] != nkey[..] {
                    return Ok(None);
                }
                self.get_at(val, &key[nkey.len()..])
            }
            Node::Branch(children) => {
                if key.is_empty() {
                    return Ok(None);
                }
                match &children[key[0] as usize] {
                    None => Ok(None),
                    Some(child) => self.get_at(child, &key[1..]),
                }
            }
            Node::Hash(id) => {
                let resolved = self.db.resolve(id)?;
                self.get_at(&resolved, key)
            }
        }
    }

    /// Insert or replace the value stored under `key`
    ///
    /// An empty value deletes the key.
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> TrieResult<()> {
        if value.is_empty() {
            return self.delete(key);
        }
        let path = key_to_nibbles(key);
        let root = self.root.take();
        self.root = Some(self.insert_at(root, &path, Node::Value(value.to_vec()))?);
        Ok(())
    }

    fn insert_at(&self, node: Option<Node>, key: &[u8], value: Node) -> TrieResult<Node> {
        let Some(node) = node else {
            if key.is_empty() {
                return Ok(value);
            }
            return Ok(Node::short(key.to_vec(), value));
        };
        if key.is_empty() {
            // exact path hit: replace the terminal value in place
            return Ok(value);
        }
        match node {
            Node::Short { key: nkey, val } => {
                let match_len = common_prefix(&nkey, key);
                if match_len == nkey.len() {
                    let new_val = self.insert_at(Some(*val), &key[match_len..], value)?;
                    return Ok(Node::short(nkey, new_val));
                }
                // diverged inside the compacted key: branch at the split
                // point, with the shorter remainders re-wrapped as needed
                let mut children = Node::empty_branch();
                let old_idx = nkey[match_len] as usize;
                children[old_idx] = Some(if nkey.len() > match_len + 1 {
                    Node::Short {
                        key: nkey[match_len + 1..].to_vec(),
                        val,
                    }
                } else {
                    *val
                });
                let new_idx = key[match_len] as usize;
                children[new_idx] = Some(self.insert_at(None, &key[match_len + 1..], value)?);

                let branch = Node::Branch(children);
                if match_len == 0 {
                    Ok(branch)
                } else {
                    Ok(Node::short(key[..match_len].to_vec(), branch))
                }
            }
            Node::Branch(mut children) => {
                let idx = key[0] as usize;
                let child = children[idx].take();
                children[idx] = Some(self.insert_at(child, &key[1..], value)?);
                Ok(Node::Branch(children))
            }
            Node::Hash(id) => {
                let resolved = self.db.resolve(&id)?;
                self.insert_at(Some(resolved), key, value)
            }
            Node::Value(_) => Err(TrieError::SerializationError("value node on a non-terminal path".into())),
        }
    }

    /// Delete the value stored under `key`
    ///
    /// Deleting an absent key is a no-op.
    pub fn delete(&mut self, key: &[u8]) -> TrieResult<()> {
        let path = key_to_nibbles(key);
        let Some(root) = self.root.take() else {
            return Ok(());
        };
        match self.delete_at(root, &path)? {
            Deletion::NotFound(root) => self.root = Some(root),
            Deletion::Deleted(root) => self.root = root,
        }
        Ok(())
    }

    fn delete_at(&self, node: Node, key: &[u8]) -> TrieResult<Deletion> {
        match node {
            Node::Value(value) => {
                if key.is_empty() {
                    Ok(Deletion::Deleted(None))
                } else {
                    Ok(Deletion::NotFound(Node::Value(value)))
                }
            }
            Node::Short { key: nkey, val } => {
                if key.len() < nkey.len() || key[..nkey.len()] != nkey[..] {
                    return Ok(Deletion::NotFound(Node::Short { key: nkey, val }));
                }
                match self.delete_at(*val, &key[nkey.len()..])? {
                    Deletion::NotFound(child) => Ok(Deletion::NotFound(Node::short(nkey, child))),
                    Deletion::Deleted(None) => Ok(Deletion::Deleted(None)),
                    Deletion::Deleted(Some(Node::Short { key: ckey, val: cval })) => {
                        // the child collapsed into a short node: fold the two
                        // compacted keys into one
                        let mut merged = nkey;
                        merged.extend_from_slice(&ckey);
                        Ok(Deletion::Deleted(Some(Node::Short { key: merged, val: cval })))
                    }
                    Deletion::Deleted(Some(child)) => Ok(Deletion::Deleted(Some(Node::short(nkey, child)))),
                }
            }
            Node::Branch(mut children) => {
                if key.is_empty() {
                    return Ok(Deletion::NotFound(Node::Branch(children)));
                }
                let idx = key[0] as usize;
                let Some(child) = children[idx].take() else {
                    return Ok(Deletion::NotFound(Node::Branch(children)));
                };
                match self.delete_at(child, &key[1..])? {
                    Deletion::NotFound(child) => {
                        children[idx] = Some(child);
                        Ok(Deletion::NotFound(Node::Branch(children)))
                    }
                    Deletion::Deleted(slot) => {
                        children[idx] = slot;
                        Ok(Deletion::Deleted(Some(self.collapse_branch(children)?)))
                    }
                }
            }
            Node::Hash(id) => {
                let resolved = self.db.resolve(&id)?;
                self.delete_at(resolved, key)
            }
        }
    }

    /// Reduce a branch to its minimal shape after a slot was emptied
    ///
    /// Two or more occupants keep the branch; a single occupant becomes a
    /// short node carrying the slot's nibble, merged into the remaining
    /// child when that child is itself a short node.
    fn collapse_branch(&self, mut children: Box<[Option<Node>; super::node::BRANCH_SLOTS]>) -> TrieResult<Node> {
        if occupied_slots(&children) >= 2 {
            return Ok(Node::Branch(children));
        }
        let Some(pos) = children.iter().position(|slot| slot.is_some()) else {
            // a branch holds at least two occupants before any delete, so
            // removing one cannot empty it
            return Err(TrieError::SerializationError("branch node collapsed to zero occupants".into()));
        };
        let Some(child) = children[pos].take() else {
            return Err(TrieError::SerializationError("branch occupancy changed during collapse".into()));
        };

        if pos == 16 {
            // only the terminal value survives: it becomes a leaf at this
            // position
            return Ok(Node::short(vec![TERMINATOR], child));
        }
        let child = match child {
            Node::Hash(id) => self.db.resolve(&id)?,
            other => other,
        };
        match child {
            Node::Short { key: ckey, val } => {
                let mut merged = vec![pos as u8];
                merged.extend_from_slice(&ckey);
                Ok(Node::Short { key: merged, val })
            }
            other => Ok(Node::short(vec![pos as u8], other)),
        }
    }

    /// Compute the root hash without persisting anything
    pub fn root_hash(&self) -> TrieResult<NodeId> {
        match &self.root {
            None => Ok(EMPTY_ROOT),
            Some(Node::Hash(id)) => Ok(*id),
            Some(node) => {
                let (_, id) = self.hash_at(node)?;
                Ok(id)
            }
        }
    }

    /// Collapse a node and compute its canonical encoding and content hash
    ///
    /// Used by proof generation and `root_hash`; nothing is written.
    pub(super) fn hash_at(&self, node: &Node) -> TrieResult<(Vec<u8>, NodeId)> {
        let collapsed = self.collapse(node)?;
        let encoded = collapsed.encode()?;
        let id = keccak256(&encoded);
        Ok((encoded, id))
    }

    /// Produce a copy of `node` with every expanded child replaced by its
    /// content hash
    fn collapse(&self, node: &Node) -> TrieResult<Node> {
        match node {
            Node::Hash(_) | Node::Value(_) => Ok(node.clone()),
            Node::Short { key, val } => {
                let val = self.collapse_child(val)?;
                Ok(Node::short(key.clone(), val))
            }
            Node::Branch(children) => {
                let mut out = Node::empty_branch();
                for (i, slot) in children.iter().enumerate() {
                    if let Some(child) = slot {
                        out[i] = Some(self.collapse_child(child)?);
                    }
                }
                Ok(Node::Branch(out))
            }
        }
    }

    fn collapse_child(&self, child: &Node) -> TrieResult<Node> {
        match child {
            Node::Hash(_) | Node::Value(_) => Ok(child.clone()),
            expanded => {
                let (_, id) = self.hash_at(expanded)?;
                Ok(Node::Hash(id))
            }
        }
    }

    /// Hash all dirty nodes and flush them to the backing store
    ///
    /// A single post-order walk: children first, each committed child
    /// replaced in its parent by a hash reference, then the parent itself
    /// encoded, hashed, and queued. Nodes that are already hash references
    /// are never revisited, so the cost is bounded by the delta since the
    /// last commit, not the trie size. The accumulated (hash, encoding)
    /// pairs land in one atomic batch; the in-memory root is left as the
    /// clean, fully hash-substituted graph.
    pub fn commit(&mut self) -> TrieResult<NodeId> {
        let Some(root) = self.root.take() else {
            return Ok(EMPTY_ROOT);
        };
        if let Node::Hash(id) = root {
            // nothing dirty since the last commit
            self.root = Some(Node::Hash(id));
            return Ok(id);
        }

        let mut entries = Vec::new();
        let collapsed = self.commit_at(root, &mut entries)?;
        let Node::Hash(id) = collapsed else {
            // every stored key sits below a short or branch node, so the
            // root always collapses to a hash reference
            return Err(TrieError::SerializationError("root did not collapse to a hash reference".into()));
        };
        debug!(root = %hex::encode(id), nodes = entries.len(), "committing trie");
        self.db.commit(entries)?;
        self.root = Some(Node::Hash(id));
        Ok(id)
    }

    fn commit_at(&self, node: Node, entries: &mut Vec<CommitEntry>) -> TrieResult<Node> {
        match node {
            // hash references are clean; values are inlined in their parent
            Node::Hash(_) | Node::Value(_) => Ok(node),
            Node::Short { key, val } => {
                let val = self.commit_at(*val, entries)?;
                let collapsed = Node::short(key, val);
                let encoded = collapsed.encode()?;
                let id = keccak256(&encoded);
                entries.push(CommitEntry { id, node: collapsed, encoded });
                Ok(Node::Hash(id))
            }
            Node::Branch(mut children) => {
                for slot in children.iter_mut() {
                    if let Some(child) = slot.take() {
                        *slot = Some(self.commit_at(child, entries)?);
                    }
                }
                let collapsed = Node::Branch(children);
                let encoded = collapsed.encode()?;
                let id = keccak256(&encoded);
                entries.push(CommitEntry { id, node: collapsed, encoded });
                Ok(Node::Hash(id))
            }
        }
    }

    /// Produce an inclusion (or non-inclusion) proof for `key`
    ///
    /// Collects the canonical encoding of every branch/short node on the
    /// key's path, root first. For an absent key the collection stops at
    /// the divergence point, which is exactly what a verifier needs for a
    /// non-inclusion witness. The trie is not mutated; uncommitted nodes
    /// are collapse-hashed on the fly without being written.
    pub fn prove(&self, key: &[u8]) -> TrieResult<Proof> {
        let mut proof = Proof::new();
        if let Some(root) = &self.root {
            self.prove_at(root, &key_to_nibbles(key), &mut proof)?;
        }
        Ok(proof)
    }

    fn prove_at(&self, node: &Node, key: &[u8], proof: &mut Proof) -> TrieResult<()> {
        match node {
            Node::Hash(id) => {
                let resolved = self.db.resolve(id)?;
                self.prove_at(&resolved, key, proof)
            }
            // the payload is embedded in its parent's encoding
            Node::Value(_) => Ok(()),
            Node::Short { key: nkey, val } => {
                let (encoded, _) = self.hash_at(node)?;
                proof.push(encoded);
                if key.len() < nkey.len() || key[..nkey.len()] != nkey[..] {
                    return Ok(());
                }
                self.prove_at(val, &key[nkey.len()..], proof)
            }
            Node::Branch(children) => {
                let (encoded, _) = self.hash_at(node)?;
                proof.push(encoded);
                if key.is_empty() {
                    return Ok(());
                }
                match &children[key[0] as usize] {
                    None => Ok(()),
                    Some(child) => self.prove_at(child, &key[1..], proof),
                }
            }
        }
    }
}

impl Trie<MemoryStore> {
    /// Create an empty trie over a fresh in-memory store
    pub fn new_in_memory() -> Self {
        Self::new(Arc::new(TrieDatabase::new(MemoryStore::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_trie() {
        let trie = Trie::new_in_memory();
        assert_eq!(trie.get(b"missing").unwrap(), None);
        assert_eq!(trie.root_hash().unwrap(), EMPTY_ROOT);
    }

    #[test]
    fn test_single_key_value() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"test", b"value").unwrap();
        assert_eq!(trie.get(b"test").unwrap(), Some(b"value".to_vec()));
        assert_ne!(trie.root_hash().unwrap(), EMPTY_ROOT);
    }

    #[test]
    fn test_last_write_wins() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"test", b"value1").unwrap();
        trie.update(b"test", b"value2").unwrap();
        assert_eq!(trie.get(b"test").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_multiple_keys_with_shared_prefixes() {
        let mut trie = Trie::new_in_memory();
        let pairs: Vec<(&[u8], &[u8])> = vec![(b"apple", b"v1"), (b"application", b"v2"), (b"banana", b"v3"), (b"app", b"v4")];
        for (key, value) in &pairs {
            trie.update(key, value).unwrap();
        }
        for (key, value) in &pairs {
            assert_eq!(trie.get(key).unwrap(), Some(value.to_vec()));
        }
        assert_eq!(trie.get(b"appl").unwrap(), None);
        assert_eq!(trie.get(b"applications").unwrap(), None);
    }

    #[test]
    fn test_delete_single_key() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"test", b"value").unwrap();
        trie.delete(b"test").unwrap();
        assert_eq!(trie.get(b"test").unwrap(), None);
        assert_eq!(trie.root_hash().unwrap(), EMPTY_ROOT);
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"test", b"value").unwrap();
        let before = trie.root_hash().unwrap();
        trie.delete(b"other").unwrap();
        assert_eq!(trie.root_hash().unwrap(), before);
    }

    #[test]
    fn test_delete_all_restores_empty_root() {
        let mut trie = Trie::new_in_memory();
        let keys: Vec<&[u8]> = vec![b"apple", b"application", b"app", b"banana", b"band", b"can"];
        for key in &keys {
            trie.update(key, b"value").unwrap();
        }
        for key in &keys {
            trie.delete(key).unwrap();
        }
        assert_eq!(trie.root_hash().unwrap(), EMPTY_ROOT);
        assert!(trie.root_node().is_none());
    }

    #[test]
    fn test_update_with_empty_value_deletes() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"test", b"value").unwrap();
        trie.update(b"test", b"").unwrap();
        assert_eq!(trie.get(b"test").unwrap(), None);
        assert_eq!(trie.root_hash().unwrap(), EMPTY_ROOT);
    }

    #[test]
    fn test_root_hash_is_order_independent() {
        let pairs: Vec<(&[u8], &[u8])> = vec![(b"one", b"1"), (b"two", b"2"), (b"three", b"3"), (b"threat", b"4")];

        let mut forward = Trie::new_in_memory();
        for (k, v) in &pairs {
            forward.update(k, v).unwrap();
        }
        let mut backward = Trie::new_in_memory();
        for (k, v) in pairs.iter().rev() {
            backward.update(k, v).unwrap();
        }
        assert_eq!(forward.root_hash().unwrap(), backward.root_hash().unwrap());
    }

    #[test]
    fn test_insert_then_delete_matches_never_inserted() {
        let mut with_extra = Trie::new_in_memory();
        with_extra.update(b"keep", b"v").unwrap();
        with_extra.update(b"kept", b"v").unwrap();
        with_extra.update(b"drop", b"v").unwrap();
        with_extra.delete(b"drop").unwrap();

        let mut without = Trie::new_in_memory();
        without.update(b"keep", b"v").unwrap();
        without.update(b"kept", b"v").unwrap();

        assert_eq!(with_extra.root_hash().unwrap(), without.root_hash().unwrap());
    }

    #[test]
    fn test_commit_and_reopen() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"key1", b"value1").unwrap();
        trie.update(b"key2", b"value2").unwrap();
        let root = trie.commit().unwrap();
        assert_eq!(root, trie.root_hash().unwrap());

        let reopened = Trie::open(trie.db().clone(), root).unwrap();
        assert_eq!(reopened.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(reopened.get(b"key2").unwrap(), Some(b"value2".to_vec()));
        assert_eq!(reopened.get(b"key3").unwrap(), None);
    }

    #[test]
    fn test_commit_is_idempotent_when_clean() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"key", b"value").unwrap();
        let first = trie.commit().unwrap();
        let second = trie.commit().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_commit_empty_trie() {
        let mut trie = Trie::new_in_memory();
        assert_eq!(trie.commit().unwrap(), EMPTY_ROOT);
        let db = trie.db().clone();
        let reopened = Trie::open(db, EMPTY_ROOT).unwrap();
        assert_eq!(reopened.get(b"anything").unwrap(), None);
    }

    #[test]
    fn test_mutate_after_commit_preserves_old_root() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"key", b"old").unwrap();
        let old_root = trie.commit().unwrap();

        trie.update(b"key", b"new").unwrap();
        let new_root = trie.commit().unwrap();
        assert_ne!(old_root, new_root);

        // copy-on-write: the old committed state is still fully readable
        let old = Trie::open(trie.db().clone(), old_root).unwrap();
        assert_eq!(old.get(b"key").unwrap(), Some(b"old".to_vec()));
        let new = Trie::open(trie.db().clone(), new_root).unwrap();
        assert_eq!(new.get(b"key").unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_open_unknown_root_fails_fast() {
        let trie = Trie::new_in_memory();
        let bogus = [3u8; 32];
        assert_eq!(Trie::open(trie.db().clone(), bogus).err(), Some(TrieError::NodeNotFound(bogus)));
    }

    #[test]
    fn test_delete_through_committed_nodes() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"apple", b"v1").unwrap();
        trie.update(b"application", b"v2").unwrap();
        let root = trie.commit().unwrap();

        let mut reopened = Trie::open(trie.db().clone(), root).unwrap();
        reopened.delete(b"application").unwrap();
        assert_eq!(reopened.get(b"apple").unwrap(), Some(b"v1".to_vec()));

        let mut single = Trie::new_in_memory();
        single.update(b"apple", b"v1").unwrap();
        assert_eq!(reopened.root_hash().unwrap(), single.root_hash().unwrap());
    }

    #[test]
    fn test_key_that_is_prefix_of_another() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"do", b"verb").unwrap();
        trie.update(b"dog", b"animal").unwrap();
        assert_eq!(trie.get(b"do").unwrap(), Some(b"verb".to_vec()));
        assert_eq!(trie.get(b"dog").unwrap(), Some(b"animal".to_vec()));

        trie.delete(b"do").unwrap();
        assert_eq!(trie.get(b"dog").unwrap(), Some(b"animal".to_vec()));

        let mut single = Trie::new_in_memory();
        single.update(b"dog", b"animal").unwrap();
        assert_eq!(trie.root_hash().unwrap(), single.root_hash().unwrap());
    }

    #[test]
    fn test_empty_key() {
        let mut trie = Trie::new_in_memory();
        trie.update(b"", b"root value").unwrap();
        assert_eq!(trie.get(b"").unwrap(), Some(b"root value".to_vec()));
        trie.delete(b"").unwrap();
        assert_eq!(trie.root_hash().unwrap(), EMPTY_ROOT);
    }
}
