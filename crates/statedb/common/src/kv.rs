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

//! Backing key-value store abstraction
//!
//! The trie engine and the pruning-offset ledger treat durable storage as an
//! external collaborator exposing plain get/put/delete plus an atomic batch
//! writer. This module defines that contract and ships an in-memory
//! reference implementation used throughout the test suites.
//!
//! # Features
//!
//! - Minimal `KeyValueStore` trait shared by all persistence consumers
//! - `WriteBatch` collecting puts/deletes for one atomic commit
//! - `MemoryStore` backed by a `parking_lot::RwLock`ed map

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a backing store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The underlying storage backend failed
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A single operation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// An ordered set of write operations committed atomically
///
/// Batches are accumulated in memory by the caller and handed to
/// [`KeyValueStore::write_batch`] in one shot; the store must apply either
/// all operations or none of them.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put operation
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { key, value });
    }

    /// Queue a delete operation
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { key });
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the batch holds no operations
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drop all queued operations
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Consume the batch, yielding its operations in insertion order
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Contract for the backing key-value store
///
/// Implementations must be safe to share across threads; the trie database
/// issues reads from whichever thread drives traversal, and batch commits
/// from whichever thread drives `commit`.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` when absent
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, overwriting any previous value
    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Remove `key`; removing an absent key is not an error
    fn delete(&self, key: &[u8]) -> StoreResult<()>;

    /// Apply all operations in `batch` atomically
    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        (**self).write_batch(batch)
    }
}

/// In-memory store for tests and ephemeral databases
///
/// All entries live in a single `RwLock`ed map; `write_batch` applies its
/// operations under one write lock, which gives the batch the same
/// all-or-nothing visibility a real backend provides.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total size of all keys and values in bytes
    pub fn total_size(&self) -> usize {
        self.entries.read().iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut entries = self.entries.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.put(b"key", b"value").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), 1);

        store.put(b"key", b"other").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(b"other".to_vec()));

        store.delete(b"key").unwrap();
        assert_eq!(store.get(b"key").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let store = MemoryStore::new();
        store.delete(b"missing").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_batch_applies_in_order() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.put(b"a".to_vec(), b"3".to_vec());
        batch.delete(b"b".to_vec());
        assert_eq!(batch.len(), 4);

        store.write_batch(batch).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);
    }

    #[test]
    fn test_empty_batch() {
        let store = MemoryStore::new();
        let batch = WriteBatch::new();
        assert!(batch.is_empty());
        store.write_batch(batch).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_shared_store_through_arc() {
        let store = Arc::new(MemoryStore::new());
        let other = Arc::clone(&store);

        store.put(b"key", b"value").unwrap();
        assert_eq!(other.get(b"key").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn test_total_size_counts_keys_and_values() {
        let store = MemoryStore::new();
        store.put(b"ab", b"cdef").unwrap();
        assert_eq!(store.total_size(), 6);
    }
}
