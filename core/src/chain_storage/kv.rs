// Copyright 2024. The MWEB Developers
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The key/value contract the engine requires of the host's storage engine: point reads plus an
//! atomic, durable batch write. Tables are one-byte prefixes.

use std::{collections::BTreeMap, sync::RwLock};

use super::error::ChainStorageError;

/// Leaf data by leaf hash.
pub const TABLE_LEAF: u8 = b'L';
/// UTXO index by commitment.
pub const TABLE_UTXO: u8 = b'U';
/// MMR node hashes by (tree, node index).
pub const TABLE_NODE: u8 = b'M';
/// Headers by hash.
pub const TABLE_HEADER: u8 = b'H';
/// MMR info: latest file index, sizes, best header.
pub const TABLE_INFO: u8 = b'I';

#[derive(Debug, Clone)]
pub enum BatchOp {
    Put { table: u8, key: Vec<u8>, value: Vec<u8> },
    Delete { table: u8, key: Vec<u8> },
}

/// Buffered writes, committed all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, table: u8, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            table,
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, table: u8, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            table,
            key: key.into(),
        });
        self
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Implemented by the host's storage engine. The engine only relies on snapshot-consistent point
/// reads and on `commit` being atomic and durable.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, table: u8, key: &[u8]) -> Result<Option<Vec<u8>>, ChainStorageError>;

    fn exists(&self, table: u8, key: &[u8]) -> Result<bool, ChainStorageError> {
        Ok(self.get(table, key)?.is_some())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), ChainStorageError>;
}

/// In-memory store used by tests and ephemeral views.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<(u8, Vec<u8>), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte-for-byte snapshot of every key and value, for apply/undo equivalence checks.
    pub fn snapshot(&self) -> BTreeMap<(u8, Vec<u8>), Vec<u8>> {
        self.entries.read().expect("store lock poisoned").clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, table: u8, key: &[u8]) -> Result<Option<Vec<u8>>, ChainStorageError> {
        Ok(self
            .entries
            .read()
            .expect("store lock poisoned")
            .get(&(table, key.to_vec()))
            .cloned())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), ChainStorageError> {
        let mut entries = self.entries.write().expect("store lock poisoned");
        for op in batch.ops() {
            match op {
                BatchOp::Put { table, key, value } => {
                    entries.insert((*table, key.clone()), value.clone());
                },
                BatchOp::Delete { table, key } => {
                    entries.remove(&(*table, key.clone()));
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn batch_is_applied_in_order() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(TABLE_UTXO, b"k".to_vec(), b"v1".to_vec());
        batch.put(TABLE_UTXO, b"k".to_vec(), b"v2".to_vec());
        batch.delete(TABLE_LEAF, b"gone".to_vec());
        store.commit(batch).unwrap();
        assert_eq!(store.get(TABLE_UTXO, b"k").unwrap(), Some(b"v2".to_vec()));
        assert!(!store.exists(TABLE_LEAF, b"gone").unwrap());
    }

    #[test]
    fn tables_are_disjoint() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(TABLE_UTXO, b"k".to_vec(), b"utxo".to_vec());
        batch.put(TABLE_HEADER, b"k".to_vec(), b"header".to_vec());
        store.commit(batch).unwrap();
        assert_eq!(store.get(TABLE_UTXO, b"k").unwrap(), Some(b"utxo".to_vec()));
        assert_eq!(store.get(TABLE_HEADER, b"k").unwrap(), Some(b"header".to_vec()));
    }
}
