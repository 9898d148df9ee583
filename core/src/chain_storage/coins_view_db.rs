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

use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::*;
use mweb_mmr::{LeafIndex, LeafSet};

use super::{
    coins_view::{CoinsView, Tree, UtxoEntry, ViewUpdates},
    error::ChainStorageError,
    kv::{KeyValueStore, WriteBatch, TABLE_HEADER, TABLE_INFO, TABLE_LEAF, TABLE_NODE, TABLE_UTXO},
};
use crate::{
    blocks::Header,
    consensus::{ConsensusDecoding, ConsensusEncoding, Hashed},
    types::{Commitment, Hash},
};

pub const LOG_TARGET: &str = "mweb::chain_storage::db";

const INFO_KEY: &[u8] = b"latest";

/// The committed tip: MMR sizes, the referenced leafset file, and the best header. Everything
/// here survives restarts; the K/V tables and the leafset file index are its single source of
/// truth.
#[derive(Debug, Clone, Default, PartialEq)]
struct MmrInfo {
    file_index: u32,
    counts: [(u64, u64); 3],
    best_header_hash: Option<Hash>,
}

impl ConsensusEncoding for MmrInfo {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.file_index.consensus_encode(writer)?;
        for (nodes, leaves) in &self.counts {
            nodes.consensus_encode(writer)?;
            leaves.consensus_encode(writer)?;
        }
        match &self.best_header_hash {
            None => 0u8.consensus_encode(writer),
            Some(hash) => {
                1u8.consensus_encode(writer)?;
                hash.consensus_encode(writer)
            },
        }
    }
}

impl ConsensusDecoding for MmrInfo {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let file_index = u32::consensus_decode(reader)?;
        let mut counts = [(0u64, 0u64); 3];
        for entry in &mut counts {
            entry.0 = u64::consensus_decode(reader)?;
            entry.1 = u64::consensus_decode(reader)?;
        }
        let best_header_hash = match u8::consensus_decode(reader)? {
            0 => None,
            1 => Some(Hash::consensus_decode(reader)?),
            _ => return Err(crate::consensus::invalid_data("bad option tag")),
        };
        Ok(MmrInfo {
            file_index,
            counts,
            best_header_hash,
        })
    }
}

fn tree_slot(tree: Tree) -> usize {
    match tree {
        Tree::Kernel => 0,
        Tree::Output => 1,
        Tree::RangeProof => 2,
    }
}

fn node_key(tree: Tree, pos: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(tree.prefix());
    key.extend_from_slice(&pos.to_be_bytes());
    key
}

fn leaf_key(tree: Tree, hash: &mweb_mmr::Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(tree.prefix());
    key.extend_from_slice(hash);
    key
}

/// Read-committed view over the backing K/V store and leafset file. The sole writer is the node
/// façade; readers may hold this view concurrently and never observe in-flight cache state.
pub struct CoinsViewDb {
    db: Arc<dyn KeyValueStore>,
    chain_dir: PathBuf,
    info: MmrInfo,
    best_header: Option<Header>,
    leafset: LeafSet,
}

impl CoinsViewDb {
    /// Opens (or initializes) the committed view under `<chain_dir>`.
    pub fn open(db: Arc<dyn KeyValueStore>, chain_dir: impl Into<PathBuf>) -> Result<Self, ChainStorageError> {
        let chain_dir = chain_dir.into();
        let info = match db.get(TABLE_INFO, INFO_KEY)? {
            Some(bytes) => MmrInfo::from_wire_bytes(&bytes)
                .map_err(|e| ChainStorageError::Serialization(e.to_string()))?,
            None => MmrInfo::default(),
        };
        let leafset = LeafSet::open(&leafset_dir(&chain_dir), info.file_index)?;
        let best_header = match &info.best_header_hash {
            None => None,
            Some(hash) => Some(load_header(db.as_ref(), hash)?),
        };
        debug!(
            target: LOG_TARGET,
            "Opened coins view at height {:?}, file index {}",
            best_header.as_ref().map(|h| h.height),
            info.file_index
        );
        Ok(Self {
            db,
            chain_dir,
            info,
            best_header,
            leafset,
        })
    }

    pub fn db(&self) -> &Arc<dyn KeyValueStore> {
        &self.db
    }

    pub fn header(&self, hash: &Hash) -> Result<Option<Header>, ChainStorageError> {
        match self.db.get(TABLE_HEADER, hash.as_bytes().as_slice())? {
            None => Ok(None),
            Some(bytes) => Header::from_wire_bytes(&bytes)
                .map(Some)
                .map_err(|e| ChainStorageError::Serialization(e.to_string())),
        }
    }
}

fn leafset_dir(chain_dir: &Path) -> PathBuf {
    chain_dir.join("leafset")
}

fn load_header(db: &dyn KeyValueStore, hash: &Hash) -> Result<Header, ChainStorageError> {
    let bytes = db
        .get(TABLE_HEADER, hash.as_bytes().as_slice())?
        .ok_or_else(|| ChainStorageError::InvalidOperation(format!("best header {} missing", hash)))?;
    Header::from_wire_bytes(&bytes).map_err(|e| ChainStorageError::Serialization(e.to_string()))
}

impl CoinsView for CoinsViewDb {
    fn best_header(&self) -> Option<Header> {
        self.best_header.clone()
    }

    fn leafset(&self) -> &LeafSet {
        &self.leafset
    }

    fn utxo(&self, commitment: &Commitment) -> Result<Option<UtxoEntry>, ChainStorageError> {
        match self.db.get(TABLE_UTXO, &commitment.0)? {
            None => Ok(None),
            Some(bytes) => UtxoEntry::from_wire_bytes(&bytes)
                .map(Some)
                .map_err(|e| ChainStorageError::Serialization(e.to_string())),
        }
    }

    fn mmr_node_count(&self, tree: Tree) -> Result<u64, ChainStorageError> {
        Ok(self.info.counts[tree_slot(tree)].0)
    }

    fn mmr_leaf_count(&self, tree: Tree) -> Result<u64, ChainStorageError> {
        Ok(self.info.counts[tree_slot(tree)].1)
    }

    fn mmr_node_hash(&self, tree: Tree, pos: u64) -> Result<Option<mweb_mmr::Hash>, ChainStorageError> {
        if pos >= self.info.counts[tree_slot(tree)].0 {
            return Ok(None);
        }
        match self.db.get(TABLE_NODE, &node_key(tree, pos))? {
            None => Ok(None),
            Some(bytes) => {
                let hash: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| ChainStorageError::Serialization("node hash is not 32 bytes".into()))?;
                Ok(Some(hash))
            },
        }
    }

    fn mmr_leaf(&self, tree: Tree, index: LeafIndex) -> Result<Option<Vec<u8>>, ChainStorageError> {
        if index.0 >= self.info.counts[tree_slot(tree)].1 {
            return Ok(None);
        }
        let leaf_hash = match self.mmr_node_hash(tree, index.node_index().0)? {
            None => return Ok(None),
            Some(hash) => hash,
        };
        self.db.get(TABLE_LEAF, &leaf_key(tree, &leaf_hash))
    }

    /// Writes a flushed cache layer to disk: the leafset file first (under a bumped file index),
    /// then every K/V mutation in one atomic batch that also publishes the new file index. A
    /// crash between the two leaves the old index live and the store untouched.
    fn commit(&mut self, updates: ViewUpdates) -> Result<(), ChainStorageError> {
        let new_file_index = self.info.file_index.wrapping_add(1);
        updates.leafset.flush(&leafset_dir(&self.chain_dir), new_file_index)?;

        let mut batch = WriteBatch::new();
        let mut new_info = MmrInfo {
            file_index: new_file_index,
            counts: [(0, 0); 3],
            best_header_hash: updates.best_header.as_ref().map(Hashed::hash),
        };

        for tree in Tree::ALL {
            let tree_updates = updates.tree(tree);
            let slot = tree_slot(tree);
            let (old_nodes, _) = self.info.counts[slot];
            new_info.counts[slot] = (tree_updates.node_count, tree_updates.leaf_count);

            // drop nodes cut off by a rewind
            for pos in tree_updates.node_count..old_nodes {
                batch.delete(TABLE_NODE, node_key(tree, pos));
            }
            for (i, hash) in tree_updates.delta.nodes.iter().enumerate() {
                batch.put(TABLE_NODE, node_key(tree, tree_updates.delta.node_start + i as u64), hash.to_vec());
            }
            for (hash, data) in &tree_updates.delta.leaves {
                batch.put(TABLE_LEAF, leaf_key(tree, hash), data.clone());
            }
        }

        for (tree, hash) in &updates.leaf_data_delete {
            batch.delete(TABLE_LEAF, leaf_key(*tree, hash));
        }
        for (commitment, entry) in &updates.utxo_put {
            batch.put(TABLE_UTXO, commitment.0.to_vec(), entry.to_wire_bytes());
        }
        for commitment in &updates.utxo_delete {
            batch.delete(TABLE_UTXO, commitment.0.to_vec());
        }
        if let Some(header) = &updates.best_header {
            batch.put(TABLE_HEADER, header.hash().to_vec(), header.to_wire_bytes());
        }
        batch.put(TABLE_INFO, INFO_KEY.to_vec(), new_info.to_wire_bytes());

        self.db.commit(batch)?;

        trace!(
            target: LOG_TARGET,
            "Committed tip {:?} (file index {})",
            updates.best_header.as_ref().map(|h| h.height),
            new_file_index
        );
        self.info = new_info;
        self.best_header = updates.best_header;
        self.leafset = updates.leafset;
        Ok(())
    }
}
