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

use std::io::{self, Read, Write};

use mweb_mmr::{BackendDelta, LeafIndex, LeafSet, NodeSource};

use super::error::ChainStorageError;
use crate::{
    blocks::Header,
    consensus::{ConsensusDecoding, ConsensusEncoding},
    transactions::transaction_components::Output,
    types::Commitment,
};

/// The three authenticated structures maintained per chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree {
    Kernel,
    Output,
    RangeProof,
}

impl Tree {
    pub const ALL: [Tree; 3] = [Tree::Kernel, Tree::Output, Tree::RangeProof];

    /// One-byte prefix namespacing this tree's keys, matching its on-disk file prefix.
    pub fn prefix(self) -> u8 {
        match self {
            Tree::Kernel => b'K',
            Tree::Output => b'O',
            Tree::RangeProof => b'R',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tree::Kernel => "kernel",
            Tree::Output => "output",
            Tree::RangeProof => "rangeproof",
        }
    }
}

/// UTXO-index record: where an unspent output lives and when it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoEntry {
    pub leaf_index: LeafIndex,
    pub height: u64,
}

impl ConsensusEncoding for UtxoEntry {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.leaf_index.0.consensus_encode(writer)?;
        self.height.consensus_encode(writer)
    }
}

impl ConsensusDecoding for UtxoEntry {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(UtxoEntry {
            leaf_index: LeafIndex(u64::consensus_decode(reader)?),
            height: u64::consensus_decode(reader)?,
        })
    }
}

/// A layered view of the coins state. `CoinsViewDb` reads the committed tip; `CoinsViewCache`
/// stacks dirty state on any parent view. Writes flow down through [`CoinsView::commit`], one
/// layer at a time, and reach disk as a single atomic batch.
pub trait CoinsView {
    fn best_header(&self) -> Option<Header>;

    fn leafset(&self) -> &LeafSet;

    fn utxo(&self, commitment: &Commitment) -> Result<Option<UtxoEntry>, ChainStorageError>;

    fn mmr_node_count(&self, tree: Tree) -> Result<u64, ChainStorageError>;

    fn mmr_leaf_count(&self, tree: Tree) -> Result<u64, ChainStorageError>;

    fn mmr_node_hash(&self, tree: Tree, pos: u64) -> Result<Option<mweb_mmr::Hash>, ChainStorageError>;

    fn mmr_leaf(&self, tree: Tree, index: LeafIndex) -> Result<Option<Vec<u8>>, ChainStorageError>;

    /// Decodes the output stored at the given leaf, spent or not.
    fn output_at(&self, index: LeafIndex) -> Result<Option<Output>, ChainStorageError> {
        match self.mmr_leaf(Tree::Output, index)? {
            None => Ok(None),
            Some(bytes) => Output::from_wire_bytes(&bytes)
                .map(Some)
                .map_err(|e| ChainStorageError::Serialization(e.to_string())),
        }
    }

    /// Applies a flushed child layer's dirty state to this layer.
    fn commit(&mut self, updates: ViewUpdates) -> Result<(), ChainStorageError>;
}

/// Everything a cache layer changed, drained at flush time and applied to the parent in one shot.
#[derive(Debug, Clone)]
pub struct ViewUpdates {
    /// The new tip; `None` means the extension chain rewound past its first block.
    pub best_header: Option<Header>,
    pub kernel: TreeUpdates,
    pub output: TreeUpdates,
    pub rangeproof: TreeUpdates,
    pub leafset: LeafSet,
    pub utxo_put: Vec<(Commitment, UtxoEntry)>,
    pub utxo_delete: Vec<Commitment>,
    /// Leaf hashes whose data fell off the end of a rewound tree.
    pub leaf_data_delete: Vec<(Tree, mweb_mmr::Hash)>,
}

#[derive(Debug, Clone)]
pub struct TreeUpdates {
    pub delta: BackendDelta,
    /// Post-update node and leaf counts; anything beyond them is truncated.
    pub node_count: u64,
    pub leaf_count: u64,
}

impl ViewUpdates {
    pub fn tree(&self, tree: Tree) -> &TreeUpdates {
        match tree {
            Tree::Kernel => &self.kernel,
            Tree::Output => &self.output,
            Tree::RangeProof => &self.rangeproof,
        }
    }
}

/// Adapter presenting one tree of a parent [`CoinsView`] as the read-only base of a cached MMR.
pub struct TreeSource<'a, V: ?Sized> {
    view: &'a V,
    tree: Tree,
}

impl<'a, V: CoinsView + ?Sized> TreeSource<'a, V> {
    pub fn new(view: &'a V, tree: Tree) -> Self {
        Self { view, tree }
    }
}

impl<'a, V: CoinsView + ?Sized> NodeSource for TreeSource<'a, V> {
    type Error = ChainStorageError;

    fn base_node_count(&self) -> Result<u64, Self::Error> {
        self.view.mmr_node_count(self.tree)
    }

    fn base_leaf_count(&self) -> Result<u64, Self::Error> {
        self.view.mmr_leaf_count(self.tree)
    }

    fn base_hash(&self, pos: u64) -> Result<Option<mweb_mmr::Hash>, Self::Error> {
        self.view.mmr_node_hash(self.tree, pos)
    }

    fn base_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, Self::Error> {
        self.view.mmr_leaf(self.tree, index)
    }
}
