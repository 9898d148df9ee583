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
    collections::HashMap,
    io::{self, Read, Write},
};

use log::*;
use mweb_mmr::{Backend, CachedBackend, LeafIndex, LeafSet, MerkleMountainRange};

use super::{
    coins_view::{CoinsView, Tree, TreeSource, TreeUpdates, UtxoEntry, ViewUpdates},
    error::ChainStorageError,
};
use crate::{
    blocks::{Block, Header},
    consensus::{ConsensusDecoding, ConsensusEncoding},
    crypto,
    transactions::{transaction_components::Output, TxBody},
    types::{BlindingFactor, Commitment, HashDigest, PublicKey},
    validation::{validate_kernel_sums, validate_owner_sums, ValidationError},
};

pub const LOG_TARGET: &str = "mweb::chain_storage::cache";

type CachedMmr<'a, V> = MerkleMountainRange<HashDigest, CachedBackend<TreeSource<'a, V>>>;

/// An output cleared from the leafset by a block, kept so disconnection can restore it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpentOutput {
    pub leaf_index: LeafIndex,
    pub height: u64,
    pub output: Output,
}

/// Everything needed to reverse one connected block, in LIFO order.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockUndo {
    pub prev_header: Option<Header>,
    pub spent: Vec<SpentOutput>,
    pub added: Vec<Commitment>,
    pub prev_kernel_leaves: u64,
    pub prev_output_leaves: u64,
}

impl ConsensusEncoding for BlockUndo {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match &self.prev_header {
            None => 0u8.consensus_encode(writer)?,
            Some(header) => {
                1u8.consensus_encode(writer)?;
                header.consensus_encode(writer)?;
            },
        }
        (self.spent.len() as u64).consensus_encode(writer)?;
        for spent in &self.spent {
            spent.leaf_index.0.consensus_encode(writer)?;
            spent.height.consensus_encode(writer)?;
            spent.output.consensus_encode(writer)?;
        }
        (self.added.len() as u64).consensus_encode(writer)?;
        for commitment in &self.added {
            commitment.consensus_encode(writer)?;
        }
        self.prev_kernel_leaves.consensus_encode(writer)?;
        self.prev_output_leaves.consensus_encode(writer)
    }
}

impl ConsensusDecoding for BlockUndo {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let prev_header = match u8::consensus_decode(reader)? {
            0 => None,
            1 => Some(Header::consensus_decode(reader)?),
            _ => return Err(crate::consensus::invalid_data("bad option tag")),
        };
        let num_spent = u64::consensus_decode(reader)?;
        let mut spent = Vec::with_capacity(num_spent.min(1024) as usize);
        for _ in 0..num_spent {
            spent.push(SpentOutput {
                leaf_index: LeafIndex(u64::consensus_decode(reader)?),
                height: u64::consensus_decode(reader)?,
                output: Output::consensus_decode(reader)?,
            });
        }
        let num_added = u64::consensus_decode(reader)?;
        let mut added = Vec::with_capacity(num_added.min(1024) as usize);
        for _ in 0..num_added {
            added.push(Commitment::consensus_decode(reader)?);
        }
        Ok(BlockUndo {
            prev_header,
            spent,
            added,
            prev_kernel_leaves: u64::consensus_decode(reader)?,
            prev_output_leaves: u64::consensus_decode(reader)?,
        })
    }
}

/// A dirty layer stacked on a parent [`CoinsView`]. All mutation happens here; the parent is
/// untouched until [`CoinsViewCache::into_updates`] drains the layer and the caller commits it.
/// Dropping the cache discards every pending change, which is exactly the abort path.
pub struct CoinsViewCache<'a, V: CoinsView> {
    parent: &'a V,
    best_header: Option<Header>,
    leafset: LeafSet,
    kernel_mmr: CachedMmr<'a, V>,
    output_mmr: CachedMmr<'a, V>,
    rangeproof_mmr: CachedMmr<'a, V>,
    // Some = added or restored, None = spent/removed
    utxo_overlay: HashMap<[u8; 33], Option<UtxoEntry>>,
    leaf_data_delete: Vec<(Tree, mweb_mmr::Hash)>,
}

impl<'a, V: CoinsView> CoinsViewCache<'a, V> {
    pub fn new(parent: &'a V) -> Result<Self, ChainStorageError> {
        Ok(Self {
            best_header: parent.best_header(),
            leafset: parent.leafset().clone(),
            kernel_mmr: MerkleMountainRange::new(CachedBackend::new(TreeSource::new(parent, Tree::Kernel))?),
            output_mmr: MerkleMountainRange::new(CachedBackend::new(TreeSource::new(parent, Tree::Output))?),
            rangeproof_mmr: MerkleMountainRange::new(CachedBackend::new(TreeSource::new(parent, Tree::RangeProof))?),
            utxo_overlay: HashMap::new(),
            leaf_data_delete: Vec::new(),
            parent,
        })
    }

    /// Applies a block atomically against this cache: spends inputs, appends outputs and kernels,
    /// enforces the balance laws against the previous header's offset totals, and rejects the
    /// block if any recomputed root disagrees with its header.
    pub fn apply_block(&mut self, block: &Block) -> Result<BlockUndo, ChainStorageError> {
        let prev_header = self.best_header.clone();
        if let Some(prev) = &prev_header {
            if block.height() != prev.height + 1 {
                return Err(ValidationError::HeightMismatch {
                    height: block.height(),
                    tip: prev.height,
                }
                .into());
            }
        }

        for kernel in block.body().kernels() {
            if kernel.lock_height.map(|h| h > block.height()).unwrap_or(false) {
                return Err(ValidationError::KernelLockHeight {
                    lock_height: kernel.lock_height.unwrap_or_default(),
                    height: block.height(),
                }
                .into());
            }
        }

        let mut undo = self.apply_body(block.body(), block.height())?;
        undo.prev_header = prev_header.clone();

        let (prev_kernel_offset, prev_owner_offset) = match &prev_header {
            Some(prev) => (prev.kernel_offset, prev.owner_offset),
            None => (BlindingFactor::default(), BlindingFactor::default()),
        };
        let kernel_delta =
            crypto::add_blinding_factors(&[block.header().kernel_offset], &[prev_kernel_offset])
                .map_err(ValidationError::Crypto)?;
        validate_kernel_sums(block.body(), &kernel_delta)?;

        let owner_delta = crypto::add_blinding_factors(&[block.header().owner_offset], &[prev_owner_offset])
            .map_err(ValidationError::Crypto)?;
        let spent_keys: Vec<PublicKey> = undo.spent.iter().map(|s| *s.output.receiver_pubkey()).collect();
        validate_owner_sums(block.body(), &owner_delta, &spent_keys)?;

        self.check_roots(block.header())?;
        self.best_header = Some(block.header().clone());
        trace!(target: LOG_TARGET, "Applied block {}", block);
        Ok(undo)
    }

    /// The raw state mutation: inputs, then outputs, then kernels. Used by [`apply_block`] and by
    /// block assembly, which needs the post-state roots before a header exists.
    pub fn apply_body(&mut self, body: &TxBody, height: u64) -> Result<BlockUndo, ChainStorageError> {
        let prev_kernel_leaves = self.kernel_mmr.leaf_count()?;
        let prev_output_leaves = self.output_mmr.leaf_count()?;

        let mut spent = Vec::with_capacity(body.inputs().len());
        for input in body.inputs() {
            let commitment = input.commitment;
            let entry = self
                .utxo(&commitment)?
                .ok_or_else(|| ChainStorageError::UnknownOutput {
                    commitment: hex::encode(commitment.0),
                })?;
            if !self.leafset.contains(entry.leaf_index) {
                return Err(ChainStorageError::DoubleSpend {
                    commitment: hex::encode(commitment.0),
                });
            }
            let output = self
                .output_at(entry.leaf_index)?
                .ok_or_else(|| ChainStorageError::UnknownOutput {
                    commitment: hex::encode(commitment.0),
                })?;
            // only the leafset bit is cleared; the commitment->leaf index stays, so a later
            // double-spend attempt is distinguishable from an unknown output
            self.leafset.remove(entry.leaf_index);
            spent.push(SpentOutput {
                leaf_index: entry.leaf_index,
                height: entry.height,
                output,
            });
        }

        let mut added = Vec::with_capacity(body.outputs().len());
        for output in body.outputs() {
            let commitment = *output.commitment();
            if let Some(entry) = self.utxo(&commitment)? {
                if self.leafset.contains(entry.leaf_index) {
                    return Err(ChainStorageError::DuplicateCommitment {
                        commitment: hex::encode(commitment.0),
                    });
                }
            }
            let leaf_index = self.output_mmr.push(output.to_wire_bytes())?;
            let proof_index = self.rangeproof_mmr.push(output.range_proof().bytes().to_vec())?;
            debug_assert_eq!(leaf_index, proof_index);
            self.leafset.add(leaf_index);
            self.utxo_overlay
                .insert(commitment.0, Some(UtxoEntry { leaf_index, height }));
            added.push(commitment);
        }

        for kernel in body.kernels() {
            self.kernel_mmr.push(kernel.to_wire_bytes())?;
        }

        Ok(BlockUndo {
            prev_header: None,
            spent,
            added,
            prev_kernel_leaves,
            prev_output_leaves,
        })
    }

    /// Reverses one block in LIFO order using its undo data.
    pub fn undo_block(&mut self, undo: &BlockUndo) -> Result<(), ChainStorageError> {
        let output_leaves = self.output_mmr.leaf_count()?;
        let kernel_leaves = self.kernel_mmr.leaf_count()?;

        // remember the hashes of the leaves being cut off so their data can be deleted downstream
        for index in undo.prev_output_leaves..output_leaves {
            if let Some(hash) = self.output_mmr.get_leaf_hash(LeafIndex(index))? {
                self.leaf_data_delete.push((Tree::Output, hash));
            }
            if let Some(hash) = self.rangeproof_mmr.get_leaf_hash(LeafIndex(index))? {
                self.leaf_data_delete.push((Tree::RangeProof, hash));
            }
        }
        for index in undo.prev_kernel_leaves..kernel_leaves {
            if let Some(hash) = self.kernel_mmr.get_leaf_hash(LeafIndex(index))? {
                self.leaf_data_delete.push((Tree::Kernel, hash));
            }
        }

        self.kernel_mmr.rewind(undo.prev_kernel_leaves)?;
        self.output_mmr.rewind(undo.prev_output_leaves)?;
        self.rangeproof_mmr.rewind(undo.prev_output_leaves)?;
        self.leafset.rewind(undo.prev_output_leaves);

        for commitment in &undo.added {
            self.utxo_overlay.insert(commitment.0, None);
        }
        for spent in &undo.spent {
            self.leafset.add(spent.leaf_index);
            self.utxo_overlay.insert(
                spent.output.commitment().0,
                Some(UtxoEntry {
                    leaf_index: spent.leaf_index,
                    height: spent.height,
                }),
            );
        }

        if let Some(prev) = &undo.prev_header {
            self.check_roots(prev)?;
        }
        self.best_header = undo.prev_header.clone();
        trace!(
            target: LOG_TARGET,
            "Disconnected block; new tip {:?}",
            self.best_header.as_ref().map(|h| h.height)
        );
        Ok(())
    }

    /// The four committed roots of the cache's current state.
    pub fn roots(&self) -> Result<Roots, ChainStorageError> {
        Ok(Roots {
            output_root: self.output_mmr.root()?.into(),
            rangeproof_root: self.rangeproof_mmr.root()?.into(),
            kernel_root: self.kernel_mmr.root()?.into(),
            leafset_root: self.leafset.root::<HashDigest>().into(),
        })
    }

    fn check_roots(&self, header: &Header) -> Result<(), ChainStorageError> {
        let roots = self.roots()?;
        if roots.output_root != header.output_root {
            return Err(ChainStorageError::RootMismatch { tree: "output" });
        }
        if roots.rangeproof_root != header.rangeproof_root {
            return Err(ChainStorageError::RootMismatch { tree: "rangeproof" });
        }
        if roots.kernel_root != header.kernel_root {
            return Err(ChainStorageError::RootMismatch { tree: "kernel" });
        }
        if roots.leafset_root != header.leafset_root {
            return Err(ChainStorageError::RootMismatch { tree: "leafset" });
        }
        Ok(())
    }

    /// Drains the layer into the update set its parent commits. Consuming the cache releases the
    /// parent borrow, so the caller can go on to take the parent mutably.
    pub fn into_updates(self) -> Result<ViewUpdates, ChainStorageError> {
        let mut utxo_put = Vec::new();
        let mut utxo_delete = Vec::new();
        for (commitment, entry) in self.utxo_overlay {
            match entry {
                Some(entry) => utxo_put.push((Commitment(commitment), entry)),
                None => utxo_delete.push(Commitment(commitment)),
            }
        }
        Ok(ViewUpdates {
            best_header: self.best_header,
            kernel: tree_updates(&self.kernel_mmr)?,
            output: tree_updates(&self.output_mmr)?,
            rangeproof: tree_updates(&self.rangeproof_mmr)?,
            leafset: self.leafset,
            utxo_put,
            utxo_delete,
            leaf_data_delete: self.leaf_data_delete,
        })
    }
}

/// The committed roots at a tip.
#[derive(Debug, Clone, PartialEq)]
pub struct Roots {
    pub output_root: crate::types::Hash,
    pub rangeproof_root: crate::types::Hash,
    pub kernel_root: crate::types::Hash,
    pub leafset_root: crate::types::Hash,
}

fn tree_updates<'a, V: CoinsView>(mmr: &CachedMmr<'a, V>) -> Result<TreeUpdates, ChainStorageError> {
    Ok(TreeUpdates {
        delta: mmr.backend().delta(),
        node_count: mmr.backend().node_count()?,
        leaf_count: mmr.backend().leaf_count()?,
    })
}

impl<'a, V: CoinsView> CoinsView for CoinsViewCache<'a, V> {
    fn best_header(&self) -> Option<Header> {
        self.best_header.clone()
    }

    fn leafset(&self) -> &LeafSet {
        &self.leafset
    }

    fn utxo(&self, commitment: &Commitment) -> Result<Option<UtxoEntry>, ChainStorageError> {
        if let Some(entry) = self.utxo_overlay.get(&commitment.0) {
            return Ok(*entry);
        }
        self.parent.utxo(commitment)
    }

    fn mmr_node_count(&self, tree: Tree) -> Result<u64, ChainStorageError> {
        self.mmr(tree).backend().node_count()
    }

    fn mmr_leaf_count(&self, tree: Tree) -> Result<u64, ChainStorageError> {
        self.mmr(tree).backend().leaf_count()
    }

    fn mmr_node_hash(&self, tree: Tree, pos: u64) -> Result<Option<mweb_mmr::Hash>, ChainStorageError> {
        self.mmr(tree).backend().get_hash(pos)
    }

    fn mmr_leaf(&self, tree: Tree, index: LeafIndex) -> Result<Option<Vec<u8>>, ChainStorageError> {
        self.mmr(tree).backend().get_leaf(index)
    }

    fn commit(&mut self, updates: ViewUpdates) -> Result<(), ChainStorageError> {
        for tree in Tree::ALL {
            let tree_updates = updates.tree(tree).clone();
            let backend = self.mmr_mut(tree).backend_mut();
            backend.truncate(tree_updates.delta.node_start, tree_updates.delta.leaf_start)?;
            for hash in tree_updates.delta.nodes {
                backend.push_hash(hash)?;
            }
            for (hash, data) in tree_updates.delta.leaves {
                backend.push_leaf(hash, data)?;
            }
        }
        self.leafset = updates.leafset;
        for (commitment, entry) in updates.utxo_put {
            self.utxo_overlay.insert(commitment.0, Some(entry));
        }
        for commitment in updates.utxo_delete {
            self.utxo_overlay.insert(commitment.0, None);
        }
        self.leaf_data_delete.extend(updates.leaf_data_delete);
        self.best_header = updates.best_header;
        Ok(())
    }
}

impl<'a, V: CoinsView> CoinsViewCache<'a, V> {
    fn mmr(&self, tree: Tree) -> &CachedMmr<'a, V> {
        match tree {
            Tree::Kernel => &self.kernel_mmr,
            Tree::Output => &self.output_mmr,
            Tree::RangeProof => &self.rangeproof_mmr,
        }
    }

    fn mmr_mut(&mut self, tree: Tree) -> &mut CachedMmr<'a, V> {
        match tree {
            Tree::Kernel => &mut self.kernel_mmr,
            Tree::Output => &mut self.output_mmr,
            Tree::RangeProof => &mut self.rangeproof_mmr,
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{
        chain_storage::{CoinsViewDb, MemoryStore},
        test_helpers::{build_next_block, TxBuilder},
        transactions::Transaction,
    };

    fn pegin(amount: u64) -> Transaction {
        TxBuilder::new()
            .add_pegin_output(amount)
            .add_pegin_kernel(amount)
            .build()
            .unwrap()
    }

    fn db_view() -> CoinsViewDb {
        let dir = std::env::temp_dir().join(format!("mweb_cache_test_{}", std::process::id()));
        CoinsViewDb::open(Arc::new(MemoryStore::new()), dir).unwrap()
    }

    #[test]
    fn apply_then_undo_restores_the_view() {
        let base = db_view();
        let block = build_next_block(&base, vec![pegin(1_000_000)]).unwrap();

        let mut cache = CoinsViewCache::new(&base).unwrap();
        let roots_before = cache.roots().unwrap();
        let undo = cache.apply_block(&block).unwrap();
        assert_eq!(cache.best_header().unwrap(), *block.header());

        cache.undo_block(&undo).unwrap();
        assert_eq!(cache.roots().unwrap(), roots_before);
        assert!(cache.best_header().is_none());
        assert!(cache.utxo(block.body().outputs()[0].commitment()).unwrap().is_none());
    }

    #[test]
    fn nested_cache_flushes_into_its_parent() {
        let base = db_view();
        let block = build_next_block(&base, vec![pegin(2_000_000)]).unwrap();

        let mut outer = CoinsViewCache::new(&base).unwrap();
        let updates = {
            let mut inner = CoinsViewCache::new(&outer).unwrap();
            inner.apply_block(&block).unwrap();
            inner.into_updates().unwrap()
        };
        outer.commit(updates).unwrap();

        assert_eq!(outer.best_header().unwrap(), *block.header());
        let roots = outer.roots().unwrap();
        assert_eq!(roots.output_root, block.header().output_root);
        assert_eq!(roots.kernel_root, block.header().kernel_root);
        assert_eq!(roots.leafset_root, block.header().leafset_root);
        assert!(outer.utxo(block.body().outputs()[0].commitment()).unwrap().is_some());

        // the backing view saw none of it
        assert!(base.best_header().is_none());
        assert_eq!(base.leafset().len(), 0);
    }

    #[test]
    fn discarding_a_cache_leaves_no_trace() {
        let base = db_view();
        let block = build_next_block(&base, vec![pegin(3_000_000)]).unwrap();
        {
            let mut cache = CoinsViewCache::new(&base).unwrap();
            cache.apply_block(&block).unwrap();
            // dropped without into_updates: the abort path
        }
        assert!(base.best_header().is_none());
        assert_eq!(base.mmr_leaf_count(Tree::Output).unwrap(), 0);
    }
}

