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

//! The engine's entry points for the host node: validate → connect → disconnect cycles, driven
//! strictly single-writer against the committed view.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use log::*;

mod config;

pub use config::NodeConfig;

use crate::{
    blocks::{Block, Header},
    chain_storage::{
        BlockUndo,
        ChainStorageError,
        CoinsView,
        CoinsViewCache,
        CoinsViewDb,
        KeyValueStore,
        Tree,
    },
    consensus::{ChainParams, ConsensusEncoding, Hashed},
    transactions::{
        transaction_components::{Kernel, PegInCoin, PegOutCoin},
        Transaction,
    },
    types::{Commitment, Hash, PublicKey},
    validation::{validate_owner_sums, BlockValidator, ValidationError},
};

pub const LOG_TARGET: &str = "mweb::node";

/// Host-chain block storage, used only for the initial-sync replay.
pub trait BlockStore {
    fn block(&self, hash: &Hash) -> Result<Option<Block>, ChainStorageError>;

    /// The hash of the block built on top of `hash`, if any.
    fn next_block_hash(&self, hash: &Hash) -> Result<Option<Hash>, ChainStorageError>;
}

/// Orchestrates validation and state transitions atop the coins view. The node is the only writer
/// of the committed state; connect and disconnect serialize behind its write lock, while balance
/// and UTXO queries share the read lock and never observe in-flight cache state.
pub struct Node {
    params: ChainParams,
    config: NodeConfig,
    view: RwLock<CoinsViewDb>,
}

/// Opens the committed view under `config.datadir/chain/` and wraps it in a node façade.
pub fn initialize_node(
    config: NodeConfig,
    params: ChainParams,
    db: Arc<dyn KeyValueStore>,
) -> Result<Node, ChainStorageError> {
    let view = CoinsViewDb::open(db, config.chain_dir())?;
    info!(
        target: LOG_TARGET,
        "Node initialized at {:?}, tip {:?}",
        config.datadir,
        view.best_header().map(|h| h.height)
    );
    Ok(Node {
        params,
        config,
        view: RwLock::new(view),
    })
}

impl Node {
    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Shared read access to the committed view.
    pub fn view(&self) -> RwLockReadGuard<'_, CoinsViewDb> {
        self.view.read().expect("coins view lock poisoned")
    }

    pub fn best_header(&self) -> Option<Header> {
        self.view().best_header()
    }

    /// Context-free validation of a candidate extension block against the host block's committed
    /// MWEB hash and peg-in/peg-out coin lists. Touches no state.
    pub fn validate_block(
        &self,
        block: &Block,
        mweb_hash: &Hash,
        pegins: &[PegInCoin],
        pegouts: &[PegOutCoin],
    ) -> Result<(), ValidationError> {
        BlockValidator::new(&self.params).validate(block, mweb_hash, pegins, pegouts)
    }

    /// Full transaction validation for mempool admission: context-free checks, the kernel-sum
    /// law, and the owner-sum law against the spent outputs' keys from the committed view.
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), ChainStorageError> {
        BlockValidator::new(&self.params).validate_tx(tx)?;
        let view = self.view();
        let mut input_keys: Vec<PublicKey> = Vec::with_capacity(tx.body().inputs().len());
        for input in tx.body().inputs() {
            let entry = view
                .utxo(&input.commitment)?
                .ok_or_else(|| ChainStorageError::UnknownOutput {
                    commitment: hex::encode(input.commitment.0),
                })?;
            if !view.leafset().contains(entry.leaf_index) {
                return Err(ChainStorageError::DoubleSpend {
                    commitment: hex::encode(input.commitment.0),
                });
            }
            let output = view
                .output_at(entry.leaf_index)?
                .ok_or_else(|| ChainStorageError::UnknownOutput {
                    commitment: hex::encode(input.commitment.0),
                })?;
            input_keys.push(*output.receiver_pubkey());
        }
        validate_owner_sums(tx.body(), &tx.owner_offset, &input_keys)?;
        Ok(())
    }

    /// Applies the block to a fresh cache and, only if every rule and root holds, flushes the
    /// cache to the backing store in one atomic batch. Any failure discards the cache and leaves
    /// the committed tip untouched.
    pub fn connect_block(&self, block: &Block) -> Result<BlockUndo, ChainStorageError> {
        let mut view = self.view.write().expect("coins view lock poisoned");
        trace!(target: LOG_TARGET, "Connecting block {}", block);
        let (undo, updates) = {
            let mut cache = CoinsViewCache::new(&*view)?;
            let undo = cache.apply_block(block)?;
            (undo, cache.into_updates()?)
        };
        view.commit(updates)?;
        debug!(target: LOG_TARGET, "Block {} connected at height {}", block, block.height());
        Ok(undo)
    }

    /// Reverses the tip block using its undo data, restoring the previous committed state.
    pub fn disconnect_block(&self, undo: &BlockUndo) -> Result<(), ChainStorageError> {
        let mut view = self.view.write().expect("coins view lock poisoned");
        let updates = {
            let mut cache = CoinsViewCache::new(&*view)?;
            cache.undo_block(undo)?;
            cache.into_updates()?
        };
        view.commit(updates)?;
        debug!(
            target: LOG_TARGET,
            "Block disconnected; tip {:?}",
            undo.prev_header.as_ref().map(|h| h.height)
        );
        Ok(())
    }

    /// Fast initial sync: replays extension blocks from the host block store between the first
    /// MWEB header and the trusted state header onto an empty view (the host chain already
    /// reached consensus on signatures and proofs), then cross-checks the rebuilt state against
    /// the trusted UTXO commitments and kernel history before committing any of it.
    pub fn apply_state(
        &self,
        block_store: &dyn BlockStore,
        first_mw_header_hash: &Hash,
        state_header_hash: &Hash,
        utxos: &[Commitment],
        kernels: &[Kernel],
    ) -> Result<(), ChainStorageError> {
        let mut view = self.view.write().expect("coins view lock poisoned");
        if view.best_header().is_some() {
            return Err(ChainStorageError::InvalidOperation(
                "apply_state requires an empty view".into(),
            ));
        }

        let updates = {
            let mut cache = CoinsViewCache::new(&*view)?;
            let mut next = Some(*first_mw_header_hash);
            while let Some(hash) = next {
                let block = block_store
                    .block(&hash)?
                    .ok_or_else(|| ChainStorageError::InvalidOperation(format!("missing block {}", hash)))?;
                cache.apply_block(&block)?;
                if hash == *state_header_hash {
                    next = None;
                } else {
                    next = block_store.next_block_hash(&hash)?;
                    if next.is_none() {
                        return Err(ChainStorageError::InvalidOperation(format!(
                            "chain from {} never reaches {}",
                            first_mw_header_hash, state_header_hash
                        )));
                    }
                }
            }

            verify_state(&cache, utxos, kernels)?;
            cache.into_updates()?
        };
        view.commit(updates)?;
        info!(
            target: LOG_TARGET,
            "Initial state applied; tip {:?}",
            view.best_header().map(|h| h.height)
        );
        Ok(())
    }
}

/// The rebuilt state must carry exactly the trusted UTXO set and kernel history.
fn verify_state<V: CoinsView>(
    cache: &CoinsViewCache<'_, V>,
    utxos: &[Commitment],
    kernels: &[Kernel],
) -> Result<(), ChainStorageError> {
    if cache.leafset().len() != utxos.len() as u64 {
        return Err(ChainStorageError::StateMismatch(format!(
            "{} unspent outputs rebuilt, {} expected",
            cache.leafset().len(),
            utxos.len()
        )));
    }
    for commitment in utxos {
        let entry = cache
            .utxo(commitment)?
            .ok_or_else(|| ChainStorageError::StateMismatch(format!("missing utxo {}", hex::encode(commitment.0))))?;
        if !cache.leafset().contains(entry.leaf_index) {
            return Err(ChainStorageError::StateMismatch(format!(
                "utxo {} is spent",
                hex::encode(commitment.0)
            )));
        }
    }

    let kernel_count = cache.mmr_leaf_count(Tree::Kernel)?;
    if kernel_count != kernels.len() as u64 {
        return Err(ChainStorageError::StateMismatch(format!(
            "{} kernels rebuilt, {} expected",
            kernel_count,
            kernels.len()
        )));
    }
    for (index, kernel) in kernels.iter().enumerate() {
        let leaf = cache
            .mmr_leaf(Tree::Kernel, mweb_mmr::LeafIndex(index as u64))?
            .ok_or_else(|| ChainStorageError::StateMismatch(format!("kernel leaf {} missing", index)))?;
        if leaf != kernel.to_wire_bytes() {
            return Err(ChainStorageError::StateMismatch(format!(
                "kernel {} does not match ({})",
                index,
                kernel.hash()
            )));
        }
    }
    Ok(())
}
