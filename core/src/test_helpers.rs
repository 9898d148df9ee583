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

//! Helpers for building balanced transactions and well-formed blocks in tests. Not part of the
//! engine's public surface; panics are acceptable here.

use std::num::NonZeroU64;

use crate::{
    blocks::{Block, Header},
    chain_storage::{ChainStorageError, CoinsView, CoinsViewCache},
    consensus::{ChainParams, ConsensusEncoding, Hashed},
    crypto::{self, SignedMessage},
    node::BlockStore,
    transactions::{
        aggregation::aggregate,
        transaction_components::{Bech32Address, Input, Kernel, Output, OutputFeatures, OwnerData, PegOutCoin},
        Transaction,
        TxBody,
        WeightParams,
    },
    types::{BlindingFactor, Hash, ProofMessage, PublicKey, SecretKey},
};

/// A checksum-valid host-chain address (BIP-173 test vector), HRP `bc` to match [`test_params`].
pub const TEST_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

pub fn test_params() -> ChainParams {
    ChainParams::new(
        "bc",
        20,
        21_000,
        WeightParams {
            input_weight: 1,
            output_weight: 18,
            kernel_weight: 2,
            extra_bytes_per_weight: NonZeroU64::new(42).expect("non-zero"),
        },
    )
}

pub fn test_address() -> Bech32Address {
    Bech32Address::parse(TEST_ADDRESS).expect("test address is valid")
}

pub fn random_secret() -> SecretKey {
    crypto::parse_secret_key(BlindingFactor::random().as_bytes()).expect("random bytes are a valid scalar")
}

/// An output together with every secret needed to spend or audit it.
#[derive(Debug, Clone)]
pub struct TestOutput {
    pub output: Output,
    pub amount: u64,
    pub blind: BlindingFactor,
    pub sender_key: SecretKey,
    /// One-time secret whose public key is the output's receiver key.
    pub receiver_key: SecretKey,
}

/// Builds a fully valid output (real range proof, real owner signature) to a throwaway receiver.
pub fn create_test_output(amount: u64, features: OutputFeatures) -> TestOutput {
    let blind = BlindingFactor::random();
    let commitment = crypto::commit_blinded(amount, &blind).expect("commit");
    let sender_key = random_secret();
    let receiver_key = random_secret();
    let nonce = random_secret();

    let mut owner_data = OwnerData {
        features,
        sender_pubkey: crypto::public_key(&sender_key).expect("pubkey"),
        receiver_pubkey: crypto::public_key(&receiver_key).expect("pubkey"),
        key_exchange_pubkey: crypto::public_key(&random_secret()).expect("pubkey"),
        view_tag: 0,
        masked_value: amount,
        masked_nonce: [0u8; 16],
        signature: crypto::schnorr_sign(&sender_key, &Hash::default()).expect("sign"),
    };
    owner_data.signature =
        crypto::schnorr_sign(&sender_key, &owner_data.signed_message_hash()).expect("sign");

    let blind_key = crypto::parse_secret_key(blind.as_bytes()).expect("blind is a valid scalar");
    let proof = crypto::generate_range_proof(
        amount,
        &blind_key,
        &nonce,
        &nonce,
        ProofMessage::empty(),
        &owner_data.to_wire_bytes(),
    )
    .expect("range proof");

    TestOutput {
        output: Output::new(commitment, owner_data, proof),
        amount,
        blind,
        sender_key,
        receiver_key,
    }
}

struct KernelSpec {
    fee: u64,
    pegin: Option<u64>,
    pegout: Option<PegOutCoin>,
}

/// Assembles balanced transactions: blinds and ownership keys are split across kernels and
/// offsets exactly the way the wallet builders do it.
#[derive(Default)]
pub struct TxBuilder {
    inputs: Vec<Input>,
    input_blinds: Vec<BlindingFactor>,
    input_owner_keys: Vec<SecretKey>,
    outputs: Vec<Output>,
    output_blinds: Vec<BlindingFactor>,
    sender_keys: Vec<SecretKey>,
    kernels: Vec<KernelSpec>,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fabricated input, as if some earlier output of `amount` existed.
    pub fn add_input(mut self, amount: u64) -> Self {
        let blind = BlindingFactor::random();
        let commitment = crypto::commit_blinded(amount, &blind).expect("commit");
        self.inputs.push(Input::new(OutputFeatures::empty(), commitment));
        self.input_blinds.push(blind);
        self.input_owner_keys.push(random_secret());
        self
    }

    /// Spends a previously created [`TestOutput`].
    pub fn add_spend(mut self, spent: &TestOutput) -> Self {
        self.inputs
            .push(Input::new(spent.output.features(), *spent.output.commitment()));
        self.input_blinds.push(spent.blind);
        self.input_owner_keys.push(spent.receiver_key.clone());
        self
    }

    pub fn add_output(self, amount: u64) -> Self {
        self.add_test_output(create_test_output(amount, OutputFeatures::empty()))
    }

    pub fn add_pegin_output(self, amount: u64) -> Self {
        self.add_test_output(create_test_output(amount, OutputFeatures::PEGGED_IN))
    }

    pub fn add_test_output(mut self, out: TestOutput) -> Self {
        self.output_blinds.push(out.blind);
        self.sender_keys.push(out.sender_key);
        self.outputs.push(out.output);
        self
    }

    pub fn add_plain_kernel(mut self, fee: u64) -> Self {
        self.kernels.push(KernelSpec {
            fee,
            pegin: None,
            pegout: None,
        });
        self
    }

    pub fn add_pegin_kernel(mut self, amount: u64) -> Self {
        self.kernels.push(KernelSpec {
            fee: 0,
            pegin: Some(amount),
            pegout: None,
        });
        self
    }

    pub fn add_pegout_kernel(mut self, amount: u64, fee: u64) -> Self {
        self.kernels.push(KernelSpec {
            fee,
            pegin: None,
            pegout: Some(PegOutCoin::new(amount, test_address())),
        });
        self
    }

    /// The receiver keys of the outputs this transaction spends, for owner-sum validation.
    pub fn input_owner_pubkeys(&self) -> Vec<PublicKey> {
        self.input_owner_keys
            .iter()
            .map(|k| crypto::public_key(k).expect("pubkey"))
            .collect()
    }

    pub fn build(self) -> Result<Transaction, ChainStorageError> {
        let kernel_offset = BlindingFactor::random();

        // sum(output blinds) - sum(input blinds) = kernel_offset + sum(kernel blinds)
        let total_kernel_blind =
            crypto::add_blinding_factors(&self.output_blinds, &[self.input_blinds.clone(), vec![kernel_offset]].concat())
                .map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;

        let mut kernel_blinds: Vec<BlindingFactor> =
            (1..self.kernels.len()).map(|_| BlindingFactor::random()).collect();
        let last_blind = crypto::add_blinding_factors(&[total_kernel_blind], &kernel_blinds)
            .map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;
        kernel_blinds.push(last_blind);

        let mut kernels = Vec::with_capacity(self.kernels.len());
        let mut owner_sig_keys = Vec::with_capacity(self.kernels.len());
        let mut owner_signatures = Vec::with_capacity(self.kernels.len());
        for (spec, blind) in self.kernels.into_iter().zip(kernel_blinds) {
            let kernel = Kernel::create(&blind, spec.fee, spec.pegin, spec.pegout, None, vec![])
                .map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;
            let kernel_hash = kernel.hash();
            let sig_key = random_secret();
            owner_signatures.push(SignedMessage {
                public_key: crypto::public_key(&sig_key).expect("pubkey"),
                signature: crypto::schnorr_sign(&sig_key, &kernel_hash).expect("sign"),
                message_hash: kernel_hash,
            });
            owner_sig_keys.push(BlindingFactor::from(sig_key));
            kernels.push(kernel);
        }

        // sum(sender keys) - sum(input owner keys) = owner_offset + sum(owner sig keys)
        let sender_blinds: Vec<BlindingFactor> = self.sender_keys.iter().cloned().map(Into::into).collect();
        let input_owner_blinds: Vec<BlindingFactor> =
            self.input_owner_keys.iter().cloned().map(Into::into).collect();
        let owner_offset = crypto::add_blinding_factors(
            &sender_blinds,
            &[input_owner_blinds, owner_sig_keys].concat(),
        )
        .map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;

        Ok(Transaction::new(
            kernel_offset,
            owner_offset,
            TxBody::new(self.inputs, self.outputs, kernels, owner_signatures),
        ))
    }
}

/// Assembles a block extending `view` from the given transactions, computing the header roots and
/// offset totals the same way a miner integration would.
pub fn build_next_block<V: CoinsView>(view: &V, txs: Vec<Transaction>) -> Result<Block, ChainStorageError> {
    let prev = view.best_header();
    let tx = aggregate(txs).map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;
    let height = prev.as_ref().map(|h| h.height + 1).unwrap_or(1);
    let (prev_kernel, prev_owner) = prev
        .map(|h| (h.kernel_offset, h.owner_offset))
        .unwrap_or_default();

    let kernel_offset = crypto::add_blinding_factors(&[prev_kernel, tx.kernel_offset], &[])
        .map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;
    let owner_offset = crypto::add_blinding_factors(&[prev_owner, tx.owner_offset], &[])
        .map_err(|e| ChainStorageError::InvalidOperation(e.to_string()))?;

    let body = tx.body().clone();
    let mut cache = CoinsViewCache::new(view)?;
    cache.apply_body(&body, height)?;
    let roots = cache.roots()?;

    let header = Header {
        height,
        output_root: roots.output_root,
        rangeproof_root: roots.rangeproof_root,
        kernel_root: roots.kernel_root,
        leafset_root: roots.leafset_root,
        kernel_offset,
        owner_offset,
    };
    Ok(Block::new(header, body))
}

/// Hash-linked in-memory block store for initial-sync tests.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: Vec<Block>,
}

impl MemoryBlockStore {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

impl BlockStore for MemoryBlockStore {
    fn block(&self, hash: &Hash) -> Result<Option<Block>, ChainStorageError> {
        Ok(self.blocks.iter().find(|b| b.block_hash() == *hash).cloned())
    }

    fn next_block_hash(&self, hash: &Hash) -> Result<Option<Hash>, ChainStorageError> {
        let pos = self.blocks.iter().position(|b| b.block_hash() == *hash);
        Ok(pos.and_then(|p| self.blocks.get(p + 1)).map(|b| b.block_hash()))
    }
}
