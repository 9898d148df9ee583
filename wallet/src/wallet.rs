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

use log::*;
use mweb_core::{
    blocks::Block,
    consensus::{ChainParams, Hashed},
    crypto,
    transactions::{transaction_components::Output, Transaction},
    types::Hash,
};

use crate::{
    chain::Chain,
    coin::Coin,
    error::WalletError,
    keychain::Keychain,
    output_factory::{derive_blind, mask_payload, point_digest, scalar_from_hash},
    stealth::StealthAddress,
    storage::WalletStore,
};

pub const LOG_TARGET: &str = "mweb::wallet";

/// How many address indices the scanner matches candidate outputs against.
const TRACKED_ADDRESSES: u32 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletBalance {
    pub confirmed: u64,
    /// Pegged-in value still inside the maturity window.
    pub immature: u64,
    /// Seen only in the mempool so far.
    pub unconfirmed: u64,
}

/// The wallet core: recognizes owned outputs on the opaque chain, maintains the coin table via
/// the host storage interface, and answers balance queries.
pub struct Wallet<W> {
    store: W,
    keychain: Keychain,
    params: ChainParams,
}

impl<W: WalletStore> Wallet<W> {
    /// Derives the keychain from the store's master seed.
    pub fn open(store: W, params: ChainParams) -> Result<Self, WalletError> {
        let seed = store.master_seed()?;
        let keychain = Keychain::from_seed(&seed)?;
        Ok(Self {
            store,
            keychain,
            params,
        })
    }

    pub fn store(&self) -> &W {
        &self.store
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn address(&self, index: u32) -> Result<StealthAddress, WalletError> {
        self.keychain.address(index)
    }

    /// The address index this stealth address belongs to, if it is one of ours.
    pub fn is_own_address(&self, address: &StealthAddress) -> Result<Option<u32>, WalletError> {
        if address.scan_pubkey() != &self.keychain.scan_pubkey()? {
            return Ok(None);
        }
        for index in 0..TRACKED_ADDRESSES {
            if self.keychain.address(index)? == *address {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Recovers the full opening of an output addressed to us. The inverse of
    /// [`crate::create_output`]:
    ///
    /// 1. cheap view-tag rejection from `H(scan_secret·R)`;
    /// 2. one-time-key match `P == H(scan_secret·R)·G + B_i` over the tracked indices;
    /// 3. unmask `(amount, nonce)` under `H(spend_key(i)·sender_pubkey)` and re-derive the blind;
    /// 4. reject as spoofed unless the commitment recomputes exactly.
    pub fn rewind_output(&self, output: &Output) -> Result<Coin, WalletError> {
        let shared_tweak = point_digest(&crypto::mul_public_key(
            output.key_exchange_pubkey(),
            self.keychain.scan_secret(),
        )?);
        if shared_tweak.as_bytes()[0] != output.view_tag() {
            return Err(WalletError::NotOurOutput);
        }

        let tweak = scalar_from_hash(&shared_tweak)?;
        let tweak_point = crypto::public_key(&tweak)?;
        let mut matched = None;
        for index in 0..TRACKED_ADDRESSES {
            let spend_key = self.keychain.spend_key(index)?;
            let candidate = crypto::add_public_keys(&[tweak_point, crypto::public_key(&spend_key)?])?;
            if candidate == *output.receiver_pubkey() {
                matched = Some((index, spend_key));
                break;
            }
        }
        let (address_index, spend_key) = matched.ok_or(WalletError::NotOurOutput)?;

        let shared_secret = point_digest(&crypto::mul_public_key(output.sender_pubkey(), &spend_key)?);
        let (amount, nonce) = mask_payload(
            &shared_secret,
            output.owner_data().masked_value,
            output.owner_data().masked_nonce,
        );
        let blind = derive_blind(&nonce, amount)?;
        if crypto::commit_blinded(amount, &blind)? != *output.commitment() {
            // decrypts under our keys but does not open the commitment: malformed or spoofed
            return Err(WalletError::Crypto(crypto::CryptoError::InvalidKey(
                "rewound opening does not match commitment".into(),
            )));
        }

        let one_time_key = crypto::add_secret_keys(&tweak, &spend_key)?;
        Ok(Coin {
            address_index,
            amount,
            blind,
            spend_key: one_time_key,
            commitment: *output.commitment(),
            pegged_in: output.is_pegged_in(),
            included_height: None,
            spent_by: None,
        })
    }

    /// Classifies every unspent coin at the given tip.
    pub fn balance(&self, tip_height: u64) -> Result<WalletBalance, WalletError> {
        let mut balance = WalletBalance::default();
        for coin in self.store.coins()? {
            if !coin.is_unspent() {
                continue;
            }
            match coin.depth(tip_height) {
                None => balance.unconfirmed += coin.amount,
                Some(depth) => {
                    if coin.pegged_in && depth < u64::from(self.params.pegin_maturity) {
                        balance.immature += coin.amount;
                    } else {
                        balance.confirmed += coin.amount;
                    }
                },
            }
        }
        Ok(balance)
    }

    /// Scans a connected block for owned outputs and spends of tracked coins.
    pub fn block_connected(&self, block: &Block, canonical_block_hash: &Hash) -> Result<(), WalletError> {
        let coins = self.scan_outputs(block.body().outputs(), Some(block.height()));
        if !coins.is_empty() {
            debug!(target: LOG_TARGET, "Recovered {} coins in block {}", coins.len(), block.height());
            self.store.add_coins(&coins)?;
        }
        for input in block.body().inputs() {
            if self.store.coin(&input.commitment)?.is_some() {
                self.store.mark_spent(&input.commitment, *canonical_block_hash)?;
            }
        }
        Ok(())
    }

    /// Reverses [`block_connected`](Self::block_connected): spends recorded against the block are
    /// undone and coins created in it return to the unconfirmed state.
    pub fn block_disconnected(&self, block: &Block, canonical_block_hash: &Hash) -> Result<(), WalletError> {
        self.store.unmark_spent(canonical_block_hash)?;
        self.store.rewind_to(block.height().saturating_sub(1))
    }

    pub fn transaction_added_to_mempool(&self, tx: &Transaction) -> Result<(), WalletError> {
        let coins = self.scan_outputs(tx.body().outputs(), None);
        if !coins.is_empty() {
            self.store.add_coins(&coins)?;
        }
        let tx_hash = tx.hash();
        for input in tx.body().inputs() {
            if self.store.coin(&input.commitment)?.is_some() {
                self.store.mark_spent(&input.commitment, tx_hash)?;
            }
        }
        Ok(())
    }

    /// Full historical scan, e.g. after restoring from seed: every block is replayed through the
    /// connect path, so spends of recovered coins are picked up too. Per-output failures are scan
    /// misses, not errors.
    pub fn scan_for_outputs(&self, chain: &dyn Chain) -> Result<usize, WalletError> {
        let tip = chain.tip_height()?;
        let before = self.store.coins()?.len();
        for height in 1..=tip {
            let block = match chain.block_at(height)? {
                Some(block) => block,
                None => continue,
            };
            self.block_connected(&block, &block.block_hash())?;
        }
        let recovered = self.store.coins()?.len() - before;
        info!(target: LOG_TARGET, "Scan complete: {} coins recovered up to height {}", recovered, tip);
        Ok(recovered)
    }

    fn scan_outputs(&self, outputs: &[Output], height: Option<u64>) -> Vec<Coin> {
        outputs
            .iter()
            .filter_map(|output| match self.rewind_output(output) {
                Ok(mut coin) => {
                    coin.included_height = height;
                    Some(coin)
                },
                // foreign, malformed or spoofed outputs are all the same to the scanner
                Err(_) => None,
            })
            .collect()
    }
}
