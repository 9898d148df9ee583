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

//! The storage contract the host wallet supplies: seed custody and a coin table.

use std::{collections::HashMap, sync::RwLock};

use mweb_core::types::{Commitment, Hash};

use crate::{coin::Coin, error::WalletError};

pub trait WalletStore: Send + Sync {
    fn master_seed(&self) -> Result<Vec<u8>, WalletError>;

    fn add_coins(&self, coins: &[Coin]) -> Result<(), WalletError>;

    fn coin(&self, commitment: &Commitment) -> Result<Option<Coin>, WalletError>;

    fn coins(&self) -> Result<Vec<Coin>, WalletError>;

    fn mark_spent(&self, commitment: &Commitment, tx_hash: Hash) -> Result<(), WalletError>;

    /// Clears the spend marker of every coin recorded as spent by `spent_by`. Called when the
    /// block (or transaction) that spent them is rolled back, returning the coins to spendable.
    fn unmark_spent(&self, spent_by: &Hash) -> Result<(), WalletError>;

    /// Rolls wallet state back to `height`: coins created above it return to unconfirmed.
    fn rewind_to(&self, height: u64) -> Result<(), WalletError>;
}

/// In-memory store used by tests.
pub struct MemoryWalletStore {
    seed: Vec<u8>,
    coins: RwLock<HashMap<[u8; 33], Coin>>,
}

impl MemoryWalletStore {
    pub fn new(seed: Vec<u8>) -> Self {
        Self {
            seed,
            coins: RwLock::new(HashMap::new()),
        }
    }
}

impl WalletStore for MemoryWalletStore {
    fn master_seed(&self) -> Result<Vec<u8>, WalletError> {
        Ok(self.seed.clone())
    }

    fn add_coins(&self, coins: &[Coin]) -> Result<(), WalletError> {
        let mut table = self.coins.write().expect("wallet store lock poisoned");
        for coin in coins {
            // re-adding an already-tracked coin refreshes its height, never its spend marker
            let entry = table.entry(coin.commitment.0).or_insert_with(|| coin.clone());
            if entry.included_height.is_none() {
                entry.included_height = coin.included_height;
            }
        }
        Ok(())
    }

    fn coin(&self, commitment: &Commitment) -> Result<Option<Coin>, WalletError> {
        Ok(self
            .coins
            .read()
            .expect("wallet store lock poisoned")
            .get(&commitment.0)
            .cloned())
    }

    fn coins(&self) -> Result<Vec<Coin>, WalletError> {
        Ok(self.coins.read().expect("wallet store lock poisoned").values().cloned().collect())
    }

    fn mark_spent(&self, commitment: &Commitment, tx_hash: Hash) -> Result<(), WalletError> {
        if let Some(coin) = self
            .coins
            .write()
            .expect("wallet store lock poisoned")
            .get_mut(&commitment.0)
        {
            coin.spent_by = Some(tx_hash);
        }
        Ok(())
    }

    fn unmark_spent(&self, spent_by: &Hash) -> Result<(), WalletError> {
        let mut table = self.coins.write().expect("wallet store lock poisoned");
        for coin in table.values_mut() {
            if coin.spent_by.as_ref() == Some(spent_by) {
                coin.spent_by = None;
            }
        }
        Ok(())
    }

    fn rewind_to(&self, height: u64) -> Result<(), WalletError> {
        let mut table = self.coins.write().expect("wallet store lock poisoned");
        for coin in table.values_mut() {
            if coin.included_height.map(|h| h > height).unwrap_or(false) {
                coin.included_height = None;
            }
        }
        Ok(())
    }
}
