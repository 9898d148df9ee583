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

//! Peg-out construction: burning confidential value back to a transparent host-chain address.

use log::*;
use mweb_core::transactions::{
    transaction_components::{Bech32Address, PegOutCoin},
    Transaction,
};

use crate::{error::WalletError, keychain::CHANGE_INDEX, storage::WalletStore, wallet::Wallet};

pub const LOG_TARGET: &str = "mweb::wallet::pegout";

impl<W: WalletStore> Wallet<W> {
    /// Pegs out `amount` to a host-chain address, with `fee = fee_base · estimated_weight` and
    /// change returned to `CHANGE_INDEX`.
    pub fn create_pegout_tx(
        &self,
        amount: u64,
        fee_base: u64,
        address: Bech32Address,
        tip_height: u64,
    ) -> Result<Transaction, WalletError> {
        if address.hrp() != self.params().hrp {
            return Err(WalletError::InvalidAddress(format!(
                "HRP '{}' does not match chain '{}'",
                address.hrp(),
                self.params().hrp
            )));
        }

        let (coins, fee) = self.select_coins(amount, fee_base, 1, tip_height)?;
        let total: u64 = coins.iter().map(|c| c.amount).sum();
        let change = total - amount - fee;
        let recipients = [(change, self.address(CHANGE_INDEX)?)];
        debug!(target: LOG_TARGET, "Pegging out {} (fee {}) over {} inputs", amount, fee, coins.len());
        self.build_tx(coins, &recipients, Some(PegOutCoin::new(amount, address)), None, fee)
    }
}
