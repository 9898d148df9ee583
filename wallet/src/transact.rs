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

//! Confidential-send construction and the shared transaction assembly every builder uses.

use log::*;
use mweb_core::{
    consensus::Hashed,
    crypto::{self, SignedMessage},
    transactions::{
        transaction_components::{Input, Kernel, OutputFeatures, PegOutCoin},
        Transaction,
        TxBody,
    },
    types::{BlindingFactor, Commitment},
};

use crate::{
    coin::Coin,
    error::WalletError,
    keychain::CHANGE_INDEX,
    output_factory::{create_output, random_secret},
    stealth::StealthAddress,
    storage::WalletStore,
    wallet::Wallet,
};

pub const LOG_TARGET: &str = "mweb::wallet::transact";

impl<W: WalletStore> Wallet<W> {
    /// Sends `amount` to a stealth address, selecting inputs greedily and returning change to
    /// `CHANGE_INDEX`.
    pub fn send(
        &self,
        amount: u64,
        fee_base: u64,
        receiver: &StealthAddress,
        tip_height: u64,
    ) -> Result<Transaction, WalletError> {
        let (coins, fee) = self.select_coins(amount, fee_base, 2, tip_height)?;
        let total: u64 = coins.iter().map(|c| c.amount).sum();
        let change = total - amount - fee;
        let recipients = [(amount, *receiver), (change, self.address(CHANGE_INDEX)?)];
        debug!(target: LOG_TARGET, "Sending {} with fee {} over {} inputs", amount, fee, coins.len());
        self.build_tx(coins, &recipients, None, None, fee)
    }

    /// Builds from caller-selected inputs, the way the host signals explicit coin control.
    pub fn create_tx(
        &self,
        selected_inputs: &[Commitment],
        recipients: &[(u64, StealthAddress)],
        pegout: Option<PegOutCoin>,
        pegin_amount: Option<u64>,
        fee: u64,
    ) -> Result<Transaction, WalletError> {
        let mut coins = Vec::with_capacity(selected_inputs.len());
        for commitment in selected_inputs {
            let coin = self
                .store()
                .coin(commitment)?
                .ok_or_else(|| WalletError::UnknownCoin(hex::encode(commitment.0)))?;
            coins.push(coin);
        }
        self.build_tx(coins, recipients, pegout, pegin_amount, fee)
    }

    /// Greedy selection by value, largest first, ties broken by ascending commitment hash. Only
    /// unspent, confirmed, mature coins qualify. Returns the selection and the final fee for it.
    pub(crate) fn select_coins(
        &self,
        amount: u64,
        fee_base: u64,
        num_outputs: usize,
        tip_height: u64,
    ) -> Result<(Vec<Coin>, u64), WalletError> {
        let maturity = u64::from(self.params().pegin_maturity);
        let mut spendable: Vec<Coin> = self
            .store()
            .coins()?
            .into_iter()
            .filter(|coin| {
                coin.is_unspent() &&
                    match coin.depth(tip_height) {
                        None => false,
                        Some(depth) => !coin.pegged_in || depth >= maturity,
                    }
            })
            .collect();
        spendable.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| crypto::blake2b(&a.commitment.0).cmp(&crypto::blake2b(&b.commitment.0)))
        });

        let available: u64 = spendable.iter().map(|c| c.amount).sum();
        let mut selected = Vec::new();
        let mut total = 0u64;
        for coin in spendable {
            total += coin.amount;
            selected.push(coin);
            let fee = fee_base * self.params().weight.calculate(selected.len(), num_outputs, 1, 0);
            if total >= amount.saturating_add(fee) {
                return Ok((selected, fee));
            }
        }
        let final_fee = fee_base * self.params().weight.calculate(selected.len().max(1), num_outputs, 1, 0);
        Err(WalletError::InsufficientFunds {
            required: amount.saturating_add(final_fee),
            available,
        })
    }

    /// The single assembly path: one kernel carrying the fee and peg metadata, blinds and
    /// ownership keys split across the kernel, the offsets and one owner signature.
    pub(crate) fn build_tx(
        &self,
        input_coins: Vec<Coin>,
        recipients: &[(u64, StealthAddress)],
        pegout: Option<PegOutCoin>,
        pegin_amount: Option<u64>,
        fee: u64,
    ) -> Result<Transaction, WalletError> {
        let mut outputs = Vec::with_capacity(recipients.len());
        let mut output_blinds = Vec::with_capacity(recipients.len());
        let mut sender_keys = Vec::with_capacity(recipients.len());
        for (amount, address) in recipients {
            let sender_key = random_secret()?;
            let (output, blind) = create_output(&sender_key, address, *amount, OutputFeatures::empty())?;
            outputs.push(output);
            output_blinds.push(blind);
            sender_keys.push(sender_key);
        }

        let inputs: Vec<Input> = input_coins
            .iter()
            .map(|coin| {
                let features = if coin.pegged_in {
                    OutputFeatures::PEGGED_IN
                } else {
                    OutputFeatures::empty()
                };
                Input::new(features, coin.commitment)
            })
            .collect();
        let input_blinds: Vec<BlindingFactor> = input_coins.iter().map(|c| c.blind).collect();

        // sum(output.blind) - sum(input.blind) = kernel_offset + kernel.blind
        let kernel_offset = BlindingFactor::random();
        let kernel_blind = crypto::add_blinding_factors(
            &output_blinds,
            &[input_blinds, vec![kernel_offset]].concat(),
        )?;
        let kernel = Kernel::create(&kernel_blind, fee, pegin_amount, pegout, None, vec![])?;
        let kernel_hash = kernel.hash();

        // sum(output.sender_key) - sum(input.spend_key) = owner_offset + owner_sig.key
        let owner_sig_key = random_secret()?;
        let owner_signature = SignedMessage {
            public_key: crypto::public_key(&owner_sig_key)?,
            signature: crypto::schnorr_sign(&owner_sig_key, &kernel_hash)?,
            message_hash: kernel_hash,
        };
        let sender_blinds: Vec<BlindingFactor> = sender_keys.into_iter().map(Into::into).collect();
        let input_owner_blinds: Vec<BlindingFactor> =
            input_coins.iter().map(|c| BlindingFactor::from(c.spend_key.clone())).collect();
        let owner_offset = crypto::add_blinding_factors(
            &sender_blinds,
            &[input_owner_blinds, vec![BlindingFactor::from(owner_sig_key)]].concat(),
        )?;

        Ok(Transaction::new(
            kernel_offset,
            owner_offset,
            TxBody::new(inputs, outputs, vec![kernel], vec![owner_signature]),
        ))
    }
}
