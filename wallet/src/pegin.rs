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

//! Peg-in construction: minting a pegged-in output against value burned on the host chain.

use log::*;
use mweb_core::{
    consensus::Hashed,
    crypto::{self, SignedMessage},
    transactions::{
        transaction_components::{Kernel, OutputFeatures},
        Transaction,
        TxBody,
    },
    types::BlindingFactor,
};

use crate::{
    error::WalletError,
    output_factory::{create_output, random_secret},
    stealth::StealthAddress,
    storage::WalletStore,
    wallet::Wallet,
};

pub const LOG_TARGET: &str = "mweb::wallet::pegin";

impl<W: WalletStore> Wallet<W> {
    /// Builds a fee-less peg-in of `amount` to `receiver`. No inputs: the kernel's peg-in field
    /// accounts for the minted value.
    pub fn create_pegin_tx(&self, amount: u64, receiver: &StealthAddress) -> Result<Transaction, WalletError> {
        let sender_key = random_secret()?;
        let (output, output_blind) = create_output(&sender_key, receiver, amount, OutputFeatures::PEGGED_IN)?;

        // sum(output.blind) = kernel_offset + kernel.blind
        let kernel_offset = BlindingFactor::random();
        let kernel_blind = crypto::add_blinding_factors(&[output_blind], &[kernel_offset])?;
        let kernel = Kernel::create(&kernel_blind, 0, Some(amount), None, None, vec![])?;
        let kernel_hash = kernel.hash();

        // sum(output.sender_key) = owner_offset + owner_sig.key
        let owner_sig_key = random_secret()?;
        let owner_signature = SignedMessage {
            public_key: crypto::public_key(&owner_sig_key)?,
            signature: crypto::schnorr_sign(&owner_sig_key, &kernel_hash)?,
            message_hash: kernel_hash,
        };
        let owner_offset = crypto::add_blinding_factors(
            &[BlindingFactor::from(sender_key)],
            &[BlindingFactor::from(owner_sig_key)],
        )?;

        // A peg-in to our own wallet is rewound and persisted immediately: the same path restore
        // uses, so success here proves the coin is recoverable from seed.
        if self.is_own_address(receiver)?.is_some() {
            let coin = self.rewind_output(&output)?;
            debug!(target: LOG_TARGET, "Pegging in {} to own address (index {})", amount, coin.address_index);
            self.store().add_coins(&[coin])?;
        }

        Ok(Transaction::new(
            kernel_offset,
            owner_offset,
            TxBody::new(vec![], vec![output], vec![kernel], vec![owner_signature]),
        ))
    }
}
